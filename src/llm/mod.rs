pub mod ollama;
pub mod r#trait;

pub use ollama::OllamaVisionProvider;
pub use r#trait::VisionProvider;
