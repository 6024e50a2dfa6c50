pub mod config;
pub mod constants;
pub mod error;
pub mod llm;
pub mod metadata;
pub mod models;
pub mod organizer;
pub mod pipeline;
pub mod processor;
pub mod scanner;
pub mod tagger;
pub mod utils;
pub mod vocabulary;

pub use config::Config;
pub use error::{Error, Result};
pub use llm::{OllamaVisionProvider, VisionProvider};
pub use models::{ImageTask, MetadataOutcome, PlacementMode, PlacementResult, RunSummary, TaskRecord};
pub use organizer::FileRelocator;
pub use pipeline::Pipeline;
pub use processor::{CancelFlag, ParallelProcessor};
pub use scanner::ImageScanner;
pub use tagger::TagClient;
pub use vocabulary::CategoryVocabulary;
