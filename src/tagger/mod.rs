pub mod client;
pub mod parser;
pub mod prompt;

pub use client::TagClient;
pub use parser::{normalize_tags, parse_keywords, split_tags};
pub use prompt::build_prompt;
