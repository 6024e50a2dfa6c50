use crate::error::Result;
use std::path::Path;

/// A model-serving endpoint that can look at an image and answer a prompt
#[async_trait::async_trait]
pub trait VisionProvider: Send + Sync {
    /// Send the image at `image_path` with `prompt` and return the raw text completion.
    /// An empty string is a valid (if useless) answer; callers decide what to do with it.
    async fn describe(&self, image_path: &Path, prompt: &str) -> Result<String>;

    /// Model identifier used for requests, for logs and reports
    fn model(&self) -> &str;
}
