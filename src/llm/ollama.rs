use crate::config::Config;
use crate::constants::{DEFAULT_MODEL, DEFAULT_OLLAMA_URL, DEFAULT_TEMPERATURE, DEFAULT_TIMEOUT_SECS};
use crate::error::{Error, Result};
use crate::llm::VisionProvider;
use base64::{engine::general_purpose, Engine as _};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::debug;

/// Vision provider backed by an Ollama server's `/api/chat` endpoint
pub struct OllamaVisionProvider {
    base_url: String,
    model: String,
    temperature: f32,
    timeout: Duration,
    client: reqwest::Client,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    stream: bool,
    options: ChatOptions,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
    images: Vec<String>,
}

#[derive(Serialize)]
struct ChatOptions {
    temperature: f32,
}

#[derive(Deserialize)]
struct ChatResponse {
    message: Option<ResponseMessage>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: String,
}

#[derive(Deserialize)]
struct TagsResponse {
    #[serde(default)]
    models: Vec<ModelEntry>,
}

#[derive(Deserialize)]
struct ModelEntry {
    name: String,
}

impl OllamaVisionProvider {
    /// Create a provider; `None` picks the default URL and model
    pub fn new(base_url: Option<&str>, model: Option<&str>) -> Result<Self> {
        Self::with_timeout(
            base_url,
            model,
            Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        )
    }

    /// Create a provider whose requests give up after `timeout`
    pub fn with_timeout(base_url: Option<&str>, model: Option<&str>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::Configuration(format!("cannot build HTTP client: {}", e)))?;

        Ok(Self {
            base_url: base_url
                .unwrap_or(DEFAULT_OLLAMA_URL)
                .trim_end_matches('/')
                .to_string(),
            model: model.unwrap_or(DEFAULT_MODEL).to_string(),
            temperature: DEFAULT_TEMPERATURE,
            timeout,
            client,
        })
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        let mut provider = Self::with_timeout(
            Some(&config.ollama.url),
            Some(&config.ollama.model),
            config.request_timeout(),
        )?;
        provider.temperature = config.ollama.temperature;
        Ok(provider)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Whether the server answers and lists the configured model
    pub async fn has_model(&self) -> Result<bool> {
        let url = format!("{}/api/tags", self.base_url);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| transport_error(&self.base_url, e))?;

        if !response.status().is_success() {
            return Err(Error::ServiceUnavailable(format!(
                "Ollama at {} returned {}",
                self.base_url,
                response.status()
            )));
        }

        let tags: TagsResponse = response
            .json()
            .await
            .map_err(|e| Error::InvalidResponse(format!("cannot parse model list: {}", e)))?;

        let wanted = self.model.as_str();
        Ok(tags
            .models
            .iter()
            .any(|m| m.name == wanted || m.name.strip_suffix(":latest") == Some(wanted)))
    }
}

fn transport_error(base_url: &str, e: reqwest::Error) -> Error {
    if e.is_timeout() {
        Error::ServiceUnavailable(format!("request to {} timed out", base_url))
    } else {
        Error::ServiceUnavailable(format!("cannot reach Ollama at {}: {}", base_url, e))
    }
}

#[async_trait::async_trait]
impl VisionProvider for OllamaVisionProvider {
    async fn describe(&self, image_path: &Path, prompt: &str) -> Result<String> {
        let bytes = tokio::fs::read(image_path)
            .await
            .map_err(|source| Error::ImageUnreadable {
                path: image_path.to_path_buf(),
                source,
            })?;

        let request = ChatRequest {
            model: &self.model,
            messages: vec![ChatMessage {
                role: "user",
                content: prompt,
                images: vec![general_purpose::STANDARD.encode(&bytes)],
            }],
            stream: false,
            options: ChatOptions {
                temperature: self.temperature,
            },
        };

        let url = format!("{}/api/chat", self.base_url);
        debug!(
            "POST {} model={} image={} ({} bytes, timeout {:?})",
            url,
            self.model,
            image_path.display(),
            bytes.len(),
            self.timeout
        );

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| transport_error(&self.base_url, e))?;

        let status = response.status();
        if status.is_server_error() {
            return Err(Error::ServiceUnavailable(format!(
                "Ollama at {} returned {}",
                self.base_url, status
            )));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::InvalidResponse(format!(
                "Ollama returned {}: {}",
                status,
                body.trim()
            )));
        }

        let chat: ChatResponse = response
            .json()
            .await
            .map_err(|e| Error::InvalidResponse(format!("cannot parse Ollama response: {}", e)))?;

        if let Some(error) = chat.error {
            return Err(Error::InvalidResponse(error));
        }

        Ok(chat.message.map(|m| m.content).unwrap_or_default())
    }

    fn model(&self) -> &str {
        &self.model
    }
}
