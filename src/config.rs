use crate::constants::*;
use crate::error::Error;
use crate::models::PlacementMode;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Application configuration loaded from settings.toml
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub ollama: OllamaConfig,
    #[serde(default)]
    pub tagging: TaggingConfig,
    #[serde(default)]
    pub organizer: OrganizerConfig,
    #[serde(default)]
    pub scan: ScanConfig,
    #[serde(default)]
    pub processing: ProcessingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OllamaConfig {
    #[serde(default = "default_ollama_url")]
    pub url: String,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaggingConfig {
    #[serde(default = "default_tag_count")]
    pub tag_count: usize,
    #[serde(default = "default_categories")]
    pub categories: PathBuf,
    #[serde(default = "default_fallback_keyword")]
    pub fallback_keyword: String,
    #[serde(default = "default_retry_backoff_ms")]
    pub retry_backoff_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrganizerConfig {
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
    #[serde(default)]
    pub mode: PlacementMode,
    #[serde(default = "default_max_tags_in_filename")]
    pub max_tags_in_filename: usize,
    #[serde(default = "default_true")]
    pub write_metadata: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanConfig {
    /// Walk the whole subtree instead of direct children only
    #[serde(default = "default_true")]
    pub recursive: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessingConfig {
    #[serde(default = "default_workers")]
    pub workers: usize,
}

fn default_ollama_url() -> String {
    DEFAULT_OLLAMA_URL.to_string()
}

fn default_model() -> String {
    DEFAULT_MODEL.to_string()
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

fn default_temperature() -> f32 {
    DEFAULT_TEMPERATURE
}

fn default_tag_count() -> usize {
    DEFAULT_TAG_COUNT
}

fn default_categories() -> PathBuf {
    PathBuf::from(DEFAULT_CATEGORIES_FILE)
}

fn default_fallback_keyword() -> String {
    FALLBACK_KEYWORD.to_string()
}

fn default_retry_backoff_ms() -> u64 {
    DEFAULT_RETRY_BACKOFF_MS
}

fn default_output_dir() -> PathBuf {
    PathBuf::from(DEFAULT_OUTPUT_DIR)
}

fn default_max_tags_in_filename() -> usize {
    DEFAULT_MAX_TAGS_IN_FILENAME
}

fn default_workers() -> usize {
    DEFAULT_WORKERS
}

fn default_true() -> bool {
    true
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self {
            url: default_ollama_url(),
            model: default_model(),
            timeout_secs: default_timeout_secs(),
            temperature: default_temperature(),
        }
    }
}

impl Default for TaggingConfig {
    fn default() -> Self {
        Self {
            tag_count: default_tag_count(),
            categories: default_categories(),
            fallback_keyword: default_fallback_keyword(),
            retry_backoff_ms: default_retry_backoff_ms(),
        }
    }
}

impl Default for OrganizerConfig {
    fn default() -> Self {
        Self {
            output_dir: default_output_dir(),
            mode: PlacementMode::default(),
            max_tags_in_filename: default_max_tags_in_filename(),
            write_metadata: true,
        }
    }
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self { recursive: true }
    }
}

impl Default for ProcessingConfig {
    fn default() -> Self {
        Self {
            workers: default_workers(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;

        let config: Config = toml::from_str(&content).context("Failed to parse config file")?;

        Ok(config)
    }

    /// Load configuration from default location or return defaults
    pub fn load() -> Result<Self> {
        let default_paths = [
            PathBuf::from("config/settings.toml"),
            PathBuf::from("choucroute.toml"),
            PathBuf::from(shellexpand::tilde("~/.config/choucroute/settings.toml").as_ref()),
        ];

        for path in &default_paths {
            if path.exists() {
                return Self::from_file(path);
            }
        }

        Ok(Self::default())
    }

    /// Reject values the pipeline cannot run with
    pub fn validate(&self) -> std::result::Result<(), Error> {
        if self.tagging.tag_count == 0 {
            return Err(Error::Configuration(
                "tag count must be at least 1 (the first tag is the category)".into(),
            ));
        }
        if self.processing.workers == 0 {
            return Err(Error::Configuration("worker limit must be at least 1".into()));
        }
        if self.ollama.timeout_secs == 0 {
            return Err(Error::Configuration("LLM timeout must be at least 1 second".into()));
        }
        if self.tagging.fallback_keyword.trim().is_empty() {
            return Err(Error::Configuration("fallback keyword must not be empty".into()));
        }
        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.ollama.timeout_secs)
    }

    pub fn retry_backoff(&self) -> Duration {
        Duration::from_millis(self.tagging.retry_backoff_ms)
    }
}
