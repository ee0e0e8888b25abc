//! Configuration for the story index.
//!
//! [`StoryConfig`] is the process-wide model and chunking configuration. It is
//! passed explicitly into each component at construction; nothing reads it
//! from global state.
//!
//! [`Settings`] wraps it with deployment concerns and is loaded in layers:
//! defaults -> config file -> `STORY_*` environment variables.

use config::{Config, Environment, File};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::StoryError;

/// Embedding dimension of all-MiniLM-L6-v2, the default model.
pub const DEFAULT_EMBEDDING_DIM: usize = 384;

/// Model and chunking configuration shared by all components.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoryConfig {
    /// Chat model used by the extraction collaborator
    #[serde(default = "default_model_name")]
    pub model_name: String,

    /// Sampling temperature for extraction requests
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Maximum tokens requested from the model
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// Target passage length in characters
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,

    /// Characters shared between consecutive passages
    #[serde(default = "default_chunk_overlap")]
    pub chunk_overlap: usize,

    /// Embedding dimension; must match the embedding model
    #[serde(default = "default_embedding_dimension")]
    pub embedding_dimension: usize,

    /// Texts per embedding model call
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
}

fn default_model_name() -> String {
    "gpt-4o-mini".to_string()
}

fn default_temperature() -> f32 {
    0.3
}

fn default_max_tokens() -> u32 {
    1024
}

fn default_chunk_size() -> usize {
    500
}

fn default_chunk_overlap() -> usize {
    50
}

fn default_embedding_dimension() -> usize {
    DEFAULT_EMBEDDING_DIM
}

fn default_batch_size() -> usize {
    8
}

impl Default for StoryConfig {
    fn default() -> Self {
        Self {
            model_name: default_model_name(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            chunk_size: default_chunk_size(),
            chunk_overlap: default_chunk_overlap(),
            embedding_dimension: default_embedding_dimension(),
            batch_size: default_batch_size(),
        }
    }
}

impl StoryConfig {
    /// Override chunking parameters (builder pattern).
    pub fn with_chunking(mut self, chunk_size: usize, chunk_overlap: usize) -> Self {
        self.chunk_size = chunk_size;
        self.chunk_overlap = chunk_overlap;
        self
    }

    /// Override the embedding dimension (builder pattern).
    pub fn with_embedding_dimension(mut self, dimension: usize) -> Self {
        self.embedding_dimension = dimension;
        self
    }

    /// Validate configuration values.
    pub fn validate(&self) -> Result<(), StoryError> {
        if self.chunk_size == 0 {
            return Err(StoryError::Config("chunk_size must be > 0".to_string()));
        }
        if self.chunk_overlap >= self.chunk_size {
            return Err(StoryError::Config(format!(
                "chunk_overlap ({}) must be smaller than chunk_size ({})",
                self.chunk_overlap, self.chunk_size
            )));
        }
        if self.embedding_dimension == 0 {
            return Err(StoryError::Config(
                "embedding_dimension must be > 0".to_string(),
            ));
        }
        if self.batch_size == 0 {
            return Err(StoryError::Config("batch_size must be > 0".to_string()));
        }
        if !(0.0..=2.0).contains(&self.temperature) {
            return Err(StoryError::Config(format!(
                "temperature must be 0.0-2.0, got {}",
                self.temperature
            )));
        }
        Ok(())
    }
}

/// Application settings: where stories live plus the shared [`StoryConfig`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Directory holding one subdirectory per story
    #[serde(default = "default_stories_dir")]
    pub stories_dir: String,

    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Model and chunking configuration
    #[serde(default)]
    pub pipeline: StoryConfig,
}

fn default_stories_dir() -> String {
    ProjectDirs::from("", "", "story-index")
        .map(|p| p.data_local_dir().join("stories"))
        .unwrap_or_else(|| PathBuf::from("./stories"))
        .to_string_lossy()
        .to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            stories_dir: default_stories_dir(),
            log_level: default_log_level(),
            pipeline: StoryConfig::default(),
        }
    }
}

impl Settings {
    /// Load settings with layered precedence:
    /// 1. Built-in defaults
    /// 2. Default config file (`<config dir>/story-index/config.*`, optional)
    /// 3. Caller-specified config file (required when given)
    /// 4. Environment variables (`STORY_LOG_LEVEL`, `STORY_PIPELINE__CHUNK_SIZE`, ...)
    pub fn load(config_path: Option<&str>) -> Result<Self, StoryError> {
        let config_dir = ProjectDirs::from("", "", "story-index")
            .map(|p| p.config_dir().to_path_buf())
            .unwrap_or_else(|| PathBuf::from("."));
        let default_config_path = config_dir.join("config");

        let mut builder = Config::builder()
            .set_default("stories_dir", default_stories_dir())
            .map_err(|e| StoryError::Config(e.to_string()))?
            .set_default("log_level", default_log_level())
            .map_err(|e| StoryError::Config(e.to_string()))?
            .add_source(File::with_name(&default_config_path.to_string_lossy()).required(false));

        if let Some(path) = config_path {
            builder = builder.add_source(File::with_name(path).required(true));
        }

        // Double underscore separates nesting so single underscores survive in keys.
        builder = builder.add_source(
            Environment::with_prefix("STORY")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let settings: Settings = builder
            .build()
            .map_err(|e| StoryError::Config(e.to_string()))?
            .try_deserialize()
            .map_err(|e| StoryError::Config(e.to_string()))?;

        settings.pipeline.validate()?;
        Ok(settings)
    }

    /// Directory for a named story.
    pub fn story_path(&self, story_name: &str) -> PathBuf {
        PathBuf::from(&self.stories_dir).join(story_name)
    }
}
