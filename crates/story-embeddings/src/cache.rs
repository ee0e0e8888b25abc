//! Model file caching.
//!
//! Fetches model files from HuggingFace Hub once and keeps them in a local
//! directory so later runs work offline.

use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::error::EmbeddingError;

/// Default model repository on HuggingFace
pub const DEFAULT_MODEL_REPO: &str = "sentence-transformers/all-MiniLM-L6-v2";

/// Files the Candle loader needs
pub const MODEL_FILES: &[&str] = &["config.json", "tokenizer.json", "model.safetensors"];

/// Local model cache.
#[derive(Debug, Clone)]
pub struct ModelCache {
    /// Root directory for all cached models
    pub cache_dir: PathBuf,
    /// HuggingFace repository ID
    pub repo_id: String,
}

impl Default for ModelCache {
    fn default() -> Self {
        let cache_dir = dirs::cache_dir()
            .unwrap_or_else(|| PathBuf::from(".cache"))
            .join("story-index")
            .join("models");

        Self {
            cache_dir,
            repo_id: DEFAULT_MODEL_REPO.to_string(),
        }
    }
}

impl ModelCache {
    pub fn new(cache_dir: impl Into<PathBuf>, repo_id: impl Into<String>) -> Self {
        Self {
            cache_dir: cache_dir.into(),
            repo_id: repo_id.into(),
        }
    }

    /// Directory holding this repository's files.
    pub fn model_dir(&self) -> PathBuf {
        self.cache_dir.join(self.repo_id.replace('/', "_"))
    }

    pub fn is_cached(&self) -> bool {
        ModelPaths::in_dir(&self.model_dir()).all_exist()
    }
}

/// Paths to the three model files.
#[derive(Debug, Clone)]
pub struct ModelPaths {
    pub config: PathBuf,
    pub tokenizer: PathBuf,
    pub weights: PathBuf,
}

impl ModelPaths {
    /// Standard file names inside `dir`.
    pub fn in_dir(dir: &Path) -> Self {
        Self {
            config: dir.join("config.json"),
            tokenizer: dir.join("tokenizer.json"),
            weights: dir.join("model.safetensors"),
        }
    }

    fn all_exist(&self) -> bool {
        self.config.exists() && self.tokenizer.exists() && self.weights.exists()
    }
}

/// Return cached model paths, downloading the files first if needed.
pub fn get_or_download_model(cache: &ModelCache) -> Result<ModelPaths, EmbeddingError> {
    let model_dir = cache.model_dir();

    if cache.is_cached() {
        debug!(path = ?model_dir, "Using cached model");
    } else {
        info!(repo = %cache.repo_id, "Downloading model files");
        download_model_files(cache)?;
    }

    Ok(ModelPaths::in_dir(&model_dir))
}

fn download_model_files(cache: &ModelCache) -> Result<(), EmbeddingError> {
    use hf_hub::api::sync::Api;

    let api = Api::new().map_err(|e| EmbeddingError::Download(e.to_string()))?;
    let repo = api.model(cache.repo_id.clone());
    let model_dir = cache.model_dir();

    std::fs::create_dir_all(&model_dir)?;

    for filename in MODEL_FILES {
        let source_path = repo
            .get(filename)
            .map_err(|e| EmbeddingError::Download(format!("{}: {}", filename, e)))?;

        let dest_path = model_dir.join(filename);
        std::fs::copy(&source_path, &dest_path)?;
        debug!(file = filename, dest = ?dest_path, "Cached model file");
    }

    Ok(())
}
