//! Candle-based embedding implementation.
//!
//! Runs all-MiniLM-L6-v2 on CPU and mean-pools token states into a
//! 384-dimensional sentence vector.

use std::path::Path;

use candle_core::{DType, Device, Tensor};
use candle_nn::VarBuilder;
use candle_transformers::models::bert::{BertModel, Config as BertConfig};
use tokenizers::Tokenizer;
use tracing::{debug, info};

use crate::cache::{get_or_download_model, ModelCache, ModelPaths};
use crate::error::EmbeddingError;
use crate::model::{Embedding, EmbeddingModel, ModelInfo};

/// Embedding dimension for all-MiniLM-L6-v2
pub const EMBEDDING_DIM: usize = 384;

/// Token limit; longer passages are truncated
pub const MAX_SEQ_LENGTH: usize = 256;

/// Candle-based embedder using all-MiniLM-L6-v2.
pub struct CandleEmbedder {
    model: BertModel,
    tokenizer: Tokenizer,
    device: Device,
    info: ModelInfo,
}

impl CandleEmbedder {
    /// Load the model from `cache`, downloading on first use.
    pub fn load(cache: &ModelCache) -> Result<Self, EmbeddingError> {
        let paths = get_or_download_model(cache)?;
        Self::load_from_paths(&paths)
    }

    pub fn load_default() -> Result<Self, EmbeddingError> {
        Self::load(&ModelCache::default())
    }

    pub fn load_from_paths(paths: &ModelPaths) -> Result<Self, EmbeddingError> {
        info!(weights = ?paths.weights, "Loading embedding model");
        let device = Device::Cpu;

        let config = read_bert_config(&paths.config)?;
        let tokenizer = Tokenizer::from_file(&paths.tokenizer)
            .map_err(|e| EmbeddingError::Tokenizer(e.to_string()))?;

        // Safety: the safetensors file is not modified while mapped.
        let vb = unsafe {
            VarBuilder::from_mmaped_safetensors(&[paths.weights.clone()], DType::F32, &device)?
        };
        let model = BertModel::load(vb, &config)?;

        info!(dim = EMBEDDING_DIM, max_seq = MAX_SEQ_LENGTH, "Embedding model ready");

        Ok(Self {
            model,
            tokenizer,
            device,
            info: ModelInfo {
                name: "all-MiniLM-L6-v2".to_string(),
                dimension: EMBEDDING_DIM,
                max_sequence_length: MAX_SEQ_LENGTH,
            },
        })
    }

    /// Tokenize, truncate and right-pad a batch to a common length.
    /// Returns `(input_ids, attention_mask)` tensors of shape `(batch, len)`.
    fn encode_padded(&self, texts: &[&str]) -> Result<(Tensor, Tensor), EmbeddingError> {
        let encodings = self
            .tokenizer
            .encode_batch(texts.to_vec(), true)
            .map_err(|e| EmbeddingError::Tokenizer(e.to_string()))?;

        let seq_len = encodings
            .iter()
            .map(|e| e.get_ids().len())
            .max()
            .unwrap_or(0)
            .min(MAX_SEQ_LENGTH);

        let mut ids = Vec::with_capacity(texts.len() * seq_len);
        let mut mask = Vec::with_capacity(texts.len() * seq_len);
        for encoding in &encodings {
            let take = encoding.get_ids().len().min(seq_len);
            ids.extend_from_slice(&encoding.get_ids()[..take]);
            mask.extend_from_slice(&encoding.get_attention_mask()[..take]);
            ids.extend(std::iter::repeat(0).take(seq_len - take));
            mask.extend(std::iter::repeat(0).take(seq_len - take));
        }

        let shape = (texts.len(), seq_len);
        Ok((
            Tensor::from_vec(ids, shape, &self.device)?,
            Tensor::from_vec(mask, shape, &self.device)?,
        ))
    }
}

fn read_bert_config(path: &Path) -> Result<BertConfig, EmbeddingError> {
    let raw = std::fs::read_to_string(path)?;
    serde_json::from_str(&raw)
        .map_err(|e| EmbeddingError::ModelNotFound(format!("Invalid config: {}", e)))
}

/// Mean of token states, ignoring padding positions.
fn mean_pool(states: &Tensor, attention_mask: &Tensor) -> Result<Tensor, EmbeddingError> {
    let mask = attention_mask
        .unsqueeze(2)?
        .broadcast_as(states.shape())?
        .to_dtype(DType::F32)?;

    let summed = states.broadcast_mul(&mask)?.sum(1)?;
    let counts = mask.sum(1)?.clamp(1e-9, f64::MAX)?;
    Ok(summed.broadcast_div(&counts)?)
}

impl EmbeddingModel for CandleEmbedder {
    fn info(&self) -> &ModelInfo {
        &self.info
    }

    fn embed(&self, text: &str) -> Result<Embedding, EmbeddingError> {
        self.embed_batch(&[text])?
            .pop()
            .ok_or(EmbeddingError::CountMismatch {
                sent: 1,
                received: 0,
            })
    }

    fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Embedding>, EmbeddingError> {
        if texts.is_empty() {
            return Ok(vec![]);
        }

        let (input_ids, attention_mask) = self.encode_padded(texts)?;
        let token_type_ids = Tensor::zeros_like(&input_ids)?;

        let states = self
            .model
            .forward(&input_ids, &token_type_ids, Some(&attention_mask))?;
        let pooled: Vec<Vec<f32>> = mean_pool(&states, &attention_mask)?.to_vec2()?;

        debug!(count = pooled.len(), "Encoded batch");
        Ok(pooled.into_iter().map(Embedding::new).collect())
    }
}
