//! # story-embeddings
//!
//! Text embedding for the story index.
//!
//! The embedding model is an opaque `text -> fixed-length vector` function.
//! This crate wraps it with the batching and dimension checks the index
//! relies on.
//!
//! ## Features
//! - [`EmbeddingModel`] trait with order-preserving batch calls
//! - [`BatchEmbedder`]: bounded batches, fail-fast dimension checks, passage attachment
//! - [`CandleEmbedder`]: all-MiniLM-L6-v2 (384 dimensions) via Candle, cached locally
//! - [`HashEmbedder`]: deterministic feature-hashing model for tests and offline use

pub mod batch;
pub mod cache;
pub mod candle;
pub mod error;
pub mod hash;
pub mod model;

pub use crate::candle::CandleEmbedder;
pub use batch::BatchEmbedder;
pub use cache::{get_or_download_model, ModelCache, ModelPaths, DEFAULT_MODEL_REPO, MODEL_FILES};
pub use error::EmbeddingError;
pub use hash::HashEmbedder;
pub use model::{Embedding, EmbeddingModel, ModelInfo};
