//! Ingestion error types.

use thiserror::Error;

/// Errors that can occur while splitting and indexing a story.
#[derive(Debug, Error)]
pub enum IngestError {
    /// Splitter parameters that cannot produce valid passages
    #[error("Invalid splitter config: {0}")]
    InvalidConfig(String),

    /// Configuration error
    #[error("Config error: {0}")]
    Config(#[from] story_types::StoryError),

    /// Embedding error
    #[error("Embedding error: {0}")]
    Embedding(#[from] story_embeddings::EmbeddingError),

    /// Index build or persistence error
    #[error("Vector error: {0}")]
    Vector(#[from] story_vector::VectorError),

    /// Snapshot or artifact storage error
    #[error("Storage error: {0}")]
    Storage(#[from] story_storage::StorageError),
}
