//! Retrieval error types.

use thiserror::Error;

use story_embeddings::EmbeddingError;
use story_profiles::ProfileError;
use story_storage::StorageError;
use story_vector::VectorError;

/// Errors that can occur while answering a retrieval query.
#[derive(Debug, Error)]
pub enum RetrievalError {
    /// Nothing has been indexed for this story yet
    #[error("No current version: ingest the story before retrieving")]
    NoCurrentVersion,

    /// Registry points at a version whose index is absent
    #[error("Version {0} has no index")]
    MissingIndex(String),

    #[error("Embedding error: {0}")]
    Embedding(#[from] EmbeddingError),

    #[error("Vector index error: {0}")]
    Vector(#[from] VectorError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Profile error: {0}")]
    Profile(#[from] ProfileError),
}
