//! Vector index error types.

use thiserror::Error;

/// Errors that can occur during vector operations.
#[derive(Debug, Error)]
pub enum VectorError {
    /// Vector or query of the wrong length
    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// Passage handed to `build` without an embedding
    #[error("Passage {ordinal} has no embedding")]
    MissingEmbedding { ordinal: usize },

    /// Index and metadata disagree on the number of passages
    #[error("Metadata mismatch: index holds {index} vectors, metadata holds {metadata} entries")]
    MetadataMismatch { index: usize, metadata: usize },

    /// `build` called on an index that already holds vectors
    #[error("Index already built with {0} vectors")]
    AlreadyBuilt(usize),

    /// Index file that cannot be decoded
    #[error("Invalid index file: {0}")]
    InvalidFormat(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Atomic write or JSON artifact failure
    #[error("Storage error: {0}")]
    Storage(#[from] story_storage::StorageError),
}

impl From<serde_json::Error> for VectorError {
    fn from(err: serde_json::Error) -> Self {
        VectorError::Serialization(err.to_string())
    }
}
