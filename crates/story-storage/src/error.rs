//! Storage layer error types.

use thiserror::Error;

/// Errors that can occur in the storage layer
#[derive(Error, Debug)]
pub enum StorageError {
    /// Filesystem operation failed
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Directory traversal failed while copying
    #[error("Directory walk error: {0}")]
    Walk(#[from] walkdir::Error),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Version id not present in the registry
    #[error("Version not found: {0}")]
    VersionNotFound(String),

    /// Path that cannot be used as an artifact target
    #[error("Invalid path: {0}")]
    InvalidPath(String),
}

impl From<serde_json::Error> for StorageError {
    fn from(err: serde_json::Error) -> Self {
        StorageError::Serialization(err.to_string())
    }
}
