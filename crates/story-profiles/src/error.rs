//! Profile and story element error types.

use thiserror::Error;

use crate::llm::LlmError;

/// Errors that can occur while extracting, merging or persisting profiles.
#[derive(Debug, Error)]
pub enum ProfileError {
    /// LLM collaborator failed
    #[error("LLM error: {0}")]
    Llm(#[from] LlmError),

    /// LLM reply did not contain a usable JSON object
    #[error("Malformed LLM response: {0}")]
    MalformedResponse(String),

    /// Profile that fails validation
    #[error("Invalid profile: {0}")]
    Validation(String),

    /// Profile file or atomic write failure
    #[error("Storage error: {0}")]
    Storage(#[from] story_storage::StorageError),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for ProfileError {
    fn from(err: serde_json::Error) -> Self {
        ProfileError::Serialization(err.to_string())
    }
}
