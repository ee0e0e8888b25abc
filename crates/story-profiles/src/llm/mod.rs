//! LLM collaborator used for profile and story element extraction.
//!
//! The only asynchronous seam in the system: everything else is synchronous.

mod api;
mod mock;

pub use api::{ApiLlmClient, ApiLlmConfig, LlmProvider};
pub use mock::MockLlmClient;

use async_trait::async_trait;
use thiserror::Error;

/// Error type for LLM calls.
#[derive(Debug, Error)]
pub enum LlmError {
    #[error("API request failed: {0}")]
    ApiError(String),

    #[error("Failed to parse API response: {0}")]
    ParseError(String),

    #[error("Rate limit exceeded")]
    RateLimitExceeded,

    #[error("Invalid configuration: {0}")]
    ConfigError(String),

    #[error("Server error {status}: {body}")]
    ServerError { status: u16, body: String },

    #[error("Request rejected with HTTP {status}: {body}")]
    Rejected { status: u16, body: String },
}

impl LlmError {
    /// Transient failures worth another attempt.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            LlmError::ApiError(_) | LlmError::RateLimitExceeded | LlmError::ServerError { .. }
        )
    }
}

/// Chat completion client.
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Complete `prompt` under `system` instructions. Returns the raw reply text.
    async fn complete(&self, system: &str, prompt: &str) -> Result<String, LlmError>;
}
