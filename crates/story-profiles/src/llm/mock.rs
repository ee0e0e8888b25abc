//! Scripted LLM client for tests and offline runs.

use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;

use super::{LlmClient, LlmError};

/// Replays queued replies in order and records every prompt it receives.
///
/// Once the queue is empty every call returns the fallback reply, which is
/// an empty JSON object unless set otherwise.
pub struct MockLlmClient {
    replies: Mutex<VecDeque<Result<String, LlmError>>>,
    prompts: Mutex<Vec<(String, String)>>,
    fallback: String,
}

fn locked<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl MockLlmClient {
    pub fn new() -> Self {
        Self {
            replies: Mutex::new(VecDeque::new()),
            prompts: Mutex::new(Vec::new()),
            fallback: "{}".to_string(),
        }
    }

    /// Client that answers every call with `reply`.
    pub fn always(reply: impl Into<String>) -> Self {
        Self {
            fallback: reply.into(),
            ..Self::new()
        }
    }

    /// Queue a successful reply.
    pub fn with_reply(self, reply: impl Into<String>) -> Self {
        locked(&self.replies).push_back(Ok(reply.into()));
        self
    }

    /// Queue a failure.
    pub fn with_error(self, error: LlmError) -> Self {
        locked(&self.replies).push_back(Err(error));
        self
    }

    /// `(system, prompt)` pairs received so far.
    pub fn prompts(&self) -> Vec<(String, String)> {
        locked(&self.prompts).clone()
    }

    pub fn call_count(&self) -> usize {
        locked(&self.prompts).len()
    }
}

impl Default for MockLlmClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LlmClient for MockLlmClient {
    async fn complete(&self, system: &str, prompt: &str) -> Result<String, LlmError> {
        locked(&self.prompts).push((system.to_string(), prompt.to_string()));
        locked(&self.replies)
            .pop_front()
            .unwrap_or_else(|| Ok(self.fallback.clone()))
    }
}
