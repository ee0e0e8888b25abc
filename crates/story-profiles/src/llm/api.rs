//! HTTP client for OpenAI-compatible and Anthropic chat endpoints.

use async_trait::async_trait;
use backoff::{backoff::Backoff, ExponentialBackoff};
use reqwest::{Client, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use story_types::StoryConfig;
use tracing::{debug, error, warn};

use super::{LlmClient, LlmError};

/// Wire protocol spoken by the endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LlmProvider {
    OpenAi,
    Anthropic,
}

/// Configuration for [`ApiLlmClient`].
#[derive(Debug, Clone)]
pub struct ApiLlmConfig {
    pub provider: LlmProvider,

    /// API base URL (e.g., "https://api.openai.com/v1")
    pub base_url: String,

    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,

    /// API key
    pub api_key: SecretString,

    /// Request timeout
    pub timeout: Duration,

    /// Attempts per call, including the first
    pub max_retries: u32,

    /// First retry delay; later delays grow exponentially
    pub initial_backoff: Duration,
}

impl ApiLlmConfig {
    /// OpenAI endpoint using the model settings from `config`.
    pub fn openai(api_key: impl Into<String>, config: &StoryConfig) -> Self {
        Self::with_provider(
            LlmProvider::OpenAi,
            "https://api.openai.com/v1",
            api_key,
            config,
        )
    }

    /// Anthropic endpoint using the model settings from `config`.
    pub fn anthropic(api_key: impl Into<String>, config: &StoryConfig) -> Self {
        Self::with_provider(
            LlmProvider::Anthropic,
            "https://api.anthropic.com/v1",
            api_key,
            config,
        )
    }

    fn with_provider(
        provider: LlmProvider,
        base_url: &str,
        api_key: impl Into<String>,
        config: &StoryConfig,
    ) -> Self {
        Self {
            provider,
            base_url: base_url.to_string(),
            model: config.model_name.clone(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
            api_key: SecretString::from(api_key.into()),
            timeout: Duration::from_secs(60),
            max_retries: 3,
            initial_backoff: Duration::from_millis(500),
        }
    }

    /// Pick a provider from the environment: `ANTHROPIC_API_KEY` for `claude-*`
    /// models, `OPENAI_API_KEY` otherwise.
    pub fn from_env(config: &StoryConfig) -> Result<Self, LlmError> {
        let provider = if config.model_name.starts_with("claude") {
            LlmProvider::Anthropic
        } else {
            LlmProvider::OpenAi
        };
        let var = match provider {
            LlmProvider::OpenAi => "OPENAI_API_KEY",
            LlmProvider::Anthropic => "ANTHROPIC_API_KEY",
        };

        let key = std::env::var(var)
            .map_err(|_| LlmError::ConfigError(format!("{} is not set", var)))?;
        Ok(match provider {
            LlmProvider::OpenAi => Self::openai(key, config),
            LlmProvider::Anthropic => Self::anthropic(key, config),
        })
    }

    /// Point at a different base URL (proxies, local servers, tests).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_retries(mut self, max_retries: u32, initial_backoff: Duration) -> Self {
        self.max_retries = max_retries.max(1);
        self.initial_backoff = initial_backoff;
        self
    }
}

/// Chat completion over HTTP with exponential backoff.
pub struct ApiLlmClient {
    client: Client,
    config: ApiLlmConfig,
}

impl ApiLlmClient {
    pub fn new(config: ApiLlmConfig) -> Result<Self, LlmError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| LlmError::ConfigError(e.to_string()))?;

        Ok(Self { client, config })
    }

    pub fn config(&self) -> &ApiLlmConfig {
        &self.config
    }

    /// Call the API with retry logic.
    async fn call_api(&self, system: &str, prompt: &str) -> Result<String, LlmError> {
        let mut backoff = ExponentialBackoff {
            initial_interval: self.config.initial_backoff,
            max_elapsed_time: Some(Duration::from_secs(120)),
            ..Default::default()
        };

        let mut attempts = 0;

        loop {
            attempts += 1;
            debug!(attempt = attempts, model = %self.config.model, "Calling LLM API");

            let result = match self.config.provider {
                LlmProvider::OpenAi => self.make_openai_request(system, prompt).await,
                LlmProvider::Anthropic => self.make_anthropic_request(system, prompt).await,
            };

            match result {
                Ok(response) => return Ok(response),
                Err(e) if !e.is_retryable() => return Err(e),
                Err(e) => {
                    if attempts >= self.config.max_retries {
                        error!(error = %e, "Max retries exceeded");
                        return Err(e);
                    }

                    match backoff.next_backoff() {
                        Some(duration) => {
                            warn!(
                                error = %e,
                                retry_in_ms = duration.as_millis(),
                                "API call failed, retrying"
                            );
                            tokio::time::sleep(duration).await;
                        }
                        None => {
                            error!(error = %e, "Backoff exhausted");
                            return Err(e);
                        }
                    }
                }
            }
        }
    }

    async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, LlmError> {
        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(LlmError::RateLimitExceeded);
        }
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        if status.is_server_error() {
            Err(LlmError::ServerError {
                status: status.as_u16(),
                body,
            })
        } else {
            Err(LlmError::Rejected {
                status: status.as_u16(),
                body,
            })
        }
    }

    /// Make OpenAI-compatible API request.
    async fn make_openai_request(&self, system: &str, prompt: &str) -> Result<String, LlmError> {
        #[derive(Serialize)]
        struct OpenAIRequest<'a> {
            model: &'a str,
            messages: Vec<OpenAIMessage<'a>>,
            temperature: f32,
            max_tokens: u32,
        }

        #[derive(Serialize)]
        struct OpenAIMessage<'a> {
            role: &'a str,
            content: &'a str,
        }

        #[derive(Deserialize)]
        struct OpenAIResponse {
            choices: Vec<OpenAIChoice>,
        }

        #[derive(Deserialize)]
        struct OpenAIChoice {
            message: OpenAIMessageResponse,
        }

        #[derive(Deserialize)]
        struct OpenAIMessageResponse {
            content: Option<String>,
        }

        let request = OpenAIRequest {
            model: &self.config.model,
            messages: vec![
                OpenAIMessage {
                    role: "system",
                    content: system,
                },
                OpenAIMessage {
                    role: "user",
                    content: prompt,
                },
            ],
            temperature: self.config.temperature,
            max_tokens: self.config.max_tokens,
        };

        let url = format!("{}/chat/completions", self.config.base_url);

        let response = self
            .client
            .post(&url)
            .header(
                "Authorization",
                format!("Bearer {}", self.config.api_key.expose_secret()),
            )
            .json(&request)
            .send()
            .await
            .map_err(|e| LlmError::ApiError(e.to_string()))?;

        let response_body: OpenAIResponse = Self::check_status(response)
            .await?
            .json()
            .await
            .map_err(|e| LlmError::ParseError(e.to_string()))?;

        response_body
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| LlmError::ParseError("No choices in response".to_string()))
    }

    /// Make Anthropic API request.
    async fn make_anthropic_request(&self, system: &str, prompt: &str) -> Result<String, LlmError> {
        #[derive(Serialize)]
        struct AnthropicRequest<'a> {
            model: &'a str,
            max_tokens: u32,
            temperature: f32,
            system: &'a str,
            messages: Vec<AnthropicMessage<'a>>,
        }

        #[derive(Serialize)]
        struct AnthropicMessage<'a> {
            role: &'a str,
            content: &'a str,
        }

        #[derive(Deserialize)]
        struct AnthropicResponse {
            content: Vec<AnthropicContent>,
        }

        #[derive(Deserialize)]
        struct AnthropicContent {
            #[serde(default)]
            text: String,
        }

        let request = AnthropicRequest {
            model: &self.config.model,
            max_tokens: self.config.max_tokens,
            temperature: self.config.temperature,
            system,
            messages: vec![AnthropicMessage {
                role: "user",
                content: prompt,
            }],
        };

        let url = format!("{}/messages", self.config.base_url);

        let response = self
            .client
            .post(&url)
            .header("x-api-key", self.config.api_key.expose_secret())
            .header("anthropic-version", "2023-06-01")
            .json(&request)
            .send()
            .await
            .map_err(|e| LlmError::ApiError(e.to_string()))?;

        let response_body: AnthropicResponse = Self::check_status(response)
            .await?
            .json()
            .await
            .map_err(|e| LlmError::ParseError(e.to_string()))?;

        response_body
            .content
            .into_iter()
            .next()
            .map(|c| c.text)
            .ok_or_else(|| LlmError::ParseError("No content in response".to_string()))
    }
}

#[async_trait]
impl LlmClient for ApiLlmClient {
    async fn complete(&self, system: &str, prompt: &str) -> Result<String, LlmError> {
        self.call_api(system, prompt).await
    }
}
