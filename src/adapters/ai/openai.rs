//! OpenAI-compatible chat adapter - LanguageModel implementation.
//!
//! Talks to a chat-completions endpoint with a system + user message pair
//! and a low temperature, which is what the extraction and classification
//! callers want. No retries here: callers have deterministic fallbacks and
//! take them on the first error.
//!
//! # Configuration
//!
//! ```ignore
//! let client = OpenAiClient::builder(api_key)
//!     .model("gpt-4o-mini")
//!     .timeout(Duration::from_secs(20))
//!     .build();
//! ```

use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, Secret};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use crate::ports::{CompletionError, LanguageModel};

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
const DEFAULT_MODEL: &str = "gpt-4o-mini";
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
const TEMPERATURE: f32 = 0.1;
const MAX_TOKENS: u32 = 400;

/// Builder for [`OpenAiClient`].
#[derive(Debug, Clone)]
pub struct OpenAiClientBuilder {
    api_key: Secret<String>,
    model: String,
    base_url: String,
    timeout: Duration,
}

impl OpenAiClientBuilder {
    /// Sets the model identifier.
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Sets the API base URL (for compatible gateways).
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Sets the request timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Builds the client.
    pub fn build(self) -> OpenAiClient {
        let http = Client::builder()
            .timeout(self.timeout)
            .build()
            .expect("failed to create HTTP client");
        OpenAiClient {
            api_key: self.api_key,
            model: self.model,
            base_url: self.base_url,
            timeout: self.timeout,
            http,
        }
    }
}

/// Chat-completions client implementing the LanguageModel port.
pub struct OpenAiClient {
    api_key: Secret<String>,
    model: String,
    base_url: String,
    timeout: Duration,
    http: Client,
}

impl OpenAiClient {
    /// Starts a builder with the given API key and defaults.
    pub fn builder(api_key: impl Into<String>) -> OpenAiClientBuilder {
        OpenAiClientBuilder {
            api_key: Secret::new(api_key.into()),
            model: DEFAULT_MODEL.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Creates a client from the AI configuration section, or `None` when
    /// no API key is configured (the engine then runs on its deterministic
    /// fallbacks alone).
    pub fn from_config(config: &crate::config::AiConfig) -> Option<Self> {
        let api_key = config.api_key.as_ref()?.expose_secret().clone();
        if api_key.is_empty() {
            return None;
        }
        Some(
            Self::builder(api_key)
                .model(config.model.clone())
                .base_url(config.base_url.clone())
                .timeout(config.timeout())
                .build(),
        )
    }

    fn completions_url(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    content: Option<String>,
}

#[async_trait]
impl LanguageModel for OpenAiClient {
    async fn complete(
        &self,
        system_prompt: &str,
        user_prompt: &str,
    ) -> Result<String, CompletionError> {
        let request = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: system_prompt,
                },
                ChatMessage {
                    role: "user",
                    content: user_prompt,
                },
            ],
            temperature: TEMPERATURE,
            max_tokens: MAX_TOKENS,
        };

        let response = self
            .http
            .post(self.completions_url())
            .header(
                "Authorization",
                format!("Bearer {}", self.api_key.expose_secret()),
            )
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    CompletionError::transport(format!(
                        "timed out after {}s",
                        self.timeout.as_secs()
                    ))
                } else {
                    CompletionError::transport(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            debug!(status = status.as_u16(), "completion API error");
            return Err(CompletionError::api(status.as_u16(), body));
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| CompletionError::transport(format!("response body unparseable: {e}")))?;

        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .filter(|c| !c.trim().is_empty())
            .ok_or(CompletionError::Empty)
    }
}
