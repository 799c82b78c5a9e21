//! Language Model Port - Interface for text completion.
//!
//! Abstracts the completion backend (an OpenAI-compatible chat API in
//! production). The engine uses it for intent analysis, structured fact
//! extraction, and free-form answer synthesis.
//!
//! # Design
//!
//! - A single `complete(system, user) -> String` operation; when the caller
//!   asked for structured output it parses the returned string as JSON and
//!   treats parse failure exactly like a transport failure.
//! - There is no retry or backoff here: every caller has a deterministic
//!   fallback path and takes it on the first error.

use async_trait::async_trait;

/// Port for language-model completions.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// Generate a completion for a system prompt and user prompt.
    async fn complete(
        &self,
        system_prompt: &str,
        user_prompt: &str,
    ) -> Result<String, CompletionError>;
}

/// Language model completion errors.
#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum CompletionError {
    /// Network failure reaching the provider.
    #[error("completion transport error: {0}")]
    Transport(String),

    /// The provider answered with a non-success status.
    #[error("completion API error {status}: {message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Error detail from the provider.
        message: String,
    },

    /// The provider answered with no usable content.
    #[error("completion response was empty")]
    Empty,
}

impl CompletionError {
    /// Creates a transport error.
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport(message.into())
    }

    /// Creates an API error.
    pub fn api(status: u16, message: impl Into<String>) -> Self {
        Self::Api {
            status,
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn completion_error_displays_status() {
        let err = CompletionError::api(429, "quota exceeded");
        assert_eq!(err.to_string(), "completion API error 429: quota exceeded");
    }

    #[test]
    fn completion_error_transport_display() {
        let err = CompletionError::transport("connection reset");
        assert!(err.to_string().contains("connection reset"));
    }
}
