//! Knowledge source configuration.

use serde::Deserialize;
use std::time::Duration;

use super::error::ValidationError;

/// Knowledge source (Wikipedia) configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct KnowledgeConfig {
    /// Language edition to query.
    #[serde(default = "default_language")]
    pub language: String,

    /// User agent sent with every request.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for KnowledgeConfig {
    fn default() -> Self {
        Self {
            language: default_language(),
            user_agent: default_user_agent(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl KnowledgeConfig {
    /// Timeout as a Duration.
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Validates the section.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.language.trim().is_empty() {
            return Err(ValidationError::Invalid {
                field: "knowledge.language",
                reason: "empty".to_string(),
            });
        }
        if self.user_agent.trim().is_empty() {
            return Err(ValidationError::Invalid {
                field: "knowledge.user_agent",
                reason: "empty".to_string(),
            });
        }
        Ok(())
    }
}

fn default_language() -> String {
    "ko".to_string()
}

fn default_user_agent() -> String {
    "bookwise/0.1 (https://github.com/bookwise)".to_string()
}

fn default_timeout_secs() -> u64 {
    10
}
