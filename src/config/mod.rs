//! Application configuration module.
//!
//! Type-safe configuration loading from environment variables using the
//! `config` and `dotenvy` crates. Values load with the `BOOKWISE_` prefix;
//! nested values use double underscores (`BOOKWISE_AI__MODEL`).
//!
//! # Example
//!
//! ```no_run
//! use bookwise::config::AppConfig;
//!
//! let config = AppConfig::load().expect("failed to load configuration");
//! config.validate().expect("invalid configuration");
//! ```

mod ai;
mod error;
mod knowledge;

pub use ai::AiConfig;
pub use error::{ConfigError, ValidationError};
pub use knowledge::KnowledgeConfig;

use serde::Deserialize;

/// Root application configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    /// Language model section.
    #[serde(default)]
    pub ai: AiConfig,

    /// Knowledge source section.
    #[serde(default)]
    pub knowledge: KnowledgeConfig,
}

impl AppConfig {
    /// Loads configuration from the environment (and a `.env` file when
    /// present).
    pub fn load() -> Result<Self, ConfigError> {
        // A missing .env file is fine; explicit env vars win either way.
        let _ = dotenvy::dotenv();

        let loaded = config::Config::builder()
            .add_source(
                config::Environment::with_prefix("BOOKWISE")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        Ok(loaded.try_deserialize()?)
    }

    /// Validates every section.
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.ai.validate()?;
        self.knowledge.validate()?;
        Ok(())
    }
}
