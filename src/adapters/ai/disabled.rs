//! Disabled language model - the no-API-key deployment mode.
//!
//! Every call reports a transport error, which sends each caller straight
//! to its deterministic fallback. The engine stays fully functional on
//! pattern matching alone.

use async_trait::async_trait;

use crate::ports::{CompletionError, LanguageModel};

/// Language model stand-in for deployments without a completion backend.
#[derive(Debug, Clone, Copy, Default)]
pub struct DisabledLanguageModel;

#[async_trait]
impl LanguageModel for DisabledLanguageModel {
    async fn complete(
        &self,
        _system_prompt: &str,
        _user_prompt: &str,
    ) -> Result<String, CompletionError> {
        Err(CompletionError::transport("language model disabled"))
    }
}
