//! Mock language model for testing.
//!
//! Configurable to return scripted responses in order, inject errors, or
//! fail on every call, so tests can drive both the model-first path and
//! every deterministic fallback without a real API.
//!
//! # Example
//!
//! ```ignore
//! let model = MockLanguageModel::new()
//!     .with_response(r#"{"found": true, "birth_date": "1970년 11월 27일"}"#);
//!
//! let text = model.complete("system", "user").await?;
//! ```

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use crate::ports::{CompletionError, LanguageModel};

/// A recorded call for verification.
#[derive(Debug, Clone)]
pub struct RecordedCall {
    /// The system prompt the caller sent.
    pub system_prompt: String,
    /// The user prompt the caller sent.
    pub user_prompt: String,
}

/// Mock language model.
///
/// Responses are consumed from a queue in order; an exhausted queue answers
/// with a transport error (which is exactly what drives callers onto their
/// deterministic fallbacks). `failing()` builds a model that errors on
/// every call.
#[derive(Debug, Clone)]
pub struct MockLanguageModel {
    responses: Arc<Mutex<VecDeque<Result<String, CompletionError>>>>,
    default_response: Option<String>,
    always_fail: bool,
    calls: Arc<Mutex<Vec<RecordedCall>>>,
}

impl Default for MockLanguageModel {
    fn default() -> Self {
        Self::new()
    }
}

impl MockLanguageModel {
    /// Creates a mock with an empty response queue.
    pub fn new() -> Self {
        Self {
            responses: Arc::new(Mutex::new(VecDeque::new())),
            default_response: None,
            always_fail: false,
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Creates a mock that fails every call with a transport error.
    pub fn failing() -> Self {
        Self {
            always_fail: true,
            ..Self::new()
        }
    }

    /// Queues a successful response.
    pub fn with_response(self, content: impl Into<String>) -> Self {
        self.responses
            .lock()
            .expect("mock lock")
            .push_back(Ok(content.into()));
        self
    }

    /// Queues an error response.
    pub fn with_error(self, error: CompletionError) -> Self {
        self.responses
            .lock()
            .expect("mock lock")
            .push_back(Err(error));
        self
    }

    /// Sets the response returned whenever the queue is empty.
    pub fn with_default_response(mut self, content: impl Into<String>) -> Self {
        self.default_response = Some(content.into());
        self
    }

    /// All calls made so far.
    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().expect("mock lock").clone()
    }

    /// Number of calls made so far.
    pub fn call_count(&self) -> usize {
        self.calls.lock().expect("mock lock").len()
    }
}

#[async_trait]
impl LanguageModel for MockLanguageModel {
    async fn complete(
        &self,
        system_prompt: &str,
        user_prompt: &str,
    ) -> Result<String, CompletionError> {
        self.calls.lock().expect("mock lock").push(RecordedCall {
            system_prompt: system_prompt.to_string(),
            user_prompt: user_prompt.to_string(),
        });

        if self.always_fail {
            return Err(CompletionError::transport("mock configured to fail"));
        }

        let queued = self.responses.lock().expect("mock lock").pop_front();
        match queued {
            Some(result) => result,
            None => match &self.default_response {
                Some(content) => Ok(content.clone()),
                None => Err(CompletionError::transport("mock response queue empty")),
            },
        }
    }
}
