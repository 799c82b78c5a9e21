//! Mock knowledge source for testing.
//!
//! A fixed map from search term to page; terms without an entry answer
//! not-found, mirroring how the real source behaves for missing pages.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::ports::{KnowledgeSource, LookupError, Page};

/// Mock knowledge source backed by a term -> page map.
#[derive(Debug, Clone, Default)]
pub struct MockKnowledgeSource {
    pages: HashMap<String, Page>,
    always_fail: bool,
    lookups: Arc<Mutex<Vec<String>>>,
}

impl MockKnowledgeSource {
    /// Creates an empty source (every lookup is not-found).
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a source that fails every lookup with a transport error.
    pub fn failing() -> Self {
        Self {
            always_fail: true,
            ..Self::default()
        }
    }

    /// Registers a page under a search term.
    pub fn with_page(mut self, term: impl Into<String>, page: Page) -> Self {
        self.pages.insert(term.into(), page);
        self
    }

    /// All terms looked up so far, in order.
    pub fn lookups(&self) -> Vec<String> {
        self.lookups.lock().expect("mock lock").clone()
    }
}

#[async_trait]
impl KnowledgeSource for MockKnowledgeSource {
    async fn lookup(&self, term: &str) -> Result<Page, LookupError> {
        self.lookups
            .lock()
            .expect("mock lock")
            .push(term.to_string());

        if self.always_fail {
            return Err(LookupError::transport("mock configured to fail"));
        }
        match self.pages.get(term) {
            Some(page) => Ok(page.clone()),
            None => Err(LookupError::not_found(term)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_registered_page_is_returned() {
        let source = MockKnowledgeSource::new()
            .with_page("한강 (작가)", Page::new("한강 (작가)", "s", "c", "u"));

        let page = source.lookup("한강 (작가)").await.unwrap();
        assert_eq!(page.title, "한강 (작가)");
    }

    #[tokio::test]
    async fn test_missing_page_is_not_found() {
        let source = MockKnowledgeSource::new();
        let err = source.lookup("없는 페이지").await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_failing_source_reports_transport_error() {
        let source = MockKnowledgeSource::failing();
        let err = source.lookup("한강").await.unwrap_err();
        assert!(!err.is_not_found());
    }

    #[tokio::test]
    async fn test_lookups_are_recorded_in_order() {
        let source = MockKnowledgeSource::new();
        let _ = source.lookup("첫번째").await;
        let _ = source.lookup("두번째").await;
        assert_eq!(source.lookups(), vec!["첫번째", "두번째"]);
    }
}
