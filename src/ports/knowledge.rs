//! Knowledge Source Port - Interface for free-text knowledge lookups.
//!
//! This port abstracts the external knowledge source (Wikipedia in
//! production), enabling the engine to look up pages about authors and
//! works without coupling to a specific backend.
//!
//! # Design
//!
//! - A lookup either yields a [`Page`] or a [`LookupError`]; the two arms
//!   together form the page-result union every caller matches on.
//! - `NotFound` is an ordinary outcome, not an exceptional one: the engine
//!   answers it with a clarification request, never an error surface.
//! - `content` is a bounded excerpt shaped by the adapter, biased toward
//!   biography/education sections collected ahead of the page opening.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Port for free-text knowledge page lookups.
///
/// Implementations connect to an external source and translate between its
/// API and [`Page`].
#[async_trait]
pub trait KnowledgeSource: Send + Sync {
    /// Look up a page by search term.
    ///
    /// Returns the page when one exists under exactly this term; a missing
    /// page is reported as [`LookupError::NotFound`].
    async fn lookup(&self, term: &str) -> Result<Page, LookupError>;
}

/// A successfully resolved knowledge page.
///
/// Immutable once produced; a turn may retain it in conversation state
/// after the resolver classifies it as an author/work page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page {
    /// Canonical page title as the source spells it.
    pub title: String,
    /// Lead summary paragraph.
    pub summary: String,
    /// Bounded excerpt of the body (~4000 chars), education/biography
    /// sections first.
    pub content: String,
    /// Canonical page URL.
    pub url: String,
}

impl Page {
    /// Creates a new page.
    pub fn new(
        title: impl Into<String>,
        summary: impl Into<String>,
        content: impl Into<String>,
        url: impl Into<String>,
    ) -> Self {
        Self {
            title: title.into(),
            summary: summary.into(),
            content: content.into(),
            url: url.into(),
        }
    }

    /// Summary and content joined, the haystack every extraction pass runs
    /// over.
    pub fn full_text(&self) -> String {
        format!("{} {}", self.content, self.summary)
    }

    /// Title with a trailing parenthetical qualifier removed
    /// ("한강 (작가)" -> "한강").
    pub fn bare_title(&self) -> &str {
        match self.title.split_once('(') {
            Some((head, _)) => head.trim_end(),
            None => self.title.as_str(),
        }
    }
}

/// Knowledge lookup errors.
#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum LookupError {
    /// No page exists under the search term.
    #[error("no page found for \"{term}\"")]
    NotFound {
        /// The term that was looked up.
        term: String,
    },

    /// Transport failure reaching the source.
    #[error("knowledge source transport error: {0}")]
    Transport(String),

    /// The source answered with something unparseable.
    #[error("malformed knowledge source response: {0}")]
    Malformed(String),
}

impl LookupError {
    /// Creates a not-found error.
    pub fn not_found(term: impl Into<String>) -> Self {
        Self::NotFound { term: term.into() }
    }

    /// Creates a transport error.
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport(message.into())
    }

    /// Creates a malformed-response error.
    pub fn malformed(message: impl Into<String>) -> Self {
        Self::Malformed(message.into())
    }

    /// True when the term simply has no page (as opposed to the source
    /// being unreachable).
    pub fn is_not_found(&self) -> bool {
        matches!(self, LookupError::NotFound { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_bare_title_strips_qualifier() {
        let page = Page::new("한강 (작가)", "", "", "");
        assert_eq!(page.bare_title(), "한강");
    }

    #[test]
    fn page_bare_title_without_qualifier_is_unchanged() {
        let page = Page::new("채식주의자", "", "", "");
        assert_eq!(page.bare_title(), "채식주의자");
    }

    #[test]
    fn page_full_text_joins_content_and_summary() {
        let page = Page::new("t", "요약", "본문", "u");
        assert_eq!(page.full_text(), "본문 요약");
    }

    #[test]
    fn lookup_error_not_found_classification() {
        assert!(LookupError::not_found("한강").is_not_found());
        assert!(!LookupError::transport("timeout").is_not_found());
        assert!(!LookupError::malformed("bad json").is_not_found());
    }

    #[test]
    fn lookup_error_displays_term() {
        let err = LookupError::not_found("개미");
        assert_eq!(err.to_string(), "no page found for \"개미\"");
    }
}
