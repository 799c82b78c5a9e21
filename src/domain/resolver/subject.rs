//! Subject resolution - ranked candidate search and page classification.
//!
//! Generates qualified search candidates for a named subject, asks the
//! knowledge source for each in turn, and stops at the first page that both
//! exists and classifies as an author/work page with a similar title.
//! Disambiguation listings are reported distinctly from plain misses so the
//! engine can word the clarification accordingly.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::ports::{KnowledgeSource, Page};

/// Author-qualifier suffixes, tried in priority order before the bare name.
const AUTHOR_QUALIFIERS: &[&str] = &["작가", "소설가", "만화가", "시인"];

/// Work-type qualifiers for reverse lookups.
const WORK_QUALIFIERS: &[&str] = &["소설"];

/// Occupation terms that mark a page's subject as an author.
const OCCUPATION_TERMS: &[&str] = &["소설가", "작가", "시인", "만화가", "극작가"];

/// Work-type terms that mark a page as describing a work.
const WORK_TERMS: &[&str] = &["소설", "시집", "수필집", "웹툰", "만화"];

/// Section headings that signal a bibliography.
const BIBLIOGRAPHY_HEADINGS: &[&str] = &["작품 목록", "저서", "대표작", "작품 활동"];

/// Author-related keywords accepted anywhere on the page.
const AUTHOR_KEYWORDS: &[&str] = &[
    "작가", "소설가", "시인", "저자", "만화가", "문학", "등단", "출간", "연재",
];

/// Phrases a disambiguation listing's summary uses.
const DISAMBIGUATION_MARKERS: &[&str] = &["가리킨다", "동음이의"];

/// Outcome of resolving a subject name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// A page that classifies as an author/work result.
    Found(Page),
    /// A page exists but lists several people under the name.
    Disambiguation(Page),
    /// No usable page under any candidate.
    NotFound,
}

/// Resolves subject names against the knowledge source.
pub struct SubjectResolver {
    knowledge: Arc<dyn KnowledgeSource>,
}

impl SubjectResolver {
    /// Creates a resolver over a knowledge source port.
    pub fn new(knowledge: Arc<dyn KnowledgeSource>) -> Self {
        Self { knowledge }
    }

    /// Resolves an author name through the qualified-candidate list.
    pub async fn resolve_author(&self, name: &str) -> Resolution {
        let mut candidates: Vec<String> = AUTHOR_QUALIFIERS
            .iter()
            .map(|q| format!("{name} ({q})"))
            .collect();
        candidates.push(name.to_string());
        self.resolve_candidates(name, &candidates).await
    }

    /// Resolves a work title (reverse lookup), work qualifiers first.
    pub async fn resolve_work(&self, title: &str) -> Resolution {
        let mut candidates: Vec<String> = WORK_QUALIFIERS
            .iter()
            .map(|q| format!("{title} ({q})"))
            .collect();
        candidates.push(title.to_string());
        self.resolve_candidates(title, &candidates).await
    }

    /// Resolves an author+work clarification pair: author qualifiers, the
    /// bare work, the combination, then the bare author.
    pub async fn resolve_clarified(&self, author: &str, work: &str) -> Resolution {
        let mut candidates: Vec<String> = AUTHOR_QUALIFIERS
            .iter()
            .map(|q| format!("{author} ({q})"))
            .collect();
        candidates.push(work.to_string());
        candidates.push(format!("{author} {work}"));
        candidates.push(author.to_string());

        // Title similarity is checked against whichever of the pair the
        // candidate was built from.
        let mut disambiguation = None;
        for candidate in &candidates {
            let against = if candidate.as_str() == work { work } else { author };
            match self.try_candidate(against, candidate).await {
                CandidateOutcome::Found(page) => return Resolution::Found(page),
                CandidateOutcome::Disambiguation(page) => {
                    disambiguation.get_or_insert(page);
                }
                CandidateOutcome::Miss => {}
            }
        }
        match disambiguation {
            Some(page) => Resolution::Disambiguation(page),
            None => Resolution::NotFound,
        }
    }

    async fn resolve_candidates(&self, subject: &str, candidates: &[String]) -> Resolution {
        let mut disambiguation = None;
        for candidate in candidates {
            match self.try_candidate(subject, candidate).await {
                CandidateOutcome::Found(page) => return Resolution::Found(page),
                CandidateOutcome::Disambiguation(page) => {
                    disambiguation.get_or_insert(page);
                }
                CandidateOutcome::Miss => {}
            }
        }
        match disambiguation {
            Some(page) => Resolution::Disambiguation(page),
            None => Resolution::NotFound,
        }
    }

    async fn try_candidate(&self, subject: &str, candidate: &str) -> CandidateOutcome {
        match self.knowledge.lookup(candidate).await {
            Ok(page) => {
                if is_disambiguation(&page) {
                    debug!(candidate, "candidate is a disambiguation listing");
                    return CandidateOutcome::Disambiguation(page);
                }
                if is_author_page(&page) && is_title_similar(subject, &page.title) {
                    return CandidateOutcome::Found(page);
                }
                debug!(candidate, title = %page.title, "candidate rejected by classification");
                CandidateOutcome::Miss
            }
            Err(err) if err.is_not_found() => CandidateOutcome::Miss,
            Err(err) => {
                warn!(candidate, error = %err, "knowledge lookup failed");
                CandidateOutcome::Miss
            }
        }
    }
}

enum CandidateOutcome {
    Found(Page),
    Disambiguation(Page),
    Miss,
}

/// True when the page is a disambiguation listing rather than a single
/// entity. Checked before any other signal; a listing never classifies as
/// an author page.
pub fn is_disambiguation(page: &Page) -> bool {
    DISAMBIGUATION_MARKERS
        .iter()
        .any(|m| page.summary.contains(m))
}

/// Classifies a page as describing an author or a work.
pub fn is_author_page(page: &Page) -> bool {
    if is_disambiguation(page) {
        return false;
    }

    // First summary sentence: occupation or work-type term.
    let first_sentence = page
        .summary
        .split_inclusive(['.', '\n'])
        .next()
        .unwrap_or(&page.summary);
    if OCCUPATION_TERMS.iter().any(|t| first_sentence.contains(t))
        || WORK_TERMS.iter().any(|t| first_sentence.contains(t))
    {
        return true;
    }

    // Work-type qualifier in the title, e.g. "개미 (소설)".
    if WORK_TERMS
        .iter()
        .any(|t| page.title.contains(&format!("({t})")))
    {
        return true;
    }

    // Bibliography section in the body.
    if BIBLIOGRAPHY_HEADINGS.iter().any(|h| page.content.contains(h)) {
        return true;
    }

    // Any author keyword anywhere.
    let haystack = format!("{} {} {}", page.title, page.summary, page.content);
    AUTHOR_KEYWORDS.iter().any(|k| haystack.contains(k))
}

/// Permissive title similarity: normalized (lower-cased, whitespace
/// stripped) query and title - with any trailing parenthetical qualifier
/// removed from the title - must contain one another.
pub fn is_title_similar(query: &str, result_title: &str) -> bool {
    let normalize = |s: &str| -> String {
        s.to_lowercase()
            .chars()
            .filter(|c| !c.is_whitespace())
            .collect()
    };

    let bare_title = match result_title.split_once('(') {
        Some((head, _)) => head,
        None => result_title,
    };

    let query = normalize(query);
    let title = normalize(bare_title);
    if query.is_empty() || title.is_empty() {
        return false;
    }
    query.contains(&title) || title.contains(&query)
}
