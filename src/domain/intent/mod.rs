//! Intent module - what a user utterance is asking for.
//!
//! Closed unions with exhaustive matching at every consumption site. An
//! intent is produced fresh each turn and never persisted.

mod classifier;
pub mod rules;

pub use classifier::IntentClassifier;

use serde::{Deserialize, Serialize};

/// The four things an utterance can ask the engine to do.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum QueryIntent {
    /// Search for a newly named subject; the first keyword is the subject.
    NewSearch {
        /// Extracted search keywords, best first.
        keywords: Vec<String>,
    },
    /// Follow-up about the subject already under discussion.
    ContextQuestion {
        /// The specific attribute asked for, when one was detected.
        field: Option<SpecificField>,
    },
    /// Reverse lookup: find the author of a named work.
    BookToAuthor {
        /// The work title to resolve.
        work_title: String,
    },
    /// One utterance naming two subjects to report independently.
    Compound {
        /// Both subjects, in utterance order.
        subjects: [String; 2],
    },
}

impl QueryIntent {
    /// A new-subject search on a single keyword.
    pub fn search(keyword: impl Into<String>) -> Self {
        Self::NewSearch {
            keywords: vec![keyword.into()],
        }
    }

    /// A reverse work-to-author lookup.
    pub fn book_to_author(work_title: impl Into<String>) -> Self {
        Self::BookToAuthor {
            work_title: work_title.into(),
        }
    }
}

/// The enumerated biographical/bibliographic attributes a user may request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpecificField {
    /// Primary/secondary school education.
    School,
    /// University education.
    University,
    /// Birth date.
    Birth,
    /// Death date.
    Death,
    /// Birth and death asked together ("born ... died ...").
    BirthAndDeath,
    /// Published works.
    Works,
    /// Awards received.
    Awards,
    /// Father's name.
    Father,
    /// Mother's name.
    Mother,
    /// Spouse's name.
    Spouse,
    /// Family overview.
    Family,
}

impl SpecificField {
    /// Maps a classifier field token onto the enum. Unknown tokens map to
    /// nothing rather than guessing.
    pub fn from_token(token: &str) -> Option<Self> {
        match token {
            "school" => Some(Self::School),
            "university" => Some(Self::University),
            "birth" => Some(Self::Birth),
            "death" => Some(Self::Death),
            "birth_death" => Some(Self::BirthAndDeath),
            "works" => Some(Self::Works),
            "awards" => Some(Self::Awards),
            "father" => Some(Self::Father),
            "mother" => Some(Self::Mother),
            "spouse" => Some(Self::Spouse),
            "family" => Some(Self::Family),
            _ => None,
        }
    }
}
