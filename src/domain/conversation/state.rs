//! Conversation state - what the engine remembers between turns.
//!
//! One state per conversation, owned exclusively by that conversation; the
//! engine borrows it immutably and hands back a [`StateUpdate`] overlay.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::ports::Page;

/// Maximum history entries retained; the oldest are evicted first.
const HISTORY_LIMIT: usize = 20;

/// Unique conversation identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConversationId(Uuid);

impl ConversationId {
    /// Generates a fresh identifier.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ConversationId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ConversationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// Who produced a history entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// The human side of the conversation.
    User,
    /// The engine's replies.
    Assistant,
}

/// One utterance in the conversation history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    /// Who spoke.
    pub role: Role,
    /// What was said.
    pub text: String,
    /// When it was recorded.
    pub timestamp: DateTime<Utc>,
}

impl HistoryEntry {
    /// Creates an entry stamped with the current time.
    pub fn new(role: Role, text: impl Into<String>) -> Self {
        Self {
            role,
            text: text.into(),
            timestamp: Utc::now(),
        }
    }
}

/// Per-conversation state.
///
/// Invariant: `awaiting_clarification` implies `current_subject` is set.
/// Invariant: a page stored in `last_result` passed the resolver's
/// author/work classification before being persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationState {
    /// Conversation identity.
    pub id: ConversationId,
    /// The author or work currently under discussion.
    pub current_subject: Option<String>,
    /// True while the engine waits for a disambiguating reply.
    pub awaiting_clarification: bool,
    /// Most recent classified page, reused for context questions.
    pub last_result: Option<Page>,
    /// Bounded dialogue history, newest last.
    pub history: Vec<HistoryEntry>,
}

impl ConversationState {
    /// Creates the empty state a conversation starts from.
    pub fn new() -> Self {
        Self {
            id: ConversationId::new(),
            current_subject: None,
            awaiting_clarification: false,
            last_result: None,
            history: Vec::new(),
        }
    }

    /// Appends a history entry, evicting the oldest past the bound.
    pub fn push_history(&mut self, role: Role, text: impl Into<String>) {
        self.history.push(HistoryEntry::new(role, text));
        if self.history.len() > HISTORY_LIMIT {
            let excess = self.history.len() - HISTORY_LIMIT;
            self.history.drain(..excess);
        }
    }

    /// The newest `n` history entries, oldest of those first.
    pub fn recent_history(&self, n: usize) -> &[HistoryEntry] {
        let start = self.history.len().saturating_sub(n);
        &self.history[start..]
    }

    /// Clears everything except the conversation identity.
    pub fn reset(&mut self) {
        self.current_subject = None;
        self.awaiting_clarification = false;
        self.last_result = None;
        self.history.clear();
    }

    /// Applies a turn's overlay. A `reset_conversation` update wipes the
    /// state first, then lays the remaining fields on top.
    pub fn apply(&mut self, update: &StateUpdate) {
        if update.reset_conversation {
            self.reset();
        }
        if let Some(subject) = &update.current_subject {
            self.current_subject = subject.clone();
        }
        if let Some(awaiting) = update.awaiting_clarification {
            self.awaiting_clarification = awaiting;
        }
        if let Some(result) = &update.last_result {
            self.last_result = result.clone();
        }
    }
}

impl Default for ConversationState {
    fn default() -> Self {
        Self::new()
    }
}

/// Partial state overlay produced by a turn.
///
/// `None` means "leave the field alone"; `Some(None)` clears it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StateUpdate {
    /// New subject, if the turn changed it.
    pub current_subject: Option<Option<String>>,
    /// New clarification flag, if the turn changed it.
    pub awaiting_clarification: Option<bool>,
    /// New last result, if the turn changed it.
    pub last_result: Option<Option<Page>>,
    /// When true the state is wiped before the overlay is applied.
    pub reset_conversation: bool,
}

impl StateUpdate {
    /// An overlay that changes nothing.
    pub fn none() -> Self {
        Self::default()
    }

    /// Overlay for a resolved subject: stores subject and page, clears the
    /// clarification flag.
    pub fn resolved(subject: impl Into<String>, page: Page) -> Self {
        Self {
            current_subject: Some(Some(subject.into())),
            awaiting_clarification: Some(false),
            last_result: Some(Some(page)),
            reset_conversation: false,
        }
    }

    /// Overlay that parks the conversation waiting for a clarifying reply.
    pub fn awaiting(subject: impl Into<String>) -> Self {
        Self {
            current_subject: Some(Some(subject.into())),
            awaiting_clarification: Some(true),
            last_result: None,
            reset_conversation: false,
        }
    }

    /// Marks the overlay as a full conversation reset.
    pub fn with_reset(mut self) -> Self {
        self.reset_conversation = true;
        self
    }
}
