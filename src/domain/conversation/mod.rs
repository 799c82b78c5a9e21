//! Conversation module - per-conversation state and turn outcomes.

mod state;
mod turn;

pub use state::{ConversationId, ConversationState, HistoryEntry, Role, StateUpdate};
pub use turn::{TurnAction, TurnOutcome};
