//! Turn outcomes - the closed action union every turn resolves to.

use serde::{Deserialize, Serialize};

use super::state::StateUpdate;

/// What the surrounding chat surface should do with a turn's message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnAction {
    /// Present the answer.
    ShowResult,
    /// Present a clarifying question and wait for the reply.
    AskClarification,
    /// Present a refusal or failure notice.
    Error,
}

/// The result of one `execute` call: an action, the user-facing message,
/// and the state overlay to apply before the next turn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TurnOutcome {
    /// How the surface should treat the message.
    pub action: TurnAction,
    /// User-facing message text.
    pub message: String,
    /// State changes produced by this turn.
    pub update: StateUpdate,
}

impl TurnOutcome {
    /// A successful answer.
    pub fn show(message: impl Into<String>, update: StateUpdate) -> Self {
        Self {
            action: TurnAction::ShowResult,
            message: message.into(),
            update,
        }
    }

    /// A clarifying question.
    pub fn clarify(message: impl Into<String>, update: StateUpdate) -> Self {
        Self {
            action: TurnAction::AskClarification,
            message: message.into(),
            update,
        }
    }

    /// A refusal or failure notice with no state change.
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            action: TurnAction::Error,
            message: message.into(),
            update: StateUpdate::none(),
        }
    }

    /// True when the conversation should keep going.
    pub fn should_continue(&self) -> bool {
        matches!(
            self.action,
            TurnAction::ShowResult | TurnAction::AskClarification
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_show_outcome_continues() {
        let outcome = TurnOutcome::show("답변", StateUpdate::none());
        assert_eq!(outcome.action, TurnAction::ShowResult);
        assert!(outcome.should_continue());
    }

    #[test]
    fn test_clarify_outcome_continues() {
        let outcome = TurnOutcome::clarify("어떤 작품인가요?", StateUpdate::awaiting("한강"));
        assert_eq!(outcome.action, TurnAction::AskClarification);
        assert!(outcome.should_continue());
    }

    #[test]
    fn test_error_outcome_stops_and_keeps_state() {
        let outcome = TurnOutcome::error("죄송합니다.");
        assert_eq!(outcome.action, TurnAction::Error);
        assert!(!outcome.should_continue());
        assert_eq!(outcome.update, StateUpdate::none());
    }

    #[test]
    fn test_action_serializes_snake_case() {
        let json = serde_json::to_string(&TurnAction::AskClarification).unwrap();
        assert_eq!(json, "\"ask_clarification\"");
        let json = serde_json::to_string(&TurnAction::ShowResult).unwrap();
        assert_eq!(json, "\"show_result\"");
    }
}
