//! Intent classification - language model first, keyword rules second.
//!
//! The primary path sends the utterance plus condensed recent history to
//! the language model and expects strict JSON. Any transport failure or
//! malformed payload falls back to the deterministic rule chain; the
//! classifier itself never fails.

use std::sync::Arc;

use serde::Deserialize;
use tracing::debug;

use crate::domain::conversation::ConversationState;
use crate::ports::LanguageModel;

use super::rules;
use super::{QueryIntent, SpecificField};

const INTENT_SYSTEM_PROMPT: &str = "\
사용자 질문의 의도를 분석해 JSON으로만 응답하세요.\n\
{\"intent_type\": \"book_to_author\" | \"context_question\" | \"new_search\",\n \
\"extracted_keywords\": [\"키워드\"],\n \
\"specific_info_request\": \"university\" | \"birth\" | \"death\" | \"school\" | \"works\" | \"awards\" | null}\n\
규칙: 작가명이 직접 언급되면 new_search. 책 제목만 있거나 '누가 썼어' 형태면 \
book_to_author (첫 키워드는 작품명). 새 고유명사 없이 이전 대화에 기대면 context_question.";

/// Payload shape the model is instructed to return.
#[derive(Debug, Deserialize)]
struct IntentPayload {
    intent_type: String,
    #[serde(default)]
    extracted_keywords: Vec<String>,
    #[serde(default)]
    specific_info_request: Option<String>,
}

/// Classifies a user utterance into a [`QueryIntent`].
pub struct IntentClassifier {
    model: Arc<dyn LanguageModel>,
}

impl IntentClassifier {
    /// Creates a classifier over a language model port.
    pub fn new(model: Arc<dyn LanguageModel>) -> Self {
        Self { model }
    }

    /// Classifies an utterance given the conversation so far.
    ///
    /// Never fails: model trouble degrades to the deterministic rules.
    pub async fn classify(&self, utterance: &str, state: &ConversationState) -> QueryIntent {
        let user_prompt = self.format_prompt(utterance, state);
        match self.model.complete(INTENT_SYSTEM_PROMPT, &user_prompt).await {
            Ok(raw) => match serde_json::from_str::<IntentPayload>(raw.trim()) {
                Ok(payload) => self.from_payload(payload, utterance),
                Err(err) => {
                    debug!(error = %err, "intent payload unparseable, using keyword rules");
                    Self::classify_deterministic(utterance)
                }
            },
            Err(err) => {
                debug!(error = %err, "intent completion failed, using keyword rules");
                Self::classify_deterministic(utterance)
            }
        }
    }

    /// The keyword-rule fallback, exposed for direct testing.
    pub fn classify_deterministic(utterance: &str) -> QueryIntent {
        // Authorship question: the remainder after stop-keywords is a work
        // title.
        if rules::AUTHORSHIP_KEYWORDS.iter().any(|k| utterance.contains(k)) {
            let title = rules::extract_work_title(utterance);
            if !title.is_empty() {
                return QueryIntent::BookToAuthor { work_title: title };
            }
        }

        if let Some(name) = rules::extract_person_name(utterance) {
            return QueryIntent::NewSearch {
                keywords: vec![name],
            };
        }

        QueryIntent::NewSearch {
            keywords: vec![utterance.trim().to_string()],
        }
    }

    fn format_prompt(&self, utterance: &str, state: &ConversationState) -> String {
        let mut prompt = format!("사용자 질문: {utterance}\n");
        if let Some(subject) = &state.current_subject {
            prompt.push_str(&format!("현재 대화 주제: {subject}\n"));
        }
        if state.awaiting_clarification {
            prompt.push_str("상태: 사용자에게 추가 정보를 요청한 상태\n");
        }
        let recent = state.recent_history(3);
        if !recent.is_empty() {
            prompt.push_str("최근 대화:\n");
            for entry in recent {
                let speaker = match entry.role {
                    crate::domain::conversation::Role::User => "사용자",
                    crate::domain::conversation::Role::Assistant => "AI",
                };
                let text: String = entry.text.chars().take(80).collect();
                prompt.push_str(&format!("- {speaker}: {text}\n"));
            }
        }
        prompt
    }

    fn from_payload(&self, payload: IntentPayload, utterance: &str) -> QueryIntent {
        let field = payload
            .specific_info_request
            .as_deref()
            .and_then(SpecificField::from_token);

        match payload.intent_type.as_str() {
            "book_to_author" => {
                let title = payload
                    .extracted_keywords
                    .first()
                    .map(|k| k.trim().to_string())
                    .filter(|k| !k.is_empty())
                    .unwrap_or_else(|| rules::extract_work_title(utterance));
                QueryIntent::BookToAuthor { work_title: title }
            }
            "context_question" => QueryIntent::ContextQuestion {
                field: field.or_else(|| rules::detect_specific_field(utterance)),
            },
            "new_search" | "author_search" => {
                let keywords: Vec<String> = payload
                    .extracted_keywords
                    .into_iter()
                    .map(|k| k.trim().to_string())
                    .filter(|k| !k.is_empty())
                    .collect();
                if keywords.is_empty() {
                    Self::classify_deterministic(utterance)
                } else {
                    QueryIntent::NewSearch { keywords }
                }
            }
            other => {
                debug!(intent_type = other, "unknown intent type from model");
                Self::classify_deterministic(utterance)
            }
        }
    }
}
