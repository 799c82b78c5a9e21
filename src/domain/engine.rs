//! Conversation engine - the turn-level state machine.
//!
//! `execute` takes one user utterance plus the conversation state and
//! resolves it to exactly one of show-result, ask-clarification or error.
//! Priority order each turn: clarification handling, compound-subject
//! detection, context reuse, fresh search. Errors never escape: every
//! adapter failure lands on a fallback branch or an error action.

use std::sync::Arc;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use tracing::{debug, info};

use crate::domain::conversation::{ConversationState, StateUpdate, TurnOutcome};
use crate::domain::extract::AttributeExtractor;
use crate::domain::intent::{rules, IntentClassifier, QueryIntent, SpecificField};
use crate::domain::resolver::{Resolution, SubjectResolver};
use crate::domain::respond;
use crate::ports::{KnowledgeSource, LanguageModel, Page};

const ANSWER_SYSTEM_PROMPT: &str = "\
주어진 위키 정보를 바탕으로 사용자의 질문에 한국어로 간결하게 답하세요. \
기본 소개 질문에는 요약의 핵심 정보만 사용하고, 정보가 없으면 없다고 답하세요.";

const CLARIFICATION_SYSTEM_PROMPT: &str = "\
추가 정보를 요청받은 사용자의 답변을 분석해 JSON으로만 응답하세요.\n\
{\"work_title\": \"작품명\" | null, \"author_name\": \"작가명\" | null, \"is_new_query\": true/false}\n\
규칙: 답변이 기존 요청과 무관한 새 질문이면 is_new_query: true.";

#[derive(Debug, Deserialize)]
struct ClarificationPayload {
    #[serde(default)]
    work_title: Option<String>,
    #[serde(default)]
    author_name: Option<String>,
    #[serde(default)]
    is_new_query: bool,
}

static CLARIFICATION_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    vec![
        // "채식주의자 쓴 한강 말이야" / "개미라는 작품 쓴 베르나르 베르베르"
        Regex::new(r"^(.+?)\s*(?:라는|이라는)?\s*(?:작품|소설|책)?\s*쓴\s+([가-힣]{2,4}(?:\s[가-힣]{2,4})?)")
            .expect("valid regex"),
        // "채식주의자 작가 한강"
        Regex::new(r"^(.+?)\s+(?:작가|저자)\s+([가-힣]{2,4})").expect("valid regex"),
    ]
});

static WROTE_IT_PATTERN: Lazy<Regex> = Lazy::new(|| {
    // "혼모노라는 책 썼다고 했는데" - work only, no author
    Regex::new(r"^(.+?)\s*(?:라는|이라는)?\s*(?:책|소설|작품)?\s*썼다고?\s*했는데").expect("valid regex")
});

/// The conversational resolution engine.
///
/// Owns its collaborators through the two ports; construct one per process
/// and share it across conversations (state travels per call).
pub struct ConversationEngine {
    model: Arc<dyn LanguageModel>,
    resolver: SubjectResolver,
    classifier: IntentClassifier,
    extractor: AttributeExtractor,
}

impl ConversationEngine {
    /// Creates an engine over the two adapter ports.
    pub fn new(knowledge: Arc<dyn KnowledgeSource>, model: Arc<dyn LanguageModel>) -> Self {
        Self {
            resolver: SubjectResolver::new(knowledge),
            classifier: IntentClassifier::new(model.clone()),
            extractor: AttributeExtractor::new(model.clone()),
            model,
        }
    }

    /// Executes one conversational turn.
    ///
    /// Always returns an outcome; never panics and never surfaces adapter
    /// errors directly.
    pub async fn execute(&self, utterance: &str, state: &ConversationState) -> TurnOutcome {
        let utterance = utterance.trim();
        if utterance.is_empty() {
            return TurnOutcome::error(respond::ambiguous_query());
        }
        info!(utterance, awaiting = state.awaiting_clarification, "turn start");

        if state.awaiting_clarification {
            return self.handle_clarification(utterance, state).await;
        }
        self.fresh_turn(utterance, state).await
    }

    /// Steps 2-5: everything except clarification handling.
    async fn fresh_turn(&self, utterance: &str, state: &ConversationState) -> TurnOutcome {
        if let Some([first, second]) = rules::detect_compound(utterance) {
            return self.handle_compound(&first, &second).await;
        }

        if self.should_use_context(utterance, state) {
            return self.handle_context_question(utterance, state, None).await;
        }

        if rules::is_irrelevant(utterance) {
            return TurnOutcome::error(respond::domain_refusal());
        }

        match self.classifier.classify(utterance, state).await {
            QueryIntent::BookToAuthor { work_title } => {
                self.handle_book_to_author(&work_title).await
            }
            QueryIntent::ContextQuestion { field } => {
                if state.current_subject.is_some() && state.last_result.is_some() {
                    self.handle_context_question(utterance, state, field).await
                } else {
                    // Graceful degradation: no context to lean on, so treat
                    // it as a fresh search.
                    self.handle_new_search(utterance, None).await
                }
            }
            QueryIntent::NewSearch { keywords } => {
                let subject = keywords.first().map(|k| k.trim().to_string());
                self.handle_new_search(utterance, subject).await
            }
            QueryIntent::Compound { subjects } => {
                self.handle_compound(&subjects[0], &subjects[1]).await
            }
        }
    }

    /// Context-priority check: reuse the previous result only when the
    /// subject is unchanged, a continuation keyword is present, and there
    /// is a conversation to continue. Documented precedence; a newly named
    /// subject always wins.
    fn should_use_context(&self, utterance: &str, state: &ConversationState) -> bool {
        state.current_subject.is_some()
            && state.last_result.is_some()
            && !state.history.is_empty()
            && !rules::mentions_new_subject(utterance, state.current_subject.as_deref())
            && rules::has_context_keyword(utterance)
    }

    async fn handle_context_question(
        &self,
        utterance: &str,
        state: &ConversationState,
        field: Option<SpecificField>,
    ) -> TurnOutcome {
        let Some(page) = &state.last_result else {
            return self.handle_new_search(utterance, None).await;
        };
        let subject = state
            .current_subject
            .clone()
            .unwrap_or_else(|| page.bare_title().to_string());

        let field = field.or_else(|| rules::detect_specific_field(utterance));
        let message = match field {
            Some(field) => self.extractor.extract(field, page, &subject).await,
            None => self.synthesize_answer(utterance, page).await,
        };
        TurnOutcome::show(message, StateUpdate::none())
    }

    async fn handle_new_search(&self, utterance: &str, subject: Option<String>) -> TurnOutcome {
        let subject = subject
            .filter(|s| !s.is_empty())
            .or_else(|| rules::extract_person_name(utterance));
        let Some(subject) = subject else {
            return TurnOutcome::error(respond::ambiguous_query());
        };

        match self.resolver.resolve_author(&subject).await {
            Resolution::Found(page) => self.respond_with_page(utterance, &subject, page).await,
            Resolution::Disambiguation(_) => TurnOutcome::clarify(
                respond::clarification_request(&subject),
                StateUpdate::awaiting(&subject),
            ),
            Resolution::NotFound => TurnOutcome::clarify(
                respond::search_failure(&subject),
                StateUpdate::awaiting(&subject),
            ),
        }
    }

    /// Attribute/response step for a freshly resolved subject.
    async fn respond_with_page(&self, utterance: &str, subject: &str, page: Page) -> TurnOutcome {
        let message = match rules::detect_specific_field(utterance) {
            Some(field) => self.extractor.extract(field, &page, subject).await,
            None => self.synthesize_answer(utterance, &page).await,
        };
        TurnOutcome::show(message, StateUpdate::resolved(subject, page))
    }

    async fn handle_book_to_author(&self, work_title: &str) -> TurnOutcome {
        if work_title.is_empty() {
            return TurnOutcome::error(respond::ambiguous_query());
        }
        match self.resolver.resolve_work(work_title).await {
            Resolution::Found(page) => {
                let author = self.extractor.extract_original_author(&page).await;
                // The work's summary is always surfaced, author or not.
                let card = respond::format_page_card(&page);
                let message = match &author {
                    Some(author) => {
                        format!("'{}'의 작가는 {author}입니다.\n\n{card}", page.bare_title())
                    }
                    None => card,
                };
                TurnOutcome::show(message, StateUpdate::resolved(work_title, page))
            }
            Resolution::Disambiguation(_) | Resolution::NotFound => {
                // The keyword fallback sometimes reads "X 작가 알려줘" as a
                // work question about X; before asking for a better title,
                // check whether X resolves as an author outright.
                if let Resolution::Found(page) = self.resolver.resolve_author(work_title).await {
                    let subject = page.bare_title().to_string();
                    let message = respond::format_page_card(&page);
                    return TurnOutcome::show(message, StateUpdate::resolved(subject, page));
                }
                TurnOutcome::clarify(respond::work_not_found(work_title), StateUpdate::none())
            }
        }
    }

    /// Compound path: both subjects resolve independently and concurrently;
    /// a failed side becomes an inline miss line, never an abort.
    async fn handle_compound(&self, first: &str, second: &str) -> TurnOutcome {
        let (left, right) = futures::join!(
            self.resolve_for_compound(first),
            self.resolve_for_compound(second)
        );

        let message = format!("{}\n\n{}", left.0, right.0);
        let update = match (left.1, right.1) {
            (Some(page), _) => StateUpdate::resolved(first, page),
            (None, Some(page)) => StateUpdate::resolved(second, page),
            (None, None) => StateUpdate::none(),
        };
        TurnOutcome::show(message, update)
    }

    async fn resolve_for_compound(&self, subject: &str) -> (String, Option<Page>) {
        match self.resolver.resolve_author(subject).await {
            Resolution::Found(page) => {
                let text = format!(
                    "{}\n{}",
                    respond::compound_header(subject),
                    respond::format_page_card(&page)
                );
                (text, Some(page))
            }
            Resolution::Disambiguation(_) | Resolution::NotFound => {
                (respond::compound_miss(subject), None)
            }
        }
    }

    /// Step 1: the user was asked for a representative work and answered.
    async fn handle_clarification(
        &self,
        utterance: &str,
        state: &ConversationState,
    ) -> TurnOutcome {
        let parsed = self.parse_clarification(utterance, state).await;

        if parsed.is_new_query {
            // Restart as a fresh turn against an empty state and tell the
            // caller to reset before applying.
            let fresh = ConversationState::new();
            let mut outcome = self.fresh_turn(utterance, &fresh).await;
            outcome.update.reset_conversation = true;
            return outcome;
        }

        let author = parsed
            .author_name
            .filter(|a| !a.trim().is_empty())
            .or_else(|| state.current_subject.clone());
        let work = parsed
            .work_title
            .filter(|w| !w.trim().is_empty())
            .unwrap_or_else(|| utterance.to_string());
        let Some(author) = author else {
            return TurnOutcome::error(respond::ambiguous_query());
        };

        match self.resolver.resolve_clarified(&author, &work).await {
            Resolution::Found(page) => TurnOutcome::show(
                respond::format_page_card(&page),
                StateUpdate::resolved(&author, page),
            ),
            Resolution::Disambiguation(_) | Resolution::NotFound => TurnOutcome::clarify(
                respond::combined_search_failure(&author, &work),
                StateUpdate::awaiting(&author),
            ),
        }
    }

    async fn parse_clarification(
        &self,
        utterance: &str,
        state: &ConversationState,
    ) -> ClarificationPayload {
        let mut prompt = format!("사용자 답변: {utterance}\n");
        if let Some(subject) = &state.current_subject {
            prompt.push_str(&format!("원래 찾던 작가: {subject}\n"));
        }
        match self.model.complete(CLARIFICATION_SYSTEM_PROMPT, &prompt).await {
            Ok(raw) => match serde_json::from_str::<ClarificationPayload>(raw.trim()) {
                Ok(payload) => payload,
                Err(err) => {
                    debug!(error = %err, "clarification payload unparseable, using patterns");
                    Self::parse_clarification_deterministic(utterance)
                }
            },
            Err(err) => {
                debug!(error = %err, "clarification completion failed, using patterns");
                Self::parse_clarification_deterministic(utterance)
            }
        }
    }

    /// Pattern fallback for clarification replies, raw utterance as the
    /// work title when nothing matches.
    fn parse_clarification_deterministic(utterance: &str) -> ClarificationPayload {
        let is_new_query = Self::looks_like_new_query(utterance);
        if is_new_query {
            return ClarificationPayload {
                work_title: None,
                author_name: None,
                is_new_query: true,
            };
        }

        for pattern in CLARIFICATION_PATTERNS.iter() {
            if let Some(caps) = pattern.captures(utterance) {
                let work = caps
                    .get(1)
                    .map(|g| g.as_str().replace(['"', '\''], "").trim().to_string());
                // Filler tokens like "말이야" ride along in the name capture.
                let author = caps
                    .get(2)
                    .map(|g| {
                        g.as_str()
                            .split_whitespace()
                            .filter(|t| !matches!(*t, "말이야" | "맞아" | "이야"))
                            .collect::<Vec<_>>()
                            .join(" ")
                    })
                    .filter(|a| !a.is_empty());
                return ClarificationPayload {
                    work_title: work,
                    author_name: author,
                    is_new_query: false,
                };
            }
        }

        if let Some(caps) = WROTE_IT_PATTERN.captures(utterance) {
            return ClarificationPayload {
                work_title: caps.get(1).map(|g| g.as_str().trim().to_string()),
                author_name: None,
                is_new_query: false,
            };
        }

        ClarificationPayload {
            work_title: Some(utterance.trim().to_string()),
            author_name: None,
            is_new_query: false,
        }
    }

    /// A clarification reply that reads as an author question of its own
    /// restarts the conversation. A single bare word is a work title.
    fn looks_like_new_query(utterance: &str) -> bool {
        const NEW_QUERY_MARKERS: &[&str] =
            &["작가", "소설가", "시인", "에 대해", "알려줘", "정보", "누구"];
        if utterance.split_whitespace().count() == 1 {
            return false;
        }
        NEW_QUERY_MARKERS.iter().any(|m| utterance.contains(m))
    }

    /// Free-form answer over the page text, with the canonical detail link
    /// appended when the synthesis leaves it out.
    async fn synthesize_answer(&self, utterance: &str, page: &Page) -> String {
        let excerpt: String = page.full_text().chars().take(2000).collect();
        let prompt = format!("질문: {utterance}\n\n위키 정보:\n제목: {}\n{excerpt}", page.title);
        match self.model.complete(ANSWER_SYSTEM_PROMPT, &prompt).await {
            Ok(answer) if !answer.trim().is_empty() => {
                respond::ensure_detail_link(answer.trim(), &page.url)
            }
            _ => respond::format_page_card(page),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::ai::MockLanguageModel;
    use crate::adapters::knowledge::MockKnowledgeSource;
    use crate::domain::conversation::{Role, TurnAction};

    fn hangang_page() -> Page {
        Page::new(
            "한강 (작가)",
            "한강은 대한민국의 소설가이다.",
            "한강은 1970년 11월 27일 광주광역시에서 태어났다. 연세대학교 국어국문학과를 졸업했다. 대표작으로는 《채식주의자》가 있다.",
            "https://ko.wikipedia.org/wiki/한강_(작가)",
        )
    }

    fn ant_novel_page() -> Page {
        Page::new(
            "개미 (소설)",
            "개미는 베르나르 베르베르의 소설이다.",
            "이 소설은 1991년에 발표되었다. 옮긴이는 이세욱이다.",
            "https://ko.wikipedia.org/wiki/개미_(소설)",
        )
    }

    fn engine(knowledge: MockKnowledgeSource, model: MockLanguageModel) -> ConversationEngine {
        ConversationEngine::new(Arc::new(knowledge), Arc::new(model))
    }

    #[tokio::test]
    async fn test_fresh_search_resolves_subject() {
        let engine = engine(
            MockKnowledgeSource::new().with_page("한강 (작가)", hangang_page()),
            MockLanguageModel::failing(),
        );
        let state = ConversationState::new();

        let outcome = engine.execute("한강이 누구야", &state).await;

        assert_eq!(outcome.action, TurnAction::ShowResult);
        assert!(outcome.message.contains("한강"));
        assert_eq!(
            outcome.update.current_subject,
            Some(Some("한강".to_string()))
        );
        assert!(outcome.update.last_result.is_some());
    }

    #[tokio::test]
    async fn test_context_question_reuses_last_result() {
        let engine = engine(MockKnowledgeSource::new(), MockLanguageModel::failing());
        let mut state = ConversationState::new();
        state.apply(&StateUpdate::resolved("한강", hangang_page()));
        state.push_history(Role::User, "한강이 누구야");
        state.push_history(Role::Assistant, "한강은 대한민국의 소설가입니다.");

        let outcome = engine.execute("그 작가 나이는?", &state).await;

        assert_eq!(outcome.action, TurnAction::ShowResult);
        assert!(outcome.message.contains("1970"));
        // context reuse leaves the state alone
        assert_eq!(outcome.update, StateUpdate::none());
    }

    #[tokio::test]
    async fn test_new_subject_beats_context() {
        let engine = engine(
            MockKnowledgeSource::new().with_page("김영하 (작가)", Page::new(
                "김영하 (작가)",
                "김영하는 대한민국의 소설가이다.",
                "1968년에 태어났다.",
                "https://ko.wikipedia.org/wiki/김영하_(작가)",
            )),
            MockLanguageModel::failing(),
        );
        let mut state = ConversationState::new();
        state.apply(&StateUpdate::resolved("한강", hangang_page()));
        state.push_history(Role::User, "한강이 누구야");

        let outcome = engine.execute("김영하 작가 정보", &state).await;

        assert_eq!(outcome.action, TurnAction::ShowResult);
        assert!(outcome.message.contains("김영하"));
    }

    #[tokio::test]
    async fn test_disambiguation_asks_for_representative_work() {
        let engine = engine(
            MockKnowledgeSource::new().with_page(
                "한강",
                Page::new("한강", "한강은 다음 사람을 가리킨다.", "한강 (강), 한강 (작가)", "u"),
            ),
            MockLanguageModel::failing(),
        );
        let state = ConversationState::new();

        let outcome = engine.execute("한강이 누구야", &state).await;

        assert_eq!(outcome.action, TurnAction::AskClarification);
        assert_eq!(outcome.update.awaiting_clarification, Some(true));
        assert_eq!(
            outcome.update.current_subject,
            Some(Some("한강".to_string()))
        );
    }

    #[tokio::test]
    async fn test_not_found_asks_for_retry() {
        let engine = engine(MockKnowledgeSource::new(), MockLanguageModel::failing());
        let state = ConversationState::new();

        let outcome = engine.execute("박철수철이 누구야", &state).await;

        assert_eq!(outcome.action, TurnAction::AskClarification);
        assert_eq!(outcome.update.awaiting_clarification, Some(true));
    }

    #[tokio::test]
    async fn test_irrelevant_utterance_is_refused() {
        let engine = engine(MockKnowledgeSource::new(), MockLanguageModel::failing());
        let state = ConversationState::new();

        let outcome = engine.execute("안녕하세요", &state).await;

        assert_eq!(outcome.action, TurnAction::Error);
        assert_eq!(outcome.update, StateUpdate::none());
    }

    #[tokio::test]
    async fn test_book_to_author_surfaces_extracted_author() {
        let model = MockLanguageModel::new()
            // first call: intent classification (malformed -> keyword rules)
            .with_response("말로 된 답변")
            // second call: author extraction from the work page
            .with_response(r#"{"author": "베르나르 베르베르", "found": true}"#);
        let engine = engine(
            MockKnowledgeSource::new().with_page("개미 (소설)", ant_novel_page()),
            model,
        );
        let state = ConversationState::new();

        let outcome = engine.execute("개미 작가 누구야", &state).await;

        assert_eq!(outcome.action, TurnAction::ShowResult);
        assert!(outcome.message.contains("베르나르 베르베르"));
        // the work's summary is surfaced alongside
        assert!(outcome.message.contains("개미"));
    }

    #[tokio::test]
    async fn test_book_to_author_without_author_still_shows_summary() {
        let page = Page::new(
            "어느 소설",
            "어느 소설은 장편 소설이다.",
            "줄거리만 적혀 있다.",
            "https://example.org/어느_소설",
        );
        let engine = engine(
            MockKnowledgeSource::new().with_page("어느 소설", page),
            MockLanguageModel::failing(),
        );
        let state = ConversationState::new();

        let outcome = engine.execute("어느 소설 쓴 사람 누구야", &state).await;

        assert_eq!(outcome.action, TurnAction::ShowResult);
        assert!(outcome.message.contains("어느 소설"));
    }

    #[tokio::test]
    async fn test_clarification_reply_resolves_author() {
        let engine = engine(
            MockKnowledgeSource::new().with_page("채식주의자", Page::new(
                "채식주의자",
                "채식주의자는 한강의 소설이다.",
                "2007년 출간되었다.",
                "https://ko.wikipedia.org/wiki/채식주의자",
            )),
            MockLanguageModel::failing(),
        );
        let mut state = ConversationState::new();
        state.apply(&StateUpdate::awaiting("한강"));

        let outcome = engine.execute("채식주의자", &state).await;

        assert_eq!(outcome.action, TurnAction::ShowResult);
        assert_eq!(outcome.update.awaiting_clarification, Some(false));
        assert_eq!(
            outcome.update.current_subject,
            Some(Some("한강".to_string()))
        );
    }

    #[tokio::test]
    async fn test_clarification_new_query_resets_conversation() {
        let engine = engine(
            MockKnowledgeSource::new().with_page("김영하 (작가)", Page::new(
                "김영하 (작가)",
                "김영하는 대한민국의 소설가이다.",
                "1968년에 태어났다.",
                "https://ko.wikipedia.org/wiki/김영하_(작가)",
            )),
            MockLanguageModel::failing(),
        );
        let mut state = ConversationState::new();
        state.apply(&StateUpdate::awaiting("한강"));

        let outcome = engine.execute("김영하 작가 알려줘", &state).await;

        assert!(outcome.update.reset_conversation);
        assert_eq!(outcome.action, TurnAction::ShowResult);
        assert!(outcome.message.contains("김영하"));
    }

    #[tokio::test]
    async fn test_clarification_miss_keeps_waiting() {
        let engine = engine(MockKnowledgeSource::new(), MockLanguageModel::failing());
        let mut state = ConversationState::new();
        state.apply(&StateUpdate::awaiting("한강"));

        let outcome = engine.execute("흰", &state).await;

        assert_eq!(outcome.action, TurnAction::AskClarification);
        assert_eq!(outcome.update.awaiting_clarification, Some(true));
        assert_eq!(
            outcome.update.current_subject,
            Some(Some("한강".to_string()))
        );
    }

    #[tokio::test]
    async fn test_compound_query_reports_both_subjects() {
        let engine = engine(
            MockKnowledgeSource::new()
                .with_page("김영하 (작가)", Page::new(
                    "김영하 (작가)",
                    "김영하는 대한민국의 소설가이다.",
                    "1968년에 태어났다.",
                    "https://ko.wikipedia.org/wiki/김영하_(작가)",
                ))
                .with_page("한강 (작가)", hangang_page()),
            MockLanguageModel::failing(),
        );
        let state = ConversationState::new();

        let outcome = engine.execute("김영하와 한강에 대해 알려줘", &state).await;

        assert_eq!(outcome.action, TurnAction::ShowResult);
        assert!(outcome.message.contains("김영하"));
        assert!(outcome.message.contains("한강"));
    }

    #[tokio::test]
    async fn test_compound_partial_failure_is_inline() {
        let engine = engine(
            MockKnowledgeSource::new().with_page("한강 (작가)", hangang_page()),
            MockLanguageModel::failing(),
        );
        let state = ConversationState::new();

        let outcome = engine
            .execute("김모모와 한강에 대해 알려줘", &state)
            .await;

        assert_eq!(outcome.action, TurnAction::ShowResult);
        assert!(outcome.message.contains("찾을 수 없습니다"));
        assert!(outcome.message.contains("소설가"));
    }

    #[tokio::test]
    async fn test_empty_utterance_is_error() {
        let engine = engine(MockKnowledgeSource::new(), MockLanguageModel::failing());
        let state = ConversationState::new();

        let outcome = engine.execute("   ", &state).await;

        assert_eq!(outcome.action, TurnAction::Error);
    }

    #[tokio::test]
    async fn test_field_question_on_fresh_search() {
        let engine = engine(
            MockKnowledgeSource::new().with_page("한강 (작가)", hangang_page()),
            MockLanguageModel::failing(),
        );
        let state = ConversationState::new();

        let outcome = engine.execute("한강 대학 어디 나왔어", &state).await;

        assert_eq!(outcome.action, TurnAction::ShowResult);
        assert!(outcome.message.contains("연세대학교"));
    }
}
