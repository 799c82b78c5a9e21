//! Attribute extraction - pulling a specific fact out of page prose.
//!
//! Every field follows the same discipline: ask the language model for a
//! strict JSON payload first, accept it only when `found` is true and the
//! value is non-empty, and otherwise run the deterministic pattern pass.
//! Transport failures, malformed payloads and `found: false` are all the
//! same condition. With no model available the routines are pure functions
//! of the page text.

pub mod family;
pub mod patterns;

pub use family::{FamilyInfo, Sibling, UnknownParent};

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::debug;

use crate::domain::intent::SpecificField;
use crate::domain::respond::{clickable_url, object_particle, topic_particle};
use crate::ports::{LanguageModel, Page};

const UNIVERSITY_PROMPT: &str = "텍스트에서 인물이 졸업·진학·입학한 대학교를 찾아 JSON으로만 응답하세요. 교수로 재직하는 대학은 제외합니다.\n{\"university\": \"대학교명\", \"found\": true/false}";
const SCHOOL_PROMPT: &str = "텍스트에서 인물이 다닌 고등학교/중학교/초등학교를 찾아 JSON으로만 응답하세요.\n{\"school\": \"학교명\", \"found\": true/false}";
const BIRTH_PROMPT: &str = "텍스트에서 인물의 출생 정보를 찾아 JSON으로만 응답하세요. 날짜는 원문 그대로 적으세요.\n{\"birth_date\": \"출생일\", \"found\": true/false}";
const DEATH_PROMPT: &str = "텍스트에서 인물의 사망 정보를 찾아 JSON으로만 응답하세요. 날짜는 원문 그대로 적으세요.\n{\"death_date\": \"사망일\", \"found\": true/false}";
const WORKS_PROMPT: &str = "텍스트에서 작가의 주요 작품을 찾아 JSON으로만 응답하세요. 《》 따옴표는 제거하고 중복 없이 최대 6개까지.\n{\"works\": [\"작품명\"], \"found\": true/false}";
const AWARDS_PROMPT: &str = "텍스트에서 수상 내역을 찾아 JSON으로만 응답하세요. 연도가 있으면 포함해 중복 없이 최대 7개까지.\n{\"awards\": [\"수상명\"], \"found\": true/false}";
const SPOUSE_PROMPT: &str = "텍스트에서 인물의 배우자 이름을 찾아 JSON으로만 응답하세요.\n{\"spouse\": \"이름\", \"found\": true/false}";
const WORK_AUTHOR_PROMPT: &str = "텍스트에서 이 작품의 원작자(글을 쓴 작가)를 찾아 JSON으로만 응답하세요. 옮긴이/번역가는 절대 작가로 답하지 마세요.\n{\"author\": \"작가명\", \"found\": true/false}";

#[derive(Debug, Deserialize)]
struct UniversityPayload {
    #[serde(default)]
    university: Option<String>,
    #[serde(default)]
    found: bool,
}

#[derive(Debug, Deserialize)]
struct SchoolPayload {
    #[serde(default)]
    school: Option<String>,
    #[serde(default)]
    found: bool,
}

#[derive(Debug, Deserialize)]
struct BirthPayload {
    #[serde(default)]
    birth_date: Option<String>,
    #[serde(default)]
    found: bool,
}

#[derive(Debug, Deserialize)]
struct DeathPayload {
    #[serde(default)]
    death_date: Option<String>,
    #[serde(default)]
    found: bool,
}

#[derive(Debug, Deserialize)]
struct WorksPayload {
    #[serde(default)]
    works: Vec<String>,
    #[serde(default)]
    found: bool,
}

#[derive(Debug, Deserialize)]
struct AwardsPayload {
    #[serde(default)]
    awards: Vec<String>,
    #[serde(default)]
    found: bool,
}

#[derive(Debug, Deserialize)]
struct SpousePayload {
    #[serde(default)]
    spouse: Option<String>,
    #[serde(default)]
    found: bool,
}

#[derive(Debug, Deserialize)]
struct WorkAuthorPayload {
    #[serde(default)]
    author: Option<String>,
    #[serde(default)]
    found: bool,
}

/// Extracts a specific attribute from a page and composes the answer
/// sentence for it.
pub struct AttributeExtractor {
    model: Arc<dyn LanguageModel>,
}

impl AttributeExtractor {
    /// Creates an extractor over a language model port.
    pub fn new(model: Arc<dyn LanguageModel>) -> Self {
        Self { model }
    }

    /// Extracts `field` for `subject` from `page`, always producing a
    /// user-facing sentence (not-found wordings carry the page link).
    pub async fn extract(&self, field: SpecificField, page: &Page, subject: &str) -> String {
        let text = page.full_text();
        match field {
            SpecificField::Birth => self.birth_answer(&text, page, subject).await,
            SpecificField::Death => self.death_answer(&text, page, subject).await,
            SpecificField::BirthAndDeath => self.birth_death_answer(&text, page, subject).await,
            SpecificField::School => self.school_answer(&text, page, subject).await,
            SpecificField::University => self.university_answer(&text, page, subject).await,
            SpecificField::Works => self.works_answer(&text, page, subject).await,
            SpecificField::Awards => self.awards_answer(&text, page, subject).await,
            SpecificField::Father => self.father_answer(&text, page, subject).await,
            SpecificField::Mother => self.mother_answer(&text, page, subject).await,
            SpecificField::Spouse => self.spouse_answer(&text, page, subject).await,
            SpecificField::Family => self.family_answer(&text, page, subject).await,
        }
    }

    /// Extracts the original author named on a work page. Translators are
    /// never returned.
    pub async fn extract_original_author(&self, page: &Page) -> Option<String> {
        let text = page.full_text();
        if let Some(payload) = self
            .structured::<WorkAuthorPayload>(WORK_AUTHOR_PROMPT, &text, 1500)
            .await
        {
            if payload.found {
                if let Some(author) = non_empty(payload.author) {
                    return Some(author);
                }
            }
        }
        patterns::find_original_author(&text)
    }

    async fn structured<T: DeserializeOwned>(
        &self,
        system: &str,
        content: &str,
        take: usize,
    ) -> Option<T> {
        let excerpt: String = content.chars().take(take).collect();
        match self.model.complete(system, &format!("텍스트: {excerpt}")).await {
            Ok(raw) => match serde_json::from_str::<T>(raw.trim()) {
                Ok(payload) => Some(payload),
                Err(err) => {
                    debug!(error = %err, "extraction payload unparseable");
                    None
                }
            },
            Err(err) => {
                debug!(error = %err, "extraction completion failed");
                None
            }
        }
    }

    async fn birth_value(&self, text: &str) -> Option<String> {
        if let Some(payload) = self.structured::<BirthPayload>(BIRTH_PROMPT, text, 2000).await {
            if payload.found {
                if let Some(date) = non_empty(payload.birth_date) {
                    return Some(date);
                }
            }
        }
        patterns::find_birth(text)
    }

    async fn death_value(&self, text: &str) -> Option<String> {
        if let Some(payload) = self.structured::<DeathPayload>(DEATH_PROMPT, text, 2000).await {
            if payload.found {
                if let Some(date) = non_empty(payload.death_date) {
                    return Some(date);
                }
            }
        }
        patterns::find_death(text)
    }

    async fn birth_answer(&self, text: &str, page: &Page, subject: &str) -> String {
        match self.birth_value(text).await {
            Some(date) => format!(
                "{subject}{} {date}에 태어났습니다.\n\n**상세 정보**: {}",
                topic_particle(subject),
                clickable_url(&page.url)
            ),
            None => not_found(subject, "출생 정보", page),
        }
    }

    async fn death_answer(&self, text: &str, page: &Page, subject: &str) -> String {
        match self.death_value(text).await {
            Some(date) => format!(
                "{subject}{} {date}에 사망했습니다.\n\n**상세 정보**: {}",
                topic_particle(subject),
                clickable_url(&page.url)
            ),
            None => not_found(subject, "사망 정보", page),
        }
    }

    async fn birth_death_answer(&self, text: &str, page: &Page, subject: &str) -> String {
        let birth = self.birth_value(text).await;
        let death = self.death_value(text).await;
        match (birth, death) {
            (Some(b), Some(d)) => format!(
                "{subject}{} {b}에 태어나 {d}에 사망했습니다.\n\n**상세 정보**: {}",
                topic_particle(subject),
                clickable_url(&page.url)
            ),
            (Some(b), None) => format!(
                "{subject}{} {b}에 태어났습니다. 사망 정보는 찾을 수 없습니다.\n\n**상세 정보**: {}",
                topic_particle(subject),
                clickable_url(&page.url)
            ),
            (None, Some(d)) => format!(
                "{subject}{} {d}에 사망했습니다. 출생 정보는 찾을 수 없습니다.\n\n**상세 정보**: {}",
                topic_particle(subject),
                clickable_url(&page.url)
            ),
            (None, None) => not_found(subject, "출생·사망 정보", page),
        }
    }

    async fn school_value(&self, text: &str) -> Option<String> {
        if let Some(payload) = self.structured::<SchoolPayload>(SCHOOL_PROMPT, text, 1200).await {
            if payload.found {
                if let Some(school) = non_empty(payload.school) {
                    return Some(school);
                }
            }
        }
        patterns::find_school(text)
    }

    async fn school_answer(&self, text: &str, page: &Page, subject: &str) -> String {
        match self.school_value(text).await {
            Some(school) => {
                let action = school_action(text);
                format!(
                    "{subject}{} {school}{} {action}.\n\n**상세 정보**: {}",
                    topic_particle(subject),
                    object_particle(&school),
                    clickable_url(&page.url)
                )
            }
            None => format!(
                "{subject}의 고등학교 정보는 확인할 수 없습니다.\n\n혹시 다른 학력 정보가 궁금하시면 '대학교'나 '학력'으로 질문해보세요.\n\n**전체 정보**: {}",
                clickable_url(&page.url)
            ),
        }
    }

    async fn university_answer(&self, text: &str, page: &Page, subject: &str) -> String {
        let university = {
            if let Some(payload) = self
                .structured::<UniversityPayload>(UNIVERSITY_PROMPT, text, 1200)
                .await
            {
                if payload.found {
                    non_empty(payload.university)
                } else {
                    None
                }
            } else {
                None
            }
        }
        .or_else(|| patterns::find_university(text));

        if let Some(university) = university {
            let action = if text.contains("졸업") {
                "졸업했습니다"
            } else {
                "다녔습니다"
            };
            return format!(
                "{subject}{} {university}{} {action}.\n\n**상세 정보**: {}",
                topic_particle(subject),
                object_particle(&university),
                clickable_url(&page.url)
            );
        }

        // No university on the page: the school becomes the final education.
        match self.school_value(text).await {
            Some(school) => format!(
                "{subject}{} {school}{} 졸업했습니다 (최종학력).\n\n**상세 정보**: {}",
                topic_particle(subject),
                object_particle(&school),
                clickable_url(&page.url)
            ),
            None => format!(
                "{subject}의 대학교 정보는 확인할 수 없습니다.\n\n혹시 다른 학력 정보가 궁금하시면 '고등학교'로 질문해보세요.\n\n**전체 정보**: {}",
                clickable_url(&page.url)
            ),
        }
    }

    async fn works_answer(&self, text: &str, page: &Page, subject: &str) -> String {
        let works = {
            if let Some(payload) = self.structured::<WorksPayload>(WORKS_PROMPT, text, 1500).await {
                if payload.found && !payload.works.is_empty() {
                    dedup_capped(payload.works, patterns::WORKS_LIMIT)
                } else {
                    Vec::new()
                }
            } else {
                Vec::new()
            }
        };
        let works = if works.is_empty() {
            patterns::find_works(text)
        } else {
            works
        };

        if works.is_empty() {
            return not_found(subject, "작품 정보", page);
        }
        let list = works
            .iter()
            .map(|w| format!("- {w}"))
            .collect::<Vec<_>>()
            .join("\n");
        format!(
            "{subject}의 주요 작품:\n{list}\n\n**상세 정보**: {}",
            clickable_url(&page.url)
        )
    }

    async fn awards_answer(&self, text: &str, page: &Page, subject: &str) -> String {
        let awards = {
            if let Some(payload) = self.structured::<AwardsPayload>(AWARDS_PROMPT, text, 1500).await
            {
                if payload.found && !payload.awards.is_empty() {
                    dedup_capped(payload.awards, patterns::AWARDS_LIMIT)
                } else {
                    Vec::new()
                }
            } else {
                Vec::new()
            }
        };
        let awards = if awards.is_empty() {
            patterns::find_awards(text)
        } else {
            awards
        };

        if awards.is_empty() {
            return not_found(subject, "수상 정보", page);
        }
        let list = awards
            .iter()
            .map(|a| format!("- {a}"))
            .collect::<Vec<_>>()
            .join("\n");
        format!(
            "{subject}의 주요 수상 내역:\n{list}\n\n**상세 정보**: {}",
            clickable_url(&page.url)
        )
    }

    async fn father_answer(&self, text: &str, page: &Page, subject: &str) -> String {
        let info = family::find_family_enhanced(self.model.as_ref(), text).await;
        match info.father {
            Some(father) => format!(
                "{subject}의 아버지는 {father}입니다.\n\n**상세 정보**: {}",
                clickable_url(&page.url)
            ),
            None => not_found(subject, "아버지 정보", page),
        }
    }

    async fn mother_answer(&self, text: &str, page: &Page, subject: &str) -> String {
        let info = family::find_family_enhanced(self.model.as_ref(), text).await;
        match info.mother {
            Some(mother) => format!(
                "{subject}의 어머니는 {mother}입니다.\n\n**상세 정보**: {}",
                clickable_url(&page.url)
            ),
            None => not_found(subject, "어머니 정보", page),
        }
    }

    async fn spouse_answer(&self, text: &str, page: &Page, subject: &str) -> String {
        let spouse = {
            if let Some(payload) = self.structured::<SpousePayload>(SPOUSE_PROMPT, text, 1500).await
            {
                if payload.found {
                    non_empty(payload.spouse)
                } else {
                    None
                }
            } else {
                None
            }
        }
        .or_else(|| patterns::find_spouse(text));

        match spouse {
            Some(spouse) => format!(
                "{subject}의 배우자는 {spouse}입니다.\n\n**상세 정보**: {}",
                clickable_url(&page.url)
            ),
            None => not_found(subject, "배우자 정보", page),
        }
    }

    async fn family_answer(&self, text: &str, page: &Page, subject: &str) -> String {
        let info = family::find_family_enhanced(self.model.as_ref(), text).await;
        if info.is_empty() {
            return not_found(subject, "가족 정보", page);
        }

        let mut lines = vec![format!("**{subject}의 가족 정보**")];
        if let Some(father) = &info.father {
            lines.push(format!("- 아버지: {father}"));
        }
        if let Some(mother) = &info.mother {
            lines.push(format!("- 어머니: {mother}"));
        }
        for sibling in &info.siblings {
            lines.push(format!("- 형제자매: {} ({})", sibling.name, sibling.relation));
        }
        for parent in &info.unknown_parents {
            lines.push(format!("- 부모 (성별 미상): {} ({})", parent.name, parent.detail));
        }
        format!(
            "{}\n\n**상세 정보**: {}",
            lines.join("\n"),
            clickable_url(&page.url)
        )
    }
}

/// Verb choice mirrors what the page says about the schooling.
fn school_action(text: &str) -> &'static str {
    if text.contains("졸업") {
        "졸업했습니다"
    } else if text.contains("입학") {
        "다녔습니다"
    } else {
        "출신입니다"
    }
}

fn not_found(subject: &str, what: &str, page: &Page) -> String {
    format!(
        "{subject}의 {what}를 찾을 수 없습니다.\n\n**전체 정보**: {}",
        clickable_url(&page.url)
    )
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn dedup_capped(items: Vec<String>, cap: usize) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for item in items {
        let item = item.trim().to_string();
        if !item.is_empty() && !out.contains(&item) {
            out.push(item);
            if out.len() >= cap {
                break;
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::ai::MockLanguageModel;

    fn sample_page() -> Page {
        Page::new(
            "한강 (작가)",
            "한강은 대한민국의 소설가이다.",
            "한강은 1970년 11월 27일 광주광역시에서 태어났다. 연세대학교 국어국문학과를 졸업했다. 아버지는 소설가 한승원이다. 대표작으로는 《채식주의자》, 《소년이 온다》 등이 있다. 2016년 맨부커상을 수상했다.",
            "https://ko.wikipedia.org/wiki/한강_(작가)",
        )
    }

    fn extractor(model: MockLanguageModel) -> AttributeExtractor {
        AttributeExtractor::new(Arc::new(model))
    }

    #[tokio::test]
    async fn test_birth_via_model_payload() {
        let ex = extractor(
            MockLanguageModel::new()
                .with_response(r#"{"birth_date": "1970년 11월 27일", "found": true}"#),
        );

        let answer = ex.extract(SpecificField::Birth, &sample_page(), "한강").await;

        assert!(answer.contains("1970년 11월 27일"));
        assert!(answer.contains("태어났습니다"));
    }

    #[tokio::test]
    async fn test_birth_falls_back_on_model_failure() {
        let ex = extractor(MockLanguageModel::failing());

        let answer = ex.extract(SpecificField::Birth, &sample_page(), "한강").await;

        assert!(answer.contains("1970"));
        assert!(answer.contains("태어났습니다"));
    }

    #[tokio::test]
    async fn test_found_false_triggers_fallback() {
        let ex = extractor(
            MockLanguageModel::new().with_response(r#"{"birth_date": null, "found": false}"#),
        );

        let answer = ex.extract(SpecificField::Birth, &sample_page(), "한강").await;

        assert!(answer.contains("1970"));
    }

    #[tokio::test]
    async fn test_university_answer_mentions_graduation() {
        let ex = extractor(MockLanguageModel::failing());

        let answer = ex
            .extract(SpecificField::University, &sample_page(), "한강")
            .await;

        assert!(answer.contains("연세대학교"));
        assert!(answer.contains("졸업"));
        assert!(answer.contains("http"));
    }

    #[tokio::test]
    async fn test_works_list_capped_and_formatted() {
        let ex = extractor(MockLanguageModel::failing());

        let answer = ex.extract(SpecificField::Works, &sample_page(), "한강").await;

        assert!(answer.contains("채식주의자"));
        assert!(answer.contains("- "));
        assert!(answer.contains("주요 작품"));
    }

    #[tokio::test]
    async fn test_awards_answer() {
        let ex = extractor(MockLanguageModel::failing());

        let answer = ex.extract(SpecificField::Awards, &sample_page(), "한강").await;

        assert!(answer.contains("맨부커상"));
    }

    #[tokio::test]
    async fn test_family_answer_contains_father() {
        // Two model calls happen (family pipeline), both fail -> pattern pass.
        let ex = extractor(MockLanguageModel::failing());

        let answer = ex.extract(SpecificField::Family, &sample_page(), "한강").await;

        assert!(answer.contains("한승원"));
        assert!(answer.contains("아버지"));
    }

    #[tokio::test]
    async fn test_death_not_found_carries_link() {
        let ex = extractor(MockLanguageModel::failing());

        let answer = ex.extract(SpecificField::Death, &sample_page(), "한강").await;

        assert!(answer.contains("찾을 수 없습니다"));
        assert!(answer.contains("http"));
    }

    #[tokio::test]
    async fn test_birth_and_death_partial_result() {
        let ex = extractor(MockLanguageModel::failing());

        let answer = ex
            .extract(SpecificField::BirthAndDeath, &sample_page(), "한강")
            .await;

        assert!(answer.contains("1970"));
        assert!(answer.contains("사망 정보는 찾을 수 없습니다"));
    }

    #[tokio::test]
    async fn test_deterministic_extraction_idempotent() {
        let ex = extractor(MockLanguageModel::failing());
        let page = sample_page();

        let first = ex.extract(SpecificField::University, &page, "한강").await;
        let second = ex.extract(SpecificField::University, &page, "한강").await;

        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_original_author_via_model() {
        let page = Page::new(
            "개미 (소설)",
            "개미는 베르나르 베르베르의 소설이다.",
            "이 소설은 1991년에 발표되었다.",
            "https://ko.wikipedia.org/wiki/개미_(소설)",
        );
        let ex = extractor(
            MockLanguageModel::new().with_response(r#"{"author": "베르나르 베르베르", "found": true}"#),
        );

        let author = ex.extract_original_author(&page).await;

        assert_eq!(author.as_deref(), Some("베르나르 베르베르"));
    }

    #[tokio::test]
    async fn test_original_author_fallback_pattern() {
        let page = Page::new(
            "개미 (소설)",
            "개미는 베르나르 베르베르의 소설이다.",
            "옮긴이는 이세욱이다.",
            "https://ko.wikipedia.org/wiki/개미_(소설)",
        );
        let ex = extractor(MockLanguageModel::failing());

        let author = ex.extract_original_author(&page).await;

        assert_eq!(author.as_deref(), Some("베르나르 베르베르"));
    }
}
