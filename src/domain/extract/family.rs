//! Family extraction - the most intricate routine, with a fixed
//! conflict-resolution order.
//!
//! 1. Deterministic parent pass: "아버지 X와 어머니 Y 사이에서 태어났다"
//!    sentences and explicit 아버지/어머니 markers fill the gendered slots;
//!    birth-order child terms ("X의 차녀") assign X as father; a bare
//!    "X의 아들/딸" leaves X's gender indeterminate and records an
//!    unknown-gender parent - never guessed into a gendered slot.
//! 2. Sibling pass: "X의 동생/형/언니" phrasing records siblings, which are
//!    then excluded from parent candidacy.
//! 3. Language-model pass: a confidently returned father/mother overrides
//!    the same slot from the deterministic pass; sibling and unknown-parent
//!    entries are kept as-is.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::ports::LanguageModel;

use super::patterns::trim_name;

/// A sibling relation found in the text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sibling {
    /// The sibling's name.
    pub name: String,
    /// The relation label as written (동생, 언니, ...).
    pub relation: String,
}

/// A parent whose gender the text does not determine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnknownParent {
    /// The parent's name.
    pub name: String,
    /// The phrase that named them ("X의 아들").
    pub detail: String,
}

/// Extracted family relations.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FamilyInfo {
    /// Father, when the text names one with known gender.
    pub father: Option<String>,
    /// Mother, when the text names one with known gender.
    pub mother: Option<String>,
    /// Siblings in first-seen order.
    pub siblings: Vec<Sibling>,
    /// Parents of indeterminate gender.
    pub unknown_parents: Vec<UnknownParent>,
}

impl FamilyInfo {
    /// True when nothing at all was found.
    pub fn is_empty(&self) -> bool {
        self.father.is_none()
            && self.mother.is_none()
            && self.siblings.is_empty()
            && self.unknown_parents.is_empty()
    }
}

static BIRTH_BETWEEN_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"아버지[는은이가]?\s*(?:소설가|시인|작가|만화가)?\s*([가-힣]{2,4})\s*[과와]\s*어머니[는은이가]?\s*(?:소설가|시인|작가|만화가)?\s*([가-힣]{2,4})\s*사이에서",
    )
    .expect("valid regex")
});

static FATHER_MARKER_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?:아버지|부친)[는은이가]?\s*(?:소설가|시인|작가|만화가)?\s*([가-힣]{2,4})")
        .expect("valid regex")
});

static MOTHER_MARKER_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?:어머니|모친)[는은이가]?\s*(?:소설가|시인|작가|만화가)?\s*([가-힣]{2,4})")
        .expect("valid regex")
});

// Birth-order child terms conventionally reference the father in
// biographical prose; bare 아들/딸 does not determine the parent's gender.
static ORDERED_CHILD_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"([가-힣]{2,4}(?:\s[가-힣]{2,4})?)의\s*(장녀|차녀|삼녀|장남|차남|삼남)")
        .expect("valid regex")
});

static BARE_CHILD_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"([가-힣]{2,4}(?:\s[가-힣]{2,4})?)의\s*(아들|딸)").expect("valid regex")
});

static SIBLING_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"([가-힣]{2,4}(?:\s[가-힣]{2,4})?)의\s*(동생|언니|오빠|누나|형)")
        .expect("valid regex")
});

const FAMILY_SYSTEM_PROMPT: &str = "\
주어진 텍스트에서 인물의 부모 정보를 추출해 JSON으로만 응답하세요.\n\
{\"father\": \"아버지 이름\" | null, \"mother\": \"어머니 이름\" | null, \"found\": true/false}\n\
규칙: '아버지'/'어머니'로 명시된 경우만 해당 칸에 넣으세요. \
'X의 아들', 'X의 딸'처럼 성별이 불분명한 부모는 넣지 마세요. 정보가 없으면 found: false.";

#[derive(Debug, Deserialize)]
struct FamilyPayload {
    #[serde(default)]
    father: Option<String>,
    #[serde(default)]
    mother: Option<String>,
    #[serde(default)]
    found: bool,
}

/// Occupation nouns that prose glues onto a name ("소설가 한승원").
const OCCUPATION_PREFIXES: &[&str] = &["소설가", "시인", "작가", "만화가", "극작가", "수필가"];

/// Drops leading occupation nouns from a captured name.
fn clean_person(name: &str) -> String {
    name.split_whitespace()
        .skip_while(|t| OCCUPATION_PREFIXES.contains(t))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Runs the deterministic passes only (stages 1 and 2).
pub fn find_family(text: &str) -> FamilyInfo {
    let mut info = FamilyInfo::default();

    // Stage 1a: "아버지 X와 어머니 Y 사이에서" fills both slots at once.
    if let Some(caps) = BIRTH_BETWEEN_PATTERN.captures(text) {
        info.father = caps.get(1).map(|g| trim_name(g.as_str()).to_string());
        info.mother = caps.get(2).map(|g| trim_name(g.as_str()).to_string());
    }

    // Stage 1b: explicit lexical markers.
    if info.father.is_none() {
        if let Some(caps) = FATHER_MARKER_PATTERN.captures(text) {
            info.father = caps.get(1).map(|g| trim_name(g.as_str()).to_string());
        }
    }
    if info.mother.is_none() {
        if let Some(caps) = MOTHER_MARKER_PATTERN.captures(text) {
            info.mother = caps.get(1).map(|g| trim_name(g.as_str()).to_string());
        }
    }

    // Stage 1c: birth-order child terms name the father.
    if info.father.is_none() {
        if let Some(caps) = ORDERED_CHILD_PATTERN.captures(text) {
            info.father = caps.get(1).map(|g| clean_person(g.as_str().trim()));
        }
    }

    // Stage 1d: bare son/daughter phrasing - parent gender indeterminate.
    for caps in BARE_CHILD_PATTERN.captures_iter(text) {
        let (Some(name), Some(relation)) = (caps.get(1), caps.get(2)) else {
            continue;
        };
        let name = clean_person(name.as_str().trim());
        if name.is_empty()
            || Some(&name) == info.father.as_ref()
            || Some(&name) == info.mother.as_ref()
        {
            continue;
        }
        if info.unknown_parents.iter().any(|p| p.name == name) {
            continue;
        }
        let detail = format!("{name}의 {}", relation.as_str());
        info.unknown_parents.push(UnknownParent { name, detail });
    }

    // Stage 2: siblings, excluded from parent candidacy.
    for caps in SIBLING_PATTERN.captures_iter(text) {
        let (Some(name), Some(relation)) = (caps.get(1), caps.get(2)) else {
            continue;
        };
        let name = clean_person(name.as_str().trim());
        if name.is_empty() || info.siblings.iter().any(|s| s.name == name) {
            continue;
        }
        info.siblings.push(Sibling {
            name,
            relation: relation.as_str().to_string(),
        });
    }

    let sibling_names: Vec<String> = info.siblings.iter().map(|s| s.name.clone()).collect();
    if let Some(father) = &info.father {
        if sibling_names.contains(father) {
            info.father = None;
        }
    }
    if let Some(mother) = &info.mother {
        if sibling_names.contains(mother) {
            info.mother = None;
        }
    }
    info.unknown_parents
        .retain(|p| !sibling_names.contains(&p.name));

    info
}

/// Runs the full pipeline: deterministic passes, then the language-model
/// pass whose father/mother may override the deterministic slots.
pub async fn find_family_enhanced(model: &dyn LanguageModel, text: &str) -> FamilyInfo {
    let mut info = find_family(text);

    let excerpt: String = text.chars().take(1500).collect();
    match model.complete(FAMILY_SYSTEM_PROMPT, &format!("텍스트: {excerpt}")).await {
        Ok(raw) => match serde_json::from_str::<FamilyPayload>(raw.trim()) {
            Ok(payload) if payload.found => {
                // The model is judged more context-aware for the gendered
                // slots only.
                if let Some(father) = payload.father.filter(|f| !f.trim().is_empty()) {
                    info.father = Some(father.trim().to_string());
                }
                if let Some(mother) = payload.mother.filter(|m| !m.trim().is_empty()) {
                    info.mother = Some(mother.trim().to_string());
                }
            }
            Ok(_) => {}
            Err(err) => {
                debug!(error = %err, "family payload unparseable, keeping deterministic result");
            }
        },
        Err(err) => {
            debug!(error = %err, "family completion unavailable, keeping deterministic result");
        }
    }

    info
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::ai::MockLanguageModel;

    #[test]
    fn test_birth_between_sentence_fills_both_slots() {
        let text = "김영하는 아버지 김철수와 어머니 이영희 사이에서 태어났다.";
        let info = find_family(text);
        assert_eq!(info.father.as_deref(), Some("김철수"));
        assert_eq!(info.mother.as_deref(), Some("이영희"));
    }

    #[test]
    fn test_hangang_family_sentence() {
        let text = "아버지 한승원과 어머니 임금순 사이에서 태어났다.";
        let info = find_family(text);
        assert_eq!(info.father.as_deref(), Some("한승원"));
        assert_eq!(info.mother.as_deref(), Some("임금순"));
    }

    #[test]
    fn test_ordered_child_term_names_father_and_sibling_excluded() {
        let text = "요시모토 바나나는 요시모토 다카아키의 차녀이자 만화가인 하루노 요이코의 동생이다.";
        let info = find_family(text);

        assert_eq!(info.father.as_deref(), Some("요시모토 다카아키"));
        let sibling_names: Vec<&str> = info.siblings.iter().map(|s| s.name.as_str()).collect();
        assert!(sibling_names.contains(&"하루노 요이코"));
        // the sibling never lands in a parent slot
        assert_ne!(info.mother.as_deref(), Some("하루노 요이코"));
        assert!(info.unknown_parents.iter().all(|p| p.name != "하루노 요이코"));
    }

    #[test]
    fn test_bare_son_phrasing_is_unknown_gender() {
        let text = "소설가 한승원의 아들로 태어났다.";
        let info = find_family(text);

        assert_eq!(info.father, None);
        assert_eq!(info.mother, None);
        assert_eq!(info.unknown_parents.len(), 1);
        assert_eq!(info.unknown_parents[0].name, "한승원");
        assert_eq!(info.unknown_parents[0].detail, "한승원의 아들");
    }

    #[test]
    fn test_explicit_marker_pass() {
        let text = "그의 아버지는 한승원이었고, 어머니는 임금순이었다.";
        let info = find_family(text);
        assert_eq!(info.father.as_deref(), Some("한승원"));
        assert_eq!(info.mother.as_deref(), Some("임금순"));
    }

    #[test]
    fn test_nothing_found_is_empty() {
        let info = find_family("그는 어린 시절부터 책을 좋아했다.");
        assert!(info.is_empty());
    }

    #[test]
    fn test_deterministic_pass_is_idempotent() {
        let text = "아버지 한승원과 어머니 임금순 사이에서 태어났다.";
        assert_eq!(find_family(text), find_family(text));
    }

    #[tokio::test]
    async fn test_model_overrides_gendered_slots_only() {
        let text = "아버지 한승원과 어머니 임금순 사이에서 태어났다. 하루노 요이코의 동생이다.";
        let model = MockLanguageModel::new().with_response(
            r#"{"father": "한승원", "mother": "임금순 여사", "found": true}"#,
        );

        let info = find_family_enhanced(&model, text).await;

        assert_eq!(info.mother.as_deref(), Some("임금순 여사"));
        // deterministic sibling entries survive the override
        assert_eq!(info.siblings.len(), 1);
    }

    #[tokio::test]
    async fn test_model_failure_keeps_deterministic_result() {
        let text = "아버지 한승원과 어머니 임금순 사이에서 태어났다.";
        let model = MockLanguageModel::failing();

        let info = find_family_enhanced(&model, text).await;

        assert_eq!(info.father.as_deref(), Some("한승원"));
        assert_eq!(info.mother.as_deref(), Some("임금순"));
    }

    #[tokio::test]
    async fn test_model_not_found_keeps_deterministic_result() {
        let text = "소설가 한승원의 아들로 태어났다.";
        let model = MockLanguageModel::new()
            .with_response(r#"{"father": null, "mother": null, "found": false}"#);

        let info = find_family_enhanced(&model, text).await;

        assert!(info.father.is_none());
        assert_eq!(info.unknown_parents.len(), 1);
    }
}
