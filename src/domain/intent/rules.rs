//! Keyword rule tables for intent and field detection.
//!
//! Ordering-sensitive behavior lives here as data: rules are scanned top to
//! bottom and the first hit wins. School terms come before university
//! terms, death terms before birth terms, so "언제 태어나서 언제 죽었어"
//! resolves to the combined field and "언제 죽었어" never misreads as a
//! birth question.

use once_cell::sync::Lazy;
use regex::Regex;

use super::SpecificField;

/// Birth-related keywords (also used by the combined birth+death rule).
pub const BIRTH_TERMS: &[&str] = &["태어", "출생", "나이", "몇살", "생일"];

/// Death-related keywords.
pub const DEATH_TERMS: &[&str] = &["죽었", "사망", "별세", "타계"];

/// Priority-ordered field rules scanned after the combined birth+death
/// check. First matching bucket wins.
const FIELD_RULES: &[(&[&str], SpecificField)] = &[
    (DEATH_TERMS, SpecificField::Death),
    (
        &["고등학교", "고교", "중학교", "초등학교"],
        SpecificField::School,
    ),
    (
        &["대학", "대학교", "학교", "학력", "출신"],
        SpecificField::University,
    ),
    (BIRTH_TERMS, SpecificField::Birth),
    (
        &["작품", "대표작", "소설", "책", "시집"],
        SpecificField::Works,
    ),
    (&["수상", "받은 상", "문학상"], SpecificField::Awards),
    (&["아버지", "부친"], SpecificField::Father),
    (&["어머니", "모친"], SpecificField::Mother),
    (
        &["배우자", "아내", "남편", "결혼"],
        SpecificField::Spouse,
    ),
    (&["가족", "부모", "형제"], SpecificField::Family),
];

/// Detects which specific attribute an utterance asks for, if any.
pub fn detect_specific_field(utterance: &str) -> Option<SpecificField> {
    let has_birth = BIRTH_TERMS.iter().any(|t| utterance.contains(t));
    let has_death = DEATH_TERMS.iter().any(|t| utterance.contains(t));
    if has_birth && has_death {
        return Some(SpecificField::BirthAndDeath);
    }

    for (terms, field) in FIELD_RULES {
        if terms.iter().any(|t| utterance.contains(t)) {
            return Some(*field);
        }
    }
    None
}

/// Small-talk tokens that mark an utterance as outside the domain.
const IRRELEVANT_TOKENS: &[&str] = &[
    "안녕", "하이", "반가워", "날씨", "뭐해", "뭐하니", "고마워", "감사",
    "좋은 하루", "잘자", "심심", "ㅋㅋ", "ㅎㅎ", "웃겨", "재밌다",
];

/// Keywords that anchor an utterance in the book/author domain.
const DOMAIN_KEYWORDS: &[&str] = &[
    "작가", "소설가", "시인", "저자", "만화가", "작품", "책", "소설",
    "시집", "누구", "정보", "알려줘", "추천", "문학",
];

/// True when the utterance is small talk with no domain anchor.
pub fn is_irrelevant(utterance: &str) -> bool {
    let hits_small_talk = IRRELEVANT_TOKENS.iter().any(|t| utterance.contains(t));
    let hits_domain = DOMAIN_KEYWORDS.iter().any(|t| utterance.contains(t));
    hits_small_talk && !hits_domain
}

/// Context-continuation keywords: a follow-up that leans on the previous
/// subject carries one of these.
const CONTEXT_KEYWORDS: &[&str] = &[
    "나이", "몇살", "대학", "고등학교", "학교", "학력", "졸업", "출신",
    "작품", "대표작", "수상", "언제", "어디", "태어", "죽었", "사망",
    "아버지", "어머니", "부친", "모친", "부모", "가족", "형제", "배우자",
    "그 작가", "그 사람", "그는", "그녀",
];

/// True when the utterance carries a context-continuation keyword.
pub fn has_context_keyword(utterance: &str) -> bool {
    CONTEXT_KEYWORDS.iter().any(|t| utterance.contains(t))
}

/// Keywords that signal an authorship question ("who wrote ...").
pub const AUTHORSHIP_KEYWORDS: &[&str] = &["작가", "저자", "지은이", "쓴이", "쓴 사람", "누가 썼"];

/// Generic nouns never accepted as a person name.
const NAME_STOPLIST: &[&str] = &[
    "출생일", "사망일", "알려줘", "말해줘", "대표작", "고등학교", "대학교",
    "중학교", "언제", "어디", "작가", "소설가", "만화가", "시인", "저자",
    "정보", "작품", "누구", "사람", "대해", "각각", "설명", "소개", "나이",
    "몇살", "학력", "수상", "출신", "졸업", "가족", "부모", "아버지",
    "어머니", "결혼", "생일", "사망", "출생", "태어", "소설", "시집",
    "어떤", "그거", "그게", "이거", "저거", "뭐", "나왔", "다녔",
];

/// Words stripped from an utterance when mining a bare work title.
const TITLE_STOPWORDS: &[&str] = &[
    "작가", "누가", "저자", "지은이", "쓴이", "썼어", "썼는데", "쓴", "정보",
    "누구야", "누구", "알려줘", "말해줘", "어떤", "사람", "?", "!", ".",
];

/// Trailing particles stripped off a captured name token.
const TRAILING_PARTICLES: &[char] = &['은', '는', '이', '가', '을', '를', '에', '의', '야'];

// Lazy name group so the 이/가 particle lands in the particle slot, not
// the captured name.
static WHO_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^([가-힣]{2,5}?)(?:이|가)?\s*누구").expect("valid regex"));

static SPACED_NAME_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^([가-힣]{2,5}\s[가-힣]{2,5})").expect("valid regex"));

static COMPOUND_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^\s*([가-힣]{2,5}(?:\s[가-힣]{2,5})?)\s*(?:와|과|랑|이랑|하고|그리고|,)\s+?([가-힣]{2,5}(?:\s[가-힣]{2,5})?)",
    )
    .expect("valid regex")
});

/// Hints that a two-name utterance is actually asking about both.
const COMPOUND_HINTS: &[&str] = &["대해", "알려", "정보", "각각", "설명", "소개", "누구"];

/// Strips one trailing particle off a name token ("한강에" -> "한강").
fn strip_particle(token: &str) -> &str {
    let mut chars = token.chars();
    if let Some(last) = chars.next_back() {
        if TRAILING_PARTICLES.contains(&last) && chars.clone().count() >= 2 {
            return chars.as_str();
        }
    }
    token
}

/// True when a candidate token can plausibly be a person name.
fn is_name_candidate(token: &str) -> bool {
    !token.is_empty() && !NAME_STOPLIST.iter().any(|s| token.contains(s))
}

/// Reduces a whitespace token to a bare Hangul name syllable run of 2-5
/// characters, or rejects it.
fn hangul_token(raw: &str) -> Option<&str> {
    let token = raw.trim_matches(|c: char| !('가'..='힣').contains(&c));
    if token.is_empty() || !token.chars().all(|c| ('가'..='힣').contains(&c)) {
        return None;
    }
    let token = strip_particle(token);
    let count = token.chars().count();
    if (2..=5).contains(&count) {
        Some(token)
    } else {
        None
    }
}

/// All plausible person-name candidates in an utterance: bare tokens plus
/// adjacent two-token pairs (for spaced foreign names), stop-list filtered.
fn name_candidates(text: &str) -> Vec<String> {
    let tokens: Vec<Option<&str>> = text.split_whitespace().map(hangul_token).collect();
    let mut candidates = Vec::new();
    for (i, slot) in tokens.iter().enumerate() {
        let Some(token) = slot else { continue };
        if !is_name_candidate(token) {
            continue;
        }
        candidates.push(token.to_string());
        if let Some(Some(next)) = tokens.get(i + 1) {
            if is_name_candidate(next) {
                candidates.push(format!("{token} {next}"));
            }
        }
    }
    candidates
}

/// Extracts the most plausible person name from an utterance.
///
/// Priority: "X가 누구" forms, spaced two-token names at the start, a bare
/// leading name when no question word follows, then the longest candidate
/// anywhere after stop-list filtering.
pub fn extract_person_name(utterance: &str) -> Option<String> {
    let trimmed = utterance.trim();

    if let Some(caps) = WHO_PATTERN.captures(trimmed) {
        let name = caps.get(1).map(|m| m.as_str())?;
        if is_name_candidate(name) {
            return Some(name.to_string());
        }
    }

    if let Some(caps) = SPACED_NAME_PATTERN.captures(trimmed) {
        let name = caps.get(1).map(|m| m.as_str())?;
        let parts_ok = name.split_whitespace().all(is_name_candidate);
        if parts_ok {
            return Some(name.to_string());
        }
    }

    let question_words = ["누구", "뭐", "어떤", "언제", "어디", "알려줘"];
    if !question_words.iter().any(|w| trimmed.contains(w)) {
        if let Some(first) = trimmed.split_whitespace().next() {
            let bare = strip_particle(first);
            if bare.chars().count() >= 2 && is_name_candidate(bare) {
                return Some(bare.to_string());
            }
        }
    }

    name_candidates(trimmed)
        .into_iter()
        .max_by_key(|t| t.chars().count())
}

/// Strips a trailing topic/object particle off a title token
/// ("채식주의자는" -> "채식주의자"). Only the four particles that cannot
/// plausibly end a title are stripped.
fn strip_title_particle(token: &str) -> &str {
    let mut chars = token.chars();
    if let Some(last) = chars.next_back() {
        if matches!(last, '는' | '은' | '을' | '를') && chars.clone().count() >= 2 {
            return chars.as_str();
        }
    }
    token
}

/// Mines a work title from an utterance by stripping authorship stopwords
/// and normalizing conjunctions (그리고/하고/랑 -> 와).
pub fn extract_work_title(utterance: &str) -> String {
    let mut title = utterance.trim().to_string();
    for word in TITLE_STOPWORDS {
        title = title.replace(word, " ");
    }
    title = title
        .replace("그리고", "와")
        .replace("이랑", "와")
        .replace("하고", "와");
    title
        .split_whitespace()
        .map(strip_title_particle)
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Detects an "A and B" compound utterance naming two subjects.
pub fn detect_compound(utterance: &str) -> Option<[String; 2]> {
    if !COMPOUND_HINTS.iter().any(|h| utterance.contains(h)) {
        return None;
    }
    let caps = COMPOUND_PATTERN.captures(utterance.trim())?;

    let clean = |raw: &str| -> Option<String> {
        let tokens: Vec<&str> = raw
            .split_whitespace()
            .map(strip_particle)
            .filter(|t| is_name_candidate(t))
            .collect();
        if tokens.is_empty() {
            None
        } else {
            Some(tokens.join(" "))
        }
    };

    let first = clean(caps.get(1)?.as_str())?;
    let second = clean(caps.get(2)?.as_str())?;
    if first == second {
        return None;
    }
    Some([first, second])
}

/// True when the utterance names a subject other than `current_subject`
/// alongside an author-question keyword. Used by the context-priority
/// check: a newly named subject always beats context reuse.
pub fn mentions_new_subject(utterance: &str, current_subject: Option<&str>) -> bool {
    let asks_about_author = DOMAIN_KEYWORDS.iter().any(|k| utterance.contains(k))
        || has_context_keyword(utterance);
    if !asks_about_author {
        return false;
    }

    name_candidates(utterance)
        .into_iter()
        .any(|name| match current_subject {
            Some(current) => {
                let current = current.trim();
                !current.is_empty() && name != current && !current.contains(&name)
            }
            None => true,
        })
}
