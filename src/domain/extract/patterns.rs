//! Deterministic pattern passes over page text.
//!
//! These are the fallbacks behind every model-first extraction routine and
//! the only path when the completion adapter is down. Dates are surfaced
//! verbatim from the source text; list extractions dedup in first-seen
//! order and cap (works at 6, awards at 7).

use once_cell::sync::Lazy;
use regex::Regex;

/// Works list cap.
pub const WORKS_LIMIT: usize = 6;

/// Awards list cap.
pub const AWARDS_LIMIT: usize = 7;

static BIRTH_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    vec![
        Regex::new(r"\d{4}년\s*\d{1,2}월\s*\d{1,2}일").expect("valid regex"),
        Regex::new(r"\d{4}\.\s*\d{1,2}\.\s*\d{1,2}").expect("valid regex"),
        Regex::new(r"\d{4}년").expect("valid regex"),
    ]
});

static DEATH_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    vec![
        Regex::new(r"(\d{4}년\s*\d{1,2}월\s*\d{1,2}일)(?:에|에는)?[^가-힣]{0,3}(?:사망|별세|타계)")
            .expect("valid regex"),
        Regex::new(r"(?:사망|별세|타계)[:\s]*(\d{4}년\s*\d{1,2}월\s*\d{1,2}일)")
            .expect("valid regex"),
        Regex::new(r"(\d{4}년)(?:에|에는)?[^가-힣]{0,3}(?:사망|별세|타계)").expect("valid regex"),
    ]
});

static SCHOOL_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    vec![
        Regex::new(r"([가-힣]+(?:고등학교|고교|중학교|초등학교))[을를]?\s*(?:졸업|입학|진학|재학)")
            .expect("valid regex"),
        Regex::new(r"(?:졸업|입학|진학|재학).{0,30}?([가-힣]+(?:고등학교|고교|중학교|초등학교))")
            .expect("valid regex"),
    ]
});

static UNIVERSITY_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    vec![
        // Enrollment verbs only; a campus someone teaches at (재직) never
        // matches.
        Regex::new(r"([가-힣]+(?:대학교|대학))(?:\s*[가-힣]*(?:과|학부))?[을를]?\s*(?:졸업|입학|진학|재학)")
            .expect("valid regex"),
        Regex::new(r"(?:졸업|입학|진학).{0,30}?([가-힣]+(?:대학교|대학))").expect("valid regex"),
    ]
});

static WORK_BRACKET_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    vec![
        Regex::new(r"《([^》]+)》").expect("valid regex"),
        Regex::new(r"「([^」]+)」").expect("valid regex"),
        Regex::new(r"『([^』]+)』").expect("valid regex"),
    ]
});

static AWARD_NAME_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"([가-힣]{2,}[가-힣·\s]{0,18}?(?:문학상|예술상|대상|상))[을를]?\s*(?:수상|받)")
        .expect("valid regex")
});

static AWARD_YEAR_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(\d{4}년)\s*([가-힣]{2,}[가-힣·\s]{0,18}?(?:문학상|예술상|대상|상))")
        .expect("valid regex")
});

static FATHER_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    vec![
        Regex::new(r"아버지[는은이가]?\s*(?:소설가|시인|작가|만화가)?\s*([가-힣]{2,4})")
            .expect("valid regex"),
        Regex::new(r"부친[는은이가]?\s*(?:소설가|시인|작가|만화가)?\s*([가-힣]{2,4})")
            .expect("valid regex"),
    ]
});

static MOTHER_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    vec![
        Regex::new(r"어머니[는은이가]?\s*(?:소설가|시인|작가|만화가)?\s*([가-힣]{2,4})")
            .expect("valid regex"),
        Regex::new(r"모친[는은이가]?\s*(?:소설가|시인|작가|만화가)?\s*([가-힣]{2,4})")
            .expect("valid regex"),
    ]
});

static SPOUSE_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    vec![
        Regex::new(r"(?:아내|부인|남편|배우자)[는은이가]?\s*([가-힣]{2,4})").expect("valid regex"),
    ]
});

static AUTHOR_OF_WORK_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    vec![
        Regex::new(r"([가-힣]{2,5}(?:\s[가-힣]{2,5}){0,2})의\s*(?:장편|단편)?\s*소설")
            .expect("valid regex"),
        Regex::new(r"(?:저자|지은이|글쓴이)[는은:]?\s*([가-힣]{2,5}(?:\s[가-힣]{2,5})?)")
            .expect("valid regex"),
        Regex::new(r"([가-힣]{2,5}(?:\s[가-힣]{2,5})?)[이가]\s*(?:쓴|지은|발표한)")
            .expect("valid regex"),
    ]
});

static TRANSLATOR_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?:옮긴이|번역가|번역)[는은:]?\s*([가-힣]{2,4}(?:\s[가-힣]{2,4})?)")
        .expect("valid regex")
});

/// Suffix characters trimmed off a captured personal name (particles and
/// copula onsets that the syllable-window capture drags along).
const NAME_SUFFIX_TRIM: &[char] = &['과', '와', '은', '는', '이', '가', '을', '를', '의', '였', '씨', '님'];

/// Trims one trailing particle/copula character off a captured name.
pub(crate) fn trim_name(raw: &str) -> &str {
    let mut chars = raw.chars();
    if let Some(last) = chars.next_back() {
        if NAME_SUFFIX_TRIM.contains(&last) && chars.clone().count() >= 2 {
            return chars.as_str();
        }
    }
    raw
}

fn first_match(patterns: &[Regex], text: &str) -> Option<String> {
    for pattern in patterns {
        if let Some(m) = pattern.find(text) {
            return Some(m.as_str().to_string());
        }
    }
    None
}

fn first_capture(patterns: &[Regex], text: &str) -> Option<String> {
    for pattern in patterns {
        if let Some(caps) = pattern.captures(text) {
            if let Some(g) = caps.get(1) {
                return Some(g.as_str().trim().to_string());
            }
        }
    }
    None
}

/// Birth date as written in the text.
pub fn find_birth(text: &str) -> Option<String> {
    first_match(&BIRTH_PATTERNS, text)
}

/// Death date as written in the text.
pub fn find_death(text: &str) -> Option<String> {
    first_capture(&DEATH_PATTERNS, text)
}

/// School (primary/secondary) the subject attended.
pub fn find_school(text: &str) -> Option<String> {
    first_capture(&SCHOOL_PATTERNS, text)
}

/// University the subject enrolled at.
pub fn find_university(text: &str) -> Option<String> {
    first_capture(&UNIVERSITY_PATTERNS, text).map(|u| {
        if u.ends_with("대학교") || u.ends_with("대학") {
            u
        } else {
            format!("{u}대학교")
        }
    })
}

/// Bracketed work titles, first-seen order, deduped, capped at 6.
pub fn find_works(text: &str) -> Vec<String> {
    let mut works = Vec::new();
    for pattern in WORK_BRACKET_PATTERNS.iter() {
        for caps in pattern.captures_iter(text) {
            if let Some(g) = caps.get(1) {
                let title = g.as_str().trim().to_string();
                if title.chars().count() > 1 && !works.contains(&title) {
                    works.push(title);
                    if works.len() >= WORKS_LIMIT {
                        return works;
                    }
                }
            }
        }
    }
    works
}

/// Award names, first-seen order, deduped, capped at 7. Year-prefixed
/// mentions keep the year ("2016년 국제부커상").
pub fn find_awards(text: &str) -> Vec<String> {
    let mut awards: Vec<String> = Vec::new();

    for caps in AWARD_NAME_PATTERN.captures_iter(text) {
        if let Some(g) = caps.get(1) {
            let award = g.as_str().trim().to_string();
            if award.chars().count() > 3 && !awards.contains(&award) {
                awards.push(award);
                if awards.len() >= AWARDS_LIMIT {
                    return awards;
                }
            }
        }
    }

    for caps in AWARD_YEAR_PATTERN.captures_iter(text) {
        let (Some(year), Some(name)) = (caps.get(1), caps.get(2)) else {
            continue;
        };
        let name = name.as_str().trim();
        if awards.iter().any(|a| a.contains(name)) {
            continue;
        }
        let award = format!("{} {}", year.as_str(), name);
        if !awards.contains(&award) {
            awards.push(award);
            if awards.len() >= AWARDS_LIMIT {
                return awards;
            }
        }
    }

    awards
}

/// Father's name via explicit lexical markers.
pub fn find_father(text: &str) -> Option<String> {
    first_capture(&FATHER_PATTERNS, text).map(|n| trim_name(&n).to_string())
}

/// Mother's name via explicit lexical markers.
pub fn find_mother(text: &str) -> Option<String> {
    first_capture(&MOTHER_PATTERNS, text).map(|n| trim_name(&n).to_string())
}

/// Spouse's name via explicit lexical markers.
pub fn find_spouse(text: &str) -> Option<String> {
    first_capture(&SPOUSE_PATTERNS, text).map(|n| trim_name(&n).to_string())
}

/// Keeps the trailing run of tokens free of topic/subject particles - the
/// part of a capture that is actually the name ("개미는 베르나르 베르베르"
/// -> "베르나르 베르베르").
fn trailing_name_tokens(capture: &str) -> String {
    let tokens: Vec<&str> = capture.split_whitespace().collect();
    let mut kept: Vec<&str> = Vec::new();
    for token in tokens.iter().rev() {
        let carries_particle = token
            .chars()
            .next_back()
            .is_some_and(|c| matches!(c, '는' | '은' | '이' | '가' | '을' | '를'));
        if carries_particle && !kept.is_empty() {
            break;
        }
        if carries_particle {
            kept.push(trim_name(token));
        } else {
            kept.push(token);
        }
    }
    kept.reverse();
    kept.join(" ")
}

/// Original author of a work page, translators excluded.
pub fn find_original_author(text: &str) -> Option<String> {
    let translators: Vec<String> = TRANSLATOR_PATTERN
        .captures_iter(text)
        .filter_map(|c| c.get(1).map(|g| trim_name(g.as_str().trim()).to_string()))
        .collect();

    for pattern in AUTHOR_OF_WORK_PATTERNS.iter() {
        for caps in pattern.captures_iter(text) {
            if let Some(g) = caps.get(1) {
                let name = trailing_name_tokens(g.as_str().trim());
                if name.chars().count() >= 2 && !translators.contains(&name) {
                    return Some(name);
                }
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_find_birth_full_date() {
        let text = "한강은 1970년 11월 27일 광주광역시에서 태어났다.";
        assert_eq!(find_birth(text).as_deref(), Some("1970년 11월 27일"));
    }

    #[test]
    fn test_find_birth_year_only() {
        let text = "김영하는 1968년 경기도에서 태어났다.";
        assert_eq!(find_birth(text).as_deref(), Some("1968년"));
    }

    #[test]
    fn test_find_birth_verbatim_no_reformatting() {
        let text = "1975. 8. 27 출생";
        assert_eq!(find_birth(text).as_deref(), Some("1975. 8. 27"));
    }

    #[test]
    fn test_find_death_date() {
        let text = "박경리는 2008년 5월 5일에 사망했다.";
        assert_eq!(find_death(text).as_deref(), Some("2008년 5월 5일"));
    }

    #[test]
    fn test_find_death_prefixed_form() {
        let text = "사망: 1950년 6월 13일";
        assert_eq!(find_death(text).as_deref(), Some("1950년 6월 13일"));
    }

    #[test]
    fn test_find_death_none_when_only_birth() {
        let text = "1970년 11월 27일 태어났다.";
        assert_eq!(find_death(text), None);
    }

    #[test]
    fn test_find_school() {
        let text = "풍문여자고등학교를 졸업하고 연세대학교에 입학했다.";
        assert_eq!(find_school(text).as_deref(), Some("풍문여자고등학교"));
    }

    #[test]
    fn test_find_school_reversed_order() {
        let text = "졸업한 학교는 상문고등학교이다.";
        assert_eq!(find_school(text).as_deref(), Some("상문고등학교"));
    }

    #[test]
    fn test_find_university_with_department() {
        let text = "연세대학교 국어국문학과를 졸업했다.";
        assert_eq!(find_university(text).as_deref(), Some("연세대학교"));
    }

    #[test]
    fn test_find_university_ignores_professorship() {
        let text = "서울대학교 교수로 재직 중이다.";
        assert_eq!(find_university(text), None);
    }

    #[test]
    fn test_find_works_dedup_and_cap() {
        let text = "《채식주의자》 《소년이 온다》 《채식주의자》 《흰》 《희랍어 시간》 《검은 사슴》 《여수의 사랑》 《바람이 분다, 가라》";
        let works = find_works(text);
        assert_eq!(works.len(), WORKS_LIMIT);
        assert_eq!(works[0], "채식주의자");
        assert_eq!(works[1], "소년이 온다");
        // dedup kept first occurrence only
        assert_eq!(works.iter().filter(|w| *w == "채식주의자").count(), 1);
    }

    #[test]
    fn test_find_works_other_brackets() {
        let text = "단편 「몽고반점」과 『흰』을 발표했다.";
        let works = find_works(text);
        assert!(works.contains(&"몽고반점".to_string()));
        assert!(works.contains(&"흰".to_string()));
    }

    #[test]
    fn test_find_awards() {
        let text = "2016년 맨부커상을 수상했고, 이상문학상을 받았다.";
        let awards = find_awards(text);
        assert!(awards.iter().any(|a| a.contains("맨부커상")));
        assert!(awards.iter().any(|a| a.contains("이상문학상")));
    }

    #[test]
    fn test_find_father_between_pattern() {
        let text = "그의 아버지는 한승원이었고, 문학에 대한 조예가 깊었다.";
        assert_eq!(find_father(text).as_deref(), Some("한승원"));
    }

    #[test]
    fn test_find_mother() {
        let text = "그의 어머니는 김영희였으며, 교사로 일했다.";
        assert_eq!(find_mother(text).as_deref(), Some("김영희"));
    }

    #[test]
    fn test_find_spouse() {
        let text = "김영하는 2005년 아내 이수연과 결혼했다.";
        assert_eq!(find_spouse(text).as_deref(), Some("이수연"));
    }

    #[test]
    fn test_find_original_author_from_work_page() {
        let text = "개미는 베르나르 베르베르의 소설이다. 이 소설은 1991년에 발표되었다.";
        assert_eq!(find_original_author(text).as_deref(), Some("베르나르 베르베르"));
    }

    #[test]
    fn test_find_original_author_excludes_translator() {
        let text = "옮긴이는 이세욱이다. 개미는 베르나르 베르베르의 소설이다.";
        assert_eq!(find_original_author(text).as_deref(), Some("베르나르 베르베르"));
    }

    #[test]
    fn test_deterministic_extraction_is_idempotent() {
        let text = "한강은 1970년 11월 27일 태어났다. 연세대학교 국어국문학과를 졸업했다. 《채식주의자》를 썼다.";
        assert_eq!(find_birth(text), find_birth(text));
        assert_eq!(find_university(text), find_university(text));
        assert_eq!(find_works(text), find_works(text));
    }
}
