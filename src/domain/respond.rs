//! Response composition - canonical user-facing message templates.
//!
//! Korean particle selection follows the final consonant of the preceding
//! word; URLs get their parentheses percent-encoded so terminal renderers
//! keep the whole link clickable.

use crate::ports::Page;

/// Picks the object particle (을/를) for a word.
pub fn object_particle(word: &str) -> &'static str {
    if ends_with_final_consonant(word) {
        "을"
    } else {
        "를"
    }
}

/// Picks the topic particle (은/는) for a word.
pub fn topic_particle(word: &str) -> &'static str {
    if ends_with_final_consonant(word) {
        "은"
    } else {
        "는"
    }
}

fn ends_with_final_consonant(word: &str) -> bool {
    match word.chars().last() {
        Some(c) if ('가'..='힣').contains(&c) => (c as u32 - 0xAC00) % 28 != 0,
        _ => false,
    }
}

/// Percent-encodes parentheses so the link survives terminal rendering.
pub fn clickable_url(url: &str) -> String {
    url.replace('(', "%28").replace(')', "%29")
}

/// The standard author/work card: title, trimmed summary, detail link.
pub fn format_page_card(page: &Page) -> String {
    let summary: String = page.summary.chars().take(200).collect();
    format!(
        "**{}**\n\n**요약**: {}...\n\n**상세 정보**: {}\n\n더 궁금한 것이 있으시면 언제든 물어보세요!",
        page.title,
        summary,
        clickable_url(&page.url)
    )
}

/// Appends the canonical detail link when the message does not already
/// carry one.
pub fn ensure_detail_link(message: &str, url: &str) -> String {
    if message.contains("http") {
        return message.to_string();
    }
    format!("{}\n\n**상세 정보**: {}", message, clickable_url(url))
}

/// Clarification request when a page exists but is not an author.
pub fn clarification_request(subject: &str) -> String {
    format!(
        "'{subject}'으로 검색된 결과가 작가가 아닙니다. 어떤 작품을 쓴 '{subject}' 작가 말씀하시는 건가요? 대표작품을 말씀해주세요."
    )
}

/// Clarification request when no page was found at all.
pub fn search_failure(subject: &str) -> String {
    format!(
        "'{subject}' 작가를 찾을 수 없습니다.\n\n다음 중 하나를 시도해보세요:\n1. 정확한 작가명으로 다시 검색\n2. 대표작품을 알려주세요 (예: \"채식주의자\", \"개미\" 등)\n3. 다른 작가에 대해 질문해보세요"
    )
}

/// Clarification request after an author+work combination also missed.
pub fn combined_search_failure(subject: &str, work: &str) -> String {
    format!("'{subject}' 작가의 '{work}' 작품으로 검색했지만 결과를 찾을 수 없습니다. 다른 대표작을 알려주세요.")
}

/// Clarification request when a work could not be resolved to an author.
pub fn work_not_found(work: &str) -> String {
    format!("'{work}'의 작가를 찾을 수 없습니다. 정확한 작품명을 알려주시겠어요?")
}

/// Fixed refusal for out-of-domain utterances.
pub fn domain_refusal() -> String {
    "죄송합니다. 작가 정보 검색만 가능합니다. 작가에 대해 질문해주세요.".to_string()
}

/// Message when an utterance names no recognizable subject.
pub fn ambiguous_query() -> String {
    "질문이 명확하지 않습니다. 어떤 작가에 대해 알고 싶으신지 구체적으로 말씀해주세요.".to_string()
}

/// Generic failure notice.
pub fn general_error() -> String {
    "죄송합니다. 검색 중 오류가 발생했습니다. 다시 시도해주세요.".to_string()
}

/// Header line for one side of a compound answer.
pub fn compound_header(subject: &str) -> String {
    format!("### {subject}")
}

/// Inline miss line for one side of a compound answer.
pub fn compound_miss(subject: &str) -> String {
    format!("### {subject}\n'{subject}'에 대한 정보를 찾을 수 없습니다.")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_particles_follow_final_consonant() {
        assert_eq!(object_particle("채식주의자"), "를");
        assert_eq!(object_particle("연세대학교"), "를");
        assert_eq!(object_particle("소년이 온다"), "를");
        assert_eq!(object_particle("흰"), "을");
        assert_eq!(topic_particle("한강"), "은");
        assert_eq!(topic_particle("박경리"), "는");
    }

    #[test]
    fn test_clickable_url_encodes_parens() {
        assert_eq!(
            clickable_url("https://ko.wikipedia.org/wiki/한강_(작가)"),
            "https://ko.wikipedia.org/wiki/한강_%28작가%29"
        );
    }

    #[test]
    fn test_page_card_contains_title_summary_link() {
        let page = Page::new(
            "한강 (작가)",
            "한강은 대한민국의 소설가이다.",
            "본문",
            "https://ko.wikipedia.org/wiki/한강_(작가)",
        );
        let card = format_page_card(&page);
        assert!(card.contains("한강 (작가)"));
        assert!(card.contains("소설가"));
        assert!(card.contains("%28작가%29"));
    }

    #[test]
    fn test_ensure_detail_link_appends_once() {
        let with_link = ensure_detail_link("이미 링크 있음 https://example.org", "https://other");
        assert!(!with_link.contains("other"));

        let without = ensure_detail_link("링크 없음", "https://example.org/(x)");
        assert!(without.contains("%28x%29"));
    }
}
