//! Wikipedia adapter - KnowledgeSource implementation over the MediaWiki
//! Action API.
//!
//! Fetches the plain-text extract of a page and shapes it into the port's
//! [`Page`]: the lead paragraph becomes `summary`, and `content` is a
//! bounded excerpt with biography/education sections collected ahead of the
//! page opening, since that is where the extraction passes look first.

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::Client;
use std::time::Duration;
use tracing::debug;

use crate::ports::{KnowledgeSource, LookupError, Page};

const DEFAULT_LANGUAGE: &str = "ko";
const DEFAULT_USER_AGENT: &str = "bookwise/0.1 (https://github.com/bookwise)";
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Total excerpt budget in characters.
const CONTENT_BUDGET: usize = 4000;
/// Opening-text share of the budget.
const OPENING_BUDGET: usize = 2000;
/// Per-section cap when collecting important sections.
const SECTION_BUDGET: usize = 800;
/// Cap on the collected important-section block.
const SECTIONS_BUDGET: usize = 1500;

/// Section headings worth pulling forward for extraction.
const IMPORTANT_HEADINGS: &[&str] = &[
    "학력", "학교", "교육", "출생", "이력", "약력", "생애", "고등학교",
    "대학교", "대학", "졸업", "입학", "진학", "수상", "경력", "작품", "활동",
];

/// Body keywords that rescue a section with an unhelpful heading.
const IMPORTANT_BODY_TERMS: &[&str] = &["고등학교", "대학", "졸업", "입학"];

static SECTION_HEADING: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\n==+\s*([^=\n]+?)\s*==+").expect("valid regex"));

/// MediaWiki Action API client implementing the KnowledgeSource port.
pub struct WikipediaClient {
    http: Client,
    endpoint: String,
}

impl WikipediaClient {
    /// Creates a client for the given language edition.
    pub fn new(language: &str) -> Self {
        Self::with_options(language, DEFAULT_USER_AGENT, DEFAULT_TIMEOUT)
    }

    /// Creates a client with explicit user agent and timeout.
    pub fn with_options(language: &str, user_agent: &str, timeout: Duration) -> Self {
        let http = Client::builder()
            .user_agent(user_agent.to_string())
            .timeout(timeout)
            .build()
            .expect("failed to create HTTP client");
        Self {
            http,
            endpoint: format!("https://{language}.wikipedia.org/w/api.php"),
        }
    }

    /// Creates the default Korean-language client.
    pub fn korean() -> Self {
        Self::new(DEFAULT_LANGUAGE)
    }

    /// Creates a client from the knowledge configuration section.
    pub fn from_config(config: &crate::config::KnowledgeConfig) -> Self {
        Self::with_options(&config.language, &config.user_agent, config.timeout())
    }
}

#[derive(Debug, serde::Deserialize)]
struct QueryResponse {
    query: Option<QueryBody>,
}

#[derive(Debug, serde::Deserialize)]
struct QueryBody {
    #[serde(default)]
    pages: Vec<WikiPage>,
}

#[derive(Debug, serde::Deserialize)]
struct WikiPage {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    extract: Option<String>,
    #[serde(default)]
    fullurl: Option<String>,
    #[serde(default)]
    missing: bool,
}

#[async_trait]
impl KnowledgeSource for WikipediaClient {
    async fn lookup(&self, term: &str) -> Result<Page, LookupError> {
        let response = self
            .http
            .get(&self.endpoint)
            .query(&[
                ("action", "query"),
                ("format", "json"),
                ("formatversion", "2"),
                ("redirects", "1"),
                ("prop", "extracts|info"),
                ("explaintext", "1"),
                ("inprop", "url"),
                ("titles", term),
            ])
            .send()
            .await
            .map_err(|e| LookupError::transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(LookupError::transport(format!("HTTP {status}")));
        }

        let parsed: QueryResponse = response
            .json()
            .await
            .map_err(|e| LookupError::malformed(e.to_string()))?;

        let page = parsed
            .query
            .and_then(|q| q.pages.into_iter().next())
            .ok_or_else(|| LookupError::malformed("no pages in response"))?;

        if page.missing {
            debug!(term, "page missing");
            return Err(LookupError::not_found(term));
        }

        let title = page
            .title
            .ok_or_else(|| LookupError::malformed("page without title"))?;
        let extract = page.extract.unwrap_or_default();
        let url = page
            .fullurl
            .unwrap_or_else(|| format!("https://ko.wikipedia.org/wiki/{}", title.replace(' ', "_")));

        Ok(Page {
            summary: lead_text(&extract),
            content: shape_content(&extract),
            title,
            url,
        })
    }
}

/// The lead section: everything before the first heading.
fn lead_text(full_text: &str) -> String {
    match SECTION_HEADING.find(full_text) {
        Some(m) => full_text[..m.start()].trim().to_string(),
        None => full_text.trim().to_string(),
    }
}

/// Opening text plus important sections, capped at the content budget.
fn shape_content(full_text: &str) -> String {
    let opening: String = full_text.chars().take(OPENING_BUDGET).collect();
    let sections = important_sections(full_text);
    let combined = if sections.is_empty() {
        opening
    } else {
        format!("{opening}\n\n{sections}")
    };
    combined.chars().take(CONTENT_BUDGET).collect()
}

/// Collects sections whose heading or body suggests biography/education
/// content, each capped, the whole block capped.
fn important_sections(full_text: &str) -> String {
    let mut collected = String::new();

    let matches: Vec<(usize, usize, String)> = SECTION_HEADING
        .captures_iter(full_text)
        .filter_map(|caps| {
            let whole = caps.get(0)?;
            let title = caps.get(1)?.as_str().trim().to_string();
            Some((whole.start(), whole.end(), title))
        })
        .collect();

    for (i, (_, body_start, title)) in matches.iter().enumerate() {
        let body_end = matches
            .get(i + 1)
            .map(|(next_start, _, _)| *next_start)
            .unwrap_or(full_text.len());
        let body = full_text[*body_start..body_end].trim();

        let heading_hit = IMPORTANT_HEADINGS.iter().any(|k| title.contains(k));
        let body_hit = IMPORTANT_BODY_TERMS.iter().any(|k| body.contains(k));
        if !heading_hit && !body_hit {
            continue;
        }

        let body_capped: String = body.chars().take(SECTION_BUDGET).collect();
        collected.push_str(&format!("\n\n=== {title} ===\n{body_capped}"));
        if collected.chars().count() >= SECTIONS_BUDGET {
            break;
        }
    }

    collected
        .trim()
        .chars()
        .take(SECTIONS_BUDGET)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "한강은 대한민국의 소설가이다. 1970년에 태어났다.\n== 생애 ==\n광주에서 태어나 연세대학교 국어국문학과를 졸업했다.\n== 수상 ==\n2016년 맨부커상을 수상했다.\n== 외부 링크 ==\n공식 웹사이트";

    #[test]
    fn test_lead_text_stops_at_first_heading() {
        let lead = lead_text(SAMPLE);
        assert!(lead.contains("소설가"));
        assert!(!lead.contains("생애"));
    }

    #[test]
    fn test_lead_text_without_headings_is_whole() {
        assert_eq!(lead_text("짧은 본문"), "짧은 본문");
    }

    #[test]
    fn test_important_sections_selected_by_heading() {
        let sections = important_sections(SAMPLE);
        assert!(sections.contains("=== 생애 ==="));
        assert!(sections.contains("=== 수상 ==="));
        assert!(!sections.contains("외부 링크"));
    }

    #[test]
    fn test_important_sections_selected_by_body() {
        let text = "요약.\n== 기타 ==\n서울대학교 졸업 후 활동을 시작했다.";
        let sections = important_sections(text);
        assert!(sections.contains("=== 기타 ==="));
    }

    #[test]
    fn test_shape_content_prepends_opening() {
        let content = shape_content(SAMPLE);
        assert!(content.starts_with("한강은"));
        assert!(content.contains("연세대학교"));
        assert!(content.chars().count() <= CONTENT_BUDGET);
    }

    #[test]
    fn test_shape_content_respects_budget() {
        let long_text = "가".repeat(10_000);
        let content = shape_content(&long_text);
        assert_eq!(content.chars().count(), CONTENT_BUDGET);
    }

    #[test]
    fn test_missing_page_parses() {
        let body = r#"{"query": {"pages": [{"title": "없는것", "missing": true}]}}"#;
        let parsed: QueryResponse = serde_json::from_str(body).unwrap();
        let page = parsed.query.unwrap().pages.into_iter().next().unwrap();
        assert!(page.missing);
    }

    #[test]
    fn test_present_page_parses() {
        let body = r#"{"query": {"pages": [{"title": "한강 (작가)", "extract": "한강은 소설가이다.", "fullurl": "https://ko.wikipedia.org/wiki/한강_(작가)"}]}}"#;
        let parsed: QueryResponse = serde_json::from_str(body).unwrap();
        let page = parsed.query.unwrap().pages.into_iter().next().unwrap();
        assert!(!page.missing);
        assert_eq!(page.title.as_deref(), Some("한강 (작가)"));
    }
}
