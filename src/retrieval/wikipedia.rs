//! `MediaWiki` API client.
//!
//! Uses the `list=search` endpoint for title search and a single
//! `prop=extracts|info|revisions` query per article for plain-text content,
//! canonical URL and last revision timestamp.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use super::{Article, Retriever, truncate_chars};
use crate::error::RetrievalError;

/// Default Wikipedia language edition.
const DEFAULT_LANGUAGE: &str = "en";
/// Default `User-Agent` header (Wikimedia requires a descriptive one).
const DEFAULT_USER_AGENT: &str = concat!("wiki-agent-rs/", env!("CARGO_PKG_VERSION"));
/// Default per-request timeout in seconds.
const DEFAULT_TIMEOUT_SECS: u64 = 10;
/// Default retry count for transient failures.
const DEFAULT_MAX_RETRIES: u32 = 3;
/// Base delay for exponential backoff.
const BACKOFF_BASE_MS: u64 = 250;

/// Configuration for [`WikipediaClient`].
#[derive(Debug, Clone)]
pub struct WikipediaConfig {
    /// Language edition (`en`, `de`, ...).
    pub language: String,
    /// `User-Agent` header value.
    pub user_agent: String,
    /// Per-request timeout.
    pub timeout: Duration,
    /// Retries after the first attempt for transient failures.
    pub max_retries: u32,
    /// Full API endpoint override; derived from `language` when `None`.
    pub api_url: Option<String>,
}

impl Default for WikipediaConfig {
    fn default() -> Self {
        Self {
            language: DEFAULT_LANGUAGE.to_string(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            max_retries: DEFAULT_MAX_RETRIES,
            api_url: None,
        }
    }
}

impl WikipediaConfig {
    /// Resolved API endpoint.
    #[must_use]
    pub fn endpoint(&self) -> String {
        self.api_url
            .clone()
            .unwrap_or_else(|| format!("https://{}.wikipedia.org/w/api.php", self.language))
    }
}

/// Wikipedia retriever backed by the `MediaWiki` action API.
pub struct WikipediaClient {
    http: reqwest::Client,
    endpoint: String,
    max_retries: u32,
}

impl WikipediaClient {
    /// Creates a client.
    ///
    /// # Errors
    ///
    /// Returns [`RetrievalError::Client`] if the HTTP client cannot be built.
    pub fn new(config: &WikipediaConfig) -> Result<Self, RetrievalError> {
        let http = reqwest::Client::builder()
            .user_agent(config.user_agent.clone())
            .timeout(config.timeout)
            .build()
            .map_err(|e| RetrievalError::Client(e.to_string()))?;

        Ok(Self {
            http,
            endpoint: config.endpoint(),
            max_retries: config.max_retries,
        })
    }

    /// Total tries per request: the first plus `max_retries`.
    const fn attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }

    /// Issues a GET with retries and decodes the JSON body.
    ///
    /// Connection errors, timeouts, `429` and `5xx` are retried with
    /// exponential backoff. Other `4xx` responses fail immediately.
    async fn get_json<T: DeserializeOwned>(
        &self,
        params: &[(&str, &str)],
    ) -> Result<T, RetrievalError> {
        let attempts = self.attempts();
        let mut last_error = String::new();

        for attempt in 1..=attempts {
            if attempt > 1 {
                tokio::time::sleep(backoff_delay(attempt)).await;
            }

            let response = self
                .http
                .get(&self.endpoint)
                .query(&[("format", "json"), ("formatversion", "2")])
                .query(params)
                .send()
                .await;

            match response {
                Ok(resp) if resp.status().is_success() => {
                    return resp
                        .json::<T>()
                        .await
                        .map_err(|e| RetrievalError::InvalidResponse {
                            endpoint: self.endpoint.clone(),
                            message: e.to_string(),
                        });
                }
                Ok(resp) => {
                    let status = resp.status();
                    last_error = format!("HTTP {status}");
                    if status.is_client_error() && status.as_u16() != 429 {
                        break;
                    }
                }
                Err(e) => {
                    last_error = e.to_string();
                }
            }

            warn!(attempt, attempts, error = %last_error, "wikipedia request failed");
        }

        Err(RetrievalError::RetriesExhausted {
            endpoint: self.endpoint.clone(),
            attempts,
            message: last_error,
        })
    }
}

impl std::fmt::Debug for WikipediaClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WikipediaClient")
            .field("endpoint", &self.endpoint)
            .field("max_retries", &self.max_retries)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl Retriever for WikipediaClient {
    fn name(&self) -> &'static str {
        "wikipedia"
    }

    async fn search_titles(
        &self,
        query: &str,
        max_results: usize,
    ) -> Result<Vec<String>, RetrievalError> {
        let limit = max_results.max(1).to_string();
        let response: SearchResponse = self
            .get_json(&[
                ("action", "query"),
                ("list", "search"),
                ("srsearch", query),
                ("srlimit", limit.as_str()),
            ])
            .await?;

        let titles = response.titles();
        debug!(query, found = titles.len(), "wikipedia search");
        Ok(titles)
    }

    async fn get_article(
        &self,
        title: &str,
        max_chars: usize,
    ) -> Result<Option<Article>, RetrievalError> {
        let response: PageResponse = self
            .get_json(&[
                ("action", "query"),
                ("prop", "extracts|info|revisions"),
                ("explaintext", "1"),
                ("inprop", "url"),
                ("rvprop", "timestamp"),
                ("redirects", "1"),
                ("titles", title),
            ])
            .await?;

        Ok(response.into_article(max_chars))
    }
}

// ---------------------------------------------------------------------------
// Response shapes (formatversion=2)
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    query: Option<SearchQuery>,
}

#[derive(Debug, Deserialize)]
struct SearchQuery {
    #[serde(default)]
    search: Vec<SearchHit>,
}

#[derive(Debug, Deserialize)]
struct SearchHit {
    title: String,
}

impl SearchResponse {
    fn titles(self) -> Vec<String> {
        self.query
            .map(|q| q.search.into_iter().map(|h| h.title).collect())
            .unwrap_or_default()
    }
}

#[derive(Debug, Deserialize)]
struct PageResponse {
    #[serde(default)]
    query: Option<PageQuery>,
}

#[derive(Debug, Deserialize)]
struct PageQuery {
    #[serde(default)]
    pages: Vec<Page>,
}

#[derive(Debug, Deserialize)]
struct Page {
    title: String,
    #[serde(default)]
    missing: bool,
    #[serde(default)]
    invalid: bool,
    #[serde(default)]
    fullurl: Option<String>,
    #[serde(default)]
    extract: String,
    #[serde(default)]
    revisions: Vec<Revision>,
}

#[derive(Debug, Deserialize)]
struct Revision {
    timestamp: DateTime<Utc>,
}

impl PageResponse {
    fn into_article(self, max_chars: usize) -> Option<Article> {
        let page = self.query?.pages.into_iter().next()?;
        if page.missing || page.invalid {
            return None;
        }

        let url = page.fullurl.unwrap_or_else(|| {
            format!(
                "https://en.wikipedia.org/wiki/{}",
                page.title.replace(' ', "_")
            )
        });

        Some(Article {
            summary: lead_section(&page.extract),
            content: truncate_chars(&page.extract, max_chars),
            word_count: page.extract.split_whitespace().count(),
            last_modified: page.revisions.first().map(|r| r.timestamp),
            title: page.title,
            url,
        })
    }
}

/// Returns the text before the first `== Heading ==` line.
fn lead_section(extract: &str) -> String {
    extract
        .find("\n==")
        .map_or(extract, |idx| &extract[..idx])
        .trim()
        .to_string()
}

/// Delay before `attempt` (1-based); doubles per retry up to 64x the base.
fn backoff_delay(attempt: u32) -> Duration {
    let exponent = attempt.saturating_sub(2).min(6);
    Duration::from_millis(BACKOFF_BASE_MS.saturating_mul(1 << exponent))
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case(2, 250)]
    #[test_case(3, 500)]
    #[test_case(8, 16_000)]
    #[test_case(u32::MAX, 16_000)]
    fn test_backoff_delay(attempt: u32, millis: u64) {
        assert_eq!(backoff_delay(attempt), Duration::from_millis(millis));
    }

    #[test_case(0, 1)]
    #[test_case(3, 4)]
    #[test_case(u32::MAX, u32::MAX)]
    fn test_attempts_saturate(max_retries: u32, expected: u32) {
        let config = WikipediaConfig {
            max_retries,
            ..WikipediaConfig::default()
        };
        let client = WikipediaClient::new(&config).unwrap_or_else(|e| panic!("{e}"));
        assert_eq!(client.attempts(), expected);
    }

    #[test]
    fn test_endpoint_from_language() {
        let config = WikipediaConfig {
            language: "de".to_string(),
            ..WikipediaConfig::default()
        };
        assert_eq!(config.endpoint(), "https://de.wikipedia.org/w/api.php");

        let config = WikipediaConfig {
            api_url: Some("http://localhost:8080/api.php".to_string()),
            ..WikipediaConfig::default()
        };
        assert_eq!(config.endpoint(), "http://localhost:8080/api.php");
    }

    #[test]
    fn test_parse_search_response() {
        let json = r#"{"batchcomplete":true,"query":{"searchinfo":{"totalhits":2},
            "search":[{"ns":0,"title":"Quantum computing","pageid":1},
                      {"ns":0,"title":"Qubit","pageid":2}]}}"#;
        let response: SearchResponse =
            serde_json::from_str(json).unwrap_or_else(|e| panic!("parse failed: {e}"));
        assert_eq!(response.titles(), vec!["Quantum computing", "Qubit"]);
    }

    #[test]
    fn test_parse_empty_search_response() {
        let response: SearchResponse =
            serde_json::from_str("{}").unwrap_or_else(|e| panic!("parse failed: {e}"));
        assert!(response.titles().is_empty());
    }

    #[test]
    fn test_parse_page_response() {
        let json = r#"{"query":{"pages":[{
            "pageid":25220,"ns":0,"title":"Quantum computing",
            "fullurl":"https://en.wikipedia.org/wiki/Quantum_computing",
            "extract":"A quantum computer exploits quantum mechanics.\n\n\n== History ==\nEarly work in the 1980s.",
            "revisions":[{"timestamp":"2024-11-15T10:30:00Z"}]}]}}"#;
        let response: PageResponse =
            serde_json::from_str(json).unwrap_or_else(|e| panic!("parse failed: {e}"));
        let article = response
            .into_article(3000)
            .unwrap_or_else(|| panic!("expected article"));

        assert_eq!(article.title, "Quantum computing");
        assert_eq!(
            article.url,
            "https://en.wikipedia.org/wiki/Quantum_computing"
        );
        assert_eq!(
            article.summary,
            "A quantum computer exploits quantum mechanics."
        );
        assert_eq!(article.last_modified_label(), "2024-11-15");
        assert_eq!(article.word_count, 14);
    }

    #[test]
    fn test_parse_missing_page() {
        let json = r#"{"query":{"pages":[{"ns":0,"title":"Nonexistent xyz","missing":true}]}}"#;
        let response: PageResponse =
            serde_json::from_str(json).unwrap_or_else(|e| panic!("parse failed: {e}"));
        assert!(response.into_article(3000).is_none());
    }

    #[test]
    fn test_content_truncated_word_count_full() {
        let json = r#"{"query":{"pages":[{"title":"T","extract":"one two three four five"}]}}"#;
        let response: PageResponse =
            serde_json::from_str(json).unwrap_or_else(|e| panic!("parse failed: {e}"));
        let article = response
            .into_article(7)
            .unwrap_or_else(|| panic!("expected article"));
        assert_eq!(article.content, "one two...");
        assert_eq!(article.word_count, 5);
        assert_eq!(article.url, "https://en.wikipedia.org/wiki/T");
        assert!(article.last_modified.is_none());
    }
}
