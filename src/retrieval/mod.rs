//! Article retrieval and citation formatting.
//!
//! The agent layer only sees the [`Retriever`] and [`CitationFormatter`]
//! traits; [`WikipediaClient`] and [`MlaCitation`] are the production
//! implementations.

pub mod citation;
pub mod wikipedia;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::core::SourceMetadata;
use crate::error::RetrievalError;

pub use citation::{CitationFormatter, MlaCitation, has_citation_marker};
pub use wikipedia::{WikipediaClient, WikipediaConfig};

/// Label used when an article's revision date is unknown.
pub const UNKNOWN_DATE: &str = "Unknown";

/// A retrieved reference article.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Article {
    /// Article title.
    pub title: String,
    /// Canonical URL.
    pub url: String,
    /// Lead section.
    pub summary: String,
    /// Body text, possibly truncated.
    pub content: String,
    /// Timestamp of the latest revision.
    pub last_modified: Option<DateTime<Utc>>,
    /// Word count of the full, untruncated body.
    pub word_count: usize,
}

impl Article {
    /// Revision date as `YYYY-MM-DD`, or `"Unknown"`.
    #[must_use]
    pub fn last_modified_label(&self) -> String {
        self.last_modified.map_or_else(
            || UNKNOWN_DATE.to_string(),
            |ts| ts.format("%Y-%m-%d").to_string(),
        )
    }

    /// Source metadata for registration with a fact accumulator.
    #[must_use]
    pub fn metadata(&self) -> SourceMetadata {
        SourceMetadata {
            title: self.title.clone(),
            url: self.url.clone(),
            last_modified: self.last_modified_label(),
            word_count: self.word_count,
        }
    }
}

/// Truncates `text` to at most `max_chars` characters, appending `...` when
/// anything was cut.
#[must_use]
pub fn truncate_chars(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => format!("{}...", &text[..byte_idx]),
        None => text.to_string(),
    }
}

/// Article search and lookup.
///
/// Implementations handle their own retries; an error surfaces only once
/// retries are exhausted.
#[async_trait]
pub trait Retriever: Send + Sync {
    /// Backend name for logging.
    fn name(&self) -> &'static str;

    /// Returns up to `max_results` article titles matching `query`.
    async fn search_titles(
        &self,
        query: &str,
        max_results: usize,
    ) -> Result<Vec<String>, RetrievalError>;

    /// Fetches one article by title, truncating its body to `max_chars`.
    ///
    /// Returns `Ok(None)` if the article does not exist.
    async fn get_article(
        &self,
        title: &str,
        max_chars: usize,
    ) -> Result<Option<Article>, RetrievalError>;

    /// Searches and fetches the matching articles in ranking order.
    ///
    /// Titles that disappear between search and fetch are skipped.
    async fn search(
        &self,
        query: &str,
        max_articles: usize,
        max_chars_per_article: usize,
    ) -> Result<Vec<Article>, RetrievalError> {
        let titles = self.search_titles(query, max_articles).await?;
        let mut articles = Vec::with_capacity(titles.len());
        for title in titles {
            if let Some(article) = self.get_article(&title, max_chars_per_article).await? {
                articles.push(article);
            }
        }
        Ok(articles)
    }
}
