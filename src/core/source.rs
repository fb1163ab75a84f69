//! Source metadata for retrieved articles.

use serde::{Deserialize, Serialize};

/// Prefix of accumulator-assigned source IDs.
pub const SOURCE_ID_PREFIX: &str = "source_";

/// Metadata for an article, before an ID is assigned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceMetadata {
    /// Article title.
    pub title: String,
    /// Canonical article URL.
    pub url: String,
    /// Last revision date (`YYYY-MM-DD`) or `"Unknown"`.
    pub last_modified: String,
    /// Word count of the full article.
    pub word_count: usize,
}

/// A registered source, as it appears in the structured document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Source {
    /// Query-scoped identifier (`source_1`, `source_2`, ...).
    pub id: String,
    /// Article title.
    pub title: String,
    /// Canonical article URL.
    pub url: String,
    /// Last revision date (`YYYY-MM-DD`) or `"Unknown"`.
    pub last_modified: String,
    /// Word count of the full article.
    pub word_count: usize,
}

impl Source {
    /// Builds a source from metadata and its 1-based sequence number.
    #[must_use]
    pub fn new(seq: usize, meta: SourceMetadata) -> Self {
        Self {
            id: format!("{SOURCE_ID_PREFIX}{seq}"),
            title: meta.title,
            url: meta.url,
            last_modified: meta.last_modified,
            word_count: meta.word_count,
        }
    }

    /// Returns `true` if this source has the same identity as `meta`.
    ///
    /// Identity is the `(title, url)` pair; content is not compared.
    #[must_use]
    pub fn same_identity(&self, meta: &SourceMetadata) -> bool {
        self.title == meta.title && self.url == meta.url
    }
}
