//! MLA 9th edition citations for Wikipedia articles.

use std::sync::LazyLock;

use chrono::{Datelike, NaiveDate};
use regex::Regex;

use super::Article;

/// Formats a citation string for an article.
pub trait CitationFormatter: Send + Sync {
    /// Citation style name (e.g. `"MLA"`).
    fn style(&self) -> &'static str;

    /// Formats one citation, using `accessed` as the access date.
    fn format(&self, article: &Article, accessed: NaiveDate) -> String;

    /// Formats a Works Cited list, one citation per line.
    fn works_cited(&self, articles: &[Article], accessed: NaiveDate) -> String {
        articles
            .iter()
            .map(|a| self.format(a, accessed))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// MLA 9th edition formatter.
///
/// `"Title." *Wikipedia*, Wikimedia Foundation, 15 Nov. 2024,
/// en.wikipedia.org/wiki/Title. Accessed 21 Nov. 2025.`
#[derive(Debug, Clone, Copy, Default)]
pub struct MlaCitation;

impl CitationFormatter for MlaCitation {
    fn style(&self) -> &'static str {
        "MLA"
    }

    fn format(&self, article: &Article, accessed: NaiveDate) -> String {
        let modified = article
            .last_modified
            .map(|ts| format!(" {},", mla_date(ts.date_naive())))
            .unwrap_or_default();
        let url = article
            .url
            .trim_start_matches("https://")
            .trim_start_matches("http://");

        format!(
            "\"{title}.\" *Wikipedia*, Wikimedia Foundation,{modified} {url}. Accessed {accessed}.",
            title = article.title,
            accessed = mla_date(accessed),
        )
    }
}

static CITATION_MARKER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)works cited|wikimedia foundation|\(\s*"[^"\n]+"\s*\)"#)
        .unwrap_or_else(|_| unreachable!())
});

/// Returns `true` if `text` contains an MLA citation marker: a Works Cited
/// heading, a full Wikipedia citation, or a parenthetical `("Title")`.
#[must_use]
pub fn has_citation_marker(text: &str) -> bool {
    CITATION_MARKER.is_match(text)
}

/// Formats a date the MLA way: `21 Nov. 2025`.
#[must_use]
pub fn mla_date(date: NaiveDate) -> String {
    const MONTHS: [&str; 12] = [
        "Jan.", "Feb.", "Mar.", "Apr.", "May", "June", "July", "Aug.", "Sept.", "Oct.", "Nov.",
        "Dec.",
    ];
    let month = MONTHS[date.month0() as usize];
    format!("{} {month} {}", date.day(), date.year())
}
