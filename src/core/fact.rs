//! Facts and their categories.

use serde::{Deserialize, Serialize};

use crate::error::SchemaViolation;

/// Category of an extracted fact.
///
/// The set is closed: anything else is rejected by
/// [`FactCategory::parse`] rather than coerced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FactCategory {
    /// What something is.
    Definition,
    /// When and how something came to be.
    History,
    /// Where something is used.
    Application,
    /// How something works.
    Technical,
    /// Anything else worth keeping.
    Other,
}

impl FactCategory {
    /// All categories, in declaration order.
    pub const ALL: [Self; 5] = [
        Self::Definition,
        Self::History,
        Self::Application,
        Self::Technical,
        Self::Other,
    ];

    /// Parses a category name (case-insensitive, surrounding whitespace ignored).
    ///
    /// # Errors
    ///
    /// Returns [`SchemaViolation::InvalidCategory`] for unknown names.
    pub fn parse(s: &str) -> Result<Self, SchemaViolation> {
        match s.trim().to_lowercase().as_str() {
            "definition" => Ok(Self::Definition),
            "history" => Ok(Self::History),
            "application" => Ok(Self::Application),
            "technical" => Ok(Self::Technical),
            "other" => Ok(Self::Other),
            _ => Err(SchemaViolation::InvalidCategory {
                category: s.to_string(),
            }),
        }
    }

    /// Returns the string representation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Definition => "definition",
            Self::History => "history",
            Self::Application => "application",
            Self::Technical => "technical",
            Self::Other => "other",
        }
    }
}

impl std::fmt::Display for FactCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An atomic claim linked to the sources that support it.
///
/// Only [`FactAccumulator::record_fact`](super::FactAccumulator::record_fact)
/// constructs these, so `source_ids` is always non-empty, duplicate-free and
/// refers to registered sources.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fact {
    /// The claim itself.
    pub fact: String,
    /// Supporting source IDs, in the order the model gave them.
    pub source_ids: Vec<String>,
    /// Category of the claim.
    pub category: FactCategory,
}
