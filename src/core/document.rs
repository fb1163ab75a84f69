//! The structured output document.

use serde::{Deserialize, Serialize};

use super::fact::Fact;
use super::source::Source;

/// Canonical result of a structured-mode query.
///
/// Assembled from accumulator state only; never parsed out of model text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StructuredDocument {
    /// The question that was asked.
    pub query: String,
    /// Sources registered during the query, in registration order.
    pub sources: Vec<Source>,
    /// Facts recorded during the query, in recording order.
    pub facts: Vec<Fact>,
    /// Short summary derived from the facts.
    pub summary: String,
}

impl StructuredDocument {
    /// Pretty-printed JSON rendering.
    ///
    /// # Errors
    ///
    /// Returns the serializer error (not expected for this type).
    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}
