//! Mode to capability mapping.
//!
//! A static table: each [`QueryMode`] maps to an ordered tool list and a
//! prompt template. Resolved once per query, never mutated.

use serde::{Deserialize, Serialize};

use super::prompt::PromptId;
use super::tool::{ToolKind, ToolSet};

/// Output mode of a query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QueryMode {
    /// Prose answer with inline MLA citations.
    #[default]
    Narrative,
    /// Document of facts linked to sources.
    Structured,
}

impl QueryMode {
    /// Returns the string representation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Narrative => "narrative",
            Self::Structured => "structured",
        }
    }
}

impl std::fmt::Display for QueryMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for QueryMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "narrative" | "mla" | "text" => Ok(Self::Narrative),
            "structured" | "json" => Ok(Self::Structured),
            other => Err(format!(
                "unknown mode '{other}' (expected narrative or structured)"
            )),
        }
    }
}

const NARRATIVE_TOOLS: &[ToolKind] = &[
    ToolKind::SearchWikipedia,
    ToolKind::GetWikipediaArticle,
    ToolKind::SearchAndRetrieveArticles,
    ToolKind::FormatMlaCitation,
];

const STRUCTURED_TOOLS: &[ToolKind] = &[
    ToolKind::SearchWikipedia,
    ToolKind::GetWikipediaArticle,
    ToolKind::SearchAndRetrieveArticlesJson,
    ToolKind::RecordFact,
];

/// Tools and prompt bound to one query.
#[derive(Debug, Clone)]
pub struct Capabilities {
    /// Mode these capabilities were resolved for.
    pub mode: QueryMode,
    /// Ordered tool list.
    pub tools: ToolSet,
    /// Prompt template to use.
    pub prompt: PromptId,
}

impl Capabilities {
    /// Returns `true` if these capabilities include fact recording.
    #[must_use]
    pub fn records_facts(&self) -> bool {
        self.tools.contains(ToolKind::RecordFact)
    }
}

/// Stateless lookup from mode to capabilities.
#[derive(Debug, Clone, Copy, Default)]
pub struct CapabilityRegistry;

impl CapabilityRegistry {
    /// Resolves the capabilities for `mode`.
    #[must_use]
    pub fn resolve(mode: QueryMode) -> Capabilities {
        let (tools, prompt) = match mode {
            QueryMode::Narrative => (NARRATIVE_TOOLS, PromptId::Narrative),
            QueryMode::Structured => (STRUCTURED_TOOLS, PromptId::Structured),
        };
        Capabilities {
            mode,
            tools: ToolSet::new(tools),
            prompt,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test]
    fn test_narrative_capabilities() {
        let caps = CapabilityRegistry::resolve(QueryMode::Narrative);
        assert_eq!(caps.prompt, PromptId::Narrative);
        assert!(!caps.records_facts());
        assert!(caps.tools.contains(ToolKind::SearchAndRetrieveArticles));
        assert!(caps.tools.contains(ToolKind::FormatMlaCitation));
        assert!(!caps.tools.contains(ToolKind::SearchAndRetrieveArticlesJson));
    }

    #[test]
    fn test_structured_capabilities() {
        let caps = CapabilityRegistry::resolve(QueryMode::Structured);
        assert_eq!(caps.prompt, PromptId::Structured);
        assert!(caps.records_facts());
        assert!(caps.tools.contains(ToolKind::SearchAndRetrieveArticlesJson));
        assert!(!caps.tools.contains(ToolKind::FormatMlaCitation));
        assert_eq!(caps.tools.kinds().last(), Some(&ToolKind::RecordFact));
    }

    #[test]
    fn test_resolution_is_stable() {
        let a = CapabilityRegistry::resolve(QueryMode::Structured);
        let b = CapabilityRegistry::resolve(QueryMode::Structured);
        assert_eq!(a.tools.kinds(), b.tools.kinds());
    }

    #[test_case("narrative", QueryMode::Narrative)]
    #[test_case("MLA", QueryMode::Narrative)]
    #[test_case("structured", QueryMode::Structured)]
    #[test_case("json", QueryMode::Structured)]
    fn test_mode_from_str(input: &str, expected: QueryMode) {
        assert_eq!(input.parse::<QueryMode>(), Ok(expected));
    }

    #[test]
    fn test_mode_from_str_invalid() {
        assert!("yaml".parse::<QueryMode>().is_err());
    }
}
