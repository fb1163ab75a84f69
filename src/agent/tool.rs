//! Tool type definitions for function-calling.
//!
//! Provides provider-agnostic types for tool definitions, calls, and results,
//! plus the fixed catalog of tools the research agent can be given. Which
//! subset a query gets is decided by the
//! [`CapabilityRegistry`](super::capability::CapabilityRegistry).

use serde::{Deserialize, Serialize};
use serde_json::json;

/// A tool definition that can be sent to an LLM for function-calling.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDefinition {
    /// Tool name (must match [`ToolKind::name`]).
    pub name: String,
    /// Human-readable description of what the tool does.
    pub description: String,
    /// JSON Schema object describing the tool's parameters.
    pub parameters: serde_json::Value,
}

/// A tool call requested by the LLM.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolCall {
    /// Unique identifier for this call (assigned by the provider).
    pub id: String,
    /// Name of the tool to invoke.
    pub name: String,
    /// JSON-encoded arguments for the tool.
    pub arguments: String,
}

/// The result of executing a tool call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolResult {
    /// ID of the tool call this result corresponds to.
    pub tool_call_id: String,
    /// Result content (text on success, error message on failure).
    pub content: String,
    /// Whether this result represents an error.
    pub is_error: bool,
}

impl ToolResult {
    /// Successful result.
    #[must_use]
    pub fn ok(call: &ToolCall, content: String) -> Self {
        Self {
            tool_call_id: call.id.clone(),
            content,
            is_error: false,
        }
    }

    /// Error result reported back to the model.
    #[must_use]
    pub fn error(call: &ToolCall, content: String) -> Self {
        Self {
            tool_call_id: call.id.clone(),
            content,
            is_error: true,
        }
    }
}

/// Every operation the research agent can be bound to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ToolKind {
    /// List matching article titles with URL and word count.
    SearchWikipedia,
    /// Fetch one article by title.
    GetWikipediaArticle,
    /// Search and fetch articles, followed by a Works Cited list.
    SearchAndRetrieveArticles,
    /// Search and fetch articles labelled with source IDs.
    SearchAndRetrieveArticlesJson,
    /// MLA citation for one article.
    FormatMlaCitation,
    /// Record one fact in the query's accumulator.
    RecordFact,
}

impl ToolKind {
    /// Wire name of the tool.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::SearchWikipedia => "search_wikipedia",
            Self::GetWikipediaArticle => "get_wikipedia_article",
            Self::SearchAndRetrieveArticles => "search_and_retrieve_articles",
            Self::SearchAndRetrieveArticlesJson => "search_and_retrieve_articles_json",
            Self::FormatMlaCitation => "format_mla_citation",
            Self::RecordFact => "record_fact",
        }
    }

    /// Looks a tool up by wire name.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        [
            Self::SearchWikipedia,
            Self::GetWikipediaArticle,
            Self::SearchAndRetrieveArticles,
            Self::SearchAndRetrieveArticlesJson,
            Self::FormatMlaCitation,
            Self::RecordFact,
        ]
        .into_iter()
        .find(|k| k.name() == name)
    }

    /// Function-calling schema for this tool.
    #[must_use]
    pub fn definition(self) -> ToolDefinition {
        match self {
            Self::SearchWikipedia => def_search_wikipedia(),
            Self::GetWikipediaArticle => def_get_wikipedia_article(),
            Self::SearchAndRetrieveArticles => def_search_and_retrieve(
                self.name(),
                "Search Wikipedia and retrieve the full content of the most relevant \
                 articles, followed by MLA 9th edition citations for each (Works Cited).",
            ),
            Self::SearchAndRetrieveArticlesJson => def_search_and_retrieve(
                self.name(),
                "Search Wikipedia and retrieve the full content of the most relevant \
                 articles. Each article is labelled with a SOURCE ID to use when \
                 recording facts.",
            ),
            Self::FormatMlaCitation => def_format_mla_citation(),
            Self::RecordFact => def_record_fact(),
        }
    }
}

impl std::fmt::Display for ToolKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// An ordered set of tools bound to one query.
#[derive(Debug, Clone, Default)]
pub struct ToolSet {
    kinds: Vec<ToolKind>,
}

impl ToolSet {
    /// Creates a set from an ordered list of tools.
    #[must_use]
    pub fn new(kinds: &[ToolKind]) -> Self {
        Self {
            kinds: kinds.to_vec(),
        }
    }

    /// Tools in this set, in binding order.
    #[must_use]
    pub fn kinds(&self) -> &[ToolKind] {
        &self.kinds
    }

    /// Returns `true` if `kind` is bound.
    #[must_use]
    pub fn contains(&self, kind: ToolKind) -> bool {
        self.kinds.contains(&kind)
    }

    /// Returns the tool definitions in this set.
    #[must_use]
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.kinds.iter().map(|k| k.definition()).collect()
    }

    /// Returns `true` if this set contains no tools.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.kinds.is_empty()
    }

    /// Returns the number of tools in this set.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.kinds.len()
    }
}

// ---------------------------------------------------------------------------
// Tool schema definitions
// ---------------------------------------------------------------------------

fn def_search_wikipedia() -> ToolDefinition {
    ToolDefinition {
        name: ToolKind::SearchWikipedia.name().to_string(),
        description: "Search Wikipedia for articles related to a query. Returns titles, \
                       URLs and word counts only."
            .to_string(),
        parameters: json!({
            "type": "object",
            "properties": {
                "query": {
                    "type": "string",
                    "description": "Search query text."
                },
                "max_articles": {
                    "type": "integer",
                    "description": "Maximum number of articles to list. Defaults to 3.",
                    "default": 3
                }
            },
            "required": ["query"],
            "additionalProperties": false
        }),
    }
}

fn def_get_wikipedia_article() -> ToolDefinition {
    ToolDefinition {
        name: ToolKind::GetWikipediaArticle.name().to_string(),
        description: "Retrieve a specific Wikipedia article by its exact title.".to_string(),
        parameters: json!({
            "type": "object",
            "properties": {
                "title": {
                    "type": "string",
                    "description": "Exact article title."
                },
                "max_chars": {
                    "type": "integer",
                    "description": "Maximum characters of body text. Defaults to 3000.",
                    "default": 3000
                }
            },
            "required": ["title"],
            "additionalProperties": false
        }),
    }
}

fn def_search_and_retrieve(name: &str, description: &str) -> ToolDefinition {
    ToolDefinition {
        name: name.to_string(),
        description: description.to_string(),
        parameters: json!({
            "type": "object",
            "properties": {
                "query": {
                    "type": "string",
                    "description": "Search query text."
                },
                "max_articles": {
                    "type": "integer",
                    "description": "Maximum number of articles to retrieve. Defaults to 3.",
                    "default": 3
                },
                "max_chars_per_article": {
                    "type": "integer",
                    "description": "Maximum characters of body text per article. Defaults to 3000.",
                    "default": 3000
                }
            },
            "required": ["query"],
            "additionalProperties": false
        }),
    }
}

fn def_format_mla_citation() -> ToolDefinition {
    ToolDefinition {
        name: ToolKind::FormatMlaCitation.name().to_string(),
        description: "Generate an MLA 9th edition citation for a Wikipedia article.".to_string(),
        parameters: json!({
            "type": "object",
            "properties": {
                "title": {
                    "type": "string",
                    "description": "Exact article title."
                }
            },
            "required": ["title"],
            "additionalProperties": false
        }),
    }
}

fn def_record_fact() -> ToolDefinition {
    ToolDefinition {
        name: ToolKind::RecordFact.name().to_string(),
        description: "Record one fact discovered in the retrieved articles. Call once per \
                       fact. Every fact must cite at least one SOURCE ID that appeared in a \
                       retrieval result."
            .to_string(),
        parameters: json!({
            "type": "object",
            "properties": {
                "fact": {
                    "type": "string",
                    "description": "The fact, stated specifically and precisely."
                },
                "source_ids": {
                    "type": "array",
                    "items": { "type": "string" },
                    "minItems": 1,
                    "description": "SOURCE IDs supporting the fact, e.g. [\"source_1\"]."
                },
                "category": {
                    "type": "string",
                    "enum": ["definition", "history", "application", "technical", "other"],
                    "description": "Category of the fact."
                }
            },
            "required": ["fact", "source_ids", "category"],
            "additionalProperties": false
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: [ToolKind; 6] = [
        ToolKind::SearchWikipedia,
        ToolKind::GetWikipediaArticle,
        ToolKind::SearchAndRetrieveArticles,
        ToolKind::SearchAndRetrieveArticlesJson,
        ToolKind::FormatMlaCitation,
        ToolKind::RecordFact,
    ];

    #[test]
    fn test_names_resolve_back() {
        for kind in ALL {
            assert_eq!(ToolKind::from_name(kind.name()), Some(kind));
        }
        assert_eq!(ToolKind::from_name("storage_stats"), None);
    }

    #[test]
    fn test_definitions_match_names() {
        for kind in ALL {
            let def = kind.definition();
            assert_eq!(def.name, kind.name());
            assert_eq!(def.parameters["type"], "object");
            assert!(def.parameters["required"].is_array());
        }
    }

    #[test]
    fn test_record_fact_schema_enumerates_categories() {
        let def = ToolKind::RecordFact.definition();
        let categories = def.parameters["properties"]["category"]["enum"]
            .as_array()
            .map_or(0, Vec::len);
        assert_eq!(categories, 5);
    }

    #[test]
    fn test_tool_set_order_preserved() {
        let set = ToolSet::new(&[ToolKind::RecordFact, ToolKind::SearchWikipedia]);
        let names: Vec<String> = set.definitions().into_iter().map(|d| d.name).collect();
        assert_eq!(names, vec!["record_fact", "search_wikipedia"]);
        assert!(set.contains(ToolKind::RecordFact));
        assert!(!set.contains(ToolKind::FormatMlaCitation));
        assert_eq!(set.len(), 2);
    }
}
