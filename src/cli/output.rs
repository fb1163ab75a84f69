//! Output formatting for CLI commands.

use std::fmt::Write;

use serde::Serialize;

use crate::agent::{QueryResponse, StreamEvent};
use crate::core::StructuredDocument;

/// How command results are rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    /// Human-readable text.
    #[default]
    Text,
    /// Pretty-printed JSON.
    Json,
    /// One JSON object per line.
    Ndjson,
}

impl OutputFormat {
    /// Parses a format name, falling back to [`OutputFormat::Text`].
    #[must_use]
    pub fn parse(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "json" => Self::Json,
            "ndjson" | "jsonl" => Self::Ndjson,
            _ => Self::Text,
        }
    }

    /// Serializes `value` for this format (compact for NDJSON).
    #[must_use]
    pub fn to_json<T: Serialize>(self, value: &T) -> String {
        let json = match self {
            Self::Ndjson => serde_json::to_string(value),
            Self::Text | Self::Json => serde_json::to_string_pretty(value),
        };
        json.unwrap_or_else(|e| format!(r#"{{"error":"serialization failed: {e}"}}"#))
    }
}

/// Renders a stream event, or `None` if this format shows nothing for it.
#[must_use]
pub fn format_event(event: &StreamEvent, format: OutputFormat) -> Option<String> {
    match format {
        OutputFormat::Ndjson => Some(format!("{}\n", OutputFormat::Ndjson.to_json(event))),
        OutputFormat::Json => match event {
            StreamEvent::Document { document } => Some(format!("{}\n", format.to_json(document))),
            _ => None,
        },
        OutputFormat::Text => match event {
            StreamEvent::Chunk { chunk } => Some(chunk.clone()),
            StreamEvent::Progress { progress } => Some(format!(
                "\r[{} source(s), {} fact(s)]",
                progress.sources, progress.facts
            )),
            StreamEvent::Document { document } => Some(format!("\n{}", format_document(document))),
            StreamEvent::Done { .. } => Some("\n".to_string()),
            StreamEvent::Error { .. } => None,
        },
    }
}

/// Renders a finished query response.
#[must_use]
pub fn format_response(response: &QueryResponse, format: OutputFormat) -> String {
    match (format, response) {
        (OutputFormat::Text, QueryResponse::Narrative { result }) => format!("{result}\n"),
        (OutputFormat::Text, QueryResponse::Structured { document }) => format_document(document),
        (OutputFormat::Json | OutputFormat::Ndjson, _) => format!("{}\n", format.to_json(response)),
    }
}

/// Renders a structured document as readable text.
#[must_use]
pub fn format_document(document: &StructuredDocument) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Query: {}\n", document.query);
    let _ = writeln!(out, "{}\n", document.summary);

    if !document.facts.is_empty() {
        let _ = writeln!(out, "Facts:");
        for (i, fact) in document.facts.iter().enumerate() {
            let _ = writeln!(
                out,
                "  {}. [{}] {} ({})",
                i + 1,
                fact.category,
                fact.fact,
                fact.source_ids.join(", ")
            );
        }
        out.push('\n');
    }

    if !document.sources.is_empty() {
        let _ = writeln!(out, "Sources:");
        for source in &document.sources {
            let _ = writeln!(
                out,
                "  {}: {} <{}> (modified {})",
                source.id, source.title, source.url, source.last_modified
            );
        }
    }
    out
}
