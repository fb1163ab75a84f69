//! Per-query store of sources and facts.
//!
//! A [`FactAccumulator`] belongs to exactly one query. The orchestrator
//! creates it, moves it into that query's tool executor, and takes it back
//! when the agent loop ends to build the [`StructuredDocument`]. It is never
//! shared, so it needs no interior mutability.

use std::collections::BTreeSet;

use tracing::{debug, warn};

use super::document::StructuredDocument;
use super::fact::{Fact, FactCategory};
use super::source::{Source, SourceMetadata};
use crate::error::SchemaViolation;

/// Summary used when nothing was recorded.
const EMPTY_SUMMARY: &str = "No facts were extracted from the sources.";

/// Sources and facts discovered during a single query.
#[derive(Debug, Default)]
pub struct FactAccumulator {
    sources: Vec<Source>,
    facts: Vec<Fact>,
}

impl FactAccumulator {
    /// Creates an empty accumulator.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a source and returns its ID.
    ///
    /// If a source with the same `(title, url)` is already registered, its
    /// existing ID is returned and nothing is appended.
    pub fn register_source(&mut self, meta: SourceMetadata) -> String {
        if let Some(existing) = self.sources.iter().find(|s| s.same_identity(&meta)) {
            debug!(id = %existing.id, title = %meta.title, "source already registered");
            return existing.id.clone();
        }

        let source = Source::new(self.sources.len() + 1, meta);
        let id = source.id.clone();
        debug!(id = %id, title = %source.title, "registered source");
        self.sources.push(source);
        id
    }

    /// Records a fact from raw tool arguments.
    ///
    /// Duplicate IDs within `source_ids` are collapsed, keeping the first
    /// occurrence. On rejection the fact list is left untouched.
    ///
    /// # Errors
    ///
    /// Returns a [`SchemaViolation`] if the text is empty, no sources are
    /// given, the category is unknown, or any source ID is unregistered.
    pub fn record_fact(
        &mut self,
        text: &str,
        source_ids: &[String],
        category: &str,
    ) -> Result<&Fact, SchemaViolation> {
        let result = FactCategory::parse(category)
            .and_then(|category| self.validate(text, source_ids, category));

        match result {
            Ok(fact) => {
                debug!(
                    category = %fact.category,
                    sources = fact.source_ids.len(),
                    total = self.facts.len() + 1,
                    "recorded fact"
                );
                self.facts.push(fact);
                Ok(&self.facts[self.facts.len() - 1])
            }
            Err(violation) => {
                warn!(%violation, "rejected fact");
                Err(violation)
            }
        }
    }

    fn validate(
        &self,
        text: &str,
        source_ids: &[String],
        category: FactCategory,
    ) -> Result<Fact, SchemaViolation> {
        let text = text.trim();
        if text.is_empty() {
            return Err(SchemaViolation::EmptyFact);
        }
        if source_ids.is_empty() {
            return Err(SchemaViolation::MissingSources);
        }

        let mut seen = BTreeSet::new();
        let mut ids = Vec::with_capacity(source_ids.len());
        for raw in source_ids {
            let id = raw.trim();
            if !self.sources.iter().any(|s| s.id == id) {
                return Err(SchemaViolation::InvalidReference {
                    id: id.to_string(),
                    known: self.known_ids(),
                });
            }
            if seen.insert(id) {
                ids.push(id.to_string());
            }
        }

        Ok(Fact {
            fact: text.to_string(),
            source_ids: ids,
            category,
        })
    }

    fn known_ids(&self) -> String {
        if self.sources.is_empty() {
            return "none registered yet".to_string();
        }
        self.sources
            .iter()
            .map(|s| s.id.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// Registered sources, in registration order.
    #[must_use]
    pub fn sources(&self) -> &[Source] {
        &self.sources
    }

    /// Recorded facts, in recording order.
    #[must_use]
    pub fn facts(&self) -> &[Fact] {
        &self.facts
    }

    /// Number of registered sources.
    #[must_use]
    pub const fn source_count(&self) -> usize {
        self.sources.len()
    }

    /// Number of recorded facts.
    #[must_use]
    pub const fn fact_count(&self) -> usize {
        self.facts.len()
    }

    /// Builds a short summary from the recorded facts.
    ///
    /// Leads with the first definition fact when there is one, then states
    /// how many facts were found across how many categories.
    #[must_use]
    pub fn summary(&self) -> String {
        if self.facts.is_empty() {
            return EMPTY_SUMMARY.to_string();
        }

        let categories: BTreeSet<FactCategory> = self.facts.iter().map(|f| f.category).collect();
        let counts = format!(
            "The sources provided {} facts across {} categories.",
            self.facts.len(),
            categories.len()
        );

        match self
            .facts
            .iter()
            .find(|f| f.category == FactCategory::Definition)
        {
            Some(def) => format!("{} {counts}", def.fact),
            None => counts,
        }
    }

    /// Assembles the structured document from current state.
    #[must_use]
    pub fn to_document(&self, query: &str) -> StructuredDocument {
        StructuredDocument {
            query: query.to_string(),
            sources: self.sources.clone(),
            facts: self.facts.clone(),
            summary: self.summary(),
        }
    }

    /// Consumes the accumulator, moving its state into the document.
    #[must_use]
    pub fn into_document(self, query: &str) -> StructuredDocument {
        let summary = self.summary();
        StructuredDocument {
            query: query.to_string(),
            sources: self.sources,
            facts: self.facts,
            summary,
        }
    }
}
