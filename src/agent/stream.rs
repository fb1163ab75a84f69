//! Client-facing streaming events.
//!
//! Narrative queries stream text chunks. Structured queries stream progress
//! updates, then exactly one document, then `done`. A fatal error ends
//! either kind with a single `error` event.

use std::pin::Pin;

use async_stream::stream;
use futures_util::{Stream, StreamExt};
use serde::Serialize;
use tracing::{debug, info, warn};

use super::agentic_loop::AgentEvent;
use super::capability::QueryMode;
use super::config::CitationPolicy;
use super::executor::Progress;
use super::orchestrator::{QueryLifecycle, QueryPhase};
use crate::core::StructuredDocument;
use crate::error::AgentError;

/// One event of a streamed query. Serializes as a single-key JSON object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum StreamEvent {
    /// Narrative text fragment.
    Chunk {
        /// Text to append.
        chunk: String,
    },
    /// Structured progress update.
    Progress {
        /// Current counts.
        progress: Progress,
    },
    /// The finished structured document.
    Document {
        /// Complete document.
        document: StructuredDocument,
    },
    /// Normal end of stream.
    Done {
        /// Always `true`.
        done: bool,
    },
    /// Fatal error; nothing follows.
    Error {
        /// Error message.
        error: String,
    },
}

impl StreamEvent {
    /// Text fragment event.
    #[must_use]
    pub fn chunk(text: impl Into<String>) -> Self {
        Self::Chunk { chunk: text.into() }
    }

    /// End-of-stream event.
    #[must_use]
    pub const fn done() -> Self {
        Self::Done { done: true }
    }

    /// Error event.
    #[must_use]
    pub fn error(e: &AgentError) -> Self {
        Self::Error {
            error: e.to_string(),
        }
    }

    /// Returns `true` for events after which nothing more is emitted.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Done { .. } | Self::Error { .. })
    }
}

/// Boxed stream of client events.
pub type EventStream = Pin<Box<dyn Stream<Item = StreamEvent> + Send>>;

/// Converts loop events for one query into client events.
pub(crate) fn adapt<S>(
    events: S,
    query: String,
    mode: QueryMode,
    citations: CitationPolicy,
    mut lifecycle: QueryLifecycle,
) -> EventStream
where
    S: Stream<Item = Result<AgentEvent, AgentError>> + Send + 'static,
{
    Box::pin(stream! {
        let mut events = Box::pin(events);
        let mut transcript = String::new();
        let mut last_progress = Progress::default();

        if let Err(e) = lifecycle.advance(QueryPhase::Streaming) {
            yield StreamEvent::error(&e);
            return;
        }

        while let Some(event) = events.next().await {
            match event {
                Ok(AgentEvent::Text(text)) => {
                    if mode == QueryMode::Narrative {
                        transcript.push_str(&text);
                        yield StreamEvent::chunk(text);
                    }
                }
                Ok(AgentEvent::ToolFinished { name, progress, .. }) => {
                    debug!(
                        tool = %name,
                        sources = progress.sources,
                        facts = progress.facts,
                        "tool finished"
                    );
                    if mode == QueryMode::Structured && progress != last_progress {
                        last_progress = progress;
                        yield StreamEvent::Progress { progress };
                    }
                }
                Ok(AgentEvent::Completed { outcome, accumulator }) => {
                    let finished = match mode {
                        QueryMode::Structured => {
                            let document = accumulator.unwrap_or_default().into_document(&query);
                            info!(
                                sources = document.sources.len(),
                                facts = document.facts.len(),
                                iterations = outcome.iterations,
                                "structured stream complete"
                            );
                            Ok(Some(document))
                        }
                        QueryMode::Narrative => citations.check(&transcript).map(|()| None),
                    };
                    match finished {
                        Ok(document) => {
                            settle(&mut lifecycle, QueryPhase::Completed);
                            if let Some(document) = document {
                                yield StreamEvent::Document { document };
                            }
                            yield StreamEvent::done();
                        }
                        Err(e) => {
                            settle(&mut lifecycle, QueryPhase::Failed);
                            warn!(error = %e, "stream failed");
                            yield StreamEvent::error(&e);
                        }
                    }
                    return;
                }
                Err(e) => {
                    settle(&mut lifecycle, QueryPhase::Failed);
                    warn!(error = %e, "stream failed");
                    yield StreamEvent::error(&e);
                    return;
                }
            }
        }

        let e = AgentError::Orchestration {
            message: "agent stopped without completing".to_string(),
        };
        settle(&mut lifecycle, QueryPhase::Failed);
        yield StreamEvent::error(&e);
    })
}

/// Moves the query into a terminal phase, logging a refused transition.
fn settle(lifecycle: &mut QueryLifecycle, phase: QueryPhase) {
    if let Err(e) = lifecycle.advance(phase) {
        warn!(error = %e, "query phase not advanced");
    }
}
