//! Query orchestrator.
//!
//! Each query gets its own [`ToolExecutor`], and with it its own
//! [`FactAccumulator`](crate::core::FactAccumulator). The provider, retriever
//! and citation formatter are shared and stateless per query.
//!
//! ```text
//! query → validate → CapabilityRegistry::resolve(mode)
//!   ├── ResearchAgent (prompt + tool definitions)
//!   ├── ToolExecutor (retriever, citations, accumulator)
//!   ├── agentic loop (sync) or event stream
//!   └── narrative text + citation check │ structured document
//! ```

use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::agentic_loop::{agentic_loop, agentic_loop_stream};
use super::capability::{CapabilityRegistry, QueryMode};
use super::client::create_provider;
use super::config::AgentConfig;
use super::executor::{RetrievalLimits, ToolExecutor};
use super::prompt::{PromptSet, build_user_prompt};
use super::provider::LlmProvider;
use super::research::ResearchAgent;
use super::stream::{EventStream, adapt};
use super::traits::Agent;
use crate::core::StructuredDocument;
use crate::error::AgentError;
use crate::retrieval::{CitationFormatter, MlaCitation, Retriever, WikipediaClient};

/// Maximum query length in bytes.
pub const MAX_QUERY_LEN: usize = 10_000;

/// Lifecycle phase of a single query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryPhase {
    /// Not started.
    Idle,
    /// Capabilities resolved.
    ToolsSelected,
    /// Agent loop running.
    ExecutingAgent,
    /// Events being delivered to the caller.
    Streaming,
    /// Result being assembled.
    Collecting,
    /// Finished successfully.
    Completed,
    /// Finished with an error.
    Failed,
}

impl QueryPhase {
    /// Whether `next` may follow `self`.
    #[must_use]
    pub const fn can_advance_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Idle, Self::ToolsSelected)
                | (Self::ToolsSelected, Self::ExecutingAgent)
                | (Self::ExecutingAgent, Self::Streaming | Self::Collecting | Self::Failed)
                | (Self::Streaming | Self::Collecting, Self::Completed | Self::Failed)
        )
    }

    /// Returns `true` for `Completed` and `Failed`.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

impl fmt::Display for QueryPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::ToolsSelected => "tools_selected",
            Self::ExecutingAgent => "executing_agent",
            Self::Streaming => "streaming",
            Self::Collecting => "collecting",
            Self::Completed => "completed",
            Self::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Tracks the phase of one query and rejects illegal transitions.
#[derive(Debug)]
pub struct QueryLifecycle {
    phase: QueryPhase,
}

impl QueryLifecycle {
    /// Starts in [`QueryPhase::Idle`].
    #[must_use]
    pub const fn new() -> Self {
        Self {
            phase: QueryPhase::Idle,
        }
    }

    /// Current phase.
    #[must_use]
    pub const fn phase(&self) -> QueryPhase {
        self.phase
    }

    /// Moves to `next`.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::Orchestration`] if the transition is not allowed.
    pub fn advance(&mut self, next: QueryPhase) -> Result<(), AgentError> {
        if !self.phase.can_advance_to(next) {
            return Err(AgentError::Orchestration {
                message: format!("invalid query transition {} -> {next}", self.phase),
            });
        }
        debug!(from = %self.phase, to = %next, "query phase");
        self.phase = next;
        Ok(())
    }
}

impl Default for QueryLifecycle {
    fn default() -> Self {
        Self::new()
    }
}

/// A query as submitted by a caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryRequest {
    /// Question text.
    pub query: String,
    /// Output mode.
    #[serde(default)]
    pub mode: QueryMode,
    /// Whether to stream events.
    #[serde(default)]
    pub stream: bool,
}

/// Non-streaming answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum QueryResponse {
    /// Narrative answer with inline citations.
    Narrative {
        /// Answer text.
        result: String,
    },
    /// Structured fact document.
    Structured {
        /// The document.
        document: StructuredDocument,
    },
}

impl QueryResponse {
    /// Narrative text, if any.
    #[must_use]
    pub fn result(&self) -> Option<&str> {
        match self {
            Self::Narrative { result } => Some(result),
            Self::Structured { .. } => None,
        }
    }

    /// Structured document, if any.
    #[must_use]
    pub const fn document(&self) -> Option<&StructuredDocument> {
        match self {
            Self::Narrative { .. } => None,
            Self::Structured { document } => Some(document),
        }
    }
}

/// What [`Orchestrator::start_query`] hands back.
pub enum QueryReply {
    /// The finished answer.
    Completed(QueryResponse),
    /// A single-use event stream.
    Streaming(EventStream),
}

impl fmt::Debug for QueryReply {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Completed(response) => f.debug_tuple("Completed").field(response).finish(),
            Self::Streaming(_) => f.write_str("Streaming(..)"),
        }
    }
}

/// Runs research queries against a provider and a retriever.
pub struct Orchestrator {
    provider: Arc<dyn LlmProvider>,
    retriever: Arc<dyn Retriever>,
    citations: Arc<dyn CitationFormatter>,
    config: AgentConfig,
    prompts: PromptSet,
}

impl Orchestrator {
    /// Creates an orchestrator from explicit collaborators.
    ///
    /// Loads prompt templates from [`AgentConfig::prompt_dir`], falling back
    /// to compiled-in defaults.
    pub fn new(
        provider: Arc<dyn LlmProvider>,
        retriever: Arc<dyn Retriever>,
        citations: Arc<dyn CitationFormatter>,
        config: AgentConfig,
    ) -> Self {
        let prompts = PromptSet::load(config.prompt_dir.as_deref());
        Self {
            provider,
            retriever,
            citations,
            config,
            prompts,
        }
    }

    /// Creates an orchestrator with the configured provider, the Wikipedia
    /// client and MLA citations.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError`] if the provider or HTTP client cannot be built.
    pub fn from_config(config: AgentConfig) -> Result<Self, AgentError> {
        let provider = create_provider(&config)?;
        let retriever = Arc::new(WikipediaClient::new(&config.wikipedia())?);
        Ok(Self::new(provider, retriever, Arc::new(MlaCitation), config))
    }

    /// Replaces the prompt set.
    #[must_use]
    pub fn with_prompts(mut self, prompts: PromptSet) -> Self {
        self.prompts = prompts;
        self
    }

    /// The active configuration.
    #[must_use]
    pub const fn config(&self) -> &AgentConfig {
        &self.config
    }

    /// Runs `request`, streaming or not as it asks.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError`] on validation failures and, when not streaming,
    /// on any fatal query error.
    pub async fn start_query(&self, request: QueryRequest) -> Result<QueryReply, AgentError> {
        if request.stream {
            self.query_stream(&request.query, request.mode)
                .map(QueryReply::Streaming)
        } else {
            self.query(&request.query, request.mode)
                .await
                .map(QueryReply::Completed)
        }
    }

    /// Runs a query to completion.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError`] on validation, provider, retrieval or
    /// loop-limit failures, and on a missing citation under `fail`
    /// strictness. Nothing partial is returned on error.
    pub async fn query(&self, query: &str, mode: QueryMode) -> Result<QueryResponse, AgentError> {
        validate_query(query)?;
        let start = Instant::now();
        let mut lifecycle = QueryLifecycle::new();

        let (agent, mut executor) = self.prepare(mode, &mut lifecycle)?;
        let mut request = agent.build_request(&build_user_prompt(query, mode), false);
        lifecycle.advance(QueryPhase::ExecutingAgent)?;
        info!(mode = %mode, provider = self.provider.name(), "query started");

        let outcome = match agentic_loop(
            self.provider.as_ref(),
            &mut request,
            &mut executor,
            agent.max_tool_iterations(),
        )
        .await
        {
            Ok(outcome) => outcome,
            Err(e) => {
                lifecycle.advance(QueryPhase::Failed)?;
                warn!(error = %e, "query failed");
                return Err(e);
            }
        };
        lifecycle.advance(QueryPhase::Collecting)?;

        let response = match mode {
            QueryMode::Narrative => {
                if let Err(e) = self.config.citations.check(&outcome.transcript) {
                    lifecycle.advance(QueryPhase::Failed)?;
                    warn!(error = %e, "query failed");
                    return Err(e);
                }
                QueryResponse::Narrative {
                    result: outcome.transcript,
                }
            }
            QueryMode::Structured => QueryResponse::Structured {
                document: executor
                    .into_accumulator()
                    .unwrap_or_default()
                    .into_document(query),
            },
        };
        lifecycle.advance(QueryPhase::Completed)?;

        info!(
            mode = %mode,
            iterations = outcome.iterations,
            tool_calls = outcome.tool_calls,
            total_tokens = outcome.usage.total_tokens,
            elapsed_ms = start.elapsed().as_millis(),
            "query completed"
        );
        Ok(response)
    }

    /// Starts a streamed query.
    ///
    /// Nothing runs until the stream is polled; dropping it cancels the
    /// query.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::Orchestration`] for an empty or oversized query.
    /// Later failures arrive as a final `error` event.
    pub fn query_stream(&self, query: &str, mode: QueryMode) -> Result<EventStream, AgentError> {
        validate_query(query)?;
        let mut lifecycle = QueryLifecycle::new();

        let (agent, executor) = self.prepare(mode, &mut lifecycle)?;
        let request = agent.build_request(&build_user_prompt(query, mode), true);
        lifecycle.advance(QueryPhase::ExecutingAgent)?;
        info!(mode = %mode, provider = self.provider.name(), "streaming query started");

        let events = agentic_loop_stream(
            Arc::clone(&self.provider),
            request,
            executor,
            agent.max_tool_iterations(),
        );
        Ok(adapt(
            events,
            query.to_string(),
            mode,
            self.config.citations,
            lifecycle,
        ))
    }

    /// Resolves capabilities and builds the per-query agent and executor.
    fn prepare(
        &self,
        mode: QueryMode,
        lifecycle: &mut QueryLifecycle,
    ) -> Result<(ResearchAgent, ToolExecutor), AgentError> {
        let capabilities = CapabilityRegistry::resolve(mode);
        lifecycle.advance(QueryPhase::ToolsSelected)?;
        debug!(mode = %mode, tools = capabilities.tools.len(), "capabilities resolved");

        let agent = ResearchAgent::new(&self.config, &self.prompts, &capabilities);
        let executor = ToolExecutor::new(
            &capabilities,
            Arc::clone(&self.retriever),
            Arc::clone(&self.citations),
            RetrievalLimits::from_config(&self.config),
        );
        Ok((agent, executor))
    }
}

impl fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Orchestrator")
            .field("provider", &self.provider.name())
            .field("retriever", &self.retriever.name())
            .field("citations", &self.citations.style())
            .field("model", &self.config.model)
            .finish_non_exhaustive()
    }
}

fn validate_query(query: &str) -> Result<(), AgentError> {
    if query.trim().is_empty() {
        return Err(AgentError::Orchestration {
            message: "Query cannot be empty".to_string(),
        });
    }
    if query.len() > MAX_QUERY_LEN {
        return Err(AgentError::Orchestration {
            message: format!(
                "Query exceeds maximum length ({} bytes, max {MAX_QUERY_LEN})",
                query.len()
            ),
        });
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use crate::agent::config::CitationStrictness;
    use crate::agent::message::{ChatRequest, ChatResponse};
    use crate::agent::stream::StreamEvent;
    use crate::agent::testing::{MockRetriever, ScriptedProvider, call, text, tools};
    use crate::core::FactCategory;
    use futures_util::StreamExt;
    use std::sync::atomic::Ordering;
    use test_case::test_case;

    fn config() -> AgentConfig {
        AgentConfig::builder()
            .api_key("test")
            .model("test-model")
            .build()
            .unwrap_or_else(|_| unreachable!())
    }

    fn orchestrator(provider: Arc<ScriptedProvider>, retriever: MockRetriever) -> Orchestrator {
        orchestrator_with(provider, retriever, config())
    }

    fn orchestrator_with(
        provider: Arc<ScriptedProvider>,
        retriever: MockRetriever,
        config: AgentConfig,
    ) -> Orchestrator {
        Orchestrator::new(provider, Arc::new(retriever), Arc::new(MlaCitation), config)
            .with_prompts(PromptSet::defaults())
    }

    fn strict_citations() -> AgentConfig {
        AgentConfig::builder()
            .api_key("test")
            .enforce_citations(true)
            .citation_strictness(CitationStrictness::Fail)
            .build()
            .unwrap_or_else(|_| unreachable!())
    }

    /// Retrieves quantum articles, records two facts, then stops.
    fn quantum_script(request: &ChatRequest) -> Result<ChatResponse, AgentError> {
        Ok(match request.tool_result_count() {
            0 => tools(
                "",
                vec![call(
                    "call_1",
                    "search_and_retrieve_articles_json",
                    r#"{"query":"quantum computing"}"#,
                )],
            ),
            1 => tools(
                "",
                vec![
                    call(
                        "call_2",
                        "record_fact",
                        r#"{"fact":"A quantum computer exploits quantum mechanical phenomena","source_ids":["source_1"],"category":"definition"}"#,
                    ),
                    call(
                        "call_3",
                        "record_fact",
                        r#"{"fact":"Qubits can be in superposition","source_ids":["source_1","source_2"],"category":"technical"}"#,
                    ),
                ],
            ),
            _ => text("I have recorded the facts."),
        })
    }

    fn narrative_script(request: &ChatRequest) -> Result<ChatResponse, AgentError> {
        Ok(match request.tool_result_count() {
            0 => tools(
                "Let me look that up. ",
                vec![call(
                    "call_1",
                    "search_and_retrieve_articles",
                    r#"{"query":"quantum computing"}"#,
                )],
            ),
            _ => text(
                "A quantum computer exploits quantum phenomena (\"Quantum computing\").\n\n\
                 Works Cited\n\"Quantum computing.\" *Wikipedia*, Wikimedia Foundation.",
            ),
        })
    }

    #[test_case(QueryPhase::Idle, QueryPhase::ToolsSelected, true)]
    #[test_case(QueryPhase::ToolsSelected, QueryPhase::ExecutingAgent, true)]
    #[test_case(QueryPhase::ExecutingAgent, QueryPhase::Streaming, true)]
    #[test_case(QueryPhase::ExecutingAgent, QueryPhase::Collecting, true)]
    #[test_case(QueryPhase::ExecutingAgent, QueryPhase::Failed, true)]
    #[test_case(QueryPhase::Collecting, QueryPhase::Completed, true)]
    #[test_case(QueryPhase::Streaming, QueryPhase::Failed, true)]
    #[test_case(QueryPhase::Idle, QueryPhase::ExecutingAgent, false)]
    #[test_case(QueryPhase::Completed, QueryPhase::Idle, false)]
    #[test_case(QueryPhase::Failed, QueryPhase::Completed, false)]
    #[test_case(QueryPhase::ToolsSelected, QueryPhase::Completed, false)]
    fn test_phase_transitions(from: QueryPhase, to: QueryPhase, allowed: bool) {
        assert_eq!(from.can_advance_to(to), allowed);
    }

    #[test]
    fn test_lifecycle_rejects_skips() {
        let mut lc = QueryLifecycle::new();
        assert!(lc.advance(QueryPhase::Completed).is_err());
        assert_eq!(lc.phase(), QueryPhase::Idle);
        lc.advance(QueryPhase::ToolsSelected)
            .unwrap_or_else(|e| panic!("{e}"));
        assert_eq!(lc.phase(), QueryPhase::ToolsSelected);
        assert!(!lc.phase().is_terminal());
    }

    #[test]
    fn test_request_defaults() {
        let req: QueryRequest = serde_json::from_str(r#"{"query":"What is a qubit?"}"#)
            .unwrap_or_else(|e| panic!("{e}"));
        assert_eq!(req.mode, QueryMode::Narrative);
        assert!(!req.stream);
    }

    #[test]
    fn test_response_json_shapes() {
        let narrative = QueryResponse::Narrative {
            result: "text".to_string(),
        };
        assert_eq!(
            serde_json::to_string(&narrative).unwrap_or_default(),
            r#"{"result":"text"}"#
        );
        let structured = QueryResponse::Structured {
            document: crate::core::FactAccumulator::new().into_document("q"),
        };
        let json = serde_json::to_value(&structured).unwrap_or_default();
        assert_eq!(json["document"]["query"], "q");
        assert!(structured.result().is_none());
        assert!(narrative.document().is_none());
    }

    #[tokio::test]
    async fn test_structured_quantum_query() {
        let orch = orchestrator(ScriptedProvider::new(quantum_script), MockRetriever::quantum());
        let response = orch
            .query("What is quantum computing?", QueryMode::Structured)
            .await
            .unwrap_or_else(|e| panic!("query failed: {e}"));

        let doc = response
            .document()
            .unwrap_or_else(|| panic!("expected document"));
        assert_eq!(doc.query, "What is quantum computing?");
        assert_eq!(doc.sources.len(), 2);
        assert_eq!(doc.sources[0].title, "Quantum computing");
        assert_eq!(doc.facts.len(), 2);
        assert_eq!(doc.facts[0].category, FactCategory::Definition);
        assert_eq!(doc.facts[1].source_ids, vec!["source_1", "source_2"]);
        assert!(doc.summary.starts_with("A quantum computer exploits"));
        assert!(!doc.summary.contains("recorded the facts"));
    }

    #[tokio::test]
    async fn test_structured_without_tool_calls() {
        let provider = ScriptedProvider::new(|_| Ok(text("I cannot help with that.")));
        let orch = orchestrator(provider, MockRetriever::quantum());
        let response = orch
            .query("What is quantum computing?", QueryMode::Structured)
            .await
            .unwrap_or_else(|e| panic!("query failed: {e}"));
        let doc = response
            .document()
            .unwrap_or_else(|| panic!("expected document"));
        assert!(doc.facts.is_empty());
        assert!(doc.sources.is_empty());
    }

    #[tokio::test]
    async fn test_invalid_fact_is_not_fatal() {
        let provider = ScriptedProvider::new(|req| {
            Ok(match req.tool_result_count() {
                0 => tools(
                    "",
                    vec![call(
                        "c1",
                        "search_and_retrieve_articles_json",
                        r#"{"query":"quantum"}"#,
                    )],
                ),
                1 => tools(
                    "",
                    vec![
                        call(
                            "c2",
                            "record_fact",
                            r#"{"fact":"Made up","source_ids":["source_42"],"category":"history"}"#,
                        ),
                        call(
                            "c3",
                            "record_fact",
                            r#"{"fact":"Qubits hold quantum information","source_ids":["source_2"],"category":"definition"}"#,
                        ),
                    ],
                ),
                _ => text("done"),
            })
        });
        let orch = orchestrator(provider, MockRetriever::quantum());
        let response = orch
            .query("qubit", QueryMode::Structured)
            .await
            .unwrap_or_else(|e| panic!("query failed: {e}"));
        let doc = response
            .document()
            .unwrap_or_else(|| panic!("expected document"));
        assert_eq!(doc.facts.len(), 1);
        assert_eq!(doc.facts[0].fact, "Qubits hold quantum information");
    }

    #[tokio::test]
    async fn test_concurrent_queries_are_isolated() {
        let provider = ScriptedProvider::new(|req| {
            let about_qubits = req.user_prompt().is_some_and(|p| p.contains("qubit"));
            Ok(match (req.tool_result_count(), about_qubits) {
                (0, _) => tools(
                    "",
                    vec![call(
                        "c1",
                        "search_and_retrieve_articles_json",
                        r#"{"query":"quantum"}"#,
                    )],
                ),
                (1, true) => tools(
                    "",
                    vec![call(
                        "c2",
                        "record_fact",
                        r#"{"fact":"A qubit is a unit of quantum information","source_ids":["source_2"],"category":"definition"}"#,
                    )],
                ),
                (1, false) => tools(
                    "",
                    vec![
                        call(
                            "c2",
                            "record_fact",
                            r#"{"fact":"Quantum computers exploit quantum mechanics","source_ids":["source_1"],"category":"definition"}"#,
                        ),
                        call(
                            "c3",
                            "record_fact",
                            r#"{"fact":"They may outperform classical computers","source_ids":["source_1"],"category":"application"}"#,
                        ),
                    ],
                ),
                _ => text("done"),
            })
        });
        let orch = orchestrator(provider, MockRetriever::quantum());

        let (a, b) = tokio::join!(
            orch.query("What is quantum computing?", QueryMode::Structured),
            orch.query("What is a qubit?", QueryMode::Structured),
        );
        let a = a.unwrap_or_else(|e| panic!("query a failed: {e}"));
        let b = b.unwrap_or_else(|e| panic!("query b failed: {e}"));
        let (a, b) = (
            a.document().unwrap_or_else(|| panic!("expected document")),
            b.document().unwrap_or_else(|| panic!("expected document")),
        );

        assert_eq!(a.facts.len(), 2);
        assert_eq!(b.facts.len(), 1);
        assert!(a.facts.iter().all(|f| !f.fact.contains("qubit")));
        assert_eq!(b.facts[0].fact, "A qubit is a unit of quantum information");
        assert_eq!(b.query, "What is a qubit?");
    }

    #[tokio::test]
    async fn test_narrative_result_is_full_transcript() {
        let orch = orchestrator(ScriptedProvider::new(narrative_script), MockRetriever::quantum());
        let response = orch
            .query("What is quantum computing?", QueryMode::Narrative)
            .await
            .unwrap_or_else(|e| panic!("query failed: {e}"));
        let result = response
            .result()
            .unwrap_or_else(|| panic!("expected narrative"));
        assert!(result.starts_with("Let me look that up. A quantum computer"));
        assert!(result.contains("Works Cited"));
    }

    #[tokio::test]
    async fn test_stream_concatenation_matches_query() {
        let sync = orchestrator(ScriptedProvider::new(narrative_script), MockRetriever::quantum())
            .query("What is quantum computing?", QueryMode::Narrative)
            .await
            .unwrap_or_else(|e| panic!("query failed: {e}"));

        let events: Vec<StreamEvent> =
            orchestrator(ScriptedProvider::new(narrative_script), MockRetriever::quantum())
                .query_stream("What is quantum computing?", QueryMode::Narrative)
                .unwrap_or_else(|e| panic!("stream failed: {e}"))
                .collect()
                .await;

        assert_eq!(events.last(), Some(&StreamEvent::done()));
        let streamed: String = events
            .iter()
            .filter_map(|e| match e {
                StreamEvent::Chunk { chunk } => Some(chunk.as_str()),
                _ => None,
            })
            .collect();
        assert_eq!(Some(streamed.as_str()), sync.result());
    }

    #[tokio::test]
    async fn test_structured_stream_matches_query() {
        let events: Vec<StreamEvent> =
            orchestrator(ScriptedProvider::new(quantum_script), MockRetriever::quantum())
                .query_stream("What is quantum computing?", QueryMode::Structured)
                .unwrap_or_else(|e| panic!("stream failed: {e}"))
                .collect()
                .await;

        let documents: Vec<&StructuredDocument> = events
            .iter()
            .filter_map(|e| match e {
                StreamEvent::Document { document } => Some(document),
                _ => None,
            })
            .collect();
        assert_eq!(documents.len(), 1);
        assert_eq!(documents[0].facts.len(), 2);
        assert!(
            events
                .iter()
                .all(|e| !matches!(e, StreamEvent::Chunk { .. }))
        );
        assert!(matches!(events[events.len() - 2], StreamEvent::Document { .. }));
        assert_eq!(events.last(), Some(&StreamEvent::done()));
    }

    #[tokio::test]
    async fn test_start_query_dispatches() {
        let orch = orchestrator(ScriptedProvider::new(quantum_script), MockRetriever::quantum());
        let reply = orch
            .start_query(QueryRequest {
                query: "What is quantum computing?".to_string(),
                mode: QueryMode::Structured,
                stream: false,
            })
            .await
            .unwrap_or_else(|e| panic!("{e}"));
        assert!(matches!(reply, QueryReply::Completed(QueryResponse::Structured { .. })));

        let reply = orch
            .start_query(QueryRequest {
                query: "What is quantum computing?".to_string(),
                mode: QueryMode::Narrative,
                stream: true,
            })
            .await
            .unwrap_or_else(|e| panic!("{e}"));
        assert!(matches!(reply, QueryReply::Streaming(_)));
    }

    #[tokio::test]
    async fn test_provider_failure_is_fatal() {
        let provider = ScriptedProvider::new(|_| {
            Err(AgentError::ApiRequest {
                message: "401 Unauthorized".to_string(),
                status: Some(401),
            })
        });
        let orch = orchestrator(provider, MockRetriever::quantum());
        let err = orch
            .query("What is quantum computing?", QueryMode::Structured)
            .await;
        assert!(matches!(err, Err(AgentError::ApiRequest { .. })));
    }

    #[tokio::test]
    async fn test_retrieval_failure_is_fatal() {
        let orch = orchestrator(ScriptedProvider::new(quantum_script), MockRetriever::failing());
        let err = orch
            .query("What is quantum computing?", QueryMode::Structured)
            .await;
        assert!(matches!(err, Err(AgentError::Retrieval(_))));

        let events: Vec<StreamEvent> = orch
            .query_stream("What is quantum computing?", QueryMode::Structured)
            .unwrap_or_else(|e| panic!("{e}"))
            .collect()
            .await;
        assert_eq!(events.len(), 1);
        assert!(matches!(events[0], StreamEvent::Error { .. }));
    }

    #[tokio::test]
    async fn test_missing_citation_fails_when_strict() {
        let provider = ScriptedProvider::new(|_| Ok(text("Quantum computers are fast.")));
        let orch = orchestrator_with(provider, MockRetriever::quantum(), strict_citations());
        let err = orch.query("quantum", QueryMode::Narrative).await;
        assert!(matches!(err, Err(AgentError::CitationMissing)));
    }

    #[tokio::test]
    async fn test_missing_citation_warns_by_default() {
        let provider = ScriptedProvider::new(|_| Ok(text("Quantum computers are fast.")));
        let cfg = AgentConfig::builder()
            .api_key("test")
            .enforce_citations(true)
            .build()
            .unwrap_or_else(|_| unreachable!());
        let orch = orchestrator_with(provider, MockRetriever::quantum(), cfg);
        let response = orch
            .query("quantum", QueryMode::Narrative)
            .await
            .unwrap_or_else(|e| panic!("{e}"));
        assert_eq!(response.result(), Some("Quantum computers are fast."));
    }

    #[tokio::test]
    async fn test_cited_answer_passes_strict_check() {
        let orch = orchestrator_with(
            ScriptedProvider::new(narrative_script),
            MockRetriever::quantum(),
            strict_citations(),
        );
        assert!(orch.query("quantum", QueryMode::Narrative).await.is_ok());
    }

    #[test_case(""; "empty")]
    #[test_case("   \n"; "blank")]
    fn test_empty_query_rejected(query: &str) {
        let provider = ScriptedProvider::new(|_| Ok(text("unused")));
        let orch = orchestrator(Arc::clone(&provider), MockRetriever::quantum());
        assert!(matches!(
            orch.query_stream(query, QueryMode::Narrative),
            Err(AgentError::Orchestration { .. })
        ));
        assert_eq!(provider.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_oversized_query_rejected() {
        let provider = ScriptedProvider::new(|_| Ok(text("unused")));
        let orch = orchestrator(Arc::clone(&provider), MockRetriever::quantum());
        let query = "q".repeat(MAX_QUERY_LEN + 1);
        let err = orch.query(&query, QueryMode::Narrative).await;
        assert!(matches!(err, Err(AgentError::Orchestration { .. })));
        assert_eq!(provider.calls.load(Ordering::SeqCst), 0);
    }
}
