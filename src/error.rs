//! Error types for wiki-agent-rs.
//!
//! Errors are layered: [`SchemaViolation`] for rejected fact-recording calls
//! (never fatal), [`RetrievalError`] for the Wikipedia client, [`AgentError`]
//! for everything that can abort a query, and [`CommandError`] for the CLI.

use thiserror::Error;

/// Result alias used by the CLI layer.
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level error type.
#[derive(Debug, Error)]
pub enum Error {
    /// Agent or orchestration failure.
    #[error(transparent)]
    Agent(#[from] AgentError),

    /// CLI command failure.
    #[error(transparent)]
    Command(#[from] CommandError),

    /// I/O failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Rejection of a single `record_fact` call.
///
/// These never abort a query. The orchestrator logs them and reports the
/// message back to the model as a tool error so it can retry.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaViolation {
    /// A referenced source ID was never registered in this query.
    #[error("unknown source id '{id}' (known: {known})")]
    InvalidReference {
        /// The offending ID.
        id: String,
        /// Comma-separated list of registered IDs, for the model's benefit.
        known: String,
    },

    /// The category is not one of the fixed set.
    #[error(
        "invalid category '{category}' (expected one of: definition, history, application, technical, other)"
    )]
    InvalidCategory {
        /// The rejected category string.
        category: String,
    },

    /// No source IDs were supplied.
    #[error("a fact must cite at least one source id")]
    MissingSources,

    /// The fact text was empty or whitespace.
    #[error("fact text must not be empty")]
    EmptyFact,

    /// The tool arguments did not deserialize.
    #[error("malformed record_fact arguments: {message}")]
    MalformedArguments {
        /// Deserializer message.
        message: String,
    },
}

/// Errors from the article retrieval collaborator.
#[derive(Debug, Error)]
pub enum RetrievalError {
    /// HTTP transport failed after all retries.
    #[error("request to {endpoint} failed after {attempts} attempt(s): {message}")]
    RetriesExhausted {
        /// API endpoint that was called.
        endpoint: String,
        /// Number of attempts made.
        attempts: u32,
        /// Last error message.
        message: String,
    },

    /// The API answered with something we could not decode.
    #[error("unexpected response from {endpoint}: {message}")]
    InvalidResponse {
        /// API endpoint that was called.
        endpoint: String,
        /// Decoder message.
        message: String,
    },

    /// The HTTP client could not be constructed.
    #[error("failed to build HTTP client: {0}")]
    Client(String),
}

/// Errors from the agent system.
#[derive(Debug, Error)]
pub enum AgentError {
    /// No API key was configured for a provider that needs one.
    #[error("API key missing: set OPENAI_API_KEY, OPENROUTER_API_KEY or WIKI_AGENT_API_KEY")]
    ApiKeyMissing,

    /// The configured provider name is unknown.
    #[error("unsupported provider '{name}' (expected openai, openrouter or ollama)")]
    UnsupportedProvider {
        /// Provider name as configured.
        name: String,
    },

    /// Any other invalid configuration value.
    #[error("configuration error: {message}")]
    Configuration {
        /// What was wrong.
        message: String,
    },

    /// The provider API call failed (transport, auth, rate limit).
    #[error("API request failed: {message}")]
    ApiRequest {
        /// Error message from the SDK.
        message: String,
        /// HTTP status if known.
        status: Option<u16>,
    },

    /// The streaming response broke mid-flight.
    #[error("stream error: {message}")]
    Stream {
        /// Error message.
        message: String,
    },

    /// The model kept calling tools past the iteration limit.
    #[error("tool loop exceeded {max_iterations} iterations")]
    ToolLoopExceeded {
        /// Configured iteration cap.
        max_iterations: usize,
    },

    /// A tool failed in a way that is reported back to the model.
    #[error("tool '{name}' failed: {message}")]
    ToolExecution {
        /// Tool name.
        name: String,
        /// Failure description.
        message: String,
    },

    /// Article retrieval failed.
    #[error("retrieval failed: {0}")]
    Retrieval(#[from] RetrievalError),

    /// Narrative answer contained no citation while citations are enforced.
    #[error("answer contains no citation marker")]
    CitationMissing,

    /// Query rejected or lifecycle violated.
    #[error("orchestration error: {message}")]
    Orchestration {
        /// What went wrong.
        message: String,
    },
}

impl AgentError {
    /// Returns `true` if this error is a configuration problem that is
    /// detected before any query runs.
    #[must_use]
    pub const fn is_configuration(&self) -> bool {
        matches!(
            self,
            Self::ApiKeyMissing | Self::UnsupportedProvider { .. } | Self::Configuration { .. }
        )
    }
}

/// Errors from CLI command execution.
#[derive(Debug, Error)]
pub enum CommandError {
    /// Command failed during execution.
    #[error("{0}")]
    ExecutionFailed(String),

    /// Output could not be rendered.
    #[error("output format error: {0}")]
    OutputFormat(String),

    /// Invalid argument.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_violation_messages() {
        let err = SchemaViolation::InvalidReference {
            id: "source_9".to_string(),
            known: "source_1, source_2".to_string(),
        };
        assert!(err.to_string().contains("source_9"));
        assert!(err.to_string().contains("source_1, source_2"));

        let err = SchemaViolation::InvalidCategory {
            category: "gossip".to_string(),
        };
        assert!(err.to_string().contains("gossip"));
    }

    #[test]
    fn test_configuration_classification() {
        assert!(AgentError::ApiKeyMissing.is_configuration());
        assert!(
            AgentError::UnsupportedProvider {
                name: "x".to_string()
            }
            .is_configuration()
        );
        assert!(!AgentError::CitationMissing.is_configuration());
        assert!(
            !AgentError::ApiRequest {
                message: "401".to_string(),
                status: Some(401)
            }
            .is_configuration()
        );
    }

    #[test]
    fn test_retrieval_error_converts() {
        let err: AgentError = RetrievalError::Client("tls".to_string()).into();
        assert!(matches!(err, AgentError::Retrieval(_)));
        assert!(err.to_string().contains("tls"));
    }
}
