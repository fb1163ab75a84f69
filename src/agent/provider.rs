//! Pluggable LLM provider trait.
//!
//! Implementations translate provider-agnostic [`ChatRequest`]/[`ChatResponse`]
//! into provider-specific SDK calls.

use std::collections::BTreeMap;
use std::pin::Pin;

use async_trait::async_trait;
use futures_util::Stream;

use super::message::{ChatRequest, ChatResponse};
use super::tool::ToolCall;
use crate::error::AgentError;

/// One increment of a streamed completion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamDelta {
    /// Generated text.
    Text(String),
    /// First fragment of a tool call at `index`.
    ToolCallStart {
        /// Position of the call within the response.
        index: u32,
        /// Provider-assigned call ID.
        id: String,
        /// Tool name.
        name: String,
    },
    /// Further argument JSON for the tool call at `index`.
    ToolCallArguments {
        /// Position of the call within the response.
        index: u32,
        /// Argument fragment to append.
        fragment: String,
    },
    /// The model stopped generating.
    Finish {
        /// Finish reason reported by the provider.
        reason: String,
    },
}

/// Boxed stream of completion deltas.
pub type DeltaStream = Pin<Box<dyn Stream<Item = Result<StreamDelta, AgentError>> + Send>>;

/// Reassembles tool calls from streamed fragments.
#[derive(Debug, Default)]
pub struct PendingToolCalls {
    calls: BTreeMap<u32, ToolCall>,
}

impl PendingToolCalls {
    /// Applies a tool-call delta; other deltas are ignored.
    pub fn apply(&mut self, delta: &StreamDelta) {
        match delta {
            StreamDelta::ToolCallStart { index, id, name } => {
                let call = self.calls.entry(*index).or_insert_with(|| ToolCall {
                    id: String::new(),
                    name: String::new(),
                    arguments: String::new(),
                });
                if !id.is_empty() {
                    call.id.clone_from(id);
                }
                if !name.is_empty() {
                    call.name.clone_from(name);
                }
            }
            StreamDelta::ToolCallArguments { index, fragment } => {
                self.calls
                    .entry(*index)
                    .or_insert_with(|| ToolCall {
                        id: String::new(),
                        name: String::new(),
                        arguments: String::new(),
                    })
                    .arguments
                    .push_str(fragment);
            }
            StreamDelta::Text(_) | StreamDelta::Finish { .. } => {}
        }
    }

    /// Completed calls in index order.
    #[must_use]
    pub fn into_calls(self) -> Vec<ToolCall> {
        self.calls.into_values().collect()
    }
}

/// Trait for LLM provider backends.
///
/// Implementations handle the transport layer (HTTP, SDK calls, retries)
/// for a specific provider while presenting a uniform interface to the
/// research loop.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Provider name (e.g., `"openai"`, `"openrouter"`).
    fn name(&self) -> &'static str;

    /// Executes a chat completion request.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError`] on API failures, timeouts, or parse errors.
    async fn chat(&self, request: &ChatRequest) -> Result<ChatResponse, AgentError>;

    /// Executes a streaming chat completion request.
    ///
    /// Text arrives as [`StreamDelta::Text`]; tool calls arrive as fragments
    /// keyed by index, to be reassembled with [`PendingToolCalls`].
    ///
    /// # Errors
    ///
    /// Returns [`AgentError`] on connection or streaming failures.
    async fn chat_stream(&self, request: &ChatRequest) -> Result<DeltaStream, AgentError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pending_tool_calls_reassemble() {
        let mut pending = PendingToolCalls::default();
        for delta in [
            StreamDelta::ToolCallStart {
                index: 1,
                id: "call_b".to_string(),
                name: "record_fact".to_string(),
            },
            StreamDelta::ToolCallStart {
                index: 0,
                id: "call_a".to_string(),
                name: "search_wikipedia".to_string(),
            },
            StreamDelta::ToolCallArguments {
                index: 0,
                fragment: r#"{"query":"#.to_string(),
            },
            StreamDelta::Text("ignored".to_string()),
            StreamDelta::ToolCallArguments {
                index: 0,
                fragment: r#""qubit"}"#.to_string(),
            },
        ] {
            pending.apply(&delta);
        }

        let calls = pending.into_calls();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0].id, "call_a");
        assert_eq!(calls[0].arguments, r#"{"query":"qubit"}"#);
        assert_eq!(calls[1].name, "record_fact");
        assert!(calls[1].arguments.is_empty());
    }

    #[test]
    fn test_pending_tool_calls_empty() {
        let mut pending = PendingToolCalls::default();
        pending.apply(&StreamDelta::Finish {
            reason: "stop".to_string(),
        });
        assert!(pending.into_calls().is_empty());
    }
}
