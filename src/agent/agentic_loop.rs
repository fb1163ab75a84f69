//! Agentic tool-calling loop.
//!
//! Drives the LLM ↔ tool execution round-trip: sends a request to the model,
//! executes any tool calls in the response, appends results, and repeats
//! until the model produces a response without tool calls or the iteration
//! limit is reached.
//!
//! The answer text is the concatenation of everything the model said across
//! all rounds, so the streamed and non-streamed forms agree.

use std::sync::Arc;

use async_stream::try_stream;
use futures_util::{Stream, StreamExt};
use tracing::debug;

use super::executor::{Progress, ToolExecutor};
use super::message::{ChatRequest, TokenUsage, assistant_message, tool_message};
use super::provider::{LlmProvider, PendingToolCalls, StreamDelta};
use super::tool::ToolCall;
use crate::core::FactAccumulator;
use crate::error::AgentError;

/// Result of a completed loop.
#[derive(Debug, Clone, Default)]
pub struct LoopOutcome {
    /// All assistant text, in emission order.
    pub transcript: String,
    /// Usage summed over all rounds (zero when the provider streams).
    pub usage: TokenUsage,
    /// Model round-trips made.
    pub iterations: usize,
    /// Tool calls executed.
    pub tool_calls: usize,
}

/// Event emitted by [`agentic_loop_stream`].
#[derive(Debug)]
pub enum AgentEvent {
    /// Text produced by the model.
    Text(String),
    /// A tool call finished.
    ToolFinished {
        /// Tool name.
        name: String,
        /// Whether the result was an error.
        is_error: bool,
        /// Counts after the call.
        progress: Progress,
    },
    /// The model stopped calling tools.
    Completed {
        /// Loop statistics and transcript.
        outcome: LoopOutcome,
        /// The query's accumulator, if it recorded facts.
        accumulator: Option<FactAccumulator>,
    },
}

/// Executes `calls`, appending the assistant turn and each result to the
/// conversation.
async fn run_tools(
    request: &mut ChatRequest,
    executor: &mut ToolExecutor,
    text: &str,
    calls: &[ToolCall],
) -> Result<(), AgentError> {
    request
        .messages
        .push(assistant_message(text, calls.to_vec()));

    for call in calls {
        let result = executor.execute(call).await?;
        debug!(
            tool = call.name,
            call_id = call.id,
            is_error = result.is_error,
            "tool execution complete"
        );
        request
            .messages
            .push(tool_message(&result.tool_call_id, &result.content));
    }
    Ok(())
}

/// Runs an agentic loop: model → tool calls → tool results → model → …
///
/// # Arguments
///
/// * `provider` - LLM provider to call.
/// * `request` - Initial chat request (mutated in-place with tool messages).
/// * `executor` - The query's tool executor.
/// * `max_iterations` - Safety limit on round-trips.
///
/// # Errors
///
/// Returns [`AgentError::ToolLoopExceeded`] if the model keeps requesting
/// tools beyond `max_iterations`. Propagates provider errors and fatal
/// retrieval errors.
pub async fn agentic_loop(
    provider: &dyn LlmProvider,
    request: &mut ChatRequest,
    executor: &mut ToolExecutor,
    max_iterations: usize,
) -> Result<LoopOutcome, AgentError> {
    let mut outcome = LoopOutcome::default();

    for iteration in 0..max_iterations {
        let response = provider.chat(request).await?;
        outcome.iterations = iteration + 1;
        outcome.usage.add(response.usage);
        outcome.transcript.push_str(&response.content);

        if response.tool_calls.is_empty() {
            debug!(iteration, "agentic loop completed with final text response");
            return Ok(outcome);
        }

        debug!(
            iteration,
            tool_count = response.tool_calls.len(),
            "executing tool calls"
        );
        outcome.tool_calls += response.tool_calls.len();
        run_tools(request, executor, &response.content, &response.tool_calls).await?;
    }

    Err(AgentError::ToolLoopExceeded { max_iterations })
}

/// Streaming variant of [`agentic_loop`].
///
/// Owns everything it needs, so dropping the stream cancels the query and
/// drops its accumulator. Text is forwarded as it arrives; the final event
/// is [`AgentEvent::Completed`] or an error.
pub fn agentic_loop_stream(
    provider: Arc<dyn LlmProvider>,
    mut request: ChatRequest,
    mut executor: ToolExecutor,
    max_iterations: usize,
) -> impl Stream<Item = Result<AgentEvent, AgentError>> + Send {
    try_stream! {
        let mut outcome = LoopOutcome::default();
        request.stream = true;

        for iteration in 0..max_iterations {
            let mut deltas = provider.chat_stream(&request).await?;
            outcome.iterations = iteration + 1;

            let mut text = String::new();
            let mut pending = PendingToolCalls::default();
            while let Some(delta) = deltas.next().await {
                let delta = delta?;
                if let StreamDelta::Text(ref fragment) = delta {
                    text.push_str(fragment);
                    outcome.transcript.push_str(fragment);
                    yield AgentEvent::Text(fragment.clone());
                } else {
                    pending.apply(&delta);
                }
            }

            let calls = pending.into_calls();
            if calls.is_empty() {
                debug!(iteration, "streaming loop completed with final text response");
                yield AgentEvent::Completed {
                    outcome,
                    accumulator: executor.into_accumulator(),
                };
                return;
            }

            debug!(iteration, tool_count = calls.len(), "executing tool calls");
            outcome.tool_calls += calls.len();
            request.messages.push(assistant_message(&text, calls.clone()));
            for call in &calls {
                let result = executor.execute(call).await?;
                request
                    .messages
                    .push(tool_message(&result.tool_call_id, &result.content));
                yield AgentEvent::ToolFinished {
                    name: call.name.clone(),
                    is_error: result.is_error,
                    progress: executor.progress(),
                };
            }
        }

        Err::<(), AgentError>(AgentError::ToolLoopExceeded { max_iterations })?;
    }
}
