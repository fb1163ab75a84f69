//! The agent role abstraction.
//!
//! An agent is a fixed role: system prompt, model settings and tool list.
//! The orchestrator turns it into a [`ChatRequest`] and hands that to the
//! agentic loop.

use super::message::{ChatRequest, system_message, user_message};
use super::tool::ToolDefinition;

/// A role the model can be asked to play.
pub trait Agent: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    /// Model to request.
    fn model(&self) -> &str;

    /// System prompt for the role.
    fn system_prompt(&self) -> &str;

    /// Sampling temperature.
    fn temperature(&self) -> f32 {
        0.2
    }

    /// Completion token cap per round.
    fn max_tokens(&self) -> u32 {
        4096
    }

    /// Tools offered to the model; none by default.
    fn tools(&self) -> Vec<ToolDefinition> {
        Vec::new()
    }

    /// Round-trip limit for the agentic loop.
    fn max_tool_iterations(&self) -> usize {
        10
    }

    /// Builds the opening request: system prompt, then `user_msg`.
    fn build_request(&self, user_msg: &str, stream: bool) -> ChatRequest {
        let messages = vec![system_message(self.system_prompt()), user_message(user_msg)];
        ChatRequest {
            model: self.model().to_owned(),
            messages,
            temperature: Some(self.temperature()),
            max_tokens: Some(self.max_tokens()),
            stream,
            tools: self.tools(),
        }
    }
}
