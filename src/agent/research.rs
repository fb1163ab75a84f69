//! The Wikipedia research agent.
//!
//! One agent type serves both modes; the capability table decides which
//! tools and prompt it gets for a given query.

use super::capability::Capabilities;
use super::config::AgentConfig;
use super::prompt::PromptSet;
use super::tool::ToolDefinition;
use super::traits::Agent;

/// Agent that answers a question from Wikipedia articles.
pub struct ResearchAgent {
    model: String,
    temperature: f32,
    max_tokens: u32,
    max_tool_iterations: usize,
    system_prompt: String,
    tools: Vec<ToolDefinition>,
}

impl ResearchAgent {
    /// Creates an agent bound to `capabilities`.
    #[must_use]
    pub fn new(config: &AgentConfig, prompts: &PromptSet, capabilities: &Capabilities) -> Self {
        Self {
            model: config.model.clone(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
            max_tool_iterations: config.max_tool_iterations,
            system_prompt: prompts.get(capabilities.prompt).to_string(),
            tools: capabilities.tools.definitions(),
        }
    }
}

impl Agent for ResearchAgent {
    fn name(&self) -> &'static str {
        "research"
    }

    fn model(&self) -> &str {
        &self.model
    }

    fn system_prompt(&self) -> &str {
        &self.system_prompt
    }

    fn temperature(&self) -> f32 {
        self.temperature
    }

    fn max_tokens(&self) -> u32 {
        self.max_tokens
    }

    fn tools(&self) -> Vec<ToolDefinition> {
        self.tools.clone()
    }

    fn max_tool_iterations(&self) -> usize {
        self.max_tool_iterations
    }
}
