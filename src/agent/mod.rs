//! Wikipedia research agent.
//!
//! Answers a question by letting an LLM call retrieval tools in a loop.
//! The provider abstraction is backed by OpenAI-compatible APIs.
//!
//! # Architecture
//!
//! ```text
//! User query → Orchestrator
//!   ├── CapabilityRegistry (mode → tools + prompt)
//!   ├── ResearchAgent (system prompt, tool definitions)
//!   ├── ToolExecutor (per query; owns the FactAccumulator)
//!   │   ├── Retriever (Wikipedia search / article fetch)
//!   │   └── CitationFormatter (MLA)
//!   ├── agentic loop: model ↔ tools until the model stops
//!   └── narrative text │ StructuredDocument │ StreamEvent sequence
//! ```

pub mod agentic_loop;
pub mod capability;
pub mod client;
pub mod config;
pub mod executor;
pub mod message;
pub mod orchestrator;
pub mod prompt;
pub mod provider;
pub mod providers;
pub mod research;
pub mod stream;
pub mod tool;
pub mod traits;

#[cfg(test)]
mod testing;

// Re-export key types
pub use agentic_loop::{AgentEvent, LoopOutcome, agentic_loop, agentic_loop_stream};
pub use capability::{Capabilities, CapabilityRegistry, QueryMode};
pub use client::create_provider;
pub use config::{AgentConfig, CitationPolicy, CitationStrictness};
pub use executor::{Progress, RetrievalLimits, ToolExecutor};
pub use message::{ChatMessage, ChatRequest, ChatResponse, Role, TokenUsage};
pub use orchestrator::{Orchestrator, QueryPhase, QueryReply, QueryRequest, QueryResponse};
pub use prompt::PromptSet;
pub use provider::LlmProvider;
pub use research::ResearchAgent;
pub use stream::{EventStream, StreamEvent};
pub use tool::{ToolCall, ToolDefinition, ToolKind, ToolResult, ToolSet};
pub use traits::Agent;
