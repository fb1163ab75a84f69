//! Core data model: sources, facts, the per-query accumulator and the
//! structured output document.
//!
//! Nothing here performs I/O or talks to an LLM; the agent layer drives
//! these types through tool calls.

pub mod accumulator;
pub mod document;
pub mod fact;
pub mod source;

pub use accumulator::FactAccumulator;
pub use document::StructuredDocument;
pub use fact::{Fact, FactCategory};
pub use source::{SOURCE_ID_PREFIX, Source, SourceMetadata};
