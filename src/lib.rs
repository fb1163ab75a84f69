//! # wiki-agent
//!
//! A research agent that answers questions from Wikipedia.
//!
//! Two output modes share one agent loop:
//!
//! - **narrative**: prose with inline MLA citations and a Works Cited list,
//!   optionally streamed as text chunks;
//! - **structured**: a [`StructuredDocument`](core::StructuredDocument) of
//!   facts, each tied to the registered sources that support it.
//!
//! ```no_run
//! use wiki_agent::agent::{AgentConfig, Orchestrator, QueryMode};
//!
//! # async fn run() -> Result<(), wiki_agent::error::AgentError> {
//! let config = AgentConfig::builder().from_env().build()?;
//! let orchestrator = Orchestrator::from_config(config)?;
//! let response = orchestrator
//!     .query("What is quantum computing?", QueryMode::Structured)
//!     .await?;
//! # let _ = response;
//! # Ok(())
//! # }
//! ```

pub mod agent;
pub mod cli;
pub mod core;
pub mod error;
pub mod retrieval;

pub use error::{Error, Result};
