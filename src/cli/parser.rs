//! Command-line argument parsing.
//!
//! Defines the CLI structure using clap derive macros.

use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;

use crate::agent::QueryMode;

/// wiki-agent: answer questions from Wikipedia with citations.
///
/// Produces either an MLA-cited narrative answer or a structured document
/// of facts tied to the articles that support them.
#[derive(Parser, Debug)]
#[command(name = "wiki-agent")]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Increase log verbosity (-v debug, -vv trace).
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Output format (text, json, ndjson).
    #[arg(long, default_value = "text", global = true)]
    pub format: String,

    /// The subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Ask a research question.
    ///
    /// Narrative mode streams an answer with inline MLA citations and a
    /// Works Cited list. Structured mode returns a JSON document of facts,
    /// each linked to the Wikipedia articles that support it.
    #[command(after_help = r#"Examples:
  wiki-agent query "What is quantum computing?"
  wiki-agent query "Who built the first telescope?" --structured
  wiki-agent query "History of Rust" --no-stream --strict-citations
  wiki-agent --format ndjson query "What is a qubit?" --mode structured
  wiki-agent query "What is CRISPR?" --provider ollama --model llama3.1
"#)]
    Query(QueryArgs),

    /// Write the default prompt templates for customization.
    ///
    /// Existing files are left untouched.
    #[command(after_help = r#"Examples:
  wiki-agent init-prompts                      # ~/.config/wiki-agent/prompts
  wiki-agent init-prompts --dir ./prompts      # Custom directory
"#)]
    InitPrompts {
        /// Target directory (defaults to ~/.config/wiki-agent/prompts).
        #[arg(long)]
        dir: Option<PathBuf>,
    },
}

/// Arguments for the `query` command.
#[derive(clap::Args, Debug, Clone)]
pub struct QueryArgs {
    /// The research question.
    pub question: String,

    /// Output mode: narrative or structured.
    #[arg(short, long, value_parser = parse_mode, conflicts_with = "structured")]
    pub mode: Option<QueryMode>,

    /// Shorthand for `--mode structured`.
    #[arg(long)]
    pub structured: bool,

    /// Wait for the complete answer instead of streaming it.
    #[arg(long)]
    pub no_stream: bool,

    /// LLM provider (openai, openrouter, ollama).
    #[arg(long)]
    pub provider: Option<String>,

    /// Model name.
    #[arg(long)]
    pub model: Option<String>,

    /// Articles fetched per search.
    #[arg(long)]
    pub max_articles: Option<usize>,

    /// Wikipedia language edition (e.g. "en", "de").
    #[arg(long)]
    pub language: Option<String>,

    /// Warn when a narrative answer carries no citation.
    #[arg(long)]
    pub enforce_citations: bool,

    /// Fail when a narrative answer carries no citation.
    #[arg(long)]
    pub strict_citations: bool,

    /// Path to a TOML config file.
    #[arg(long, env = "WIKI_AGENT_CONFIG")]
    pub config: Option<PathBuf>,

    /// Directory containing prompt template files.
    #[arg(long)]
    pub prompt_dir: Option<PathBuf>,
}

impl QueryArgs {
    /// The mode selected by `--mode` or `--structured`.
    #[must_use]
    pub fn resolved_mode(&self) -> QueryMode {
        if self.structured {
            QueryMode::Structured
        } else {
            self.mode.unwrap_or_default()
        }
    }
}

fn parse_mode(s: &str) -> Result<QueryMode, String> {
    s.parse()
}
