//! CLI command implementations.
//!
//! Contains the business logic for each CLI command. Output is written to
//! the supplied writer so streamed answers appear as they arrive.

use std::io::Write;
use std::path::{Path, PathBuf};

use tokio_stream::StreamExt;

use crate::agent::config::{AgentConfig, CitationStrictness};
use crate::agent::orchestrator::Orchestrator;
use crate::agent::prompt::PromptSet;
use crate::agent::stream::StreamEvent;
use crate::cli::output::{OutputFormat, format_event, format_response};
use crate::cli::parser::{Cli, Commands, QueryArgs};
use crate::error::{CommandError, Result};

/// Executes the CLI command.
///
/// # Errors
///
/// Returns an error if configuration is invalid, the query fails, or output
/// cannot be written.
pub fn execute(cli: &Cli, out: &mut dyn Write) -> Result<()> {
    let format = OutputFormat::parse(&cli.format);

    match &cli.command {
        Commands::Query(args) => cmd_query(args, format, out),
        Commands::InitPrompts { dir } => cmd_init_prompts(dir.as_deref(), format, out),
    }
}

/// Builds the agent configuration: flags, then config file, then
/// environment, then defaults.
fn build_config(args: &QueryArgs) -> Result<AgentConfig> {
    let mut builder = AgentConfig::builder();
    if let Some(provider) = &args.provider {
        builder = builder.provider(provider);
    }
    if let Some(model) = &args.model {
        builder = builder.model(model);
    }
    if let Some(n) = args.max_articles {
        builder = builder.max_articles(n);
    }
    if let Some(language) = &args.language {
        builder = builder.language(language);
    }
    if args.enforce_citations || args.strict_citations {
        builder = builder.enforce_citations(true);
    }
    if args.strict_citations {
        builder = builder.citation_strictness(CitationStrictness::Fail);
    }
    if let Some(dir) = &args.prompt_dir {
        builder = builder.prompt_dir(dir);
    }

    let builder = match &args.config {
        Some(path) => builder.from_file(path),
        None => builder.from_default_file(),
    }
    .map_err(|e| CommandError::ExecutionFailed(format!("Agent configuration error: {e}")))?;

    builder
        .from_env()
        .build()
        .map_err(|e| {
            CommandError::ExecutionFailed(format!("Agent configuration error: {e}")).into()
        })
}

fn cmd_query(args: &QueryArgs, format: OutputFormat, out: &mut dyn Write) -> Result<()> {
    let config = build_config(args)?;
    let orchestrator = Orchestrator::from_config(config).map_err(|e| {
        CommandError::ExecutionFailed(format!("Provider creation failed: {e}"))
    })?;
    // A single JSON object cannot be streamed.
    let stream = !args.no_stream && format != OutputFormat::Json;

    let rt = tokio::runtime::Runtime::new().map_err(|e| {
        CommandError::ExecutionFailed(format!("Failed to create async runtime: {e}"))
    })?;

    rt.block_on(run_query(&orchestrator, args, stream, format, out))
}

async fn run_query(
    orchestrator: &Orchestrator,
    args: &QueryArgs,
    stream: bool,
    format: OutputFormat,
    out: &mut dyn Write,
) -> Result<()> {
    let mode = args.resolved_mode();
    if !stream {
        let response = orchestrator
            .query(&args.question, mode)
            .await
            .map_err(|e| CommandError::ExecutionFailed(format!("Query failed: {e}")))?;
        out.write_all(format_response(&response, format).as_bytes())?;
        return Ok(());
    }

    let mut events = orchestrator
        .query_stream(&args.question, mode)
        .map_err(|e| CommandError::ExecutionFailed(format!("Query failed: {e}")))?;
    while let Some(event) = events.next().await {
        if let Some(text) = format_event(&event, format) {
            out.write_all(text.as_bytes())?;
            out.flush()?;
        }
        if let StreamEvent::Error { error } = event {
            return Err(CommandError::ExecutionFailed(format!("Query failed: {error}")).into());
        }
    }
    Ok(())
}

fn cmd_init_prompts(dir: Option<&Path>, format: OutputFormat, out: &mut dyn Write) -> Result<()> {
    let target_dir = dir
        .map(PathBuf::from)
        .or_else(PromptSet::default_dir)
        .ok_or_else(|| {
            CommandError::ExecutionFailed(
                "Could not determine home directory for default prompt path".to_string(),
            )
        })?;

    let written = PromptSet::write_defaults(&target_dir).map_err(|e| {
        CommandError::ExecutionFailed(format!("Failed to write prompt templates: {e}"))
    })?;

    let text = match format {
        OutputFormat::Text if written.is_empty() => format!(
            "All prompt templates already exist in: {}\n",
            target_dir.display()
        ),
        OutputFormat::Text => {
            let names: String = written
                .iter()
                .map(|path| {
                    format!(
                        "  {}\n",
                        path.file_name()
                            .and_then(|n| n.to_str())
                            .unwrap_or("unknown")
                    )
                })
                .collect();
            format!(
                "Wrote {} prompt template(s) to: {}\n{names}\nEdit these files to customize the system prompts.\n",
                written.len(),
                target_dir.display()
            )
        }
        OutputFormat::Json | OutputFormat::Ndjson => {
            let paths: Vec<String> = written
                .iter()
                .map(|p| p.to_string_lossy().into_owned())
                .collect();
            let json = serde_json::json!({
                "directory": target_dir.to_string_lossy(),
                "written": paths,
                "count": written.len()
            });
            format!("{}\n", format.to_json(&json))
        }
    };
    out.write_all(text.as_bytes())?;
    Ok(())
}
