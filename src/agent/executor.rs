//! Tool executor that dispatches tool calls to the retriever, citation
//! formatter and fact accumulator.
//!
//! One executor is created per query. It owns that query's
//! [`FactAccumulator`], so concurrent queries never share recording state.

use std::fmt::Write;
use std::sync::Arc;

use chrono::{Local, NaiveDate};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::capability::Capabilities;
use super::config::{AgentConfig, MAX_ARTICLES_LIMIT, MAX_CHARS_LIMIT};
use super::tool::{ToolCall, ToolKind, ToolResult, ToolSet};
use crate::core::FactAccumulator;
use crate::error::{AgentError, SchemaViolation};
use crate::retrieval::{Article, CitationFormatter, Retriever};

/// Maximum raw byte length of tool argument JSON from the LLM.
const MAX_TOOL_ARGS_LEN: usize = 100_000;
/// Section rule used in retrieval output.
const RULE: &str = "================================================================================";

/// Default retrieval sizes for tool calls that omit them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetrievalLimits {
    /// Articles per search.
    pub max_articles: usize,
    /// Characters of body text per article.
    pub max_chars_per_article: usize,
}

impl RetrievalLimits {
    /// Limits taken from configuration.
    #[must_use]
    pub const fn from_config(config: &AgentConfig) -> Self {
        Self {
            max_articles: config.max_articles,
            max_chars_per_article: config.max_chars_per_article,
        }
    }

    fn articles(self, requested: Option<usize>) -> usize {
        requested
            .unwrap_or(self.max_articles)
            .clamp(1, MAX_ARTICLES_LIMIT)
    }

    fn chars(self, requested: Option<usize>) -> usize {
        requested
            .unwrap_or(self.max_chars_per_article)
            .clamp(1, MAX_CHARS_LIMIT)
    }
}

impl Default for RetrievalLimits {
    fn default() -> Self {
        Self {
            max_articles: 3,
            max_chars_per_article: 3000,
        }
    }
}

/// Source and fact counts of a structured query so far.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct Progress {
    /// Distinct sources registered.
    pub sources: usize,
    /// Facts accepted.
    pub facts: usize,
}

/// Executes tool calls for a single query.
pub struct ToolExecutor {
    retriever: Arc<dyn Retriever>,
    citations: Arc<dyn CitationFormatter>,
    tools: ToolSet,
    accumulator: Option<FactAccumulator>,
    limits: RetrievalLimits,
    accessed: NaiveDate,
}

impl ToolExecutor {
    /// Creates an executor bound to `capabilities`.
    ///
    /// A fresh [`FactAccumulator`] is created when the capabilities include
    /// fact recording.
    #[must_use]
    pub fn new(
        capabilities: &Capabilities,
        retriever: Arc<dyn Retriever>,
        citations: Arc<dyn CitationFormatter>,
        limits: RetrievalLimits,
    ) -> Self {
        Self {
            retriever,
            citations,
            tools: capabilities.tools.clone(),
            accumulator: capabilities.records_facts().then(FactAccumulator::new),
            limits,
            accessed: Local::now().date_naive(),
        }
    }

    /// Overrides the citation access date.
    #[must_use]
    pub const fn with_access_date(mut self, accessed: NaiveDate) -> Self {
        self.accessed = accessed;
        self
    }

    /// Current source and fact counts (zero in narrative mode).
    #[must_use]
    pub fn progress(&self) -> Progress {
        self.accumulator
            .as_ref()
            .map_or_else(Progress::default, |acc| Progress {
                sources: acc.source_count(),
                facts: acc.fact_count(),
            })
    }

    /// Consumes the executor, returning its accumulator.
    #[must_use]
    pub fn into_accumulator(self) -> Option<FactAccumulator> {
        self.accumulator
    }

    /// Dispatches a tool call.
    ///
    /// Bad arguments, unknown or unbound tools, missing articles and
    /// rejected facts come back as error results for the model to react to.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::Retrieval`] when the retriever gives up; the
    /// query cannot continue.
    pub async fn execute(&mut self, call: &ToolCall) -> Result<ToolResult, AgentError> {
        if call.arguments.len() > MAX_TOOL_ARGS_LEN {
            return Ok(ToolResult::error(
                call,
                format!(
                    "tool arguments too large ({} bytes, max {MAX_TOOL_ARGS_LEN})",
                    call.arguments.len()
                ),
            ));
        }

        let kind = match ToolKind::from_name(&call.name) {
            Some(kind) if self.tools.contains(kind) => kind,
            Some(_) => {
                return Ok(ToolResult::error(
                    call,
                    format!("tool '{}' is not available for this query", call.name),
                ));
            }
            None => {
                return Ok(ToolResult::error(
                    call,
                    format!("unknown tool '{}'", call.name),
                ));
            }
        };

        debug!(tool = %kind, "executing tool");
        let args = if call.arguments.trim().is_empty() {
            "{}"
        } else {
            call.arguments.as_str()
        };

        let result = match kind {
            ToolKind::SearchWikipedia => self.tool_search_wikipedia(args).await,
            ToolKind::GetWikipediaArticle => self.tool_get_article(args).await,
            ToolKind::SearchAndRetrieveArticles => self.tool_search_and_retrieve(args).await,
            ToolKind::SearchAndRetrieveArticlesJson => {
                self.tool_search_and_retrieve_json(args).await
            }
            ToolKind::FormatMlaCitation => self.tool_format_citation(args).await,
            ToolKind::RecordFact => self.tool_record_fact(args),
        };

        match result {
            Ok(content) => Ok(ToolResult::ok(call, content)),
            Err(AgentError::Retrieval(e)) => Err(AgentError::Retrieval(e)),
            Err(e) => Ok(ToolResult::error(call, e.to_string())),
        }
    }

    /// Registers an article and returns its source ID (structured mode).
    fn register(&mut self, article: &Article) -> Option<String> {
        self.accumulator
            .as_mut()
            .map(|acc| acc.register_source(article.metadata()))
    }

    // -----------------------------------------------------------------------
    // Tool implementations
    // -----------------------------------------------------------------------

    async fn tool_search_wikipedia(&mut self, args: &str) -> Result<String, AgentError> {
        #[derive(Deserialize)]
        struct Args {
            query: String,
            max_articles: Option<usize>,
        }
        let args: Args = parse_args(ToolKind::SearchWikipedia, args)?;
        let articles = self
            .retriever
            .search(
                &args.query,
                self.limits.articles(args.max_articles),
                self.limits.max_chars_per_article,
            )
            .await?;

        if articles.is_empty() {
            return Ok(format!("No Wikipedia articles found for query: {}", args.query));
        }

        let mut out = format!("Found {} Wikipedia articles:\n", articles.len());
        for (i, article) in articles.iter().enumerate() {
            let _ = write!(
                out,
                "\n{}. {}\n   URL: {}\n   Words: {}\n",
                i + 1,
                article.title,
                article.url,
                article.word_count
            );
            if let Some(id) = self.register(article) {
                let _ = writeln!(out, "   SOURCE ID: {id}");
            }
        }
        Ok(out)
    }

    async fn tool_get_article(&mut self, args: &str) -> Result<String, AgentError> {
        #[derive(Deserialize)]
        struct Args {
            title: String,
            max_chars: Option<usize>,
        }
        let args: Args = parse_args(ToolKind::GetWikipediaArticle, args)?;
        let Some(article) = self
            .retriever
            .get_article(&args.title, self.limits.chars(args.max_chars))
            .await?
        else {
            return Ok(format!("Article '{}' not found on Wikipedia.", args.title));
        };

        let mut out = String::new();
        if let Some(id) = self.register(&article) {
            let _ = writeln!(out, "SOURCE ID: {id}");
        }
        let _ = write!(
            out,
            "Title: {}\nURL: {}\nLast Modified: {}\nWord Count: {}\n\nSummary:\n{}\n\nContent:\n{}\n",
            article.title,
            article.url,
            article.last_modified_label(),
            article.word_count,
            article.summary,
            article.content
        );
        Ok(out)
    }

    async fn search_articles(
        &self,
        args: &str,
        kind: ToolKind,
    ) -> Result<(String, Vec<Article>), AgentError> {
        #[derive(Deserialize)]
        struct Args {
            query: String,
            max_articles: Option<usize>,
            max_chars_per_article: Option<usize>,
        }
        let args: Args = parse_args(kind, args)?;
        let articles = self
            .retriever
            .search(
                &args.query,
                self.limits.articles(args.max_articles),
                self.limits.chars(args.max_chars_per_article),
            )
            .await?;
        Ok((args.query, articles))
    }

    async fn tool_search_and_retrieve(&mut self, args: &str) -> Result<String, AgentError> {
        let (query, articles) = self
            .search_articles(args, ToolKind::SearchAndRetrieveArticles)
            .await?;
        if articles.is_empty() {
            return Ok(format!("No Wikipedia articles found for query: {query}"));
        }

        let mut out = format!("Retrieved {} Wikipedia articles:\n\n", articles.len());
        for (i, article) in articles.iter().enumerate() {
            let _ = write!(out, "{RULE}\nArticle {}: {}\n{RULE}\n", i + 1, article.title);
            write_article_body(&mut out, article);
        }

        let _ = write!(
            out,
            "\n{RULE}\nWorks Cited ({} Format):\n{RULE}\n{}\n",
            self.citations.style(),
            self.citations.works_cited(&articles, self.accessed)
        );
        Ok(out)
    }

    async fn tool_search_and_retrieve_json(&mut self, args: &str) -> Result<String, AgentError> {
        let (query, articles) = self
            .search_articles(args, ToolKind::SearchAndRetrieveArticlesJson)
            .await?;
        if articles.is_empty() {
            return Ok(format!("No Wikipedia articles found for query: {query}"));
        }

        let mut out = format!("Retrieved {} Wikipedia articles:\n\n", articles.len());
        for article in &articles {
            let id = self.register(article).unwrap_or_default();
            let _ = write!(out, "{RULE}\nSOURCE ID: {id}\nArticle: {}\n{RULE}\n", article.title);
            write_article_body(&mut out, article);
        }
        out.push_str("\nIMPORTANT: Use the provided SOURCE IDs when recording facts.\n");
        Ok(out)
    }

    async fn tool_format_citation(&self, args: &str) -> Result<String, AgentError> {
        #[derive(Deserialize)]
        struct Args {
            title: String,
        }
        let args: Args = parse_args(ToolKind::FormatMlaCitation, args)?;
        let article = self.retriever.get_article(&args.title, 1).await?;
        Ok(article.map_or_else(
            || {
                format!(
                    "Article '{}' not found on Wikipedia. Cannot generate citation.",
                    args.title
                )
            },
            |a| self.citations.format(&a, self.accessed),
        ))
    }

    fn tool_record_fact(&mut self, args: &str) -> Result<String, AgentError> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum SourceIds {
            One(String),
            Many(Vec<String>),
        }

        #[derive(Deserialize)]
        struct Args {
            fact: String,
            source_ids: SourceIds,
            category: String,
        }

        let name = ToolKind::RecordFact.name();
        let args: Args = serde_json::from_str(args).map_err(|e| {
            let violation = SchemaViolation::MalformedArguments {
                message: e.to_string(),
            };
            warn!(%violation, "rejected fact");
            AgentError::ToolExecution {
                name: name.to_string(),
                message: violation.to_string(),
            }
        })?;
        let source_ids = match args.source_ids {
            SourceIds::One(id) => vec![id],
            SourceIds::Many(ids) => ids,
        };

        let accumulator = self.accumulator.as_mut().ok_or_else(|| AgentError::ToolExecution {
            name: name.to_string(),
            message: "fact recording is not active for this query".to_string(),
        })?;

        let (category, sources) = accumulator
            .record_fact(&args.fact, &source_ids, &args.category)
            .map(|fact| (fact.category, fact.source_ids.len()))
            .map_err(|violation| AgentError::ToolExecution {
                name: name.to_string(),
                message: format!("fact rejected: {violation}"),
            })?;

        Ok(format!(
            "Fact recorded (category: {category}, {sources} source(s)). {} fact(s) recorded so far.",
            accumulator.fact_count()
        ))
    }
}

impl std::fmt::Debug for ToolExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolExecutor")
            .field("retriever", &self.retriever.name())
            .field("tools", &self.tools)
            .field("progress", &self.progress())
            .finish_non_exhaustive()
    }
}

fn parse_args<T: serde::de::DeserializeOwned>(
    kind: ToolKind,
    args: &str,
) -> Result<T, AgentError> {
    serde_json::from_str(args).map_err(|e| AgentError::ToolExecution {
        name: kind.name().to_string(),
        message: format!("invalid arguments: {e}"),
    })
}

fn write_article_body(out: &mut String, article: &Article) {
    let _ = write!(
        out,
        "URL: {}\nWord Count: {}\nLast Modified: {}\n\nSummary:\n{}\n\nContent:\n{}\n\n",
        article.url,
        article.word_count,
        article.last_modified_label(),
        article.summary,
        article.content
    );
}
