//! Agent configuration with builder pattern, TOML file and environment
//! variable support.
//!
//! Configuration is resolved in order: explicit values → config file →
//! environment variables → defaults. Each layer only fills fields the
//! previous layers left unset.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use tracing::warn;

use crate::error::AgentError;
use crate::retrieval::{WikipediaConfig, has_citation_marker};

/// Providers the factory knows how to build.
pub const SUPPORTED_PROVIDERS: &[&str] = &["openai", "openrouter", "ollama"];

/// Default provider.
const DEFAULT_PROVIDER: &str = "openai";
/// Default sampling temperature.
const DEFAULT_TEMPERATURE: f32 = 0.2;
/// Default completion token limit.
const DEFAULT_MAX_TOKENS: u32 = 4096;
/// Default request timeout in seconds.
const DEFAULT_TIMEOUT_SECS: u64 = 120;
/// Default max retries.
const DEFAULT_MAX_RETRIES: u32 = 3;
/// Default maximum tool-calling loop iterations.
const DEFAULT_MAX_TOOL_ITERATIONS: usize = 10;
/// Default articles per search.
const DEFAULT_MAX_ARTICLES: usize = 3;
/// Default characters of body text per article.
const DEFAULT_MAX_CHARS_PER_ARTICLE: usize = 3000;
/// Hard cap on articles per search.
pub const MAX_ARTICLES_LIMIT: usize = 10;
/// Hard cap on characters per article.
pub const MAX_CHARS_LIMIT: usize = 20_000;
/// Hard cap on retrieval retries.
pub const MAX_RETRIES_LIMIT: u32 = 10;

/// Model, base URL and API key variable for a provider.
struct ProviderDefaults {
    model: &'static str,
    base_url: Option<&'static str>,
    key_env: Option<&'static str>,
}

fn provider_defaults(provider: &str) -> ProviderDefaults {
    match provider {
        "openrouter" => ProviderDefaults {
            model: "openai/gpt-4o-mini",
            base_url: Some("https://openrouter.ai/api/v1"),
            key_env: Some("OPENROUTER_API_KEY"),
        },
        "ollama" => ProviderDefaults {
            model: "llama3.1",
            base_url: Some("http://localhost:11434/v1"),
            key_env: None,
        },
        _ => ProviderDefaults {
            model: "gpt-4o-mini",
            base_url: None,
            key_env: Some("OPENAI_API_KEY"),
        },
    }
}

/// What to do when a narrative answer carries no citation marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CitationStrictness {
    /// Log a warning and return the answer.
    #[default]
    Warn,
    /// Fail the query.
    Fail,
}

impl std::str::FromStr for CitationStrictness {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "warn" => Ok(Self::Warn),
            "fail" => Ok(Self::Fail),
            other => Err(format!("unknown citation strictness '{other}'")),
        }
    }
}

/// Citation enforcement for narrative answers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CitationPolicy {
    /// Whether to check for citation markers at all.
    pub enforce: bool,
    /// Outcome when no marker is found.
    pub strictness: CitationStrictness,
}

impl CitationPolicy {
    /// Checks a finished narrative answer.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::CitationMissing`] when enforcement is on, the
    /// strictness is [`CitationStrictness::Fail`] and `text` has no marker.
    pub fn check(&self, text: &str) -> Result<(), AgentError> {
        if !self.enforce || has_citation_marker(text) {
            return Ok(());
        }
        match self.strictness {
            CitationStrictness::Warn => {
                warn!(chars = text.len(), "answer carries no citation marker");
                Ok(())
            }
            CitationStrictness::Fail => Err(AgentError::CitationMissing),
        }
    }
}

/// Configuration for the agent system.
#[derive(Debug, Clone)]
pub struct AgentConfig {
    /// LLM provider name (`openai`, `openrouter` or `ollama`).
    pub provider: String,
    /// API key for the provider (not needed for `ollama`).
    pub api_key: Option<String>,
    /// Optional base URL override (for proxies or compatible APIs).
    pub base_url: Option<String>,
    /// Model identifier.
    pub model: String,
    /// Sampling temperature.
    pub temperature: f32,
    /// Maximum completion tokens per round.
    pub max_tokens: u32,
    /// Request timeout.
    pub timeout: Duration,
    /// Maximum retry attempts per request.
    pub max_retries: u32,
    /// Maximum tool-calling loop iterations before aborting.
    pub max_tool_iterations: usize,
    /// Default articles per search tool call.
    pub max_articles: usize,
    /// Default characters of body text per article.
    pub max_chars_per_article: usize,
    /// Wikipedia language edition.
    pub language: String,
    /// Optional `User-Agent` override for Wikipedia requests.
    pub user_agent: Option<String>,
    /// Citation enforcement for narrative answers.
    pub citations: CitationPolicy,
    /// Directory containing prompt template files.
    ///
    /// Missing files fall back to the compiled-in defaults.
    pub prompt_dir: Option<PathBuf>,
}

impl AgentConfig {
    /// Creates a new builder for `AgentConfig`.
    #[must_use]
    pub fn builder() -> AgentConfigBuilder {
        AgentConfigBuilder::default()
    }

    /// Retrieval settings derived from this configuration.
    #[must_use]
    pub fn wikipedia(&self) -> WikipediaConfig {
        let mut config = WikipediaConfig {
            language: self.language.clone(),
            max_retries: self.max_retries,
            ..WikipediaConfig::default()
        };
        if let Some(ref agent) = self.user_agent {
            config.user_agent.clone_from(agent);
        }
        config
    }
}

/// Default config file location (`~/.config/wiki-agent/config.toml`).
#[must_use]
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("wiki-agent").join("config.toml"))
}

/// On-disk configuration layout.
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct FileConfig {
    llm: LlmSection,
    wikipedia: WikipediaSection,
    agent: AgentSection,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct LlmSection {
    provider: Option<String>,
    model: Option<String>,
    base_url: Option<String>,
    api_key_env: Option<String>,
    temperature: Option<f32>,
    max_tokens: Option<u32>,
    timeout_secs: Option<u64>,
    max_retries: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct WikipediaSection {
    language: Option<String>,
    user_agent: Option<String>,
    max_articles: Option<usize>,
    max_chars_per_article: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct AgentSection {
    max_tool_iterations: Option<usize>,
    enforce_citations: Option<bool>,
    citation_strictness: Option<CitationStrictness>,
    prompt_dir: Option<PathBuf>,
}

/// Builder for [`AgentConfig`].
#[derive(Debug, Clone, Default)]
pub struct AgentConfigBuilder {
    provider: Option<String>,
    api_key: Option<String>,
    base_url: Option<String>,
    model: Option<String>,
    temperature: Option<f32>,
    max_tokens: Option<u32>,
    timeout: Option<Duration>,
    max_retries: Option<u32>,
    max_tool_iterations: Option<usize>,
    max_articles: Option<usize>,
    max_chars_per_article: Option<usize>,
    language: Option<String>,
    user_agent: Option<String>,
    enforce_citations: Option<bool>,
    citation_strictness: Option<CitationStrictness>,
    prompt_dir: Option<PathBuf>,
}

/// Reads and parses an environment variable, ignoring unparsable values.
fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|v| v.trim().parse().ok())
}

fn env_bool(key: &str) -> Option<bool> {
    std::env::var(key)
        .ok()
        .map(|v| matches!(v.trim().to_lowercase().as_str(), "1" | "true" | "yes" | "on"))
}

impl AgentConfigBuilder {
    /// Populates unset fields from environment variables.
    #[must_use]
    pub fn from_env(mut self) -> Self {
        if self.provider.is_none() {
            self.provider = std::env::var("WIKI_AGENT_PROVIDER").ok();
        }
        if self.api_key.is_none() {
            let provider = self.provider.as_deref().unwrap_or(DEFAULT_PROVIDER);
            self.api_key = std::env::var("WIKI_AGENT_API_KEY")
                .ok()
                .or_else(|| {
                    provider_defaults(provider)
                        .key_env
                        .and_then(|key| std::env::var(key).ok())
                })
                .filter(|k| !k.trim().is_empty());
        }
        if self.base_url.is_none() {
            self.base_url = std::env::var("WIKI_AGENT_BASE_URL").ok();
        }
        if self.model.is_none() {
            self.model = std::env::var("WIKI_AGENT_MODEL").ok();
        }
        if self.temperature.is_none() {
            self.temperature = env_parse("WIKI_AGENT_TEMPERATURE");
        }
        if self.max_tool_iterations.is_none() {
            self.max_tool_iterations = env_parse("WIKI_AGENT_MAX_TOOL_ITERATIONS");
        }
        if self.max_articles.is_none() {
            self.max_articles = env_parse("WIKI_AGENT_MAX_ARTICLES");
        }
        if self.max_chars_per_article.is_none() {
            self.max_chars_per_article = env_parse("WIKI_AGENT_MAX_CHARS_PER_ARTICLE");
        }
        if self.language.is_none() {
            self.language = std::env::var("WIKI_AGENT_LANGUAGE").ok();
        }
        if self.enforce_citations.is_none() {
            self.enforce_citations = env_bool("WIKI_AGENT_ENFORCE_CITATIONS");
        }
        if self.citation_strictness.is_none() {
            self.citation_strictness = env_parse("WIKI_AGENT_CITATION_STRICTNESS");
        }
        if self.prompt_dir.is_none() {
            self.prompt_dir = std::env::var("WIKI_AGENT_PROMPT_DIR")
                .ok()
                .map(PathBuf::from);
        }
        self
    }

    /// Populates unset fields from a TOML config file.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::Configuration`] if the file cannot be read or
    /// parsed.
    pub fn from_file(self, path: &Path) -> Result<Self, AgentError> {
        let text = std::fs::read_to_string(path).map_err(|e| AgentError::Configuration {
            message: format!("cannot read {}: {e}", path.display()),
        })?;
        self.from_toml(&text).map_err(|e| AgentError::Configuration {
            message: format!("{}: {e}", path.display()),
        })
    }

    /// Populates unset fields from the default config file, if it exists.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::Configuration`] if the file exists but is invalid.
    pub fn from_default_file(self) -> Result<Self, AgentError> {
        match default_config_path() {
            Some(path) if path.is_file() => self.from_file(&path),
            _ => Ok(self),
        }
    }

    fn from_toml(mut self, text: &str) -> Result<Self, toml::de::Error> {
        let file: FileConfig = toml::from_str(text)?;
        let FileConfig {
            llm,
            wikipedia,
            agent,
        } = file;

        self.provider = self.provider.or(llm.provider);
        self.model = self.model.or(llm.model);
        self.base_url = self.base_url.or(llm.base_url);
        if self.api_key.is_none() {
            self.api_key = llm
                .api_key_env
                .and_then(|key| std::env::var(key).ok())
                .filter(|k| !k.trim().is_empty());
        }
        self.temperature = self.temperature.or(llm.temperature);
        self.max_tokens = self.max_tokens.or(llm.max_tokens);
        self.timeout = self.timeout.or(llm.timeout_secs.map(Duration::from_secs));
        self.max_retries = self.max_retries.or(llm.max_retries);

        self.language = self.language.or(wikipedia.language);
        self.user_agent = self.user_agent.or(wikipedia.user_agent);
        self.max_articles = self.max_articles.or(wikipedia.max_articles);
        self.max_chars_per_article = self
            .max_chars_per_article
            .or(wikipedia.max_chars_per_article);

        self.max_tool_iterations = self.max_tool_iterations.or(agent.max_tool_iterations);
        self.enforce_citations = self.enforce_citations.or(agent.enforce_citations);
        self.citation_strictness = self.citation_strictness.or(agent.citation_strictness);
        self.prompt_dir = self.prompt_dir.or(agent.prompt_dir);
        Ok(self)
    }

    /// Sets the LLM provider name.
    #[must_use]
    pub fn provider(mut self, provider: impl Into<String>) -> Self {
        self.provider = Some(provider.into());
        self
    }

    /// Sets the API key.
    #[must_use]
    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    /// Sets the base URL override.
    #[must_use]
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Sets the model.
    #[must_use]
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    /// Sets the sampling temperature.
    #[must_use]
    pub const fn temperature(mut self, t: f32) -> Self {
        self.temperature = Some(t);
        self
    }

    /// Sets the completion token limit.
    #[must_use]
    pub const fn max_tokens(mut self, n: u32) -> Self {
        self.max_tokens = Some(n);
        self
    }

    /// Sets the request timeout.
    #[must_use]
    pub const fn timeout(mut self, duration: Duration) -> Self {
        self.timeout = Some(duration);
        self
    }

    /// Sets the max retries.
    #[must_use]
    pub const fn max_retries(mut self, n: u32) -> Self {
        self.max_retries = Some(n);
        self
    }

    /// Sets the maximum tool-calling loop iterations.
    #[must_use]
    pub const fn max_tool_iterations(mut self, n: usize) -> Self {
        self.max_tool_iterations = Some(n);
        self
    }

    /// Sets the default articles per search.
    #[must_use]
    pub const fn max_articles(mut self, n: usize) -> Self {
        self.max_articles = Some(n);
        self
    }

    /// Sets the default characters per article.
    #[must_use]
    pub const fn max_chars_per_article(mut self, n: usize) -> Self {
        self.max_chars_per_article = Some(n);
        self
    }

    /// Sets the Wikipedia language edition.
    #[must_use]
    pub fn language(mut self, language: impl Into<String>) -> Self {
        self.language = Some(language.into());
        self
    }

    /// Enables or disables citation enforcement.
    #[must_use]
    pub const fn enforce_citations(mut self, enforce: bool) -> Self {
        self.enforce_citations = Some(enforce);
        self
    }

    /// Sets the citation strictness.
    #[must_use]
    pub const fn citation_strictness(mut self, strictness: CitationStrictness) -> Self {
        self.citation_strictness = Some(strictness);
        self
    }

    /// Sets the prompt template directory.
    #[must_use]
    pub fn prompt_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.prompt_dir = Some(dir.into());
        self
    }

    /// Builds the [`AgentConfig`].
    ///
    /// # Errors
    ///
    /// - [`AgentError::UnsupportedProvider`] for an unknown provider name.
    /// - [`AgentError::ApiKeyMissing`] if the provider needs a key and none
    ///   was set.
    /// - [`AgentError::Configuration`] for out-of-range values.
    pub fn build(self) -> Result<AgentConfig, AgentError> {
        let provider = self
            .provider
            .map_or_else(|| DEFAULT_PROVIDER.to_string(), |p| p.trim().to_lowercase());
        if !SUPPORTED_PROVIDERS.contains(&provider.as_str()) {
            return Err(AgentError::UnsupportedProvider { name: provider });
        }
        let defaults = provider_defaults(&provider);

        let api_key = self.api_key.filter(|k| !k.trim().is_empty());
        if api_key.is_none() && defaults.key_env.is_some() {
            return Err(AgentError::ApiKeyMissing);
        }

        let model = self
            .model
            .filter(|m| !m.trim().is_empty())
            .unwrap_or_else(|| defaults.model.to_string());

        let temperature = self.temperature.unwrap_or(DEFAULT_TEMPERATURE);
        if !(0.0..=2.0).contains(&temperature) {
            return Err(AgentError::Configuration {
                message: format!("temperature {temperature} outside 0.0..=2.0"),
            });
        }

        let max_articles = self.max_articles.unwrap_or(DEFAULT_MAX_ARTICLES);
        if max_articles == 0 || max_articles > MAX_ARTICLES_LIMIT {
            return Err(AgentError::Configuration {
                message: format!("max_articles must be between 1 and {MAX_ARTICLES_LIMIT}"),
            });
        }

        let max_chars_per_article = self
            .max_chars_per_article
            .unwrap_or(DEFAULT_MAX_CHARS_PER_ARTICLE);
        if max_chars_per_article == 0 || max_chars_per_article > MAX_CHARS_LIMIT {
            return Err(AgentError::Configuration {
                message: format!("max_chars_per_article must be between 1 and {MAX_CHARS_LIMIT}"),
            });
        }

        let max_tool_iterations = self
            .max_tool_iterations
            .unwrap_or(DEFAULT_MAX_TOOL_ITERATIONS);
        if max_tool_iterations == 0 {
            return Err(AgentError::Configuration {
                message: "max_tool_iterations must be at least 1".to_string(),
            });
        }

        let max_retries = self.max_retries.unwrap_or(DEFAULT_MAX_RETRIES);
        if max_retries > MAX_RETRIES_LIMIT {
            return Err(AgentError::Configuration {
                message: format!("max_retries must be at most {MAX_RETRIES_LIMIT}"),
            });
        }

        Ok(AgentConfig {
            base_url: self
                .base_url
                .or_else(|| defaults.base_url.map(str::to_string)),
            provider,
            api_key,
            model,
            temperature,
            max_tokens: self.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS),
            timeout: self
                .timeout
                .unwrap_or(Duration::from_secs(DEFAULT_TIMEOUT_SECS)),
            max_retries,
            max_tool_iterations,
            max_articles,
            max_chars_per_article,
            language: self.language.unwrap_or_else(|| "en".to_string()),
            user_agent: self.user_agent,
            citations: CitationPolicy {
                enforce: self.enforce_citations.unwrap_or(false),
                strictness: self.citation_strictness.unwrap_or_default(),
            },
            prompt_dir: self.prompt_dir,
        })
    }
}
