//! In-memory retriever and scripted provider for unit tests.

#![allow(clippy::panic)]

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use futures_util::stream;

use super::message::{ChatRequest, ChatResponse, TokenUsage};
use super::provider::{DeltaStream, LlmProvider, StreamDelta};
use super::tool::ToolCall;
use crate::error::{AgentError, RetrievalError};
use crate::retrieval::{Article, Retriever, truncate_chars};

/// Builds a tool call.
pub fn call(id: &str, name: &str, arguments: &str) -> ToolCall {
    ToolCall {
        id: id.to_string(),
        name: name.to_string(),
        arguments: arguments.to_string(),
    }
}

/// Builds an article with a fixed revision date.
pub fn article(title: &str, content: &str) -> Article {
    Article {
        title: title.to_string(),
        url: format!("https://en.wikipedia.org/wiki/{}", title.replace(' ', "_")),
        summary: content.split('.').next().unwrap_or_default().to_string(),
        content: content.to_string(),
        last_modified: Utc.with_ymd_and_hms(2024, 11, 15, 10, 30, 0).single(),
        word_count: content.split_whitespace().count(),
    }
}

/// Retriever over a fixed article list.
///
/// A search matches articles whose title or content contains any query word
/// longer than two characters.
pub struct MockRetriever {
    articles: Vec<Article>,
    failing: bool,
    pub calls: AtomicUsize,
}

impl MockRetriever {
    pub fn new(articles: Vec<Article>) -> Self {
        Self {
            articles,
            failing: false,
            calls: AtomicUsize::new(0),
        }
    }

    /// Two articles about quantum computing.
    pub fn quantum() -> Self {
        Self::new(vec![
            article(
                "Quantum computing",
                "A quantum computer is a computer that exploits quantum mechanical phenomena.",
            ),
            article(
                "Qubit",
                "A qubit is the basic unit of quantum information. It can be in a superposition.",
            ),
        ])
    }

    /// Retriever whose every call fails after retries.
    pub fn failing() -> Self {
        Self {
            failing: true,
            ..Self::new(Vec::new())
        }
    }

    fn check(&self) -> Result<(), RetrievalError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.failing {
            return Err(RetrievalError::RetriesExhausted {
                endpoint: "mock".to_string(),
                attempts: 4,
                message: "HTTP 503".to_string(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl Retriever for MockRetriever {
    fn name(&self) -> &'static str {
        "mock"
    }

    async fn search_titles(
        &self,
        query: &str,
        max_results: usize,
    ) -> Result<Vec<String>, RetrievalError> {
        self.check()?;
        let words: Vec<String> = query
            .split_whitespace()
            .filter(|w| w.len() > 2)
            .map(str::to_lowercase)
            .collect();
        Ok(self
            .articles
            .iter()
            .filter(|a| {
                let haystack = format!("{} {}", a.title, a.content).to_lowercase();
                words.iter().any(|w| haystack.contains(w.as_str()))
            })
            .take(max_results)
            .map(|a| a.title.clone())
            .collect())
    }

    async fn get_article(
        &self,
        title: &str,
        max_chars: usize,
    ) -> Result<Option<Article>, RetrievalError> {
        self.check()?;
        Ok(self.articles.iter().find(|a| a.title == title).map(|a| {
            let mut a = a.clone();
            a.content = truncate_chars(&a.content, max_chars);
            a
        }))
    }
}

type Script = dyn Fn(&ChatRequest) -> Result<ChatResponse, AgentError> + Send + Sync;

/// Provider that answers each request with a closure over the conversation.
pub struct ScriptedProvider {
    script: Box<Script>,
    pub calls: AtomicUsize,
}

impl ScriptedProvider {
    pub fn new(
        script: impl Fn(&ChatRequest) -> Result<ChatResponse, AgentError> + Send + Sync + 'static,
    ) -> Arc<Self> {
        Arc::new(Self {
            script: Box::new(script),
            calls: AtomicUsize::new(0),
        })
    }

    fn respond(&self, request: &ChatRequest) -> Result<ChatResponse, AgentError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        (self.script)(request)
    }
}

/// A text-only response.
pub fn text(content: &str) -> ChatResponse {
    ChatResponse {
        content: content.to_string(),
        usage: TokenUsage {
            prompt_tokens: 10,
            completion_tokens: 5,
            total_tokens: 15,
        },
        tool_calls: Vec::new(),
        finish_reason: Some("stop".to_string()),
    }
}

/// A response that requests tool calls, optionally with leading text.
pub fn tools(content: &str, calls: Vec<ToolCall>) -> ChatResponse {
    ChatResponse {
        tool_calls: calls,
        finish_reason: Some("tool_calls".to_string()),
        ..text(content)
    }
}

/// Splits a response into the deltas a streaming provider would send.
fn deltas(response: ChatResponse) -> Vec<StreamDelta> {
    let mut out: Vec<StreamDelta> = response
        .content
        .split_inclusive(' ')
        .map(|piece| StreamDelta::Text(piece.to_string()))
        .collect();
    for (index, call) in (0u32..).zip(response.tool_calls) {
        let mid = call
            .arguments
            .char_indices()
            .nth(call.arguments.chars().count() / 2)
            .map_or(call.arguments.len(), |(i, _)| i);
        out.push(StreamDelta::ToolCallStart {
            index,
            id: call.id,
            name: call.name,
        });
        out.push(StreamDelta::ToolCallArguments {
            index,
            fragment: call.arguments[..mid].to_string(),
        });
        out.push(StreamDelta::ToolCallArguments {
            index,
            fragment: call.arguments[mid..].to_string(),
        });
    }
    out.push(StreamDelta::Finish {
        reason: response.finish_reason.unwrap_or_default(),
    });
    out
}

#[async_trait]
impl LlmProvider for ScriptedProvider {
    fn name(&self) -> &'static str {
        "scripted"
    }

    async fn chat(&self, request: &ChatRequest) -> Result<ChatResponse, AgentError> {
        tokio::task::yield_now().await;
        self.respond(request)
    }

    async fn chat_stream(&self, request: &ChatRequest) -> Result<DeltaStream, AgentError> {
        tokio::task::yield_now().await;
        let response = self.respond(request)?;
        Ok(Box::pin(stream::iter(deltas(response).into_iter().map(Ok))))
    }
}
