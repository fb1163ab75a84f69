//! `OpenAI`-compatible provider implementation using the `async-openai` crate.
//!
//! Serves `OpenAI` itself, `OpenRouter` and Ollama's `/v1` endpoint; they
//! differ only in base URL and key, both taken from [`AgentConfig`].

use async_openai::Client;
use async_openai::config::OpenAIConfig;
use async_openai::error::OpenAIError;
use async_openai::types::{
    ChatCompletionMessageToolCall, ChatCompletionRequestAssistantMessage,
    ChatCompletionRequestAssistantMessageContent, ChatCompletionRequestMessage,
    ChatCompletionRequestSystemMessage, ChatCompletionRequestSystemMessageContent,
    ChatCompletionRequestToolMessage, ChatCompletionRequestToolMessageContent,
    ChatCompletionRequestUserMessage, ChatCompletionRequestUserMessageContent, ChatCompletionTool,
    ChatCompletionToolType, CreateChatCompletionRequest, CreateChatCompletionResponse,
    CreateChatCompletionStreamResponse, FinishReason, FunctionCall, FunctionObject,
};
use async_trait::async_trait;
use futures_util::StreamExt;
use futures_util::stream;
use tracing::debug;

use crate::agent::config::AgentConfig;
use crate::agent::message::{ChatMessage, ChatRequest, ChatResponse, Role, TokenUsage};
use crate::agent::provider::{DeltaStream, LlmProvider, StreamDelta};
use crate::agent::tool::ToolCall;
use crate::error::AgentError;

/// Placeholder key for servers that ignore authentication.
const NO_KEY: &str = "not-needed";

/// `OpenAI`-compatible LLM provider.
pub struct OpenAiProvider {
    client: Client<OpenAIConfig>,
    flavor: &'static str,
}

impl OpenAiProvider {
    /// Creates a new provider from agent configuration.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::Configuration`] if the HTTP client cannot be
    /// built.
    pub fn new(config: &AgentConfig) -> Result<Self, AgentError> {
        let key = config.api_key.as_deref().unwrap_or(NO_KEY);
        let mut openai_config = OpenAIConfig::new().with_api_key(key);

        if let Some(ref base_url) = config.base_url {
            openai_config = openai_config.with_api_base(base_url);
        }

        let flavor = match config.provider.as_str() {
            "openrouter" => "openrouter",
            "ollama" => "ollama",
            _ => "openai",
        };

        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| AgentError::Configuration {
                message: format!("cannot build HTTP client: {e}"),
            })?;

        Ok(Self {
            client: Client::with_config(openai_config).with_http_client(http),
            flavor,
        })
    }

    /// Converts our message type to the `OpenAI` SDK type.
    fn convert_message(msg: &ChatMessage) -> ChatCompletionRequestMessage {
        match msg.role {
            Role::System => {
                ChatCompletionRequestMessage::System(ChatCompletionRequestSystemMessage {
                    content: ChatCompletionRequestSystemMessageContent::Text(msg.content.clone()),
                    name: None,
                })
            }
            Role::User => ChatCompletionRequestMessage::User(ChatCompletionRequestUserMessage {
                content: ChatCompletionRequestUserMessageContent::Text(msg.content.clone()),
                name: None,
            }),
            Role::Assistant => {
                let tool_calls = (!msg.tool_calls.is_empty()).then(|| {
                    msg.tool_calls
                        .iter()
                        .map(|tc| ChatCompletionMessageToolCall {
                            id: tc.id.clone(),
                            r#type: ChatCompletionToolType::Function,
                            function: FunctionCall {
                                name: tc.name.clone(),
                                arguments: tc.arguments.clone(),
                            },
                        })
                        .collect()
                });

                let content = (!msg.content.is_empty()).then(|| {
                    ChatCompletionRequestAssistantMessageContent::Text(msg.content.clone())
                });

                #[allow(deprecated)]
                ChatCompletionRequestMessage::Assistant(ChatCompletionRequestAssistantMessage {
                    content,
                    name: None,
                    tool_calls,
                    refusal: None,
                    audio: None,
                    function_call: None,
                })
            }
            Role::Tool => ChatCompletionRequestMessage::Tool(ChatCompletionRequestToolMessage {
                content: ChatCompletionRequestToolMessageContent::Text(msg.content.clone()),
                tool_call_id: msg.tool_call_id.clone().unwrap_or_default(),
            }),
        }
    }

    /// Builds an `OpenAI` chat completion request from our generic request.
    fn build_request(request: &ChatRequest) -> CreateChatCompletionRequest {
        let messages: Vec<_> = request.messages.iter().map(Self::convert_message).collect();

        let tools = (!request.tools.is_empty()).then(|| {
            request
                .tools
                .iter()
                .map(|td| ChatCompletionTool {
                    r#type: ChatCompletionToolType::Function,
                    function: FunctionObject {
                        name: td.name.clone(),
                        description: Some(td.description.clone()),
                        parameters: Some(td.parameters.clone()),
                        strict: None,
                    },
                })
                .collect()
        });

        CreateChatCompletionRequest {
            model: request.model.clone(),
            messages,
            temperature: request.temperature.filter(|&t| t != 0.0),
            max_completion_tokens: request.max_tokens,
            stream: request.stream.then_some(true),
            tools,
            ..Default::default()
        }
    }

    /// Flattens one streamed chunk into deltas.
    fn chunk_deltas(response: &CreateChatCompletionStreamResponse) -> Vec<StreamDelta> {
        let Some(choice) = response.choices.first() else {
            return Vec::new();
        };

        let mut deltas = Vec::new();
        if let Some(text) = choice.delta.content.as_ref().filter(|t| !t.is_empty()) {
            deltas.push(StreamDelta::Text(text.clone()));
        }
        for chunk in choice.delta.tool_calls.iter().flatten() {
            let name = chunk.function.as_ref().and_then(|f| f.name.clone());
            if chunk.id.is_some() || name.is_some() {
                deltas.push(StreamDelta::ToolCallStart {
                    index: chunk.index,
                    id: chunk.id.clone().unwrap_or_default(),
                    name: name.unwrap_or_default(),
                });
            }
            if let Some(args) = chunk
                .function
                .as_ref()
                .and_then(|f| f.arguments.as_ref())
                .filter(|a| !a.is_empty())
            {
                deltas.push(StreamDelta::ToolCallArguments {
                    index: chunk.index,
                    fragment: args.clone(),
                });
            }
        }
        if let Some(ref reason) = choice.finish_reason {
            deltas.push(StreamDelta::Finish {
                reason: finish_reason_label(reason),
            });
        }
        deltas
    }

    /// Maps a completed SDK response to our response type.
    fn into_response(response: CreateChatCompletionResponse) -> ChatResponse {
        let usage = response
            .usage
            .map_or_else(TokenUsage::default, |u| TokenUsage {
                prompt_tokens: u.prompt_tokens,
                completion_tokens: u.completion_tokens,
                total_tokens: u.total_tokens,
            });

        let Some(choice) = response.choices.into_iter().next() else {
            return ChatResponse {
                usage,
                ..ChatResponse::default()
            };
        };

        let tool_calls: Vec<ToolCall> = choice
            .message
            .tool_calls
            .unwrap_or_default()
            .into_iter()
            .map(|tc| ToolCall {
                id: tc.id,
                name: tc.function.name,
                arguments: tc.function.arguments,
            })
            .collect();

        ChatResponse {
            content: choice.message.content.unwrap_or_default(),
            usage,
            tool_calls,
            finish_reason: choice.finish_reason.as_ref().map(finish_reason_label),
        }
    }
}

fn finish_reason_label(reason: &FinishReason) -> String {
    format!("{reason:?}").to_lowercase()
}

fn api_error(e: &OpenAIError) -> AgentError {
    AgentError::ApiRequest {
        message: e.to_string(),
        status: None,
    }
}

impl std::fmt::Debug for OpenAiProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiProvider")
            .field("flavor", &self.flavor)
            .field("client", &"<async-openai::Client>")
            .finish()
    }
}

#[async_trait]
impl LlmProvider for OpenAiProvider {
    fn name(&self) -> &'static str {
        self.flavor
    }

    async fn chat(&self, request: &ChatRequest) -> Result<ChatResponse, AgentError> {
        let openai_request = Self::build_request(request);

        let response = self
            .client
            .chat()
            .create(openai_request)
            .await
            .map_err(|e| api_error(&e))?;

        let response = Self::into_response(response);
        debug!(
            provider = self.flavor,
            tool_calls = response.tool_calls.len(),
            total_tokens = response.usage.total_tokens,
            "chat completion"
        );
        Ok(response)
    }

    async fn chat_stream(&self, request: &ChatRequest) -> Result<DeltaStream, AgentError> {
        let mut stream_request = request.clone();
        stream_request.stream = true;
        let openai_request = Self::build_request(&stream_request);

        let stream = self
            .client
            .chat()
            .create_stream(openai_request)
            .await
            .map_err(|e| api_error(&e))?;

        let mapped = stream.flat_map(
            |result: Result<CreateChatCompletionStreamResponse, OpenAIError>| {
                let items: Vec<Result<StreamDelta, AgentError>> = match result {
                    Ok(response) => Self::chunk_deltas(&response).into_iter().map(Ok).collect(),
                    Err(e) => vec![Err(AgentError::Stream {
                        message: e.to_string(),
                    })],
                };
                stream::iter(items)
            },
        );

        Ok(Box::pin(mapped))
    }
}
