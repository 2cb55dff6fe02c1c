//! OpenRouter chat-completions backend.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{header, Client, StatusCode};
use serde::{Deserialize, Serialize};

use super::{ChatMessage, Completion, LlmClient, LlmError, ToolCall, ToolSchema};
use crate::config::Config;

/// Connection settings for [`OpenRouterClient`].
#[derive(Debug, Clone)]
pub struct OpenRouterConfig {
    pub api_key: String,
    pub base_url: String,
    pub model: String,
    pub max_tokens: u32,
    pub timeout: Duration,
}

impl From<&Config> for OpenRouterConfig {
    fn from(config: &Config) -> Self {
        Self {
            api_key: config.api_key.clone(),
            base_url: config.base_url.clone(),
            model: config.model.clone(),
            max_tokens: config.max_tokens,
            timeout: config.request_timeout,
        }
    }
}

/// OpenRouter client speaking the OpenAI-compatible chat-completions API.
pub struct OpenRouterClient {
    client: Client,
    config: OpenRouterConfig,
}

impl OpenRouterClient {
    pub fn new(config: OpenRouterConfig) -> Result<Self, LlmError> {
        let client = Client::builder().timeout(config.timeout).build()?;
        Ok(Self { client, config })
    }

    fn completions_url(&self) -> String {
        format!("{}/chat/completions", self.config.base_url)
    }
}

#[async_trait]
impl LlmClient for OpenRouterClient {
    async fn complete(
        &self,
        messages: &[ChatMessage],
        tools: &[ToolSchema],
    ) -> Result<Completion, LlmError> {
        let request = ChatRequest {
            model: &self.config.model,
            messages,
            max_tokens: self.config.max_tokens,
            tools: (!tools.is_empty()).then_some(tools),
        };

        tracing::debug!(
            model = %self.config.model,
            messages = messages.len(),
            tools = tools.len(),
            "Sending chat completion request"
        );

        let response = self
            .client
            .post(self.completions_url())
            .header(header::AUTHORIZATION, format!("Bearer {}", self.config.api_key))
            .header("X-Title", "chat-agent")
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        parse_response(status, &body)
    }
}

/// Map an HTTP status and body onto a normalized completion.
fn parse_response(status: StatusCode, body: &str) -> Result<Completion, LlmError> {
    if !status.is_success() {
        let message = serde_json::from_str::<ErrorBody>(body)
            .map(|e| e.error.message)
            .unwrap_or_else(|_| format!("HTTP {}: {}", status, body));

        return Err(match status.as_u16() {
            401 | 403 => LlmError::Auth(message),
            429 => LlmError::RateLimit(message),
            500..=599 => LlmError::Server(message),
            _ => LlmError::Api(message),
        });
    }

    let parsed: ChatResponse = serde_json::from_str(body)?;

    // OpenRouter can report upstream provider failures inside a 200 response.
    if let Some(error) = parsed.error {
        return Err(LlmError::Api(error.message));
    }

    let message = parsed
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| LlmError::MalformedResponse("response contained no choices".into()))?
        .message;

    Completion::from_parts(message.content, message.tool_calls)
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<&'a [ToolSchema]>,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
    error: Option<ApiError>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: Option<String>,
    tool_calls: Option<Vec<ToolCall>>,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: ApiError,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    message: String,
}
