//! LLM transport: message types, the client trait, and the OpenRouter backend.
//!
//! The message types serialize directly into the OpenAI-compatible wire
//! format that OpenRouter accepts, so the transcript can be sent as-is.

mod error;
mod openrouter;

pub use error::LlmError;
pub use openrouter::{OpenRouterClient, OpenRouterConfig};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Message role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
    Tool,
}

/// One transcript entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,

    /// Present only on assistant messages that request tool execution.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<ToolCall>>,

    /// Present only on tool messages; links the result to its request.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self::text(Role::System, content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::text(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::text(Role::Assistant, content)
    }

    /// Assistant message carrying tool-call requests (and any text the model
    /// emitted alongside them).
    pub fn assistant_tool_calls(content: Option<String>, calls: Vec<ToolCall>) -> Self {
        Self {
            role: Role::Assistant,
            content,
            tool_calls: Some(calls),
            tool_call_id: None,
        }
    }

    pub fn tool_result(tool_call_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: Role::Tool,
            content: Some(content.into()),
            tool_calls: None,
            tool_call_id: Some(tool_call_id.into()),
        }
    }

    fn text(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: Some(content.into()),
            tool_calls: None,
            tool_call_id: None,
        }
    }
}

/// A tool invocation requested by the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    /// Opaque, transport-assigned identifier.
    pub id: String,

    #[serde(rename = "type", default = "function_type")]
    pub call_type: String,

    pub function: FunctionCall,
}

impl ToolCall {
    pub fn new(id: impl Into<String>, name: impl Into<String>, arguments: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            call_type: function_type(),
            function: FunctionCall {
                name: name.into(),
                arguments: arguments.into(),
            },
        }
    }
}

/// Function name plus its JSON-encoded arguments, exactly as the model sent them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionCall {
    pub name: String,
    #[serde(default, deserialize_with = "arguments_as_text")]
    pub arguments: String,
}

/// Accept arguments as JSON text, `null`, or an already-decoded JSON value.
///
/// Validation happens at the tool registry, so anything the model sends is
/// carried through as text rather than failing the whole response.
fn arguments_as_text<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::Null => String::new(),
        serde_json::Value::String(text) => text,
        other => other.to_string(),
    })
}

/// A tool as advertised to the model.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToolSchema {
    #[serde(rename = "type")]
    pub tool_type: String,
    pub function: FunctionSchema,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FunctionSchema {
    pub name: String,
    pub description: String,
    pub parameters: serde_json::Value,
}

fn function_type() -> String {
    "function".to_string()
}

/// Normalized outcome of one successful completion call.
///
/// Transport failures are the `Err` side of [`LlmClient::complete`].
#[derive(Debug, Clone, PartialEq)]
pub enum Completion {
    /// Terminal reply for the user.
    AssistantText(String),
    /// One or more tool calls; `content` is any text sent alongside them.
    ToolCallsRequested {
        content: Option<String>,
        calls: Vec<ToolCall>,
    },
}

impl Completion {
    /// Normalize the raw parts of an assistant message.
    ///
    /// Tool calls take precedence over text. A message with neither is a
    /// malformed response, never an empty success.
    pub fn from_parts(
        content: Option<String>,
        tool_calls: Option<Vec<ToolCall>>,
    ) -> Result<Self, LlmError> {
        let content = content.filter(|c| !c.trim().is_empty());

        match tool_calls {
            Some(calls) if !calls.is_empty() => Ok(Self::ToolCallsRequested { content, calls }),
            _ => content.map(Self::AssistantText).ok_or_else(|| {
                LlmError::MalformedResponse("response contained neither text nor tool calls".into())
            }),
        }
    }
}

/// A chat-completion transport.
///
/// Implementations send the whole transcript and tool catalog in one request
/// and do not retry; retry policy belongs to the caller.
#[async_trait]
pub trait LlmClient: Send + Sync {
    async fn complete(
        &self,
        messages: &[ChatMessage],
        tools: &[ToolSchema],
    ) -> Result<Completion, LlmError>;
}
