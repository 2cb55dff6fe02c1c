//! Append-only conversation history.

use thiserror::Error;

use crate::llm::{ChatMessage, ToolCall};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TranscriptError {
    /// A tool result referenced an id that is not awaiting a result.
    #[error("no unresolved tool call with id {0}")]
    UnknownToolCallId(String),

    #[error("{0} tool call(s) still awaiting results")]
    Unresolved(usize),
}

/// The ordered message log sent to the model on every call.
///
/// Messages are only ever appended. Tool results must answer a request made
/// by the most recent tool-calling assistant message, and each request is
/// answered exactly once.
#[derive(Debug, Clone)]
pub struct Transcript {
    messages: Vec<ChatMessage>,
    pending: Vec<String>,
}

impl Transcript {
    /// Start a transcript with the system instruction.
    pub fn new(system_prompt: impl Into<String>) -> Self {
        Self {
            messages: vec![ChatMessage::system(system_prompt)],
            pending: Vec::new(),
        }
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn push_user(&mut self, text: impl Into<String>) {
        self.messages.push(ChatMessage::user(text));
    }

    pub fn push_assistant(&mut self, text: impl Into<String>) {
        self.messages.push(ChatMessage::assistant(text));
    }

    /// Append an assistant message that requests tool calls. Each request
    /// stays pending until [`Transcript::push_tool_result`] answers it.
    pub fn push_tool_calls(&mut self, content: Option<String>, calls: Vec<ToolCall>) {
        self.pending.extend(calls.iter().map(|c| c.id.clone()));
        self.messages
            .push(ChatMessage::assistant_tool_calls(content, calls));
    }

    pub fn push_tool_result(
        &mut self,
        tool_call_id: &str,
        content: impl Into<String>,
    ) -> Result<(), TranscriptError> {
        let index = self
            .pending
            .iter()
            .position(|id| id == tool_call_id)
            .ok_or_else(|| TranscriptError::UnknownToolCallId(tool_call_id.to_string()))?;
        self.pending.remove(index);
        self.messages
            .push(ChatMessage::tool_result(tool_call_id, content));
        Ok(())
    }

    /// Fails if any tool call is still waiting for its result.
    pub fn ensure_resolved(&self) -> Result<(), TranscriptError> {
        if self.pending.is_empty() {
            Ok(())
        } else {
            Err(TranscriptError::Unresolved(self.pending.len()))
        }
    }
}
