//! Core agent turn-loop implementation.

use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use thiserror::Error;

use crate::config::Config;
use crate::llm::{Completion, LlmClient, LlmError, OpenRouterClient, OpenRouterConfig, ToolCall};
use crate::tools::{ToolError, ToolRegistry};

use super::io::{Console, UserInput};
use super::prompt::build_system_prompt;
use super::transcript::{Transcript, TranscriptError};

/// Session-ending failures.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("transport failure: {0}")]
    Transport(#[from] LlmError),

    #[error("stopped after {0} consecutive tool rounds without a reply")]
    LoopBoundExceeded(usize),

    #[error("transcript invariant violated: {0}")]
    Transcript(#[from] TranscriptError),

    #[error("failed to read input: {0}")]
    Input(#[from] std::io::Error),
}

/// Where the loop is in the current turn.
#[derive(Debug, Clone, PartialEq)]
pub enum TurnState {
    AwaitingUserInput,
    AwaitingModel,
    ExecutingTools(Vec<ToolCall>),
    Terminated,
}

/// Loop limits and dispatch policy.
#[derive(Debug, Clone)]
pub struct LoopSettings {
    /// Consecutive tool-only model turns allowed within one user turn.
    pub max_tool_rounds: usize,
    /// Retries for transient transport failures.
    pub max_retries: u32,
    /// Initial retry backoff; doubled after every retry.
    pub retry_backoff: Duration,
    /// Run one turn's tool calls concurrently. Results are still appended in
    /// request order.
    pub parallel_tools: bool,
}

impl Default for LoopSettings {
    fn default() -> Self {
        Self {
            max_tool_rounds: 25,
            max_retries: 2,
            retry_backoff: Duration::from_millis(500),
            parallel_tools: false,
        }
    }
}

impl From<&Config> for LoopSettings {
    fn from(config: &Config) -> Self {
        Self {
            max_tool_rounds: config.max_tool_rounds,
            max_retries: config.max_retries,
            retry_backoff: config.retry_backoff,
            parallel_tools: config.parallel_tools,
        }
    }
}

/// Counters reported when a session ends cleanly.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionSummary {
    pub turns: usize,
    pub model_calls: usize,
    pub tool_calls: usize,
}

/// The interactive agent.
pub struct Agent {
    llm: Arc<dyn LlmClient>,
    tools: Arc<ToolRegistry>,
    settings: LoopSettings,
    transcript: Transcript,
    state: TurnState,
    summary: SessionSummary,
}

impl Agent {
    /// Create an agent talking to OpenRouter with the built-in tools.
    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        let llm = Arc::new(OpenRouterClient::new(OpenRouterConfig::from(config))?);
        let tools = ToolRegistry::with_defaults(&config.workspace_path, config.tool_timeout)?;
        let system_prompt =
            build_system_prompt(&config.workspace_path.to_string_lossy(), &tools);

        Ok(Self::new(llm, Arc::new(tools), LoopSettings::from(config), system_prompt))
    }

    /// Create an agent from its collaborators. The transcript is seeded with
    /// `system_prompt`.
    pub fn new(
        llm: Arc<dyn LlmClient>,
        tools: Arc<ToolRegistry>,
        settings: LoopSettings,
        system_prompt: impl Into<String>,
    ) -> Self {
        Self {
            llm,
            tools,
            settings,
            transcript: Transcript::new(system_prompt),
            state: TurnState::AwaitingUserInput,
            summary: SessionSummary::default(),
        }
    }

    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    pub fn state(&self) -> &TurnState {
        &self.state
    }

    /// Run the session until the user ends it or a fatal error occurs.
    ///
    /// Fatal errors are reported on `console` before being returned.
    pub async fn run(
        &mut self,
        input: &mut dyn UserInput,
        console: &mut dyn Console,
    ) -> Result<SessionSummary, SessionError> {
        let mut tool_rounds = 0;

        loop {
            // Any early return below leaves the agent terminated.
            let state = std::mem::replace(&mut self.state, TurnState::Terminated);

            self.state = match state {
                TurnState::AwaitingUserInput => {
                    let line = match input.next_user_input().await {
                        Ok(line) => line,
                        Err(e) => return Err(fail(console, e.into())),
                    };

                    match line.filter(|l| !l.trim().is_empty()) {
                        Some(text) => {
                            self.transcript.push_user(text);
                            self.summary.turns += 1;
                            tool_rounds = 0;
                            TurnState::AwaitingModel
                        }
                        None => {
                            tracing::debug!("End of input, terminating session");
                            TurnState::Terminated
                        }
                    }
                }

                TurnState::AwaitingModel => {
                    if let Err(e) = self.transcript.ensure_resolved() {
                        return Err(fail(console, e.into()));
                    }

                    match self.complete_with_retry().await {
                        Ok(Completion::AssistantText(text)) => {
                            console.assistant(&text);
                            self.transcript.push_assistant(text);
                            TurnState::AwaitingUserInput
                        }
                        Ok(Completion::ToolCallsRequested { content, calls }) => {
                            if tool_rounds >= self.settings.max_tool_rounds {
                                return Err(fail(
                                    console,
                                    SessionError::LoopBoundExceeded(tool_rounds),
                                ));
                            }
                            tool_rounds += 1;
                            self.transcript.push_tool_calls(content, calls.clone());
                            TurnState::ExecutingTools(calls)
                        }
                        Err(e) => return Err(fail(console, e.into())),
                    }
                }

                TurnState::ExecutingTools(calls) => {
                    if let Err(e) = self.execute_tool_calls(&calls, console).await {
                        return Err(fail(console, e));
                    }
                    TurnState::AwaitingModel
                }

                TurnState::Terminated => return Ok(self.summary),
            };
        }
    }

    /// Call the model, retrying transient failures with exponential backoff.
    async fn complete_with_retry(&mut self) -> Result<Completion, LlmError> {
        let catalog = self.tools.describe_all();
        let mut backoff = self.settings.retry_backoff;
        let mut attempt = 0;

        loop {
            self.summary.model_calls += 1;
            tracing::debug!(
                messages = self.transcript.len(),
                attempt = attempt + 1,
                "Calling model"
            );

            match self.llm.complete(self.transcript.messages(), &catalog).await {
                Ok(completion) => return Ok(completion),
                Err(e) if e.is_retryable() && attempt < self.settings.max_retries => {
                    attempt += 1;
                    tracing::warn!(
                        error = %e,
                        attempt,
                        max_retries = self.settings.max_retries,
                        backoff_ms = backoff.as_millis() as u64,
                        "Model call failed, retrying"
                    );
                    tokio::time::sleep(backoff).await;
                    backoff = next_backoff(backoff);
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Resolve every requested call and append one tool message per request,
    /// in the order the model listed them.
    async fn execute_tool_calls(
        &mut self,
        calls: &[ToolCall],
        console: &mut dyn Console,
    ) -> Result<(), SessionError> {
        if self.settings.parallel_tools {
            for call in calls {
                console.tool_call(&call.function.name, &call.function.arguments);
            }

            let tools = Arc::clone(&self.tools);
            let outputs = join_all(
                calls
                    .iter()
                    .map(|call| tools.invoke(&call.function.name, &call.function.arguments)),
            )
            .await;

            for (call, output) in calls.iter().zip(outputs) {
                self.record_tool_result(call, output)?;
            }
        } else {
            for call in calls {
                console.tool_call(&call.function.name, &call.function.arguments);
                let output = self
                    .tools
                    .invoke(&call.function.name, &call.function.arguments)
                    .await;
                self.record_tool_result(call, output)?;
            }
        }

        Ok(())
    }

    /// Fold a tool outcome into the transcript. Failures become result text
    /// so the model can react to them.
    fn record_tool_result(
        &mut self,
        call: &ToolCall,
        output: Result<String, ToolError>,
    ) -> Result<(), SessionError> {
        self.summary.tool_calls += 1;

        let content = match output {
            Ok(text) => text,
            Err(e) => {
                tracing::warn!(tool = %call.function.name, id = %call.id, error = %e, "Tool call failed");
                format!("Error: {}", e)
            }
        };

        self.transcript.push_tool_result(&call.id, content)?;
        Ok(())
    }
}

/// Double the retry delay, saturating instead of overflowing.
fn next_backoff(backoff: Duration) -> Duration {
    backoff.saturating_mul(2)
}

fn fail(console: &mut dyn Console, error: SessionError) -> SessionError {
    tracing::error!(error = %error, "Session terminated");
    console.error(&error.to_string());
    error
}
