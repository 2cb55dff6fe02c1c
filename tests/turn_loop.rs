//! End-to-end turn-loop scenarios with a scripted model and real file tools.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chat_agent::agent::{Agent, Console, LoopSettings, TurnState, UserInput};
use chat_agent::llm::{ChatMessage, Completion, LlmClient, LlmError, Role, ToolCall, ToolSchema};
use chat_agent::tools::ToolRegistry;
use tempfile::TempDir;

/// Replays canned completions and records the transcript seen by each call.
struct ScriptedLlm {
    replies: Mutex<VecDeque<Completion>>,
    seen: Mutex<Vec<Vec<ChatMessage>>>,
    catalogs: Mutex<Vec<usize>>,
}

impl ScriptedLlm {
    fn new(replies: Vec<Completion>) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(replies.into()),
            seen: Mutex::new(Vec::new()),
            catalogs: Mutex::new(Vec::new()),
        })
    }

    fn seen(&self) -> Vec<Vec<ChatMessage>> {
        self.seen.lock().unwrap().clone()
    }
}

#[async_trait]
impl LlmClient for ScriptedLlm {
    async fn complete(
        &self,
        messages: &[ChatMessage],
        tools: &[ToolSchema],
    ) -> Result<Completion, LlmError> {
        self.seen.lock().unwrap().push(messages.to_vec());
        self.catalogs.lock().unwrap().push(tools.len());
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| LlmError::Api("no scripted reply left".into()))
    }
}

/// Hands out lines and records how many times it was asked.
struct ScriptedInput {
    lines: VecDeque<String>,
    prompts: usize,
}

impl ScriptedInput {
    fn new(lines: &[&str]) -> Self {
        Self {
            lines: lines.iter().map(|l| l.to_string()).collect(),
            prompts: 0,
        }
    }
}

#[async_trait]
impl UserInput for ScriptedInput {
    async fn next_user_input(&mut self) -> std::io::Result<Option<String>> {
        self.prompts += 1;
        Ok(self.lines.pop_front())
    }
}

#[derive(Default)]
struct CapturedConsole {
    replies: Vec<String>,
    tools: Vec<String>,
    errors: Vec<String>,
}

impl Console for CapturedConsole {
    fn assistant(&mut self, text: &str) {
        self.replies.push(text.to_string());
    }

    fn tool_call(&mut self, name: &str, _arguments: &str) {
        self.tools.push(name.to_string());
    }

    fn error(&mut self, message: &str) {
        self.errors.push(message.to_string());
    }
}

fn workspace() -> TempDir {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("notes.txt"), "meeting at 5pm").unwrap();
    std::fs::write(dir.path().join("todo.txt"), "buy milk").unwrap();
    dir
}

fn agent(llm: Arc<ScriptedLlm>, dir: &TempDir, settings: LoopSettings) -> Agent {
    let tools = ToolRegistry::with_defaults(dir.path(), Duration::from_secs(5)).unwrap();
    Agent::new(llm, Arc::new(tools), settings, "You are a test assistant.")
}

fn read_file(id: &str, path: &str) -> ToolCall {
    ToolCall::new(id, "read_file", format!(r#"{{"filePath":"{}"}}"#, path))
}

fn text(s: &str) -> Completion {
    Completion::AssistantText(s.to_string())
}

fn tool_calls(calls: Vec<ToolCall>) -> Completion {
    Completion::ToolCallsRequested {
        content: None,
        calls,
    }
}

#[tokio::test]
async fn plain_reply_returns_to_user() {
    let dir = workspace();
    let llm = ScriptedLlm::new(vec![text("hi there")]);
    let mut agent = agent(llm.clone(), &dir, LoopSettings::default());
    let mut input = ScriptedInput::new(&["hello"]);
    let mut console = CapturedConsole::default();

    let summary = agent.run(&mut input, &mut console).await.unwrap();

    let messages = agent.transcript().messages();
    assert_eq!(messages.len(), 3);
    assert_eq!(messages[0].role, Role::System);
    assert_eq!(messages[1], ChatMessage::user("hello"));
    assert_eq!(messages[2], ChatMessage::assistant("hi there"));

    assert_eq!(console.replies, ["hi there"]);
    assert_eq!(llm.seen().len(), 1);
    assert_eq!(input.prompts, 2);
    assert_eq!(summary.turns, 1);
    assert_eq!(summary.tool_calls, 0);
    assert_eq!(agent.state(), &TurnState::Terminated);
}

#[tokio::test]
async fn tool_result_is_fed_back_without_user_input() {
    let dir = workspace();
    let llm = ScriptedLlm::new(vec![
        tool_calls(vec![read_file("t1", "notes.txt")]),
        text("You have a meeting at 5pm"),
    ]);
    let mut agent = agent(llm.clone(), &dir, LoopSettings::default());
    let mut input = ScriptedInput::new(&["what's in notes.txt?"]);
    let mut console = CapturedConsole::default();

    agent.run(&mut input, &mut console).await.unwrap();

    let messages = agent.transcript().messages();
    let roles: Vec<_> = messages.iter().map(|m| m.role).collect();
    assert_eq!(
        roles,
        [Role::System, Role::User, Role::Assistant, Role::Tool, Role::Assistant]
    );
    assert_eq!(messages[2].tool_calls.as_deref(), Some(&[read_file("t1", "notes.txt")][..]));
    assert_eq!(messages[3], ChatMessage::tool_result("t1", "meeting at 5pm"));
    assert_eq!(messages[4], ChatMessage::assistant("You have a meeting at 5pm"));

    // The second call already carried the tool result; the user was asked
    // only for the first line and the terminating one.
    let seen = llm.seen();
    assert_eq!(seen.len(), 2);
    assert_eq!(seen[1].len(), 4);
    assert_eq!(seen[1][3], ChatMessage::tool_result("t1", "meeting at 5pm"));
    assert_eq!(input.prompts, 2);
    assert_eq!(console.tools, ["read_file"]);
    assert_eq!(console.replies, ["You have a meeting at 5pm"]);
    assert_eq!(*llm.catalogs.lock().unwrap(), [3, 3]);
}

#[tokio::test]
async fn multiple_tool_calls_resolve_in_request_order() {
    let dir = workspace();
    let llm = ScriptedLlm::new(vec![
        tool_calls(vec![
            read_file("a", "todo.txt"),
            read_file("b", "notes.txt"),
            ToolCall::new("c", "list_files", ""),
        ]),
        text("done"),
    ]);
    let mut agent = agent(llm.clone(), &dir, LoopSettings::default());

    let summary = agent
        .run(&mut ScriptedInput::new(&["summarize"]), &mut CapturedConsole::default())
        .await
        .unwrap();

    let messages = agent.transcript().messages();
    let ids: Vec<_> = messages[3..6]
        .iter()
        .map(|m| m.tool_call_id.as_deref().unwrap())
        .collect();
    assert_eq!(ids, ["a", "b", "c"]);
    assert_eq!(messages[3].content.as_deref(), Some("buy milk"));
    assert_eq!(messages[4].content.as_deref(), Some("meeting at 5pm"));
    assert_eq!(messages[5].content.as_deref(), Some(r#"["notes.txt","todo.txt"]"#));
    assert_eq!(summary.tool_calls, 3);
    assert_eq!(summary.model_calls, 2);
}

#[tokio::test]
async fn parallel_dispatch_keeps_deterministic_order() {
    let dir = workspace();
    let llm = ScriptedLlm::new(vec![
        tool_calls(vec![read_file("a", "notes.txt"), read_file("b", "todo.txt")]),
        text("done"),
    ]);
    let settings = LoopSettings {
        parallel_tools: true,
        ..LoopSettings::default()
    };
    let mut agent = agent(llm.clone(), &dir, settings);

    agent
        .run(&mut ScriptedInput::new(&["both"]), &mut CapturedConsole::default())
        .await
        .unwrap();

    let messages = agent.transcript().messages();
    assert_eq!(messages[3], ChatMessage::tool_result("a", "meeting at 5pm"));
    assert_eq!(messages[4], ChatMessage::tool_result("b", "buy milk"));
}

#[tokio::test]
async fn tool_failures_become_results_the_model_sees() {
    let dir = workspace();
    let llm = ScriptedLlm::new(vec![
        tool_calls(vec![
            read_file("missing", "nope.txt"),
            ToolCall::new("unknown", "delete_everything", "{}"),
            ToolCall::new("invalid", "read_file", r#"{"path":"notes.txt"}"#),
        ]),
        text("sorry, I could not read that"),
    ]);
    let mut agent = agent(llm.clone(), &dir, LoopSettings::default());
    let mut console = CapturedConsole::default();

    agent
        .run(&mut ScriptedInput::new(&["read nope.txt"]), &mut console)
        .await
        .unwrap();

    let messages = agent.transcript().messages();
    assert_eq!(messages.len(), 7);

    let missing = messages[3].content.as_deref().unwrap();
    assert!(missing.starts_with("Error: tool read_file failed"), "{missing}");
    assert!(missing.contains("nope.txt"));

    assert_eq!(
        messages[4].content.as_deref(),
        Some("Error: unknown tool: delete_everything")
    );

    let invalid = messages[5].content.as_deref().unwrap();
    assert!(invalid.starts_with("Error: invalid arguments for read_file"), "{invalid}");

    assert_eq!(console.replies, ["sorry, I could not read that"]);
    assert!(console.errors.is_empty());
}

#[tokio::test]
async fn each_turn_appends_its_own_chain() {
    let dir = workspace();
    let llm = ScriptedLlm::new(vec![
        text("hi"),
        tool_calls(vec![read_file("t1", "todo.txt")]),
        text("buy milk"),
    ]);
    let mut agent = agent(llm.clone(), &dir, LoopSettings::default());

    let summary = agent
        .run(
            &mut ScriptedInput::new(&["hello", "what's on my list?", ""]),
            &mut CapturedConsole::default(),
        )
        .await
        .unwrap();

    let roles: Vec<_> = agent.transcript().messages().iter().map(|m| m.role).collect();
    assert_eq!(
        roles,
        [
            Role::System,
            Role::User,
            Role::Assistant,
            Role::User,
            Role::Assistant,
            Role::Tool,
            Role::Assistant,
        ]
    );
    assert_eq!(summary.turns, 2);
    assert_eq!(summary.model_calls, 3);
}

#[tokio::test]
async fn empty_line_terminates_immediately() {
    let dir = workspace();
    let llm = ScriptedLlm::new(vec![text("unused")]);
    let mut agent = agent(llm.clone(), &dir, LoopSettings::default());

    agent
        .run(&mut ScriptedInput::new(&["", "hello"]), &mut CapturedConsole::default())
        .await
        .unwrap();

    assert_eq!(agent.transcript().len(), 1);
    assert!(llm.seen().is_empty());
    assert_eq!(agent.state(), &TurnState::Terminated);
}

#[tokio::test]
async fn transport_failure_is_reported_and_fatal() {
    let dir = workspace();
    let llm = ScriptedLlm::new(vec![]);
    let mut agent = agent(llm.clone(), &dir, LoopSettings::default());
    let mut input = ScriptedInput::new(&["hello", "again"]);
    let mut console = CapturedConsole::default();

    let err = agent.run(&mut input, &mut console).await.unwrap_err();

    assert!(err.to_string().contains("no scripted reply left"));
    assert_eq!(console.errors.len(), 1);
    assert_eq!(input.prompts, 1);
    // The user message stays; nothing else is appended.
    assert_eq!(agent.transcript().len(), 2);
}

#[tokio::test]
async fn empty_arguments_are_validated_not_fatal() {
    let dir = workspace();
    let llm = ScriptedLlm::new(vec![
        tool_calls(vec![
            ToolCall::new("r", "read_file", ""),
            ToolCall::new("l", "list_files", ""),
        ]),
        text("which file?"),
    ]);
    let mut agent = agent(llm.clone(), &dir, LoopSettings::default());
    let mut console = CapturedConsole::default();

    agent
        .run(&mut ScriptedInput::new(&["read it"]), &mut console)
        .await
        .unwrap();

    let messages = agent.transcript().messages();
    let read = messages[3].content.as_deref().unwrap();
    assert!(read.starts_with("Error: invalid arguments for read_file"), "{read}");
    assert_eq!(messages[4].content.as_deref(), Some(r#"["notes.txt","todo.txt"]"#));
    assert_eq!(console.replies, ["which file?"]);
    assert!(console.errors.is_empty());
}
