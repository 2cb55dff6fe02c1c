//! Terminal input and output for the interactive session.

use async_trait::async_trait;
use tokio::io::{
    AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader, Lines, Stdin, Stdout,
};

const USER_PROMPT: &str = "You: ";

/// Source of user turns.
#[async_trait]
pub trait UserInput: Send {
    /// Next line from the user, or `None` when the session should end.
    async fn next_user_input(&mut self) -> std::io::Result<Option<String>>;
}

/// Where the session reports replies and failures.
pub trait Console: Send {
    fn assistant(&mut self, text: &str);

    fn tool_call(&mut self, name: &str, arguments: &str);

    fn error(&mut self, message: &str);
}

/// Reads one line per turn, writing the `You: ` prompt before each read.
///
/// End of input or a blank line ends the session.
pub struct PromptedInput<R, W> {
    lines: Lines<BufReader<R>>,
    prompt_out: W,
}

/// Interactive input from the terminal.
pub type StdinInput = PromptedInput<Stdin, Stdout>;

impl<R, W> PromptedInput<R, W>
where
    R: AsyncRead + Unpin + Send,
    W: AsyncWrite + Unpin + Send,
{
    pub fn new(reader: R, prompt_out: W) -> Self {
        Self {
            lines: BufReader::new(reader).lines(),
            prompt_out,
        }
    }
}

impl PromptedInput<Stdin, Stdout> {
    pub fn stdin() -> Self {
        Self::new(tokio::io::stdin(), tokio::io::stdout())
    }
}

impl Default for PromptedInput<Stdin, Stdout> {
    fn default() -> Self {
        Self::stdin()
    }
}

#[async_trait]
impl<R, W> UserInput for PromptedInput<R, W>
where
    R: AsyncRead + Unpin + Send,
    W: AsyncWrite + Unpin + Send,
{
    async fn next_user_input(&mut self) -> std::io::Result<Option<String>> {
        self.prompt_out.write_all(USER_PROMPT.as_bytes()).await?;
        self.prompt_out.flush().await?;

        let line = self.lines.next_line().await?;
        Ok(line
            .map(|l| l.trim().to_string())
            .filter(|l| !l.is_empty()))
    }
}

pub fn format_assistant(text: &str) -> String {
    format!("Assistant: {}", text)
}

pub fn format_tool_call(name: &str, arguments: &str) -> String {
    format!("\x1b[2mtool: {}({})\x1b[0m", name, arguments)
}

pub fn format_error(message: &str) -> String {
    format!("Error: {}", message)
}

/// Prints to the terminal.
#[derive(Debug, Default)]
pub struct StdConsole;

impl Console for StdConsole {
    fn assistant(&mut self, text: &str) {
        println!("{}", format_assistant(text));
    }

    fn tool_call(&mut self, name: &str, arguments: &str) {
        println!("{}", format_tool_call(name, arguments));
    }

    fn error(&mut self, message: &str) {
        eprintln!("{}", format_error(message));
    }
}
