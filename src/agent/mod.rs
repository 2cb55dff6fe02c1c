//! Agent module - the interactive turn-loop.
//!
//! Each user turn follows the "tools in a loop" pattern:
//! 1. Append the user's line to the transcript
//! 2. Call the LLM with the full transcript and the tool catalog
//! 3. If the LLM requests tool calls, execute them, append the results and go to 2
//! 4. Otherwise print the reply and wait for the next line

mod agent_loop;
mod io;
mod prompt;
mod transcript;

pub use agent_loop::{Agent, LoopSettings, SessionError, SessionSummary, TurnState};
pub use io::{Console, PromptedInput, StdConsole, StdinInput, UserInput};
pub use prompt::build_system_prompt;
pub use transcript::{Transcript, TranscriptError};
