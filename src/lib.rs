//! # Chat Agent
//!
//! An interactive command-line agent that chats through OpenRouter and lets
//! the model call local tools.
//!
//! This library provides:
//! - A turn-loop that feeds tool results back to the model until it replies
//! - A tool registry with schema-validated arguments and file tools
//! - An OpenRouter chat-completions client
//!
//! ## Architecture
//!
//! The agent follows the "tools in a loop" pattern:
//! 1. Read a line from the user and append it to the transcript
//! 2. Send the transcript and tool catalog to the LLM
//! 3. Execute any requested tool calls and append their results
//! 4. Repeat 2-3 until the LLM answers, then print the answer
//!
//! ## Example
//!
//! ```rust,ignore
//! use chat_agent::{agent::{Agent, StdConsole, StdinInput}, Config};
//!
//! let config = Config::from_env()?;
//! let mut agent = Agent::from_config(&config)?;
//! agent.run(&mut StdinInput::stdin(), &mut StdConsole).await?;
//! ```

pub mod agent;
pub mod config;
pub mod llm;
pub mod tools;

pub use config::Config;
