//! Configuration management for the chat agent.
//!
//! Configuration can be set via environment variables (a `.env` file in the
//! working directory is loaded first, if present):
//! - `OPENROUTER_API_KEY` - Required. Your OpenRouter API key. `OPENROUTER_KEY` is accepted as a fallback.
//! - `OPENROUTER_BASE_URL` - Optional. API base URL. Defaults to `https://openrouter.ai/api/v1`.
//! - `DEFAULT_MODEL` - Optional. The LLM model to use. Defaults to `deepseek/deepseek-chat:free`.
//! - `MAX_TOKENS` - Optional. Upper bound on the size of each model reply. Defaults to `1000`.
//! - `MAX_TOOL_ROUNDS` - Optional. Consecutive tool-only model turns allowed per user turn. Defaults to `25`.
//! - `MAX_RETRIES` - Optional. Retries for transient transport failures. Defaults to `2`.
//! - `RETRY_BACKOFF_MS` - Optional. Initial retry backoff, doubled per attempt. Defaults to `500`.
//! - `REQUEST_TIMEOUT_SECS` - Optional. Timeout for one completion request. Defaults to `120`.
//! - `TOOL_TIMEOUT_SECS` - Optional. Timeout for one tool invocation. Defaults to `30`.
//! - `PARALLEL_TOOLS` - Optional. Dispatch the tool calls of one turn concurrently. Defaults to `false`.
//! - `WORKSPACE_PATH` - Optional. Directory tool paths resolve against. Defaults to current directory.

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;

/// Default OpenRouter API base URL.
pub const DEFAULT_BASE_URL: &str = "https://openrouter.ai/api/v1";

/// Default model identifier (OpenRouter format).
pub const DEFAULT_MODEL: &str = "deepseek/deepseek-chat:free";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid value for {0}: {1}")]
    InvalidValue(String, String),
}

/// Agent configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// OpenRouter API key
    pub api_key: String,

    /// Chat-completions base URL
    pub base_url: String,

    /// LLM model identifier (OpenRouter format)
    pub model: String,

    /// Response-size bound sent with every completion request
    pub max_tokens: u32,

    /// Workspace directory for file operations
    pub workspace_path: PathBuf,

    /// Maximum consecutive tool-only model turns within one user turn
    pub max_tool_rounds: usize,

    /// Retries for transient transport failures
    pub max_retries: u32,

    /// Initial backoff between transport retries
    pub retry_backoff: Duration,

    /// Timeout for a single completion request
    pub request_timeout: Duration,

    /// Timeout for a single tool invocation
    pub tool_timeout: Duration,

    /// Dispatch the tool calls of one assistant turn concurrently
    pub parallel_tools: bool,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::MissingEnvVar` if neither `OPENROUTER_API_KEY`
    /// nor `OPENROUTER_KEY` is set, and `ConfigError::InvalidValue` if an
    /// optional variable does not parse.
    pub fn from_env() -> Result<Self, ConfigError> {
        let api_key = std::env::var("OPENROUTER_API_KEY")
            .or_else(|_| std::env::var("OPENROUTER_KEY"))
            .map_err(|_| ConfigError::MissingEnvVar("OPENROUTER_API_KEY".to_string()))?;

        let base_url =
            std::env::var("OPENROUTER_BASE_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());

        let model = std::env::var("DEFAULT_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.to_string());

        let workspace_path = std::env::var("WORKSPACE_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")));

        let parallel_tools = std::env::var("PARALLEL_TOOLS")
            .ok()
            .map(|v| {
                parse_bool(&v).map_err(|e| ConfigError::InvalidValue("PARALLEL_TOOLS".to_string(), e))
            })
            .transpose()?
            .unwrap_or(false);

        Ok(Self {
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
            model,
            max_tokens: env_or("MAX_TOKENS", 1000)?,
            workspace_path,
            max_tool_rounds: env_or("MAX_TOOL_ROUNDS", 25)?,
            max_retries: env_or("MAX_RETRIES", 2)?,
            retry_backoff: Duration::from_millis(env_or("RETRY_BACKOFF_MS", 500)?),
            request_timeout: Duration::from_secs(env_or("REQUEST_TIMEOUT_SECS", 120)?),
            tool_timeout: Duration::from_secs(env_or("TOOL_TIMEOUT_SECS", 30)?),
            parallel_tools,
        })
    }

    /// Create a config with custom values (useful for testing).
    pub fn new(api_key: String, model: String, workspace_path: PathBuf) -> Self {
        Self {
            api_key,
            base_url: DEFAULT_BASE_URL.to_string(),
            model,
            max_tokens: 1000,
            workspace_path,
            max_tool_rounds: 25,
            max_retries: 2,
            retry_backoff: Duration::from_millis(500),
            request_timeout: Duration::from_secs(120),
            tool_timeout: Duration::from_secs(30),
            parallel_tools: false,
        }
    }
}

/// Read a numeric variable, falling back to `default` when unset.
fn env_or<T>(name: &str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(name) {
        Ok(raw) => parse_value(name, &raw),
        Err(_) => Ok(default),
    }
}

fn parse_value<T>(name: &str, raw: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    raw.trim()
        .parse()
        .map_err(|e: T::Err| ConfigError::InvalidValue(name.to_string(), format!("{}", e)))
}

fn parse_bool(value: &str) -> Result<bool, String> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "t" | "yes" | "y" | "on" => Ok(true),
        "0" | "false" | "f" | "no" | "n" | "off" => Ok(false),
        other => Err(format!("expected boolean-like value, got: {}", other)),
    }
}
