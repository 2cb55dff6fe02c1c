//! Transport error types.

use thiserror::Error;

/// A failed completion call.
#[derive(Debug, Error)]
pub enum LlmError {
    /// Network-level failure, including request timeouts.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Authentication failed: {0}")]
    Auth(String),

    #[error("Rate limit exceeded: {0}")]
    RateLimit(String),

    #[error("Server error: {0}")]
    Server(String),

    /// Any other error reported by the provider.
    #[error("Provider error: {0}")]
    Api(String),

    /// The response parsed but did not contain a usable assistant message.
    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    #[error("Failed to decode response: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl LlmError {
    /// Whether the same request may succeed if sent again.
    pub fn is_retryable(&self) -> bool {
        match self {
            LlmError::Http(e) => e.is_timeout() || e.is_connect() || e.is_request(),
            LlmError::RateLimit(_) | LlmError::Server(_) => true,
            LlmError::Auth(_)
            | LlmError::Api(_)
            | LlmError::MalformedResponse(_)
            | LlmError::Serialization(_) => false,
        }
    }
}
