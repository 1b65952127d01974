//! Typed errors for the LLM client, mirroring the fetcher's `thiserror`
//! convention for library-crate errors.

use thiserror::Error;

/// Result type for LLM client operations.
pub type Result<T> = std::result::Result<T, LlmError>;

#[derive(Debug, Error)]
pub enum LlmError {
    /// Configuration error (missing API key, invalid settings)
    #[error("config error: {0}")]
    Config(String),

    /// Network error (connection failed, DNS failure, socket closed)
    #[error("network error: {0}")]
    Network(String),

    /// API error (non-2xx response)
    #[error("api error (status {status}): {body}")]
    Api { status: u16, body: String },

    /// Parse error (invalid JSON, unexpected response format)
    #[error("parse error: {0}")]
    Parse(String),

    /// Request exceeded its deadline.
    #[error("request timed out")]
    Timeout,

    /// No chunk arrived within the stall-detection window.
    #[error("stream stalled: no chunk within the configured stall timeout")]
    StreamStalled,

    /// No key became available within the key pool's acquisition timeout.
    #[error("key pool exhausted: no key acquired within the configured timeout")]
    KeyPoolTimeout,
}

impl LlmError {
    /// Retryable per the HTTP-status policy: 429, 502, 503.
    pub fn is_retryable_http(&self) -> bool {
        matches!(self, LlmError::Api { status, .. } if matches!(status, 429 | 502 | 503))
    }

    /// Retryable per the network-error policy (connection refused, DNS
    /// failure, socket closed, abort, "network timeout").
    pub fn is_retryable_network(&self) -> bool {
        matches!(
            self,
            LlmError::Network(_) | LlmError::Timeout | LlmError::StreamStalled
        )
    }
}
