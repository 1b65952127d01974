//! Typed errors for the fetcher library.
//!
//! Uses `thiserror` for library errors (not `anyhow`) to provide
//! strongly-typed, composable error handling.

use thiserror::Error;

/// Errors that can occur while fetching a URL.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Security validation failed (SSRF protection)
    #[error("security error: {0}")]
    Security(#[from] SecurityError),

    /// Transport-level failure (connection refused, DNS failure, etc.)
    #[error("network error: {0}")]
    Network(String),

    /// The request exceeded its deadline.
    #[error("timeout fetching {url}")]
    Timeout { url: String },

    /// Server responded with a status code the caller must not retry.
    #[error("http {status} fetching {url}")]
    Http { url: String, status: u16 },

    /// Server responded with a retryable status after exhausting retries.
    #[error("http {status} fetching {url} after {attempts} attempts")]
    RateLimited {
        url: String,
        status: u16,
        attempts: u32,
    },

    /// Response body could not be read or decoded.
    #[error("failed to read response body: {0}")]
    Body(String),
}

impl FetchError {
    /// Whether this error represents a rate-limited response (HTTP 429).
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, FetchError::RateLimited { .. })
    }
}

/// Security-related errors, primarily for SSRF protection.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SecurityError {
    /// URL scheme not allowed (e.g., file://, ftp://)
    #[error("disallowed URL scheme: {0}")]
    DisallowedScheme(String),

    /// Host is blocked (e.g., localhost, internal IPs)
    #[error("blocked host: {0}")]
    BlockedHost(String),

    /// IP in blocked CIDR range (e.g., 10.0.0.0/8)
    #[error("blocked IP range: {0}")]
    BlockedCidr(String),

    /// URL has no host
    #[error("URL has no host")]
    NoHost,

    /// DNS resolution failed
    #[error("DNS resolution failed: {0}")]
    DnsResolution(String),

    /// URL parsing failed
    #[error("URL parse error: {0}")]
    UrlParse(String),
}

impl From<url::ParseError> for SecurityError {
    fn from(e: url::ParseError) -> Self {
        SecurityError::UrlParse(e.to_string())
    }
}

/// Result type alias for fetch operations.
pub type FetchResult<T> = std::result::Result<T, FetchError>;

/// Result type alias for security operations.
pub type SecurityResult<T> = std::result::Result<T, SecurityError>;
