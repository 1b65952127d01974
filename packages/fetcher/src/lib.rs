//! Rate-limited, retrying HTTP fetcher with SSRF protection (C1).
//!
//! This crate is the sole place outbound HTTP requests are issued from;
//! source connectors (C2), board discovery (C3), and the LLM fit
//! analyzer's non-streaming calls all go through [`RateLimitedFetcher`] or
//! its [`retry::retry_with_backoff`] helper directly.

pub mod client;
pub mod error;
pub mod html;
pub mod retry;
pub mod security;

pub use client::{batch_fetch, BatchOptions, FetchOptions, FetchOutcome, RateLimitedFetcher};
pub use error::{FetchError, FetchResult, SecurityError, SecurityResult};
pub use security::UrlValidator;
