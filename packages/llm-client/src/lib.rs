//! Streaming OpenAI-compatible chat completion client with a fair key pool.
//!
//! This crate covers the resume-fit analyzer's LLM plumbing (C7): opening
//! and draining a streaming chat completion, detecting a stalled stream,
//! enforcing a hard time cap, retrying on the provider's transient failures,
//! and fairly sharing a small set of API keys across concurrent callers.
//! Turning an assembled response into a `FitAnalysis` is domain logic and
//! lives with that type, not here.
//!
//! ```rust,ignore
//! use llm_client::{ChatRequest, LlmClient, StreamConfig};
//!
//! let client = LlmClient::new("https://api.openai.com/v1", api_key);
//! let request = ChatRequest::fit_analysis("gpt-4o-mini", system_prompt, user_prompt);
//! let completion = client.stream_with_retry(request, &StreamConfig::default()).await?;
//! ```

pub mod client;
pub mod error;
pub mod key_pool;
pub mod streaming;
pub mod types;

pub use client::{parse_json_response, LlmClient, StreamConfig, StreamedCompletion};
pub use error::{LlmError, Result};
pub use key_pool::{KeyGuard, KeyPool};
pub use streaming::{ChatCompletionChunk, ChatCompletionStream};
pub use types::{strip_code_blocks, strip_think_tags, truncate_to_char_boundary, ChatRequest, Message, Usage};
