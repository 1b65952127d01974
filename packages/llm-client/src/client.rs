//! OpenAI-compatible streaming chat completion client (C7).

use std::time::Duration;

use futures::StreamExt;
use serde_json::Value;

use fetcher::retry::{exponential_backoff, linear_backoff, retry_with_backoff, Attempt};

use crate::error::LlmError;
use crate::streaming::ChatCompletionStream;
use crate::types::{ChatRequest, Usage};

/// Knobs controlling the streaming call's timeouts and retry schedule.
#[derive(Debug, Clone)]
pub struct StreamConfig {
    /// Abort if no chunk arrives within this window (stall detection).
    pub stall_timeout: Duration,
    /// Abort the whole request if it runs longer than this, regardless of
    /// chunk activity (hard cap).
    pub hard_cap: Duration,
    /// Max attempts against the HTTP-status retry policy (429/502/503).
    pub max_http_retries: u32,
    /// Max attempts against the network-error retry policy.
    pub max_network_retries: u32,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            stall_timeout: Duration::from_secs(60),
            hard_cap: Duration::from_secs(12 * 60),
            max_http_retries: 3,
            max_network_retries: 3,
        }
    }
}

/// Everything assembled out of a completed stream.
#[derive(Debug, Clone, Default)]
pub struct StreamedCompletion {
    pub content: String,
    pub usage: Option<Usage>,
}

/// A thin client over one OpenAI-compatible base URL + API key.
pub struct LlmClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl LlmClient {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into(),
            api_key: api_key.into(),
        }
    }

    /// Open a streaming chat completion. `request.stream` is forced true.
    async fn open_stream(&self, mut request: ChatRequest) -> Result<ChatCompletionStream, LlmError> {
        request.stream = true;
        let body = serde_json::to_value(&request).map_err(|e| LlmError::Parse(e.to_string()))?;

        let response = self
            .http
            .post(format!("{}/chat/completions", self.base_url.trim_end_matches('/')))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| LlmError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(LlmError::Api {
                status: status.as_u16(),
                body,
            });
        }

        Ok(ChatCompletionStream::new(response.bytes_stream()))
    }

    /// Drain a stream, enforcing stall-detection per chunk and a hard cap
    /// over the whole call.
    async fn collect_stream(
        &self,
        mut stream: ChatCompletionStream,
        config: &StreamConfig,
    ) -> Result<StreamedCompletion, LlmError> {
        let deadline = tokio::time::Instant::now() + config.hard_cap;
        let mut out = StreamedCompletion::default();

        loop {
            let remaining = deadline.saturating_duration_since(tokio::time::Instant::now());
            if remaining.is_zero() {
                return Err(LlmError::Timeout);
            }
            let per_chunk_wait = remaining.min(config.stall_timeout);

            match tokio::time::timeout(per_chunk_wait, stream.next()).await {
                Err(_) => return Err(LlmError::StreamStalled),
                Ok(None) => return Ok(out),
                Ok(Some(Err(e))) => return Err(e),
                Ok(Some(Ok(chunk))) => {
                    if let Some(usage) = chunk.usage {
                        out.usage = Some(usage);
                    }
                    if chunk.done {
                        return Ok(out);
                    }
                    out.content.push_str(&chunk.delta);
                }
            }
        }
    }

    /// Open + collect a streaming call once, with no retry.
    pub async fn stream_once(
        &self,
        request: ChatRequest,
        config: &StreamConfig,
    ) -> Result<StreamedCompletion, LlmError> {
        let stream = self.open_stream(request).await?;
        self.collect_stream(stream, config).await
    }

    /// Open + collect with the full retry policy from §4.7: HTTP 429/502/503
    /// retry with `2000*(attempt+1)ms` backoff (honoring `Retry-After` when
    /// present isn't applicable to a streaming POST body, so the fixed
    /// schedule always applies here); network errors retry with
    /// `1000*(attempt+1)ms` backoff. Non-retryable errors (4xx except 429,
    /// malformed body) fail immediately.
    pub async fn stream_with_retry(
        &self,
        request: ChatRequest,
        config: &StreamConfig,
    ) -> Result<StreamedCompletion, LlmError> {
        let max_attempts = config.max_http_retries.max(config.max_network_retries).max(1);

        retry_with_backoff(max_attempts, exponential_backoff(1), |attempt| {
            let request = request.clone();
            async move {
                match self.stream_once(request, config).await {
                    Ok(completion) => Attempt::Done(completion),
                    Err(e) if e.is_retryable_http() => {
                        let backoff = linear_backoff(2000)(attempt);
                        Attempt::Failed {
                            error: e,
                            retryable: attempt + 1 < config.max_http_retries,
                            retry_after: Some(backoff),
                        }
                    }
                    Err(e) if e.is_retryable_network() => {
                        let backoff = linear_backoff(1000)(attempt);
                        Attempt::Failed {
                            error: e,
                            retryable: attempt + 1 < config.max_network_retries,
                            retry_after: Some(backoff),
                        }
                    }
                    Err(e) => Attempt::Failed {
                        error: e,
                        retryable: false,
                        retry_after: None,
                    },
                }
            }
        })
        .await
    }

    /// One non-retrying attempt, for use as a fallback provider after the
    /// primary has exhausted its retries.
    pub async fn stream_fallback(
        &self,
        request: ChatRequest,
        config: &StreamConfig,
    ) -> Result<StreamedCompletion, LlmError> {
        self.stream_once(request, config).await
    }
}

/// Parse a raw JSON value out of assembled stream content after stripping
/// `<think>` sections and fenced code blocks, per the response-parsing
/// contract. Domain-specific field coercion (clamping, defaulting) lives
/// with the `FitAnalysis` type that consumes this.
pub fn parse_json_response(content: &str) -> Result<Value, LlmError> {
    let stripped_think = crate::types::strip_think_tags(content);
    let stripped = crate::types::strip_code_blocks(&stripped_think);
    serde_json::from_str(stripped).map_err(|e| LlmError::Parse(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_plain_json() {
        let value = parse_json_response(r#"{"fitScore": 87}"#).unwrap();
        assert_eq!(value["fitScore"], 87);
    }

    #[test]
    fn parses_json_wrapped_in_think_and_fences() {
        let input = "<think>deliberating...</think>```json\n{\"fitScore\": 62}\n```";
        let value = parse_json_response(input).unwrap();
        assert_eq!(value["fitScore"], 62);
    }

    #[test]
    fn rejects_garbage() {
        assert!(parse_json_response("not json at all").is_err());
    }
}
