//! SSE streaming parser for OpenAI-compatible chat completions (C7).
//!
//! Converts a raw `reqwest` byte stream into `ChatCompletionChunk` values,
//! handling `data: [DONE]`, partial lines, buffering, and the trailing
//! `usage` object some providers attach to the final chunk.

use bytes::Bytes;
use futures::stream::Stream;
use std::pin::Pin;
use std::task::{Context, Poll};

use crate::error::LlmError;
use crate::types::Usage;

/// A single chunk from a streaming chat completion.
#[derive(Debug, Clone, Default)]
pub struct ChatCompletionChunk {
    /// The text delta for this chunk.
    pub delta: String,
    /// Whether the stream is done (`data: [DONE]` seen).
    pub done: bool,
    /// Token usage, present only on the chunk that carries it (typically
    /// the last one before `[DONE]`).
    pub usage: Option<Usage>,
}

#[derive(Debug, serde::Deserialize)]
struct StreamChunkRaw {
    #[serde(default)]
    choices: Vec<StreamChoiceRaw>,
    #[serde(default)]
    usage: Option<Usage>,
}

#[derive(Debug, serde::Deserialize)]
struct StreamChoiceRaw {
    delta: DeltaRaw,
}

#[derive(Debug, serde::Deserialize)]
struct DeltaRaw {
    #[serde(default)]
    content: Option<String>,
}

/// Stream adapter that converts raw SSE bytes into `ChatCompletionChunk` values.
pub struct ChatCompletionStream {
    inner: Pin<Box<dyn Stream<Item = Result<Bytes, reqwest::Error>> + Send>>,
    buffer: String,
}

impl ChatCompletionStream {
    pub fn new(byte_stream: impl Stream<Item = Result<Bytes, reqwest::Error>> + Send + 'static) -> Self {
        Self {
            inner: Box::pin(byte_stream),
            buffer: String::new(),
        }
    }
}

impl Stream for ChatCompletionStream {
    type Item = Result<ChatCompletionChunk, LlmError>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();

        loop {
            if let Some(chunk) = try_parse_line(&mut this.buffer) {
                return Poll::Ready(Some(chunk));
            }

            match Pin::new(&mut this.inner).poll_next(cx) {
                Poll::Ready(Some(Ok(bytes))) => match std::str::from_utf8(&bytes) {
                    Ok(text) => this.buffer.push_str(text),
                    Err(e) => {
                        return Poll::Ready(Some(Err(LlmError::Parse(format!(
                            "invalid UTF-8 in stream: {}",
                            e
                        )))));
                    }
                },
                Poll::Ready(Some(Err(e))) => {
                    return Poll::Ready(Some(Err(LlmError::Network(e.to_string()))));
                }
                Poll::Ready(None) => {
                    if this.buffer.trim().is_empty() {
                        return Poll::Ready(None);
                    }
                    if let Some(chunk) = try_parse_line(&mut this.buffer) {
                        return Poll::Ready(Some(chunk));
                    }
                    return Poll::Ready(None);
                }
                Poll::Pending => return Poll::Pending,
            }
        }
    }
}

/// Try to extract and parse a complete SSE line from the buffer.
/// Returns `None` if no complete line is available yet; malformed
/// non-`data:` lines and unparsable chunks are silently skipped rather
/// than surfaced, per the contract ("ignore malformed chunks").
fn try_parse_line(buffer: &mut String) -> Option<Result<ChatCompletionChunk, LlmError>> {
    loop {
        let newline_pos = buffer.find('\n')?;
        let line = buffer[..newline_pos].trim().to_string();
        buffer.drain(..=newline_pos);

        if line.is_empty() {
            continue;
        }

        let Some(data) = line.strip_prefix("data: ") else {
            continue;
        };
        let data = data.trim();

        if data == "[DONE]" {
            return Some(Ok(ChatCompletionChunk {
                delta: String::new(),
                done: true,
                usage: None,
            }));
        }

        match serde_json::from_str::<StreamChunkRaw>(data) {
            Ok(raw) => {
                let delta = raw
                    .choices
                    .into_iter()
                    .next()
                    .and_then(|c| c.delta.content)
                    .unwrap_or_default();
                return Some(Ok(ChatCompletionChunk {
                    delta,
                    done: false,
                    usage: raw.usage,
                }));
            }
            Err(_) => continue,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;

    fn make_sse_bytes(lines: &[&str]) -> Vec<Result<Bytes, reqwest::Error>> {
        lines
            .iter()
            .map(|line| Ok(Bytes::from(format!("{}\n", line))))
            .collect()
    }

    #[tokio::test]
    async fn parses_single_chunk() {
        let data = make_sse_bytes(&[
            r#"data: {"choices":[{"delta":{"content":"Hello"}}]}"#,
            "",
            "data: [DONE]",
        ]);

        let mut stream = ChatCompletionStream::new(futures::stream::iter(data));

        let chunk = stream.next().await.unwrap().unwrap();
        assert_eq!(chunk.delta, "Hello");
        assert!(!chunk.done);

        let done = stream.next().await.unwrap().unwrap();
        assert!(done.done);
    }

    #[tokio::test]
    async fn parses_multiple_tokens() {
        let data = make_sse_bytes(&[
            r#"data: {"choices":[{"delta":{"content":"Hello"}}]}"#,
            "",
            r#"data: {"choices":[{"delta":{"content":" world"}}]}"#,
            "",
            "data: [DONE]",
        ]);

        let mut stream = ChatCompletionStream::new(futures::stream::iter(data));

        assert_eq!(stream.next().await.unwrap().unwrap().delta, "Hello");
        assert_eq!(stream.next().await.unwrap().unwrap().delta, " world");
        assert!(stream.next().await.unwrap().unwrap().done);
    }

    #[tokio::test]
    async fn empty_delta_yields_empty_string() {
        let data = make_sse_bytes(&[r#"data: {"choices":[{"delta":{}}]}"#, "", "data: [DONE]"]);
        let mut stream = ChatCompletionStream::new(futures::stream::iter(data));
        let chunk = stream.next().await.unwrap().unwrap();
        assert_eq!(chunk.delta, "");
    }

    #[tokio::test]
    async fn malformed_chunks_are_ignored_not_surfaced() {
        let data = make_sse_bytes(&[
            "data: {not json}",
            r#"data: {"choices":[{"delta":{"content":"ok"}}]}"#,
            "",
            "data: [DONE]",
        ]);
        let mut stream = ChatCompletionStream::new(futures::stream::iter(data));
        let chunk = stream.next().await.unwrap().unwrap();
        assert_eq!(chunk.delta, "ok");
    }

    #[tokio::test]
    async fn captures_usage_on_final_chunk() {
        let data = make_sse_bytes(&[
            r#"data: {"choices":[{"delta":{"content":"{\"fitScore\":"}}]}"#,
            "",
            r#"data: {"choices":[{"delta":{"content":"87}"}}],"usage":{"prompt_tokens":120,"completion_tokens":40,"total_tokens":160}}"#,
            "",
            "data: [DONE]",
        ]);
        let mut stream = ChatCompletionStream::new(futures::stream::iter(data));
        let _first = stream.next().await.unwrap().unwrap();
        let second = stream.next().await.unwrap().unwrap();
        let usage = second.usage.expect("usage present on final chunk");
        assert_eq!(usage.total_tokens, 160);
    }

    #[tokio::test]
    async fn scenario_assembles_fit_score_across_chunks() {
        // The literal byte sequence from the concrete test scenario.
        let raw = "data: {\"choices\":[{\"delta\":{\"content\":\"{\\\"fitScore\\\":\"}}]}\n\ndata: {\"choices\":[{\"delta\":{\"content\":\"87}\"}}]}\n\ndata: [DONE]\n\n";
        let mut stream =
            ChatCompletionStream::new(futures::stream::iter(vec![Ok(Bytes::from(raw))]));

        let mut assembled = String::new();
        while let Some(item) = stream.next().await {
            let chunk = item.unwrap();
            if chunk.done {
                break;
            }
            assembled.push_str(&chunk.delta);
        }

        assert_eq!(assembled, "{\"fitScore\":87}");
        let parsed: serde_json::Value = serde_json::from_str(&assembled).unwrap();
        assert_eq!(parsed["fitScore"], 87);
    }
}
