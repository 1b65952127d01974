//! Request/response types for OpenAI-compatible chat completions (C7).

use serde::{Deserialize, Serialize};

/// Chat completion request. `stream` is always forced to `true` by
/// [`crate::client::LlmClient::stream_chat_completion`]; it is present here
/// so the serialized body matches what a real provider expects.
#[derive(Debug, Clone, Serialize)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<Message>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    pub stream: bool,
}

impl ChatRequest {
    /// Build the request the C7 contract specifies: `temperature=0.3`,
    /// `max_tokens=2048`, `stream=true`.
    pub fn fit_analysis(model: impl Into<String>, system: impl Into<String>, user: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            messages: vec![Message::system(system), Message::user(user)],
            temperature: Some(0.3),
            max_tokens: Some(2048),
            stream: true,
        }
    }
}

/// Chat message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub role: String,
    pub content: String,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: "assistant".to_string(),
            content: content.into(),
        }
    }
}

/// Token usage statistics.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default)]
pub struct Usage {
    #[serde(default)]
    pub prompt_tokens: u32,
    #[serde(default)]
    pub completion_tokens: u32,
    #[serde(default)]
    pub total_tokens: u32,
}

/// Truncate a string to at most `max_bytes` bytes at a character boundary.
pub fn truncate_to_char_boundary(s: &str, max_bytes: usize) -> &str {
    if s.len() <= max_bytes {
        return s;
    }
    let mut end = max_bytes;
    while !s.is_char_boundary(end) && end > 0 {
        end -= 1;
    }
    &s[..end]
}

/// Strip markdown code-block fences from a response, keeping the inner text.
pub fn strip_code_blocks(response: &str) -> &str {
    response
        .trim()
        .trim_start_matches("```json")
        .trim_start_matches("```")
        .trim_end_matches("```")
        .trim()
}

/// Strip a wrapping `<think>...</think>` section some reasoning models emit
/// before their actual answer.
pub fn strip_think_tags(response: &str) -> String {
    let mut out = String::with_capacity(response.len());
    let mut rest = response;
    while let Some(start) = rest.find("<think>") {
        out.push_str(&rest[..start]);
        match rest[start..].find("</think>") {
            Some(end_rel) => {
                rest = &rest[start + end_rel + "</think>".len()..];
            }
            None => {
                // Unterminated think block: drop the rest of the string.
                rest = "";
                break;
            }
        }
    }
    out.push_str(rest);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn message_constructors_set_role() {
        assert_eq!(Message::system("hi").role, "system");
        assert_eq!(Message::user("hi").role, "user");
        assert_eq!(Message::assistant("hi").role, "assistant");
    }

    #[test]
    fn fit_analysis_request_matches_contract() {
        let req = ChatRequest::fit_analysis("gpt-4o-mini", "sys", "user");
        assert_eq!(req.temperature, Some(0.3));
        assert_eq!(req.max_tokens, Some(2048));
        assert!(req.stream);
        assert_eq!(req.messages.len(), 2);
    }

    #[test]
    fn truncates_at_char_boundary() {
        let text = "Hello 世界";
        let truncated = truncate_to_char_boundary(text, 8);
        assert!(truncated.len() <= 8);
        assert!(text.starts_with(truncated));
    }

    #[test]
    fn strips_code_blocks() {
        assert_eq!(strip_code_blocks("```json\n{}\n```"), "{}");
        assert_eq!(strip_code_blocks("```\n{}\n```"), "{}");
        assert_eq!(strip_code_blocks("{}"), "{}");
    }

    #[test]
    fn strips_think_tags() {
        let input = "<think>reasoning here</think>{\"fitScore\":80}";
        assert_eq!(strip_think_tags(input), "{\"fitScore\":80}");
    }

    #[test]
    fn strips_think_tags_when_absent() {
        assert_eq!(strip_think_tags("{\"fitScore\":80}"), "{\"fitScore\":80}");
    }
}
