//! Client protocol data models
//!
//! Anthropic-style message request, response and stream event structures

use super::pricing::Cost;
use super::{null_as_default, TokenUsage};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Stream event type emitted for every forwarded text delta
pub const CONTENT_BLOCK_DELTA: &str = "content_block_delta";

/// Response object type for complete messages
pub const MESSAGE_TYPE: &str = "message";

/// A single chat message (flat text only)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ChatMessage {
    /// Author role, e.g. "user" or "assistant"
    #[serde(default, deserialize_with = "null_as_default")]
    pub role: String,
    /// Message text
    #[serde(default, deserialize_with = "null_as_default")]
    pub content: String,
}

impl ChatMessage {
    pub fn new(role: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: role.into(),
            content: content.into(),
        }
    }
}

/// Inbound chat request
///
/// Missing fields decode to their defaults; rejecting malformed
/// conversations is left to the upstream.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ChatRequest {
    /// Model name as requested by the client
    #[serde(default, deserialize_with = "null_as_default")]
    pub model: String,
    /// Ordered conversation
    #[serde(default, deserialize_with = "null_as_default")]
    pub messages: Vec<ChatMessage>,
    /// Maximum tokens to generate (optional)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    /// Whether to stream the response
    #[serde(default, deserialize_with = "null_as_default")]
    pub stream: bool,
}

/// Complete (non-streaming) response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ChatResponse {
    /// Upstream completion id
    pub id: String,
    /// Always "message"
    #[serde(rename = "type")]
    pub response_type: String,
    /// Role of the first upstream choice
    pub role: String,
    /// Text of the first upstream choice
    pub content: String,
    /// Model reported by the upstream
    pub model: String,
    /// Upstream finish reason, copied unchanged
    pub stop_reason: Option<String>,
    /// Token usage reported by the upstream
    pub usage: TokenUsage,
    /// Computed cost
    pub cost: Cost,
}

/// Text delta carried by a stream event
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct TextDelta {
    pub text: String,
}

/// Streaming event, one per forwarded upstream chunk
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct StreamEvent {
    /// Always "content_block_delta"
    #[serde(rename = "type")]
    pub event_type: String,
    /// Content block index (single block, always 0)
    pub index: usize,
    /// Incremental text
    pub delta: TextDelta,
    /// Finish reason, present on the final chunk
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stop_reason: Option<String>,
}

impl StreamEvent {
    /// Create a text delta event for the given content block
    pub fn text_delta(index: usize, text: impl Into<String>, stop_reason: Option<String>) -> Self {
        Self {
            event_type: CONTENT_BLOCK_DELTA.to_string(),
            index,
            delta: TextDelta { text: text.into() },
            stop_reason,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_defaults() {
        let request: ChatRequest = serde_json::from_str(r#"{"messages":[{"role":"user","content":"hi"}]}"#).unwrap();
        assert_eq!(request.model, "");
        assert_eq!(request.max_tokens, None);
        assert!(!request.stream);
        assert_eq!(request.messages, vec![ChatMessage::new("user", "hi")]);
    }

    #[test]
    fn test_stream_event_omits_missing_stop_reason() {
        let event = StreamEvent::text_delta(0, "Hi", None);
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json, serde_json::json!({
            "type": "content_block_delta",
            "index": 0,
            "delta": {"text": "Hi"}
        }));
    }
}
