//! Upstream (OpenAI-compatible) data models
//!
//! Defines chat completion request, response and stream chunk structures

use super::TokenUsage;
use super::null_as_default;
use serde::{Deserialize, Serialize};

/// Upstream chat completion request
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UpstreamRequest {
    /// Namespaced model name, e.g. "openai/gpt-4o-mini"
    pub model: String,
    /// Message list
    pub messages: Vec<UpstreamMessage>,
    /// Maximum tokens to generate (optional)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    /// Whether to stream the response (omitted when false)
    #[serde(default, skip_serializing_if = "is_false")]
    pub stream: bool,
}

fn is_false(value: &bool) -> bool {
    !*value
}

/// Upstream message
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpstreamMessage {
    /// Role (system/user/assistant)
    #[serde(default, deserialize_with = "null_as_default")]
    pub role: String,
    /// Text content; null for tool-only answers
    #[serde(default, deserialize_with = "null_as_default")]
    pub content: Option<String>,
}

/// Error object some upstreams embed in a failed completion document
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpstreamError {
    #[serde(default, deserialize_with = "null_as_default")]
    pub message: String,
}

/// Upstream chat completion response
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UpstreamResponse {
    #[serde(default, deserialize_with = "null_as_default")]
    pub id: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub object: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub created: u64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub model: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub choices: Vec<UpstreamChoice>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub usage: TokenUsage,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<UpstreamError>,
}

/// Upstream completion choice
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpstreamChoice {
    #[serde(default, deserialize_with = "null_as_default")]
    pub index: u32,
    #[serde(default, deserialize_with = "null_as_default")]
    pub message: UpstreamMessage,
    #[serde(default, deserialize_with = "null_as_default")]
    pub finish_reason: Option<String>,
}

/// Upstream stream chunk (one `data:` frame)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UpstreamStreamChunk {
    #[serde(default, deserialize_with = "null_as_default")]
    pub id: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub object: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub created: u64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub model: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub choices: Vec<UpstreamStreamChoice>,
}

/// Upstream stream choice
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpstreamStreamChoice {
    #[serde(default, deserialize_with = "null_as_default")]
    pub index: u32,
    #[serde(default, deserialize_with = "null_as_default")]
    pub delta: UpstreamDelta,
    #[serde(default, deserialize_with = "null_as_default")]
    pub finish_reason: Option<String>,
}

/// Incremental message content
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpstreamDelta {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
}
