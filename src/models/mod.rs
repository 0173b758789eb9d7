//! Data models module
//!
//! Defines the client protocol, upstream protocol and pricing data structures

use serde::{Deserialize, Deserializer, Serialize};
use utoipa::ToSchema;

pub mod messages;
pub mod openai;
pub mod pricing;

/// Token usage reported by the upstream
///
/// `total_tokens` is passed through as reported and never checked against
/// the sum of the other two counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct TokenUsage {
    /// Prompt (input) token count
    #[serde(default, deserialize_with = "null_as_default")]
    pub prompt_tokens: u64,
    /// Completion (output) token count
    #[serde(default, deserialize_with = "null_as_default")]
    pub completion_tokens: u64,
    /// Total token count
    #[serde(default, deserialize_with = "null_as_default")]
    pub total_tokens: u64,
}

/// Decode a field that may be absent or `null` as its default value
pub fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}
