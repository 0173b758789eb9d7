//! Logging utilities
//!
//! Shared logging configuration and helper functions

use crate::config::settings::LoggingConfig;
use crate::models::messages::{ChatMessage, ChatRequest};
use anyhow::Result;
use tracing::info;

/// Set to true to include full message contents in debug logs
/// Default is false to reduce log verbosity
pub const VERBOSE_REQUEST_LOGGING: bool = false;

/// Initialize logging system
///
/// `format` is either "json" (production) or anything else for human
/// readable output.
pub fn init_logging(config: &LoggingConfig) -> Result<()> {
    if config.format == "json" {
        tracing_subscriber::fmt()
            .with_env_filter(config.level.as_str())
            .json()
            .with_current_span(false)
            .with_span_list(false)
            .try_init()
            .map_err(|e| anyhow::anyhow!("Failed to set tracing subscriber: {}", e))?;
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(config.level.as_str())
            .with_target(false)
            .with_thread_ids(false)
            .with_file(false)
            .with_line_number(false)
            .try_init()
            .map_err(|e| anyhow::anyhow!("Failed to set tracing subscriber: {}", e))?;
    }

    info!("Logging system initialized");
    Ok(())
}

/// Truncate a string with a note about original length
pub fn truncate_content(s: &str, max_len: usize) -> String {
    if s.len() <= max_len {
        return s.to_string();
    }

    let mut cut = max_len;
    while !s.is_char_boundary(cut) {
        cut -= 1;
    }
    format!("{}... ({} chars truncated)", &s[..cut], s.len() - cut)
}

fn filter_message(msg: &ChatMessage) -> serde_json::Value {
    // System prompts are truncated harder
    let max_len = if msg.role == "system" { 100 } else { 200 };
    serde_json::json!({
        "role": msg.role,
        "content": truncate_content(&msg.content, max_len),
    })
}

/// Create a filtered summary of a client request for logging
/// Keeps original structure but truncates verbose content
pub fn create_request_log_summary(request: &ChatRequest) -> serde_json::Value {
    if VERBOSE_REQUEST_LOGGING {
        serde_json::to_value(request).unwrap_or(serde_json::json!({"error": "serialize failed"}))
    } else {
        let filtered_messages: Vec<serde_json::Value> = request.messages.iter()
            .map(filter_message)
            .collect();

        serde_json::json!({
            "model": request.model,
            "max_tokens": request.max_tokens,
            "stream": request.stream,
            "messages": filtered_messages,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_content() {
        assert_eq!(truncate_content("short", 10), "short");
        assert_eq!(truncate_content("abcdefghij", 4), "abcd... (6 chars truncated)");
    }

    #[test]
    fn test_truncate_respects_char_boundary() {
        // "é" is two bytes; cutting at 1 must back off to 0
        assert_eq!(truncate_content("éa", 1), "... (3 chars truncated)");
    }

    #[test]
    fn test_request_summary_truncates_messages() {
        let request = ChatRequest {
            model: "gpt-4o-mini".to_string(),
            messages: vec![
                ChatMessage::new("system", "s".repeat(150)),
                ChatMessage::new("user", "hello"),
            ],
            max_tokens: Some(64),
            stream: true,
        };

        let summary = create_request_log_summary(&request);
        assert_eq!(summary["model"], "gpt-4o-mini");
        assert_eq!(summary["stream"], true);
        assert_eq!(summary["max_tokens"], 64);
        assert_eq!(summary["messages"][1]["content"], "hello");
        assert!(summary["messages"][0]["content"]
            .as_str()
            .unwrap()
            .ends_with("(50 chars truncated)"));
    }
}
