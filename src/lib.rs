//! LLM Gateway Library
//!
//! Exposes an Anthropic-style messages endpoint backed by an OpenAI-compatible
//! chat completion upstream, with per-request cost accounting and telemetry

pub mod config;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod services;
pub mod telemetry;
pub mod utils;

// Re-export common types
pub use config::Settings;
pub use handlers::{create_router, router_with_state, AppState};
pub use models::{messages, openai, pricing};
pub use services::{ApiConverter, PricingCache, StreamTranslator, UpstreamClient};
pub use telemetry::Telemetry;
pub use utils::error::{AppError, AppResult};

/// Library version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");

/// Library description
pub const DESCRIPTION: &str = env!("CARGO_PKG_DESCRIPTION");

/// Get version information
pub fn version_info() -> String {
    format!("{} v{} - {}", NAME, VERSION, DESCRIPTION)
}
