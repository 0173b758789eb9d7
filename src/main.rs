//! LLM Gateway Server
//!
//! HTTP gateway that accepts Anthropic-style message requests and serves
//! them from an OpenAI-compatible chat completion upstream

use anyhow::{Context, Result};
use llm_gateway::utils::logging::init_logging;
use llm_gateway::{router_with_state, version_info, AppState, Settings};
use std::sync::Arc;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    // Load settings from environment and .env
    let settings = Settings::new().context("Failed to load server settings")?;

    init_logging(&settings.logging)?;
    info!("{}", version_info());

    let addr = format!("{}:{}", settings.server.host, settings.server.port);
    let telemetry_enabled = settings.telemetry_enabled();

    let state = AppState::from_settings(settings).context("Failed to initialize services")?;

    if telemetry_enabled {
        match state.telemetry.check_health().await {
            Ok(()) => info!("📊 Telemetry backend reachable"),
            Err(e) => warn!("Telemetry backend unreachable, continuing without it: {:#}", e),
        }
    } else {
        info!("Telemetry disabled");
    }

    let app = router_with_state(Arc::new(state));

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    info!("🚀 LLM Gateway server started!");
    info!("📝 Health check: http://{}/v1/health", addr);
    info!("🔄 Messages endpoint: http://{}/v1/messages", addr);

    axum::serve(listener, app)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to start server: {}", e))?;

    Ok(())
}
