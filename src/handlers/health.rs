//! Health check handlers
//!
//! Reports the health of the gateway and its telemetry backend

use crate::handlers::AppState;
use axum::{extract::State, http::StatusCode, response::Json};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, warn};
use utoipa::ToSchema;

pub const HEALTHY: &str = "healthy";
pub const UNHEALTHY: &str = "unhealthy";

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct HealthResponse {
    /// Overall status
    pub status: String,
    /// Per-component status
    pub components: BTreeMap<String, ComponentHealth>,
    /// Timestamp (RFC 3339)
    pub time: String,
}

/// Health of a single component
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ComponentHealth {
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ComponentHealth {
    fn healthy() -> Self {
        Self {
            status: HEALTHY.to_string(),
            details: None,
        }
    }

    fn unhealthy(details: String) -> Self {
        Self {
            status: UNHEALTHY.to_string(),
            details: Some(details),
        }
    }
}

impl HealthResponse {
    /// Flatten component statuses for telemetry (`<name>` and `<name>_details`)
    pub fn component_statuses(&self) -> BTreeMap<String, String> {
        let mut statuses = BTreeMap::new();
        for (name, component) in &self.components {
            statuses.insert(name.clone(), component.status.clone());
            if let Some(details) = &component.details {
                statuses.insert(format!("{}_details", name), details.clone());
            }
        }
        statuses
    }
}

/// Health check
///
/// GET /v1/health
/// Returns 503 when any dependency is unhealthy
#[utoipa::path(
    get,
    path = "/v1/health",
    tag = "health",
    responses(
        (status = 200, description = "All components healthy", body = HealthResponse),
        (status = 503, description = "At least one component unhealthy", body = HealthResponse)
    )
)]
pub async fn health_check(State(state): State<Arc<AppState>>) -> (StatusCode, Json<HealthResponse>) {
    debug!("Executing health check");
    let started = Instant::now();

    let mut components = BTreeMap::new();
    components.insert("server".to_string(), ComponentHealth::healthy());

    let telemetry_health = match state.telemetry.check_health().await {
        Ok(()) => ComponentHealth::healthy(),
        Err(e) => {
            warn!("Telemetry backend unhealthy: {:#}", e);
            ComponentHealth::unhealthy(format!("{:#}", e))
        }
    };
    components.insert("telemetry".to_string(), telemetry_health);

    let all_healthy = components.values().all(|component| component.status == HEALTHY);
    let response = HealthResponse {
        status: if all_healthy { HEALTHY } else { UNHEALTHY }.to_string(),
        components,
        time: chrono::Utc::now().to_rfc3339(),
    };

    state.telemetry
        .record_health(&response.status, &response.component_statuses(), started.elapsed())
        .await;

    let status = if all_healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (status, Json(response))
}
