//! HTTP handlers module
//!
//! Contains all HTTP endpoint handling logic

pub mod docs;
pub mod health;
pub mod proxy;

use crate::config::Settings;
use crate::middleware::logging::request_logging_middleware;
use crate::services::{ApiConverter, HttpPricingSource, PricingCache, UpstreamClient};
use crate::telemetry::{InfluxSink, Telemetry};
use anyhow::Result;
use axum::{extract::DefaultBodyLimit, middleware, routing::get, routing::post, Router};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::{limit::RequestBodyLimitLayer, trace::TraceLayer};

/// Application state
///
/// Every collaborator is constructed once and handed to the handlers;
/// nothing here is mutated per request.
#[derive(Debug, Clone)]
pub struct AppState {
    pub settings: Settings,
    pub client: UpstreamClient,
    pub converter: ApiConverter,
    pub pricing: Arc<PricingCache>,
    pub telemetry: Telemetry,
}

impl AppState {
    /// Build the production collaborators from settings
    pub fn from_settings(settings: Settings) -> Result<Self> {
        let client = UpstreamClient::new(&settings)?;
        let converter = ApiConverter::new(&settings);

        let pricing_source = HttpPricingSource::new(&settings)?;
        let pricing = Arc::new(PricingCache::new(Arc::new(pricing_source), settings.pricing_cache_ttl()));

        let telemetry = if settings.telemetry_enabled() {
            Telemetry::new(Arc::new(InfluxSink::new(&settings.telemetry)?))
        } else {
            Telemetry::disabled()
        };

        Ok(Self {
            settings,
            client,
            converter,
            pricing,
            telemetry,
        })
    }
}

/// Create application router
pub async fn create_router(settings: Settings) -> Result<Router> {
    let state = AppState::from_settings(settings)?;
    Ok(router_with_state(Arc::new(state)))
}

/// Create the router around an already assembled state
pub fn router_with_state(state: Arc<AppState>) -> Router {
    let max_request_size = state.settings.request.max_request_size;

    let middleware_stack = ServiceBuilder::new()
        .layer(middleware::from_fn(request_logging_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(RequestBodyLimitLayer::new(max_request_size));

    Router::new()
        .route(
            "/v1/messages",
            post(proxy::handle_messages).fallback(proxy::method_not_allowed),
        )
        .route("/v1/health", get(health::health_check))
        .route("/v1/openapi.json", get(docs::openapi_json))
        .with_state(state)
        // Replaces axum's built-in 2 MiB extractor limit with the configured one
        .layer(DefaultBodyLimit::max(max_request_size))
        .layer(middleware_stack)
}
