//! API documentation
//!
//! GET /v1/openapi.json serves the OpenAPI document for the public endpoints

use crate::handlers::{health, proxy};
use crate::models::messages::{ChatMessage, ChatRequest, ChatResponse, StreamEvent, TextDelta};
use crate::models::pricing::{Cost, ModelPricing, PricingStatus};
use crate::models::TokenUsage;
use crate::utils::error::ErrorPayload;
use axum::response::Json;
use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "LLM Gateway API",
        description = "A gateway service that converts between Anthropic and OpenAI API formats"
    ),
    paths(proxy::handle_messages, health::health_check),
    components(schemas(
        ChatMessage,
        ChatRequest,
        ChatResponse,
        StreamEvent,
        TextDelta,
        TokenUsage,
        Cost,
        ModelPricing,
        PricingStatus,
        ErrorPayload,
        health::HealthResponse,
        health::ComponentHealth
    )),
    tags(
        (name = "messages", description = "Chat message translation"),
        (name = "health", description = "Service health")
    )
)]
pub struct ApiDoc;

/// OpenAPI document
///
/// GET /v1/openapi.json
pub async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}
