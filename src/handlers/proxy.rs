//! Messages proxy handlers
//!
//! Translates client message requests into upstream chat completion calls
//! and translates the answers back, streaming or not

use crate::handlers::AppState;
use crate::models::messages::{ChatRequest, ChatResponse};
use crate::models::openai::UpstreamRequest;
use crate::services::StreamTranslator;
use crate::utils::error::{respond_with_error, AppError, ErrorPayload};
use crate::utils::logging::create_request_log_summary;
use axum::{
    body::Bytes,
    extract::State,
    response::{sse::Event, IntoResponse, Response, Sse},
    Json,
};
use std::convert::Infallible;
use std::sync::Arc;
use std::time::Instant;
use tokio_stream::wrappers::ReceiverStream;
use tracing::{debug, warn};
use uuid::Uuid;

/// Handle client message requests
///
/// POST /v1/messages
#[utoipa::path(
    post,
    path = "/v1/messages",
    tag = "messages",
    request_body = ChatRequest,
    responses(
        (status = 200, description = "Complete message, or an event stream when `stream` is set", body = ChatResponse),
        (status = 400, description = "Request body could not be decoded", body = ErrorPayload),
        (status = 405, description = "Method other than POST", body = ErrorPayload),
        (status = 500, description = "Upstream or translation failure", body = ErrorPayload)
    )
)]
pub async fn handle_messages(State(state): State<Arc<AppState>>, body: Bytes) -> Response {
    let request_id = Uuid::new_v4().to_string();
    let started = Instant::now();

    let chat_request: ChatRequest = match serde_json::from_slice(&body) {
        Ok(request) => request,
        Err(e) => {
            warn!("Rejected request body: {}", e);
            return respond_with_error(
                &state.telemetry,
                &request_id,
                None,
                started.elapsed(),
                AppError::InvalidRequestBody(e.to_string()),
            )
            .await;
        }
    };

    if let Ok(summary_json) = serde_json::to_string_pretty(&create_request_log_summary(&chat_request)) {
        debug!("📥 Client Request {}:\n{}", request_id, summary_json);
    }

    state.telemetry
        .record_request(&request_id, &chat_request.model, chat_request.messages.len(), chat_request.stream)
        .await;

    let upstream_request = state.converter.convert_request(&chat_request);

    if chat_request.stream {
        handle_stream_request(state, upstream_request, chat_request.model, request_id, started).await
    } else {
        handle_normal_request(state, upstream_request, chat_request.model, request_id, started).await
    }
}

/// Reject every method other than POST on the messages endpoint
pub async fn method_not_allowed(State(state): State<Arc<AppState>>) -> Response {
    let request_id = Uuid::new_v4().to_string();
    respond_with_error(
        &state.telemetry,
        &request_id,
        None,
        std::time::Duration::ZERO,
        AppError::MethodNotAllowed,
    )
    .await
}

/// Handle normal (non-streaming) requests
async fn handle_normal_request(
    state: Arc<AppState>,
    upstream_request: UpstreamRequest,
    model: String,
    request_id: String,
    started: Instant,
) -> Response {
    debug!("Handling normal request for model: {}", upstream_request.model);

    let upstream_response = match state.client.chat_completions(&upstream_request).await {
        Ok(response) => response,
        Err(e) => {
            return respond_with_error(&state.telemetry, &request_id, Some(&model), started.elapsed(), e).await;
        }
    };

    let directory = state.pricing.directory().await;

    let chat_response = match state
        .converter
        .convert_response(upstream_response, directory.as_deref().map(Vec::as_slice))
    {
        Ok(response) => response,
        Err(e) => {
            return respond_with_error(&state.telemetry, &request_id, Some(&model), started.elapsed(), e).await;
        }
    };

    state.telemetry
        .record_response(&request_id, &model, started.elapsed(), 200, false)
        .await;

    debug!("Request {} completed", request_id);
    Json(chat_response).into_response()
}

/// Handle streaming requests
///
/// Errors before the upstream stream is open still produce an error
/// payload; afterwards the status is committed and failures only end the
/// stream.
async fn handle_stream_request(
    state: Arc<AppState>,
    upstream_request: UpstreamRequest,
    model: String,
    request_id: String,
    started: Instant,
) -> Response {
    debug!("Handling streaming request for model: {}", upstream_request.model);

    let upstream = match state.client.chat_completions_stream(&upstream_request).await {
        Ok(upstream) => upstream,
        Err(e) => {
            return respond_with_error(&state.telemetry, &request_id, Some(&model), started.elapsed(), e).await;
        }
    };

    // Capacity 1: a slow client stalls the upstream read
    let (mut tx, rx) = tokio::sync::mpsc::channel::<Result<Event, Infallible>>(1);
    let telemetry = state.telemetry.clone();
    let translator = StreamTranslator::new(state.converter.clone(), telemetry.clone(), request_id.clone());

    tokio::spawn(async move {
        let summary = translator.run(upstream, &mut tx).await;
        debug!(
            "Stream {} finished: {:?}, {} chunks forwarded, {} malformed frames",
            request_id, summary.outcome, summary.chunks_forwarded, summary.malformed_frames
        );
        telemetry
            .record_response(&request_id, &model, started.elapsed(), 200, summary.outcome.is_error())
            .await;
    });

    debug!("Starting streaming response transmission");
    Sse::new(ReceiverStream::new(rx)).into_response()
}
