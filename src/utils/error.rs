//! Error handling module
//!
//! Defines the gateway error taxonomy, its client-visible payload and the
//! error responder that reports failures to telemetry

use crate::telemetry::Telemetry;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

/// Application error types
#[derive(Error, Debug)]
pub enum AppError {
    /// Inbound body is not a valid chat request
    #[error("Invalid request body: {0}")]
    InvalidRequestBody(String),

    /// Wrong HTTP method on the messages endpoint
    #[error("Method not allowed")]
    MethodNotAllowed,

    /// Upstream request could not be serialized
    #[error("Failed to serialize upstream request: {0}")]
    UpstreamMarshal(String),

    /// Upstream could not be reached
    #[error("Failed to forward request upstream: {0}")]
    UpstreamUnreachable(String),

    /// Upstream body could not be read
    #[error("Failed to read upstream response: {0}")]
    UpstreamRead(String),

    /// Upstream body is not a valid completion document
    #[error("Failed to parse upstream response: {0}")]
    UpstreamParse(String),

    /// Upstream document could not be translated
    #[error("Response conversion failed: {0}")]
    Conversion(String),

    /// Upstream did not answer a streaming request with an event stream
    #[error("Streaming unsupported: {0}")]
    StreamingUnsupported(String),
}

/// Client-visible error payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ErrorPayload {
    /// Error message
    pub message: String,
    /// HTTP status code
    pub code: u16,
}

impl AppError {
    /// Get HTTP status code
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::InvalidRequestBody(_) => StatusCode::BAD_REQUEST,
            AppError::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            AppError::UpstreamMarshal(_)
            | AppError::UpstreamUnreachable(_)
            | AppError::UpstreamRead(_)
            | AppError::UpstreamParse(_)
            | AppError::Conversion(_)
            | AppError::StreamingUnsupported(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Category reported to telemetry
    pub fn category(&self) -> &'static str {
        match self {
            AppError::InvalidRequestBody(_) => "invalid_request",
            AppError::MethodNotAllowed => "method_not_allowed",
            AppError::UpstreamMarshal(_) => "marshal_error",
            AppError::UpstreamUnreachable(_) => "api_error",
            AppError::UpstreamRead(_) => "response_read_error",
            AppError::UpstreamParse(_) => "response_parse_error",
            AppError::Conversion(_) => "conversion_error",
            AppError::StreamingUnsupported(_) => "streaming_unsupported",
        }
    }

    /// Message shown to the client; details stay in logs and telemetry
    pub fn client_message(&self) -> &'static str {
        match self {
            AppError::InvalidRequestBody(_) => "Invalid request body",
            AppError::MethodNotAllowed => "Method not allowed",
            AppError::UpstreamMarshal(_) => "Error preparing request",
            AppError::UpstreamUnreachable(_) => "Error forwarding request",
            AppError::UpstreamRead(_) => "Error reading response",
            AppError::UpstreamParse(_) => "Error parsing response",
            AppError::Conversion(_) => "Invalid response from upstream",
            AppError::StreamingUnsupported(_) => "Streaming unsupported",
        }
    }

    /// Convert to the client error payload
    pub fn to_payload(&self) -> ErrorPayload {
        ErrorPayload {
            message: self.client_message().to_string(),
            code: self.status_code().as_u16(),
        }
    }
}

/// Implement IntoResponse trait to allow errors to be returned directly as HTTP responses
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        if status.is_server_error() {
            tracing::error!("Application error: {} - Status code: {}", self, status);
        } else {
            tracing::warn!("Client error: {} - Status code: {}", self, status);
        }

        (status, Json(self.to_payload())).into_response()
    }
}

/// Result type alias
pub type AppResult<T> = Result<T, AppError>;

/// Report an error to telemetry and turn it into the client response
///
/// `model` is set once the request has been recorded, in which case the
/// failed response is recorded as well.
pub async fn respond_with_error(
    telemetry: &Telemetry,
    request_id: &str,
    model: Option<&str>,
    elapsed: std::time::Duration,
    error: AppError,
) -> Response {
    telemetry
        .record_error(request_id, error.category(), &error.to_string())
        .await;

    if let Some(model) = model {
        telemetry
            .record_response(request_id, model, elapsed, error.status_code().as_u16(), true)
            .await;
    }

    error.into_response()
}
