//! Error handling tests

mod common;

use axum::http::StatusCode;
use axum::response::IntoResponse;
use common::{Record, RecordingSink};
use llm_gateway::telemetry::Telemetry;
use llm_gateway::utils::error::*;
use std::sync::Arc;
use std::time::Duration;

fn all_errors() -> Vec<AppError> {
    vec![
        AppError::InvalidRequestBody("eof".to_string()),
        AppError::MethodNotAllowed,
        AppError::UpstreamMarshal("nan".to_string()),
        AppError::UpstreamUnreachable("refused".to_string()),
        AppError::UpstreamRead("reset".to_string()),
        AppError::UpstreamParse("expected value".to_string()),
        AppError::Conversion("no choices".to_string()),
        AppError::StreamingUnsupported("application/json".to_string()),
    ]
}

#[test]
fn test_app_error_status_codes() {
    let statuses: Vec<StatusCode> = all_errors().iter().map(AppError::status_code).collect();
    assert_eq!(statuses, vec![
        StatusCode::BAD_REQUEST,
        StatusCode::METHOD_NOT_ALLOWED,
        StatusCode::INTERNAL_SERVER_ERROR,
        StatusCode::INTERNAL_SERVER_ERROR,
        StatusCode::INTERNAL_SERVER_ERROR,
        StatusCode::INTERNAL_SERVER_ERROR,
        StatusCode::INTERNAL_SERVER_ERROR,
        StatusCode::INTERNAL_SERVER_ERROR,
    ]);
}

#[test]
fn test_error_categories() {
    let categories: Vec<&str> = all_errors().iter().map(AppError::category).collect();
    assert_eq!(categories, vec![
        "invalid_request",
        "method_not_allowed",
        "marshal_error",
        "api_error",
        "response_read_error",
        "response_parse_error",
        "conversion_error",
        "streaming_unsupported",
    ]);
}

#[test]
fn test_client_message_hides_details() {
    for error in all_errors() {
        let payload = error.to_payload();
        assert_eq!(payload.code, error.status_code().as_u16());
        assert!(!payload.message.contains("refused"));
        assert!(!payload.message.contains("reset"));
    }
}

#[test]
fn test_error_display_formatting() {
    let error = AppError::UpstreamParse("expected value at line 1".to_string());
    assert_eq!(error.to_string(), "Failed to parse upstream response: expected value at line 1");
    assert_eq!(AppError::MethodNotAllowed.to_string(), "Method not allowed");
}

#[test]
fn test_error_response_serialization() {
    let payload = ErrorPayload {
        message: "Error reading response".to_string(),
        code: 500,
    };

    let json = serde_json::to_value(&payload).unwrap();
    assert_eq!(json, serde_json::json!({"message": "Error reading response", "code": 500}));
}

#[tokio::test]
async fn test_into_response() {
    let response = AppError::InvalidRequestBody("eof".to_string()).into_response();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let payload: ErrorPayload = serde_json::from_slice(&body).unwrap();
    assert_eq!(payload.message, "Invalid request body");
    assert_eq!(payload.code, 400);
}

#[tokio::test]
async fn test_respond_with_error_before_request_recorded() {
    let sink = Arc::new(RecordingSink::new());
    let telemetry = Telemetry::new(sink.clone());

    let response = respond_with_error(
        &telemetry,
        "req-1",
        None,
        Duration::ZERO,
        AppError::InvalidRequestBody("eof".to_string()),
    ).await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(sink.records(), vec![Record::Error {
        request_id: "req-1".to_string(),
        category: "invalid_request".to_string(),
        message: "Invalid request body: eof".to_string(),
    }]);
}

#[tokio::test]
async fn test_respond_with_error_after_request_recorded() {
    let sink = Arc::new(RecordingSink::new());
    let telemetry = Telemetry::new(sink.clone());

    let response = respond_with_error(
        &telemetry,
        "req-2",
        Some("gpt-4o-mini"),
        Duration::from_millis(12),
        AppError::UpstreamRead("reset".to_string()),
    ).await;

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(sink.error_categories(), vec!["response_read_error"]);
    assert_eq!(sink.responses(), vec![Record::Response {
        request_id: "req-2".to_string(),
        model: "gpt-4o-mini".to_string(),
        status: 500,
        error: true,
    }]);
}

#[test]
fn test_app_result_type() {
    fn parse(raw: &str) -> AppResult<u32> {
        raw.parse().map_err(|_| AppError::InvalidRequestBody(raw.to_string()))
    }

    assert_eq!(parse("7").unwrap(), 7);
    assert!(matches!(parse("seven"), Err(AppError::InvalidRequestBody(_))));
}
