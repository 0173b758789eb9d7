//! HTTP client service
//!
//! Encapsulates HTTP communication with the upstream chat completion API

use crate::config::Settings;
use crate::models::openai::*;
use crate::utils::error::{AppError, AppResult};
use anyhow::{Context, Result};
use bytes::Bytes;
use futures::stream::BoxStream;
use futures::{StreamExt, TryStreamExt};
use reqwest::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Client, Response};
use std::io;
use std::time::Duration;
use tokio_util::io::StreamReader;
use tracing::{debug, warn};

/// Buffered reader over a live upstream event stream
pub type UpstreamEventStream = StreamReader<BoxStream<'static, io::Result<Bytes>>, Bytes>;

/// Upstream API client
#[derive(Debug, Clone)]
pub struct UpstreamClient {
    client: Client,
    stream_client: Client,
    url: String,
    api_key: String,
}

impl UpstreamClient {
    /// Create a new client instance
    pub fn new(settings: &Settings) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(settings.upstream.timeout))
            .user_agent(concat!("llm-gateway/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Failed to create HTTP client")?;

        let stream_client = Client::builder()
            .timeout(Duration::from_secs(settings.upstream.stream_timeout))
            .user_agent(concat!("llm-gateway/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Failed to create streaming HTTP client")?;

        Ok(Self {
            client,
            stream_client,
            url: settings.upstream.url.clone(),
            api_key: settings.upstream.api_key.clone(),
        })
    }

    /// Send a chat completion request and parse the complete answer
    ///
    /// Non-success statuses are not rejected here: an upstream error
    /// document parses as a response without choices.
    pub async fn chat_completions(&self, request: &UpstreamRequest) -> AppResult<UpstreamResponse> {
        debug!("Sending upstream chat completion request");

        let response = self.send(&self.client, request, false).await?;
        let status = response.status();

        let body = response
            .bytes()
            .await
            .map_err(|e| AppError::UpstreamRead(e.to_string()))?;

        if !status.is_success() {
            warn!("Upstream returned {}: {}", status, String::from_utf8_lossy(&body));
        }

        serde_json::from_slice(&body).map_err(|e| AppError::UpstreamParse(e.to_string()))
    }

    /// Send a streaming chat completion request
    ///
    /// Fails with [`AppError::StreamingUnsupported`] when the upstream does
    /// not answer with an event stream.
    pub async fn chat_completions_stream(&self, request: &UpstreamRequest) -> AppResult<UpstreamEventStream> {
        debug!("Sending upstream streaming chat completion request");

        let response = self.send(&self.stream_client, request, true).await?;
        let status = response.status();

        let is_event_stream = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(|value| value.starts_with("text/event-stream"))
            .unwrap_or(false);

        if !is_event_stream {
            let error_text = response.text().await.unwrap_or_default();
            return Err(AppError::StreamingUnsupported(format!(
                "upstream answered {} without an event stream: {}",
                status, error_text
            )));
        }

        let body = response
            .bytes_stream()
            .map_err(|e| io::Error::new(io::ErrorKind::Other, e))
            .boxed();

        Ok(StreamReader::new(body))
    }

    async fn send(&self, client: &Client, request: &UpstreamRequest, stream: bool) -> AppResult<Response> {
        let body = serde_json::to_vec(request).map_err(|e| AppError::UpstreamMarshal(e.to_string()))?;

        let mut builder = client
            .post(&self.url)
            .header(AUTHORIZATION, format!("Bearer {}", self.api_key))
            .header(CONTENT_TYPE, "application/json");

        if stream {
            builder = builder.header(ACCEPT, "text/event-stream");
        }

        builder
            .body(body)
            .send()
            .await
            .map_err(|e| AppError::UpstreamUnreachable(e.to_string()))
    }
}
