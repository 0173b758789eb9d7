//! Telemetry module
//!
//! Fire-and-forget metrics collaborator. Sinks report failures through
//! `Result`; the [`Telemetry`] handle logs them and never lets them reach
//! the response path.

pub mod influx;

use anyhow::Result;
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

pub use influx::InfluxSink;

/// Destination for gateway metrics
#[async_trait]
pub trait TelemetrySink: Send + Sync {
    /// Record an accepted client request
    async fn record_request(&self, request_id: &str, model: &str, message_count: usize, stream: bool) -> Result<()>;

    /// Record a finished response
    async fn record_response(
        &self,
        request_id: &str,
        model: &str,
        duration: Duration,
        status: u16,
        error: bool,
    ) -> Result<()>;

    /// Record one forwarded stream event
    async fn record_stream_chunk(&self, request_id: &str, chunk_size: usize, sequence: u64) -> Result<()>;

    /// Record a failure of the given category
    async fn record_error(&self, request_id: &str, category: &str, message: &str) -> Result<()>;

    /// Record a health check result
    async fn record_health(
        &self,
        status: &str,
        components: &BTreeMap<String, String>,
        duration: Duration,
    ) -> Result<()>;

    /// Check that the sink itself is reachable
    async fn check_health(&self) -> Result<()>;
}

/// Sink used when no telemetry backend is configured
#[derive(Debug, Clone, Default)]
pub struct DisabledSink;

#[async_trait]
impl TelemetrySink for DisabledSink {
    async fn record_request(&self, request_id: &str, model: &str, message_count: usize, stream: bool) -> Result<()> {
        debug!(request_id, model, message_count, stream, "telemetry disabled: request");
        Ok(())
    }

    async fn record_response(
        &self,
        request_id: &str,
        model: &str,
        duration: Duration,
        status: u16,
        error: bool,
    ) -> Result<()> {
        debug!(request_id, model, duration_ms = duration.as_millis() as u64, status, error, "telemetry disabled: response");
        Ok(())
    }

    async fn record_stream_chunk(&self, _request_id: &str, _chunk_size: usize, _sequence: u64) -> Result<()> {
        Ok(())
    }

    async fn record_error(&self, request_id: &str, category: &str, message: &str) -> Result<()> {
        debug!(request_id, category, message, "telemetry disabled: error");
        Ok(())
    }

    async fn record_health(
        &self,
        _status: &str,
        _components: &BTreeMap<String, String>,
        _duration: Duration,
    ) -> Result<()> {
        Ok(())
    }

    async fn check_health(&self) -> Result<()> {
        Ok(())
    }
}

/// Shared telemetry handle
///
/// Every call waits for the sink; a failing sink is logged locally.
#[derive(Clone)]
pub struct Telemetry {
    sink: Arc<dyn TelemetrySink>,
}

impl std::fmt::Debug for Telemetry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Telemetry").finish_non_exhaustive()
    }
}

impl Telemetry {
    pub fn new(sink: Arc<dyn TelemetrySink>) -> Self {
        Self { sink }
    }

    /// Handle that drops every record
    pub fn disabled() -> Self {
        Self::new(Arc::new(DisabledSink))
    }

    pub async fn record_request(&self, request_id: &str, model: &str, message_count: usize, stream: bool) {
        if let Err(e) = self.sink.record_request(request_id, model, message_count, stream).await {
            warn!("Failed to record request: {:#}", e);
        }
    }

    pub async fn record_response(&self, request_id: &str, model: &str, duration: Duration, status: u16, error: bool) {
        if let Err(e) = self.sink.record_response(request_id, model, duration, status, error).await {
            warn!("Failed to record response: {:#}", e);
        }
    }

    pub async fn record_stream_chunk(&self, request_id: &str, chunk_size: usize, sequence: u64) {
        if let Err(e) = self.sink.record_stream_chunk(request_id, chunk_size, sequence).await {
            warn!("Failed to record streaming chunk: {:#}", e);
        }
    }

    pub async fn record_error(&self, request_id: &str, category: &str, message: &str) {
        if let Err(e) = self.sink.record_error(request_id, category, message).await {
            warn!("Failed to record error: {:#}", e);
        }
    }

    pub async fn record_health(&self, status: &str, components: &BTreeMap<String, String>, duration: Duration) {
        if let Err(e) = self.sink.record_health(status, components, duration).await {
            warn!("Failed to record health check: {:#}", e);
        }
    }

    /// Sink health, surfaced by the health endpoint
    pub async fn check_health(&self) -> Result<()> {
        self.sink.check_health().await
    }
}
