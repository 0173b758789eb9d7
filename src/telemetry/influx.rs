//! InfluxDB telemetry sink
//!
//! Writes one line-protocol point per record through the InfluxDB v2 HTTP API

use super::TelemetrySink;
use crate::config::settings::TelemetryConfig;
use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::time::Duration;
use tracing::debug;

/// InfluxDB v2 sink
#[derive(Debug, Clone)]
pub struct InfluxSink {
    client: Client,
    base_url: String,
    token: String,
    org: String,
    bucket: String,
}

impl InfluxSink {
    /// Create a sink from telemetry settings
    pub fn new(config: &TelemetryConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(5))
            .user_agent(concat!("llm-gateway/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Failed to create InfluxDB HTTP client")?;

        Ok(Self {
            client,
            base_url: config.influxdb_url.trim_end_matches('/').to_string(),
            token: config.influxdb_token.clone(),
            org: config.influxdb_org.clone(),
            bucket: config.influxdb_bucket.clone(),
        })
    }

    async fn write(&self, point: Point) -> Result<()> {
        let timestamp = chrono::Utc::now().timestamp_nanos_opt().unwrap_or_default();
        let line = point.to_line(timestamp);
        debug!("Writing telemetry point: {}", line);

        let response = self.client
            .post(format!("{}/api/v2/write", self.base_url))
            .query(&[("org", self.org.as_str()), ("bucket", self.bucket.as_str()), ("precision", "ns")])
            .header("Authorization", format!("Token {}", self.token))
            .header("Content-Type", "text/plain; charset=utf-8")
            .body(line)
            .send()
            .await
            .context("Failed to send telemetry point")?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            anyhow::bail!("InfluxDB write failed: {} - {}", status, error_text);
        }

        Ok(())
    }
}

#[async_trait]
impl TelemetrySink for InfluxSink {
    async fn record_request(&self, request_id: &str, model: &str, message_count: usize, stream: bool) -> Result<()> {
        let point = Point::new("llm_requests")
            .tag("request_id", request_id)
            .tag("model", model)
            .field("message_count", FieldValue::Int(message_count as i64))
            .field("streaming", FieldValue::Bool(stream));
        self.write(point).await
    }

    async fn record_response(
        &self,
        request_id: &str,
        model: &str,
        duration: Duration,
        status: u16,
        error: bool,
    ) -> Result<()> {
        let point = Point::new("llm_responses")
            .tag("request_id", request_id)
            .tag("model", model)
            .field("response_time_ms", FieldValue::Int(duration.as_millis() as i64))
            .field("status", FieldValue::Int(i64::from(status)))
            .field("error", FieldValue::Bool(error));
        self.write(point).await
    }

    async fn record_stream_chunk(&self, request_id: &str, chunk_size: usize, sequence: u64) -> Result<()> {
        let point = Point::new("llm_streaming_chunks")
            .tag("request_id", request_id)
            .field("chunk_size", FieldValue::Int(chunk_size as i64))
            .field("chunk_number", FieldValue::Int(sequence as i64));
        self.write(point).await
    }

    async fn record_error(&self, request_id: &str, category: &str, message: &str) -> Result<()> {
        let point = Point::new("llm_errors")
            .tag("request_id", request_id)
            .tag("type", category)
            .field("message", FieldValue::Str(message.to_string()));
        self.write(point).await
    }

    async fn record_health(
        &self,
        status: &str,
        components: &BTreeMap<String, String>,
        duration: Duration,
    ) -> Result<()> {
        let mut point = Point::new("health_checks")
            .tag("status", status)
            .field("duration_ms", FieldValue::Int(duration.as_millis() as i64));
        for (name, value) in components {
            point = point.field(&format!("component_{}", name), FieldValue::Str(value.clone()));
        }
        self.write(point).await
    }

    async fn check_health(&self) -> Result<()> {
        let response = self.client
            .get(format!("{}/health", self.base_url))
            .send()
            .await
            .context("Failed to connect to InfluxDB")?;

        if !response.status().is_success() {
            anyhow::bail!("InfluxDB reported status {}", response.status());
        }

        Ok(())
    }
}

/// Line-protocol field value
#[derive(Debug, Clone, PartialEq)]
enum FieldValue {
    Int(i64),
    Bool(bool),
    Str(String),
}

/// A single line-protocol point
#[derive(Debug, Clone)]
struct Point {
    measurement: &'static str,
    tags: Vec<(String, String)>,
    fields: Vec<(String, FieldValue)>,
}

impl Point {
    fn new(measurement: &'static str) -> Self {
        Self {
            measurement,
            tags: Vec::new(),
            fields: Vec::new(),
        }
    }

    /// Empty tag values are not representable and are dropped
    fn tag(mut self, key: &str, value: &str) -> Self {
        if !value.is_empty() {
            self.tags.push((key.to_string(), value.to_string()));
        }
        self
    }

    fn field(mut self, key: &str, value: FieldValue) -> Self {
        self.fields.push((key.to_string(), value));
        self
    }

    fn to_line(&self, timestamp_ns: i64) -> String {
        let mut line = escape_key(self.measurement);

        for (key, value) in &self.tags {
            let _ = write!(line, ",{}={}", escape_key(key), escape_key(value));
        }

        let fields: Vec<String> = self.fields
            .iter()
            .map(|(key, value)| {
                let rendered = match value {
                    FieldValue::Int(v) => format!("{}i", v),
                    FieldValue::Bool(v) => v.to_string(),
                    FieldValue::Str(v) => format!(
                        "\"{}\"",
                        flatten_line_breaks(v).replace('\\', "\\\\").replace('"', "\\\"")
                    ),
                };
                format!("{}={}", escape_key(key), rendered)
            })
            .collect();

        let _ = write!(line, " {} {}", fields.join(","), timestamp_ns);
        line
    }
}

/// Line breaks end a point; client-supplied text must never carry one
fn flatten_line_breaks(value: &str) -> String {
    value.replace(['\n', '\r'], " ")
}

/// Escape measurement names, tag keys/values and field keys
fn escape_key(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in flatten_line_breaks(value).chars() {
        if matches!(c, ',' | '=' | ' ') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}
