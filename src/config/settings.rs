//! Application configuration settings
//!
//! Defines all configuration structures and loading logic

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Server configuration
    pub server: ServerConfig,
    /// Upstream API configuration
    pub upstream: UpstreamConfig,
    /// Pricing directory configuration
    pub pricing: PricingConfig,
    /// Telemetry export configuration
    pub telemetry: TelemetryConfig,
    /// Request configuration
    pub request: RequestConfig,
    /// Logging configuration
    pub logging: LoggingConfig,
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Listen host
    pub host: String,
    /// Listen port
    pub port: u16,
}

/// Upstream API configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpstreamConfig {
    /// Full chat completions URL
    pub url: String,
    /// API key (shared with the pricing directory)
    pub api_key: String,
    /// Provider namespace prepended to model names
    pub model_prefix: String,
    /// Request timeout in seconds
    pub timeout: u64,
    /// Streaming request timeout in seconds
    pub stream_timeout: u64,
}

/// Pricing directory configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PricingConfig {
    /// Model listing URL
    pub url: String,
    /// Fetch timeout in seconds
    pub timeout: u64,
    /// Cache time-to-live in seconds (0 disables caching)
    pub cache_ttl: u64,
}

/// Telemetry export configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelemetryConfig {
    /// InfluxDB URL; empty disables export
    pub influxdb_url: String,
    /// InfluxDB token
    pub influxdb_token: String,
    /// InfluxDB organisation
    pub influxdb_org: String,
    /// InfluxDB bucket
    pub influxdb_bucket: String,
}

/// Request configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestConfig {
    /// Maximum request size in bytes
    pub max_request_size: usize,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level
    pub level: String,
    /// Log format (text/json)
    pub format: String,
}

impl Settings {
    /// Create a new configuration instance from the process environment
    pub fn new() -> Result<Self> {
        // Load .env file if it exists
        dotenv::dotenv().ok();

        Self::from_source(|key| std::env::var(key).ok())
    }

    /// Create a configuration instance from an arbitrary key lookup
    pub fn from_source<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str, default: &str| -> String {
            lookup(key)
                .filter(|value| !value.is_empty())
                .unwrap_or_else(|| default.to_string())
        };

        let settings = Self {
            server: ServerConfig {
                host: get("SERVER_HOST", "0.0.0.0"),
                port: get("PORT", "8080")
                    .parse()
                    .context("Invalid port number")?,
            },
            upstream: UpstreamConfig {
                url: get("OPENAI_API_URL", "https://router.requesty.ai/v1/chat/completions"),
                api_key: lookup("API_KEY")
                    .context("API_KEY environment variable not set")?,
                model_prefix: get("UPSTREAM_MODEL_PREFIX", "openai/"),
                timeout: get("REQUEST_TIMEOUT", "60")
                    .parse()
                    .context("Invalid request timeout")?,
                stream_timeout: get("STREAM_TIMEOUT", "300")
                    .parse()
                    .context("Invalid stream timeout")?,
            },
            pricing: PricingConfig {
                url: get("PRICING_URL", "https://router.requesty.ai/v1/models"),
                timeout: get("PRICING_TIMEOUT", "5")
                    .parse()
                    .context("Invalid pricing timeout")?,
                cache_ttl: get("PRICING_CACHE_TTL", "300")
                    .parse()
                    .context("Invalid pricing cache TTL")?,
            },
            telemetry: TelemetryConfig {
                influxdb_url: get("INFLUXDB_URL", ""),
                influxdb_token: get("INFLUXDB_TOKEN", ""),
                influxdb_org: get("INFLUXDB_ORG", "my-org"),
                influxdb_bucket: get("INFLUXDB_BUCKET", "llm_metrics"),
            },
            request: RequestConfig {
                max_request_size: get("MAX_REQUEST_SIZE", "10485760")
                    .parse()
                    .context("Invalid maximum request size")?,
            },
            logging: LoggingConfig {
                level: get("RUST_LOG", "info"),
                format: get("LOG_FORMAT", "text"),
            },
        };

        // Validate configuration
        settings.validate()?;

        Ok(settings)
    }

    /// Validate configuration validity
    fn validate(&self) -> Result<()> {
        if self.server.port == 0 {
            anyhow::bail!("Port number cannot be 0");
        }

        if self.upstream.api_key.is_empty() {
            anyhow::bail!("API key cannot be empty");
        }

        if self.upstream.api_key.contains(char::is_whitespace) {
            anyhow::bail!("API key cannot contain whitespace characters");
        }

        if !self.upstream.url.starts_with("http") {
            anyhow::bail!("Invalid upstream URL format, should start with 'http'");
        }

        if !self.pricing.url.starts_with("http") {
            anyhow::bail!("Invalid pricing URL format, should start with 'http'");
        }

        if !self.telemetry.influxdb_url.is_empty() && !self.telemetry.influxdb_url.starts_with("http") {
            anyhow::bail!("Invalid InfluxDB URL format, should start with 'http'");
        }

        // Validate timeout values
        if self.upstream.timeout == 0 || self.upstream.stream_timeout == 0 || self.pricing.timeout == 0 {
            anyhow::bail!("Timeout values cannot be 0");
        }

        if self.request.max_request_size == 0 {
            anyhow::bail!("Maximum request size cannot be 0");
        }

        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.logging.level.as_str()) {
            anyhow::bail!("Invalid log level: {}", self.logging.level);
        }

        let valid_formats = ["text", "json"];
        if !valid_formats.contains(&self.logging.format.as_str()) {
            anyhow::bail!("Invalid log format: {}", self.logging.format);
        }

        Ok(())
    }

    /// Pricing cache time-to-live
    pub fn pricing_cache_ttl(&self) -> Duration {
        Duration::from_secs(self.pricing.cache_ttl)
    }

    /// Whether telemetry points are exported
    pub fn telemetry_enabled(&self) -> bool {
        !self.telemetry.influxdb_url.is_empty()
    }
}
