//! Pricing directory access
//!
//! Fetches the per-model pricing directory and keeps a time-limited copy

use crate::config::Settings;
use crate::models::pricing::{ModelListResponse, ModelPricing};
use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tracing::{debug, warn};

/// Source of the full pricing directory
#[async_trait]
pub trait PricingSource: Send + Sync {
    /// Fetch every listed model, in directory order
    async fn fetch_all(&self) -> Result<Vec<ModelPricing>>;
}

/// Pricing directory served over HTTP (`GET /v1/models`)
#[derive(Debug, Clone)]
pub struct HttpPricingSource {
    client: Client,
    url: String,
    api_key: String,
}

impl HttpPricingSource {
    /// Create a source from application settings
    pub fn new(settings: &Settings) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(settings.pricing.timeout))
            .user_agent(concat!("llm-gateway/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Failed to create pricing HTTP client")?;

        Ok(Self {
            client,
            url: settings.pricing.url.clone(),
            api_key: settings.upstream.api_key.clone(),
        })
    }
}

#[async_trait]
impl PricingSource for HttpPricingSource {
    async fn fetch_all(&self) -> Result<Vec<ModelPricing>> {
        debug!("Fetching model pricing from {}", self.url);

        let response = self.client
            .get(&self.url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .send()
            .await
            .context("Failed to fetch model pricing")?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            anyhow::bail!("Pricing directory request failed: {} - {}", status, error_text);
        }

        let listing: ModelListResponse = response
            .json()
            .await
            .context("Failed to decode model pricing")?;

        debug!("Fetched pricing for {} models", listing.data.len());
        Ok(listing.data)
    }
}

struct CachedDirectory {
    fetched_at: Instant,
    entries: Arc<Vec<ModelPricing>>,
}

/// Pricing directory with a time-to-live cache
///
/// A zero TTL fetches on every lookup. The lock only guards the cached copy
/// and is never held across a fetch. While one lookup refreshes a stale copy,
/// concurrent lookups are served that copy. A failed refresh keeps serving the
/// last good copy for another TTL before retrying.
pub struct PricingCache {
    source: Arc<dyn PricingSource>,
    ttl: Duration,
    cached: RwLock<Option<CachedDirectory>>,
    refreshing: AtomicBool,
}

impl std::fmt::Debug for PricingCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PricingCache")
            .field("ttl", &self.ttl)
            .finish_non_exhaustive()
    }
}

/// Clears the refresh flag even if the lookup is cancelled mid-fetch
struct RefreshGuard<'a>(&'a AtomicBool);

impl Drop for RefreshGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl PricingCache {
    pub fn new(source: Arc<dyn PricingSource>, ttl: Duration) -> Self {
        Self {
            source,
            ttl,
            cached: RwLock::new(None),
            refreshing: AtomicBool::new(false),
        }
    }

    /// Current directory, or `None` if it cannot be loaded
    pub async fn directory(&self) -> Option<Arc<Vec<ModelPricing>>> {
        if self.ttl.is_zero() {
            return self.refresh().await;
        }

        let stale = {
            let cached = self.cached.read().await;
            match cached.as_ref() {
                Some(entry) if entry.fetched_at.elapsed() < self.ttl => return Some(entry.entries.clone()),
                Some(entry) => Some(entry.entries.clone()),
                None => None,
            }
        };

        if self.refreshing.swap(true, Ordering::AcqRel) {
            if stale.is_some() {
                debug!("Pricing refresh in progress, serving stale directory");
                return stale;
            }
            // Nothing to serve yet: fetch alongside the running refresh
            return self.refresh().await;
        }

        let _guard = RefreshGuard(&self.refreshing);
        self.refresh().await
    }

    /// Fetch from the source and update the cached copy
    async fn refresh(&self) -> Option<Arc<Vec<ModelPricing>>> {
        match self.source.fetch_all().await {
            Ok(entries) => {
                let entries = Arc::new(entries);
                *self.cached.write().await = Some(CachedDirectory {
                    fetched_at: Instant::now(),
                    entries: entries.clone(),
                });
                Some(entries)
            }
            Err(e) => {
                warn!("Pricing directory unavailable: {:#}", e);
                let mut cached = self.cached.write().await;
                if let Some(entry) = cached.as_mut() {
                    // Back off: keep the stale copy for another TTL
                    entry.fetched_at = Instant::now();
                }
                cached.as_ref().map(|entry| entry.entries.clone())
            }
        }
    }

    /// Drop the cached copy so the next lookup refetches
    pub async fn invalidate(&self) {
        *self.cached.write().await = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;
    use std::sync::atomic::{AtomicU64, AtomicUsize};

    struct CountingSource {
        fetches: AtomicUsize,
        failing: AtomicBool,
        delay_ms: AtomicU64,
    }

    impl CountingSource {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                fetches: AtomicUsize::new(0),
                failing: AtomicBool::new(false),
                delay_ms: AtomicU64::new(0),
            })
        }
    }

    #[async_trait]
    impl PricingSource for CountingSource {
        async fn fetch_all(&self) -> Result<Vec<ModelPricing>> {
            self.fetches.fetch_add(1, Ordering::SeqCst);
            let delay = self.delay_ms.load(Ordering::SeqCst);
            if delay > 0 {
                tokio::time::sleep(Duration::from_millis(delay)).await;
            }
            if self.failing.load(Ordering::SeqCst) {
                anyhow::bail!("directory offline");
            }
            Ok(vec![ModelPricing {
                id: "openai/gpt-4o-mini".to_string(),
                input_price: 0.01,
                output_price: 0.02,
                ..Default::default()
            }])
        }
    }

    #[tokio::test]
    async fn test_cache_reuses_fresh_directory() {
        let source = CountingSource::new();
        let cache = PricingCache::new(source.clone(), Duration::from_secs(60));

        assert_eq!(cache.directory().await.unwrap().len(), 1);
        assert_eq!(cache.directory().await.unwrap().len(), 1);
        assert_eq!(source.fetches.load(Ordering::SeqCst), 1);

        cache.invalidate().await;
        cache.directory().await.unwrap();
        assert_eq!(source.fetches.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_zero_ttl_always_fetches() {
        let source = CountingSource::new();
        let cache = PricingCache::new(source.clone(), Duration::ZERO);

        cache.directory().await;
        cache.directory().await;
        assert_eq!(source.fetches.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_stale_copy_served_on_failure() {
        let source = CountingSource::new();
        let cache = PricingCache::new(source.clone(), Duration::ZERO);

        assert!(cache.directory().await.is_some());
        source.failing.store(true, Ordering::SeqCst);
        assert!(cache.directory().await.is_some());

        cache.invalidate().await;
        assert!(cache.directory().await.is_none());
    }

    #[tokio::test]
    async fn test_slow_failing_refresh_does_not_serialize_lookups() {
        let source = CountingSource::new();
        let cache = Arc::new(PricingCache::new(source.clone(), Duration::from_millis(10)));

        assert!(cache.directory().await.is_some());
        tokio::time::sleep(Duration::from_millis(20)).await;
        source.failing.store(true, Ordering::SeqCst);
        source.delay_ms.store(200, Ordering::SeqCst);

        let started = Instant::now();
        let lookups = (0..5).map(|_| {
            let cache = cache.clone();
            tokio::spawn(async move { cache.directory().await })
        });
        let results = futures::future::join_all(lookups).await;
        let elapsed = started.elapsed();

        assert!(results.into_iter().all(|r| r.unwrap().is_some()));
        assert_eq!(source.fetches.load(Ordering::SeqCst), 2);
        assert!(elapsed < Duration::from_millis(600), "lookups took {:?}", elapsed);
    }

    #[tokio::test]
    async fn test_failed_refresh_backs_off_for_one_ttl() {
        let source = CountingSource::new();
        let cache = PricingCache::new(source.clone(), Duration::from_millis(50));

        cache.directory().await;
        tokio::time::sleep(Duration::from_millis(60)).await;
        source.failing.store(true, Ordering::SeqCst);

        assert!(cache.directory().await.is_some());
        assert!(cache.directory().await.is_some());
        assert!(cache.directory().await.is_some());
        assert_eq!(source.fetches.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_zero_ttl_fetches_concurrently() {
        let source = CountingSource::new();
        source.delay_ms.store(200, Ordering::SeqCst);
        let cache = Arc::new(PricingCache::new(source.clone(), Duration::ZERO));

        let started = Instant::now();
        let lookups = (0..5).map(|_| {
            let cache = cache.clone();
            tokio::spawn(async move { cache.directory().await })
        });
        let results = futures::future::join_all(lookups).await;
        let elapsed = started.elapsed();

        assert!(results.into_iter().all(|r| r.unwrap().is_some()));
        assert_eq!(source.fetches.load(Ordering::SeqCst), 5);
        assert!(elapsed < Duration::from_millis(600), "lookups took {:?}", elapsed);
    }

    #[tokio::test]
    async fn test_cancelled_refresh_releases_flag() {
        let source = CountingSource::new();
        let cache = PricingCache::new(source.clone(), Duration::from_millis(10));

        cache.directory().await;
        tokio::time::sleep(Duration::from_millis(20)).await;
        source.delay_ms.store(500, Ordering::SeqCst);

        let cancelled = tokio::time::timeout(Duration::from_millis(20), cache.directory()).await;
        assert!(cancelled.is_err());

        source.delay_ms.store(0, Ordering::SeqCst);
        cache.directory().await;
        assert_eq!(source.fetches.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_http_source_decodes_directory() {
        let server = MockServer::start_async().await;
        let listing = server.mock_async(|when, then| {
            when.method(GET)
                .path("/v1/models")
                .header("Authorization", "Bearer sk-test-key");
            then.status(200).json_body(serde_json::json!({
                "object": "list",
                "data": [{
                    "id": "openai/gpt-4o-mini",
                    "object": "model",
                    "input_price": 0.01,
                    "output_price": 0.02,
                    "context_window": 128000,
                    "max_output_tokens": 16384
                }]
            }));
        }).await;

        let mut settings = Settings::from_source(|key| match key {
            "API_KEY" => Some("sk-test-key".to_string()),
            _ => None,
        }).unwrap();
        settings.pricing.url = server.url("/v1/models");

        let source = HttpPricingSource::new(&settings).unwrap();
        let entries = source.fetch_all().await.unwrap();

        listing.assert_async().await;
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].max_tokens, 16384);
        assert_eq!(entries[0].output_price, 0.02);
    }
}
