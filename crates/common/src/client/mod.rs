//! Paper source abstraction
//!
//! Provides a unified interface for obtaining raw paper responses:
//! - Semantic Scholar HTTP client with bounded retry and rate limiting
//! - Offline source for cache-only runs
//! - In-memory mock for tests

use crate::config::{ApiConfig, AppConfig};
use crate::errors::{AppError, Result};
use crate::metrics;
use crate::models::PaperId;
use async_trait::async_trait;
use backoff::{future::retry, ExponentialBackoff, ExponentialBackoffBuilder};
use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
use std::collections::HashMap;
use std::num::NonZeroU32;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Trait for raw paper retrieval
#[async_trait]
pub trait PaperSource: Send + Sync {
    /// Fetch the raw response body for one paper
    async fn fetch(&self, id: &PaperId) -> Result<Vec<u8>>;

    /// Short name for logs
    fn name(&self) -> &str;
}

/// Semantic Scholar v1 client
pub struct SemanticScholarClient {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    max_retries: u32,
    initial_backoff: Duration,
    max_backoff: Duration,
    retry_statuses: Vec<u16>,
    limiter: Option<DefaultDirectRateLimiter>,
}

impl SemanticScholarClient {
    /// Create a new client
    pub fn new(config: &ApiConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .user_agent(config.user_agent.as_str())
            .build()?;

        let limiter = NonZeroU32::new(config.requests_per_second)
            .map(|rps| RateLimiter::direct(Quota::per_second(rps)));

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            max_retries: config.max_retries,
            initial_backoff: Duration::from_millis(config.initial_backoff_ms),
            max_backoff: Duration::from_millis(config.max_backoff_ms.max(config.initial_backoff_ms)),
            retry_statuses: config.retry_statuses.clone(),
            limiter,
        })
    }

    /// Deterministic URL for a paper
    pub fn paper_url(&self, id: &PaperId) -> String {
        format!("{}/paper/{}", self.base_url, id)
    }

    fn backoff_policy(&self) -> ExponentialBackoff {
        ExponentialBackoffBuilder::new()
            .with_initial_interval(self.initial_backoff)
            .with_max_interval(self.max_backoff)
            .with_multiplier(2.0)
            .with_max_elapsed_time(None)
            .build()
    }

    /// Whether another attempt is allowed after `attempt` failed transiently
    fn can_retry(&self, attempt: u32) -> bool {
        attempt <= self.max_retries
    }

    /// One request. Transient failures are returned as
    /// `backoff::Error::Transient` until the retry budget is spent.
    async fn attempt(
        &self,
        id: &PaperId,
        url: &str,
        attempt: u32,
    ) -> std::result::Result<Vec<u8>, backoff::Error<AppError>> {
        if let Some(limiter) = &self.limiter {
            limiter.until_ready().await;
        }

        let mut request = self.client.get(url);
        if let Some(ref api_key) = self.api_key {
            request = request.header("x-api-key", api_key);
        }

        let started = Instant::now();
        let response = match request.send().await {
            Ok(response) => response,
            Err(e) => {
                metrics::record_fetch("transport_error", started);
                let transient = e.is_timeout() || e.is_connect();
                let err = AppError::Fetch {
                    id: id.to_string(),
                    message: e.to_string(),
                };
                if transient && self.can_retry(attempt) {
                    warn!(paper_id = %id, attempt, error = %err, "Request failed, retrying");
                    metrics::record_retry();
                    return Err(backoff::Error::transient(err));
                }
                return Err(backoff::Error::permanent(err));
            }
        };

        let status = response.status();
        if self.retry_statuses.contains(&status.as_u16()) {
            metrics::record_fetch("transient_status", started);
            if !self.can_retry(attempt) {
                return Err(backoff::Error::permanent(AppError::RetriesExhausted {
                    id: id.to_string(),
                    attempts: attempt,
                    status: status.as_u16(),
                }));
            }
            warn!(paper_id = %id, attempt, status = status.as_u16(), "Transient upstream status, retrying");
            metrics::record_retry();
            return Err(backoff::Error::transient(AppError::UpstreamStatus {
                id: id.to_string(),
                status: status.as_u16(),
            }));
        }

        let body = response.bytes().await.map_err(|e| {
            backoff::Error::permanent(AppError::Fetch {
                id: id.to_string(),
                message: format!("Failed to read body: {}", e),
            })
        })?;

        if status.is_success() || (status.is_client_error() && is_error_reply(&body)) {
            metrics::record_fetch(if status.is_success() { "ok" } else { "error_reply" }, started);
            debug!(paper_id = %id, status = status.as_u16(), bytes = body.len(), "Paper fetched");
            return Ok(body.to_vec());
        }

        metrics::record_fetch("failed_status", started);
        Err(backoff::Error::permanent(AppError::UpstreamStatus {
            id: id.to_string(),
            status: status.as_u16(),
        }))
    }
}

/// The service answers unknown or malformed ids with a 4xx JSON body
/// carrying an `error` field. That reply is a result, not a failure: it is
/// handed to the store so it can be cached and decoded as not-found.
fn is_error_reply(body: &[u8]) -> bool {
    serde_json::from_slice::<serde_json::Value>(body)
        .map(|value| value.get("error").is_some())
        .unwrap_or(false)
}

#[async_trait]
impl PaperSource for SemanticScholarClient {
    async fn fetch(&self, id: &PaperId) -> Result<Vec<u8>> {
        let url = self.paper_url(id);
        let attempts = AtomicU32::new(0);

        retry(self.backoff_policy(), || {
            let attempt = attempts.fetch_add(1, Ordering::Relaxed) + 1;
            let url = url.as_str();
            async move { self.attempt(id, url, attempt).await }
        })
        .await
    }

    fn name(&self) -> &str {
        "semantic-scholar"
    }
}

/// Source for cache-only runs; every lookup that reaches it fails
pub struct OfflineSource;

#[async_trait]
impl PaperSource for OfflineSource {
    async fn fetch(&self, id: &PaperId) -> Result<Vec<u8>> {
        Err(AppError::Fetch {
            id: id.to_string(),
            message: "offline mode: paper is not cached".to_string(),
        })
    }

    fn name(&self) -> &str {
        "offline"
    }
}

/// Mock source for testing
///
/// Serves canned bodies and counts how often each id was requested.
#[derive(Default)]
pub struct MockPaperSource {
    responses: HashMap<PaperId, Vec<u8>>,
    calls: Mutex<HashMap<PaperId, usize>>,
}

impl MockPaperSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve `body` for `id`
    pub fn with_response(mut self, id: impl Into<PaperId>, body: impl Into<Vec<u8>>) -> Self {
        self.responses.insert(id.into(), body.into());
        self
    }

    /// Number of fetches issued for `id`
    pub fn calls(&self, id: &str) -> usize {
        self.calls
            .lock()
            .map(|calls| calls.get(id).copied().unwrap_or(0))
            .unwrap_or(0)
    }

    /// Number of fetches issued in total
    pub fn total_calls(&self) -> usize {
        self.calls
            .lock()
            .map(|calls| calls.values().sum())
            .unwrap_or(0)
    }
}

#[async_trait]
impl PaperSource for MockPaperSource {
    async fn fetch(&self, id: &PaperId) -> Result<Vec<u8>> {
        if let Ok(mut calls) = self.calls.lock() {
            *calls.entry(id.clone()).or_default() += 1;
        }

        self.responses.get(id).cloned().ok_or_else(|| AppError::Fetch {
            id: id.to_string(),
            message: "no canned response".to_string(),
        })
    }

    fn name(&self) -> &str {
        "mock"
    }
}

/// Create a paper source based on configuration
pub fn create_source(config: &AppConfig) -> Result<Arc<dyn PaperSource>> {
    if config.cache.offline {
        return Ok(Arc::new(OfflineSource));
    }
    Ok(Arc::new(SemanticScholarClient::new(&config.api)?))
}
