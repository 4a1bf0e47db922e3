//! HTTP snapshot provider.
//!
//! Talks to the snapshot service:
//!
//! - `GET {base}/snapshot/meta` for per-source counts
//! - `GET {base}/snapshot?sources=a,b` for records of a scope
//!
//! Handles rate limiting, retries with exponential backoff, response parsing
//! and the circuit breaker.

use std::sync::Arc;
use std::time::Duration;

use serde::de::DeserializeOwned;

use super::circuit_breaker::CircuitBreaker;
use super::provider::{DataError, SnapshotProvider};
use crate::domain::{ScopeKey, Snapshot, SnapshotMeta};

/// Connection settings for [`HttpProvider`].
#[derive(Debug, Clone, PartialEq)]
pub struct HttpSettings {
    pub base_url: String,
    pub timeout: Duration,
    pub max_retries: u32,
    pub base_delay: Duration,
}

impl HttpSettings {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            timeout: Duration::from_secs(15),
            max_retries: 3,
            base_delay: Duration::from_millis(500),
        }
    }
}

pub struct HttpProvider {
    client: reqwest::blocking::Client,
    circuit_breaker: Arc<CircuitBreaker>,
    base_url: String,
    max_retries: u32,
    base_delay: Duration,
}

impl HttpProvider {
    pub fn new(settings: HttpSettings, circuit_breaker: Arc<CircuitBreaker>) -> Result<Self, DataError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(settings.timeout)
            .user_agent(concat!("pricewall/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| DataError::Other(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            circuit_breaker,
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            max_retries: settings.max_retries,
            base_delay: settings.base_delay,
        })
    }

    pub fn meta_url(&self) -> String {
        format!("{}/snapshot/meta", self.base_url)
    }

    /// An empty scope asks for every source.
    pub fn snapshot_url(&self, scope: &ScopeKey) -> String {
        if scope.is_empty() {
            format!("{}/snapshot", self.base_url)
        } else {
            format!("{}/snapshot?sources={}", self.base_url, scope.query_value())
        }
    }

    /// Execute a GET with retry and circuit breaker logic, decoding the body
    /// as JSON.
    fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T, DataError> {
        let mut last_error = None;

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                let delay = backoff_delay(self.base_delay, attempt);
                tracing::debug!(url, attempt, ?delay, "retrying snapshot request");
                std::thread::sleep(delay);
            }

            if !self.circuit_breaker.is_allowed() {
                return Err(DataError::CircuitBreakerTripped {
                    remaining_secs: self.circuit_breaker.remaining_cooldown().as_secs(),
                });
            }

            match self.client.get(url).send() {
                Ok(resp) => {
                    let status = resp.status();

                    if status == reqwest::StatusCode::FORBIDDEN {
                        self.circuit_breaker.trip();
                        return Err(DataError::CircuitBreakerTripped {
                            remaining_secs: self.circuit_breaker.remaining_cooldown().as_secs(),
                        });
                    }

                    if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
                        self.circuit_breaker.record_failure();
                        let retry_after = resp
                            .headers()
                            .get("retry-after")
                            .and_then(|v| v.to_str().ok())
                            .and_then(|v| v.parse::<u64>().ok())
                            .unwrap_or(60);
                        last_error = Some(DataError::RateLimited {
                            retry_after_secs: retry_after,
                        });
                        continue;
                    }

                    if status.is_server_error() {
                        self.circuit_breaker.record_failure();
                        last_error = Some(DataError::HttpStatus {
                            status: status.as_u16(),
                            url: url.to_string(),
                        });
                        continue;
                    }

                    if !status.is_success() {
                        return Err(DataError::HttpStatus {
                            status: status.as_u16(),
                            url: url.to_string(),
                        });
                    }

                    let body = resp
                        .text()
                        .map_err(|e| DataError::NetworkUnreachable(e.to_string()))?;
                    let parsed = parse_body(&body)?;
                    self.circuit_breaker.record_success();
                    return Ok(parsed);
                }
                Err(e) => {
                    if e.is_connect() || e.is_timeout() {
                        self.circuit_breaker.record_failure();
                        last_error = Some(DataError::NetworkUnreachable(e.to_string()));
                        continue;
                    }
                    return Err(DataError::NetworkUnreachable(e.to_string()));
                }
            }
        }

        Err(last_error.unwrap_or_else(|| DataError::Other("max retries exceeded".into())))
    }
}

/// Decode a response body. A body that does not match the expected shape is
/// a format change, not a transport error.
pub fn parse_body<T: DeserializeOwned>(body: &str) -> Result<T, DataError> {
    serde_json::from_str(body)
        .map_err(|e| DataError::ResponseFormatChanged(format!("failed to parse response: {e}")))
}

impl SnapshotProvider for HttpProvider {
    fn name(&self) -> &str {
        "http"
    }

    fn fetch_meta(&self) -> Result<SnapshotMeta, DataError> {
        self.get_json(&self.meta_url())
    }

    fn fetch_snapshot(&self, scope: &ScopeKey) -> Result<Snapshot, DataError> {
        let snapshot: Snapshot = self.get_json(&self.snapshot_url(scope))?;
        // Services may ignore the filter; never hand out rows outside the scope.
        if scope.is_empty() {
            Ok(snapshot)
        } else {
            Ok(snapshot.restricted_to(scope))
        }
    }

    fn is_available(&self) -> bool {
        self.circuit_breaker.is_allowed()
    }
}

/// Exponential backoff before retry `attempt` (1-based). Saturates instead
/// of overflowing for large attempt counts.
fn backoff_delay(base: Duration, attempt: u32) -> Duration {
    base.saturating_mul(2u32.saturating_pow(attempt.saturating_sub(1)))
}
