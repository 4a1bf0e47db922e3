//! Snapshot provider trait and structured error types.
//!
//! The SnapshotProvider trait abstracts over where snapshots come from (the
//! HTTP snapshot service, a JSON file on disk, the synthetic generator) so the
//! fetch worker can swap implementations and tests can mock them.

use thiserror::Error;

use crate::domain::{ScopeKey, Snapshot, SnapshotMeta};

/// Structured error types for snapshot fetches.
///
/// Every variant belongs to the network-failure class: the loader marks the
/// affected scope failed and keeps everything else displayable.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DataError {
    #[error("network unreachable: {0}")]
    NetworkUnreachable(String),

    #[error("rate limited by snapshot service (retry after {retry_after_secs}s)")]
    RateLimited { retry_after_secs: u64 },

    #[error("HTTP {status} from {url}")]
    HttpStatus { status: u16, url: String },

    #[error("response format changed: {0}")]
    ResponseFormatChanged(String),

    #[error("snapshot service blocked (circuit breaker open, {remaining_secs}s left)")]
    CircuitBreakerTripped { remaining_secs: u64 },

    #[error("I/O error: {0}")]
    Io(String),

    #[error("data error: {0}")]
    Other(String),
}

impl DataError {
    /// Whether this error is a transport-level failure. All fetch errors
    /// are; the distinction exists so hosts can match on it.
    pub fn is_network_failure(&self) -> bool {
        true
    }

    /// Whether retrying right away could succeed.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            DataError::NetworkUnreachable(_)
                | DataError::RateLimited { .. }
                | DataError::HttpStatus { status: 500..=599, .. }
        )
    }
}

impl From<std::io::Error> for DataError {
    fn from(e: std::io::Error) -> Self {
        DataError::Io(e.to_string())
    }
}

/// Trait for snapshot sources.
///
/// Implementations are called from the fetch worker's pool, never from the
/// render thread, so blocking I/O is fine.
pub trait SnapshotProvider: Send + Sync {
    /// Human-readable name of this provider.
    fn name(&self) -> &str;

    /// Lightweight metadata: total count and per-source counts.
    fn fetch_meta(&self) -> Result<SnapshotMeta, DataError>;

    /// Full records for the sources in `scope`.
    fn fetch_snapshot(&self, scope: &ScopeKey) -> Result<Snapshot, DataError>;

    /// Whether the provider currently accepts requests.
    fn is_available(&self) -> bool {
        true
    }
}
