//! Snapshot providers: HTTP service, JSON file, synthetic generator.

pub mod circuit_breaker;
pub mod file;
pub mod http;
pub mod provider;
pub mod synthetic;

pub use circuit_breaker::{BreakerState, CircuitBreaker};
pub use file::FileProvider;
pub use http::{HttpProvider, HttpSettings};
pub use provider::{DataError, SnapshotProvider};
pub use synthetic::SyntheticProvider;
