//! Pricewall Loader: progressive snapshot loading, caching and the fetch worker.
//!
//! This crate builds on `pricewall-core` to provide:
//! - Scope-keyed snapshot cache with request-id tagging
//! - Progressive loader: metadata first, default category next, the rest
//!   prefetched in the background on a stagger
//! - Background fetch worker on a private rayon pool
//! - Live clock for relative-time labels
//! - View model tying the loader to the view pipeline

pub mod clock;
pub mod loader;
pub mod scope_cache;
pub mod view;
pub mod worker;

pub use clock::{relative_time, LiveClock, Subscription};
pub use loader::{
    FetchJob, FetchPayload, FetchPurpose, FetchTarget, LoadStage, LoadedView, LoaderSettings,
    ProgressiveLoader,
};
pub use scope_cache::{LoadState, RequestId, ScopeCache};
pub use view::ViewModel;
pub use worker::{FetchWorker, WorkerCommand, WorkerError, WorkerResponse};
