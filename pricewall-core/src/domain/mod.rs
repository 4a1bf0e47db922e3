//! Domain types for Pricewall

pub mod asset;
pub mod scope;
pub mod snapshot;
pub mod source;

pub use asset::{parse_numeric, AssetRecord, ClassifiedAsset};
pub use scope::ScopeKey;
pub use snapshot::{Snapshot, SnapshotMeta};
pub use source::{SourceSchedule, SourceStatus};
