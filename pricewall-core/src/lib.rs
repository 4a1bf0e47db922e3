//! Pricewall Core: classification, grouping, virtualization and snapshot providers.
//!
//! This crate contains everything between raw snapshot records and the rows a
//! host draws:
//! - Domain types (asset records, source schedules, snapshots, scope keys)
//! - Catalog of categories, source names and per-source taxonomies
//! - Classifier mapping records to subcategory labels
//! - Grouping and row flattening into header / subheader / tile rows
//! - Prefix-sum virtualizer answering visible-range queries in O(log rows)
//! - Memoized view pipeline tying the three stages together
//! - Snapshot providers (HTTP, file, synthetic) behind one trait

pub mod catalog;
pub mod classify;
pub mod config;
pub mod data;
pub mod domain;
pub mod flatten;
pub mod pipeline;
pub mod virtualize;

pub use catalog::{Catalog, CatalogError, CategoryGroup};
pub use classify::Classifier;
pub use config::{ConfigError, PricewallConfig, ProviderConfig};
pub use flatten::{columns_for_width, flatten, Filters, FlattenOutput, VirtualRow};
pub use pipeline::{DerivedView, PipelineCounters, ViewPipeline, ViewStatus};
pub use virtualize::{OffsetTable, SizeModel, VirtualItem, VirtualWindow};

#[cfg(test)]
mod tests {
    use super::*;

    /// Compile-time check: everything the fetch worker moves across threads
    /// is Send + Sync.
    #[allow(dead_code)]
    fn assert_send_sync() {
        fn require_send<T: Send>() {}
        fn require_sync<T: Sync>() {}

        // Domain types
        require_send::<domain::AssetRecord>();
        require_sync::<domain::AssetRecord>();
        require_send::<domain::ClassifiedAsset>();
        require_sync::<domain::ClassifiedAsset>();
        require_send::<domain::Snapshot>();
        require_sync::<domain::Snapshot>();
        require_send::<domain::SnapshotMeta>();
        require_sync::<domain::SnapshotMeta>();
        require_send::<domain::ScopeKey>();
        require_sync::<domain::ScopeKey>();

        // Lookup and derived types
        require_send::<Catalog>();
        require_sync::<Catalog>();
        require_send::<Classifier>();
        require_sync::<Classifier>();
        require_send::<VirtualRow>();
        require_sync::<VirtualRow>();

        // Providers
        require_send::<data::CircuitBreaker>();
        require_sync::<data::CircuitBreaker>();
        require_send::<data::HttpProvider>();
        require_sync::<data::HttpProvider>();
        require_send::<data::DataError>();
        require_sync::<data::DataError>();
    }

    #[test]
    fn default_catalog_compiles_into_classifier() {
        let catalog = Catalog::default_catalog();
        let classifier = Classifier::new(&catalog).unwrap();
        assert!(classifier.has_taxonomy("weather"));
        assert!(!classifier.has_taxonomy("npm"));
    }
}
