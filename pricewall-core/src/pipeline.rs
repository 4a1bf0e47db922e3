//! Memoized classify → flatten → offset-table pipeline.
//!
//! Each stage is keyed by the identity of its inputs and only recomputes when
//! that key changes:
//!
//! | stage    | key                                          |
//! |----------|----------------------------------------------|
//! | classify | dataset generation                           |
//! | flatten  | classified generation, filters, column count |
//! | offsets  | rows generation, size model                  |
//!
//! Scrolling and clock ticks touch none of these keys, so they never rebuild
//! anything; [`ViewPipeline::window`] only reads the offset table.

use std::sync::Arc;

use crate::catalog::Catalog;
use crate::classify::Classifier;
use crate::domain::{AssetRecord, ClassifiedAsset};
use crate::flatten::{flatten, Filters, VirtualRow};
use crate::virtualize::{OffsetTable, SizeModel, VirtualWindow, DEFAULT_OVERSCAN};

/// How many times each stage has been recomputed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PipelineCounters {
    pub classify: u64,
    pub flatten: u64,
    pub offsets: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct FlattenKey {
    classified_generation: u64,
    filters: Filters,
    columns: usize,
}

#[derive(Debug)]
pub struct ViewPipeline {
    catalog: Arc<Catalog>,
    classifier: Classifier,
    overscan: usize,

    dataset_generation: Option<u64>,
    classified: Arc<Vec<ClassifiedAsset>>,
    classified_generation: u64,

    flatten_key: Option<FlattenKey>,
    rows: Arc<Vec<VirtualRow>>,
    total_matched: usize,
    rows_generation: u64,

    offsets_key: Option<(u64, SizeModel)>,
    offsets: OffsetTable,

    counters: PipelineCounters,
}

impl ViewPipeline {
    pub fn new(catalog: Arc<Catalog>, classifier: Classifier) -> Self {
        Self {
            catalog,
            classifier,
            overscan: DEFAULT_OVERSCAN,
            dataset_generation: None,
            classified: Arc::new(Vec::new()),
            classified_generation: 0,
            flatten_key: None,
            rows: Arc::new(Vec::new()),
            total_matched: 0,
            rows_generation: 0,
            offsets_key: None,
            offsets: OffsetTable::default(),
            counters: PipelineCounters::default(),
        }
    }

    pub fn with_overscan(mut self, overscan: usize) -> Self {
        self.overscan = overscan;
        self
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// Bring every stage up to date with the inputs. `dataset_generation`
    /// must change whenever `records` changes. Returns true when the row list
    /// was rebuilt.
    pub fn update(
        &mut self,
        dataset_generation: u64,
        records: &[Arc<AssetRecord>],
        filters: &Filters,
        columns: usize,
        sizes: SizeModel,
    ) -> bool {
        if self.dataset_generation != Some(dataset_generation) {
            self.classified = Arc::new(self.classifier.classify_all(records));
            self.dataset_generation = Some(dataset_generation);
            self.classified_generation += 1;
            self.counters.classify += 1;
        }

        let key = FlattenKey {
            classified_generation: self.classified_generation,
            filters: filters.clone(),
            columns: columns.max(1),
        };
        let rows_changed = self.flatten_key.as_ref() != Some(&key);
        if rows_changed {
            let out = flatten(&self.classified, filters, key.columns, &self.catalog);
            self.rows = Arc::new(out.rows);
            self.total_matched = out.total_matched;
            self.flatten_key = Some(key);
            self.rows_generation += 1;
            self.counters.flatten += 1;
        }

        let offsets_key = (self.rows_generation, sizes);
        if self.offsets_key != Some(offsets_key) {
            self.offsets = OffsetTable::for_rows(&self.rows, &sizes);
            self.offsets_key = Some(offsets_key);
            self.counters.offsets += 1;
        }

        rows_changed
    }

    /// Window for a scroll position. Reads the current offset table only.
    pub fn window(&self, scroll: u64, viewport: u64) -> VirtualWindow {
        self.offsets.window(scroll, viewport, self.overscan)
    }

    pub fn rows(&self) -> &Arc<Vec<VirtualRow>> {
        &self.rows
    }

    pub fn classified(&self) -> &Arc<Vec<ClassifiedAsset>> {
        &self.classified
    }

    pub fn offsets(&self) -> &OffsetTable {
        &self.offsets
    }

    pub fn total_matched(&self) -> usize {
        self.total_matched
    }

    pub fn counters(&self) -> PipelineCounters {
        self.counters
    }

    /// Outbound view snapshot with the loader's loading and error state.
    pub fn derived(&self, is_loading: bool, error: Option<String>) -> DerivedView {
        DerivedView {
            rows: Arc::clone(&self.rows),
            total_filtered: self.total_matched,
            is_loading,
            error,
        }
    }
}

/// Rows plus status for the host to render.
#[derive(Debug, Clone, PartialEq)]
pub struct DerivedView {
    pub rows: Arc<Vec<VirtualRow>>,
    pub total_filtered: usize,
    pub is_loading: bool,
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViewStatus {
    Loading,
    Failed(String),
    Empty,
    Ready,
}

impl DerivedView {
    /// Rows win over status: a view with data is `Ready` even while a
    /// refresh is in flight or after it failed.
    pub fn status(&self) -> ViewStatus {
        if !self.rows.is_empty() {
            return ViewStatus::Ready;
        }
        if self.is_loading {
            return ViewStatus::Loading;
        }
        match &self.error {
            Some(reason) => ViewStatus::Failed(reason.clone()),
            None => ViewStatus::Empty,
        }
    }
}
