//! View model: the loader and the view pipeline behind one facade.
//!
//! Hosts call the mutating operations (select a category, type a search,
//! resize, scroll, report a finished job) and read back a [`DerivedView`]
//! plus a [`VirtualWindow`]. Transient filter state lives here and is never
//! persisted.

use std::sync::Arc;
use std::time::Instant;

use pricewall_core::catalog::Catalog;
use pricewall_core::classify::Classifier;
use pricewall_core::data::DataError;
use pricewall_core::flatten::{columns_for_width, Filters, VirtualRow};
use pricewall_core::pipeline::{DerivedView, PipelineCounters, ViewPipeline};
use pricewall_core::virtualize::{SizeModel, VirtualWindow};

use crate::loader::{FetchJob, FetchPayload, LoadedView, LoaderSettings, ProgressiveLoader};
use crate::scope_cache::RequestId;

pub struct ViewModel {
    catalog: Arc<Catalog>,
    loader: ProgressiveLoader,
    pipeline: ViewPipeline,
    filters: Filters,
    columns: usize,
    sizes: SizeModel,
    scroll: u64,
    viewport: u64,
    loaded: Option<LoadedView>,
}

impl ViewModel {
    pub fn new(
        catalog: Arc<Catalog>,
        classifier: Classifier,
        settings: LoaderSettings,
        sizes: SizeModel,
        overscan: usize,
    ) -> Self {
        Self {
            loader: ProgressiveLoader::new(Arc::clone(&catalog), settings),
            pipeline: ViewPipeline::new(Arc::clone(&catalog), classifier).with_overscan(overscan),
            catalog,
            filters: Filters::default(),
            columns: 1,
            sizes,
            scroll: 0,
            viewport: 0,
            loaded: None,
        }
    }

    /// Recompute whatever the last change invalidated.
    fn sync(&mut self, now: Instant) {
        let loaded = self.loader.view(now);
        self.pipeline.update(
            loaded.generation,
            &loaded.records,
            &self.filters,
            self.columns,
            self.sizes,
        );
        self.loaded = Some(loaded);
    }

    pub fn mount(&mut self, default_category: &str, now: Instant) -> Vec<FetchJob> {
        self.filters.category = Some(default_category.to_string());
        let jobs = self.loader.mount(default_category, now);
        self.sync(now);
        jobs
    }

    /// Switch category (`None` shows every source). Clears the source
    /// filter and scrolls back to the top.
    pub fn select_category(&mut self, category: Option<String>, now: Instant) -> Vec<FetchJob> {
        let scope = self.loader.scope_for(category.as_deref());
        self.filters.category = category;
        self.filters.source = None;
        self.scroll = 0;
        let jobs = self.loader.request(scope, now).into_iter().collect();
        self.sync(now);
        jobs
    }

    pub fn select_source(&mut self, source: Option<String>, now: Instant) {
        self.filters.source = source;
        self.scroll = 0;
        self.sync(now);
    }

    pub fn set_search(&mut self, text: impl Into<String>, now: Instant) {
        let text = text.into();
        self.filters.search = if text.trim().is_empty() { None } else { Some(text) };
        self.scroll = 0;
        self.sync(now);
    }

    pub fn set_columns(&mut self, columns: usize, now: Instant) {
        self.columns = columns.max(1);
        self.sync(now);
    }

    pub fn set_sizes(&mut self, sizes: SizeModel, now: Instant) {
        self.sizes = sizes;
        self.sync(now);
    }

    /// Viewport resize: width drives the column count, height the window.
    pub fn resize(&mut self, width: u32, height: u64, min_tile_width: u32, max_columns: usize, now: Instant) {
        self.viewport = height;
        self.set_columns(columns_for_width(width, min_tile_width, max_columns), now);
    }

    pub fn set_viewport(&mut self, height: u64) {
        self.viewport = height;
    }

    pub fn scroll_by(&mut self, delta: i64) {
        let max = self.max_scroll();
        self.scroll = self.scroll.saturating_add_signed(delta).min(max);
    }

    pub fn scroll_to(&mut self, offset: u64) {
        self.scroll = offset.min(self.max_scroll());
    }

    pub fn scroll_to_end(&mut self) {
        self.scroll = self.max_scroll();
    }

    fn max_scroll(&self) -> u64 {
        self.pipeline
            .offsets()
            .total_extent()
            .saturating_sub(self.viewport)
    }

    pub fn scroll(&self) -> u64 {
        self.scroll
    }

    pub fn poll(&mut self, now: Instant) -> Vec<FetchJob> {
        let jobs = self.loader.poll(now);
        if !jobs.is_empty() {
            self.sync(now);
        }
        jobs
    }

    pub fn retry(&mut self, now: Instant) -> Vec<FetchJob> {
        let jobs = self.loader.retry(now);
        self.sync(now);
        jobs
    }

    /// Report a finished job. Returns true when the displayed view changed.
    pub fn complete(
        &mut self,
        id: RequestId,
        result: Result<FetchPayload, DataError>,
        now: Instant,
    ) -> bool {
        let changed = self.loader.complete(id, result, now);
        if changed {
            self.sync(now);
            self.scroll = self.scroll.min(self.max_scroll());
        }
        changed
    }

    pub fn derived(&self) -> DerivedView {
        let (is_loading, error) = self
            .loaded
            .as_ref()
            .map_or((false, None), |l| (l.is_loading, l.error.clone()));
        self.pipeline.derived(is_loading, error)
    }

    pub fn window(&self) -> VirtualWindow {
        self.pipeline.window(self.scroll, self.viewport)
    }

    pub fn rows(&self) -> &[VirtualRow] {
        self.pipeline.rows()
    }

    pub fn loaded(&self) -> Option<&LoadedView> {
        self.loaded.as_ref()
    }

    pub fn loader(&self) -> &ProgressiveLoader {
        &self.loader
    }

    pub fn filters(&self) -> &Filters {
        &self.filters
    }

    pub fn columns(&self) -> usize {
        self.columns
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn counters(&self) -> PipelineCounters {
        self.pipeline.counters()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::worker::execute;
    use pricewall_core::data::SyntheticProvider;
    use pricewall_core::pipeline::ViewStatus;

    fn model() -> ViewModel {
        let catalog = Arc::new(Catalog::default_catalog());
        let classifier = Classifier::new(&catalog).unwrap();
        ViewModel::new(
            catalog,
            classifier,
            LoaderSettings::default(),
            SizeModel::new(2, 1, 3),
            2,
        )
    }

    fn run(model: &mut ViewModel, provider: &SyntheticProvider, jobs: Vec<FetchJob>, now: Instant) {
        for job in jobs {
            let result = execute(provider, &job.target);
            model.complete(job.id, result, now);
        }
    }

    #[test]
    fn mount_then_resolve_shows_rows() {
        let provider = SyntheticProvider::new(
            Catalog::default_catalog().navigation_order(),
            10,
            3,
        );
        let mut m = model();
        let t0 = Instant::now();
        m.resize(120, 30, 26, 8, t0);
        let jobs = m.mount("crypto", t0);
        assert_eq!(m.derived().status(), ViewStatus::Loading);

        run(&mut m, &provider, jobs, t0);
        let view = m.derived();
        assert_eq!(view.status(), ViewStatus::Ready);
        assert_eq!(view.total_filtered, 20);
        assert_eq!(m.columns(), 4);
        assert!(!m.window().visible.is_empty());
    }

    #[test]
    fn clock_and_scroll_do_not_touch_pipeline() {
        let provider = SyntheticProvider::new(["coingecko", "coinbase"], 200, 3);
        let mut m = model();
        let t0 = Instant::now();
        m.resize(80, 20, 26, 8, t0);
        let jobs = m.mount("crypto", t0);
        run(&mut m, &provider, jobs, t0);

        let before = m.counters();
        for _ in 0..50 {
            m.scroll_by(7);
            let _ = m.window();
        }
        // Polling with nothing due changes nothing either.
        assert!(m.poll(t0).is_empty());
        assert_eq!(m.counters(), before);
    }

    #[test]
    fn search_blank_is_no_filter() {
        let mut m = model();
        let t0 = Instant::now();
        m.set_search("   ", t0);
        assert_eq!(m.filters().search, None);
        m.set_search("btc", t0);
        assert_eq!(m.filters().search.as_deref(), Some("btc"));
    }

    #[test]
    fn scroll_is_clamped() {
        let provider = SyntheticProvider::new(["npm"], 40, 3);
        let mut m = model();
        let t0 = Instant::now();
        m.resize(26, 10, 26, 8, t0);
        let jobs = m.mount("packages", t0);
        run(&mut m, &provider, jobs, t0);
        m.scroll_by(-5);
        assert_eq!(m.scroll(), 0);
        m.scroll_by(1_000_000);
        // 1 header (2) + 40 tile rows (3 each) = 122, viewport 10.
        assert_eq!(m.scroll(), 112);
    }
}
