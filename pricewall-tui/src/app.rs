//! Application state: single-owner, main-thread only.
//!
//! All TUI state lives here. Fetches run on the loader's worker; jobs the
//! state produces are queued in an outbox the event loop drains.

use std::collections::{HashMap, VecDeque};
use std::time::Instant;

use chrono::NaiveDateTime;

use pricewall_core::config::ViewConfig;
use pricewall_core::data::DataError;
use pricewall_loader::{FetchJob, FetchTarget, RequestId, ViewModel, WorkerResponse};

const MAX_ERROR_HISTORY: usize = 50;

/// One category tab. `category == None` is the "All" tab.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tab {
    pub category: Option<String>,
    pub label: String,
}

/// Status message severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusLevel {
    Info,
    Warning,
    Error,
}

/// Error category for display.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Network,
    Data,
    Other,
}

impl ErrorCategory {
    pub fn label(self) -> &'static str {
        match self {
            ErrorCategory::Network => "NET",
            ErrorCategory::Data => "DATA",
            ErrorCategory::Other => "ERR",
        }
    }

    fn of(err: &DataError) -> Self {
        match err {
            DataError::NetworkUnreachable(_)
            | DataError::RateLimited { .. }
            | DataError::CircuitBreakerTripped { .. }
            | DataError::HttpStatus { .. } => ErrorCategory::Network,
            DataError::ResponseFormatChanged(_) | DataError::Io(_) => ErrorCategory::Data,
            DataError::Other(_) => ErrorCategory::Other,
        }
    }
}

/// An error record for the error history overlay.
#[derive(Debug, Clone)]
pub struct ErrorRecord {
    pub timestamp: NaiveDateTime,
    pub category: ErrorCategory,
    pub message: String,
    pub context: String,
}

/// Active overlay (if any).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Overlay {
    None,
    Help,
    ErrorHistory,
}

pub struct AppState {
    pub running: bool,
    pub vm: ViewModel,
    pub tabs: Vec<Tab>,
    pub active_tab: usize,
    pub overlay: Overlay,

    // Search
    pub search_mode: bool,
    pub search_input: String,

    // Status and errors
    pub status_message: Option<(String, StatusLevel)>,
    pub error_history: VecDeque<ErrorRecord>,
    pub error_scroll: usize,

    view: ViewConfig,
    viewport: (u16, u16),
    outbox: Vec<FetchJob>,
    submitted: HashMap<RequestId, FetchTarget>,
}

impl AppState {
    pub fn new(vm: ViewModel, view: ViewConfig) -> Self {
        let mut tabs = vec![Tab {
            category: None,
            label: "All".into(),
        }];
        tabs.extend(vm.catalog().categories.iter().map(|c| Tab {
            category: Some(c.id.clone()),
            label: c.name.clone(),
        }));
        Self {
            running: true,
            vm,
            tabs,
            active_tab: 0,
            overlay: Overlay::None,
            search_mode: false,
            search_input: String::new(),
            status_message: None,
            error_history: VecDeque::new(),
            error_scroll: 0,
            view,
            viewport: (0, 0),
            outbox: Vec::new(),
            submitted: HashMap::new(),
        }
    }

    /// Start loading with `default_category` selected.
    pub fn mount(&mut self, default_category: &str, now: Instant) {
        self.active_tab = self
            .tabs
            .iter()
            .position(|t| t.category.as_deref() == Some(default_category))
            .unwrap_or(0);
        let jobs = self.vm.mount(default_category, now);
        self.outbox.extend(jobs);
    }

    /// Jobs queued since the last call. The caller submits them to the worker.
    pub fn take_outbox(&mut self) -> Vec<FetchJob> {
        for job in &self.outbox {
            self.submitted.insert(job.id, job.target.clone());
        }
        std::mem::take(&mut self.outbox)
    }

    pub fn queue(&mut self, jobs: impl IntoIterator<Item = FetchJob>) {
        self.outbox.extend(jobs);
    }

    // ── Tabs and sources ─────────────────────────────────────────────

    pub fn active(&self) -> &Tab {
        &self.tabs[self.active_tab]
    }

    pub fn select_tab(&mut self, index: usize, now: Instant) {
        if index >= self.tabs.len() || index == self.active_tab {
            return;
        }
        self.active_tab = index;
        let category = self.tabs[index].category.clone();
        let jobs = self.vm.select_category(category, now);
        self.outbox.extend(jobs);
    }

    pub fn next_tab(&mut self, now: Instant) {
        self.select_tab((self.active_tab + 1) % self.tabs.len(), now);
    }

    pub fn prev_tab(&mut self, now: Instant) {
        let n = self.tabs.len();
        self.select_tab((self.active_tab + n - 1) % n, now);
    }

    /// Sources reachable from the active tab, in navigation order.
    pub fn tab_sources(&self) -> Vec<String> {
        let catalog = self.vm.catalog();
        match &self.active().category {
            Some(category) => catalog.sources_in(category).to_vec(),
            None => catalog
                .navigation_order()
                .into_iter()
                .map(String::from)
                .collect(),
        }
    }

    /// Step the source filter: none → first source → … → last → none.
    pub fn cycle_source(&mut self, forward: bool, now: Instant) {
        let sources = self.tab_sources();
        if sources.is_empty() {
            return;
        }
        let current = self
            .vm
            .filters()
            .source
            .as_ref()
            .and_then(|s| sources.iter().position(|x| x == s));
        let next = match (current, forward) {
            (None, true) => Some(0),
            (None, false) => Some(sources.len() - 1),
            (Some(i), true) if i + 1 < sources.len() => Some(i + 1),
            (Some(i), false) if i > 0 => Some(i - 1),
            _ => None,
        };
        self.vm.select_source(next.map(|i| sources[i].clone()), now);
    }

    // ── Search ───────────────────────────────────────────────────────

    pub fn begin_search(&mut self) {
        self.search_mode = true;
        self.search_input = self.vm.filters().search.clone().unwrap_or_default();
    }

    pub fn push_search(&mut self, c: char, now: Instant) {
        self.search_input.push(c);
        self.vm.set_search(self.search_input.clone(), now);
    }

    pub fn pop_search(&mut self, now: Instant) {
        self.search_input.pop();
        self.vm.set_search(self.search_input.clone(), now);
    }

    pub fn cancel_search(&mut self, now: Instant) {
        self.search_mode = false;
        self.search_input.clear();
        self.vm.set_search("", now);
    }

    pub fn confirm_search(&mut self) {
        self.search_mode = false;
    }

    // ── Viewport ─────────────────────────────────────────────────────

    /// Grid area changed size.
    pub fn resize(&mut self, width: u16, height: u16, now: Instant) {
        if self.viewport == (width, height) {
            return;
        }
        self.viewport = (width, height);
        self.vm.resize(
            u32::from(width),
            u64::from(height),
            self.view.min_tile_width,
            self.view.max_columns,
            now,
        );
    }

    pub fn page(&self) -> i64 {
        i64::from(self.viewport.1.max(1))
    }

    // ── Loader plumbing ──────────────────────────────────────────────

    pub fn poll(&mut self, now: Instant) {
        let jobs = self.vm.poll(now);
        self.outbox.extend(jobs);
    }

    pub fn retry(&mut self, now: Instant) {
        let jobs = self.vm.retry(now);
        if jobs.is_empty() {
            self.set_status("Nothing to retry");
        } else {
            self.set_warning(format!("Retrying {} request(s)", jobs.len()));
        }
        self.outbox.extend(jobs);
    }

    /// Feed one worker response into the view model. Returns true when the
    /// screen needs a redraw.
    pub fn handle_response(&mut self, resp: WorkerResponse, now: Instant) -> bool {
        let WorkerResponse::Done {
            id,
            result,
            elapsed,
        } = resp;
        let target = self.submitted.remove(&id);
        let context = match &target {
            Some(FetchTarget::Meta) => "metadata".to_string(),
            Some(FetchTarget::Scope(scope)) => format!("sources {}", scope.query_value()),
            None => String::new(),
        };
        match &result {
            Ok(_) => tracing::debug!(id, ?elapsed, %context, "fetch finished"),
            Err(err) => {
                tracing::warn!(id, %err, %context, "fetch failed");
                self.push_error(ErrorCategory::of(err), err.to_string(), context);
            }
        }
        self.vm.complete(id, result, now)
    }

    // ── Status ───────────────────────────────────────────────────────

    /// Push an error to history and show it in the status bar.
    pub fn push_error(&mut self, category: ErrorCategory, message: String, context: String) {
        let record = ErrorRecord {
            timestamp: chrono::Local::now().naive_local(),
            category,
            message: message.clone(),
            context,
        };
        self.error_history.push_front(record);
        if self.error_history.len() > MAX_ERROR_HISTORY {
            self.error_history.pop_back();
        }
        self.status_message = Some((message, StatusLevel::Error));
    }

    pub fn set_status(&mut self, msg: impl Into<String>) {
        self.status_message = Some((msg.into(), StatusLevel::Info));
    }

    pub fn set_warning(&mut self, msg: impl Into<String>) {
        self.status_message = Some((msg.into(), StatusLevel::Warning));
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::sync::Arc;

    use pricewall_core::catalog::Catalog;
    use pricewall_core::classify::Classifier;
    use pricewall_core::data::SyntheticProvider;
    use pricewall_loader::worker::execute;
    use pricewall_loader::LoaderSettings;

    pub(crate) fn app() -> AppState {
        let catalog = Arc::new(Catalog::default_catalog());
        let classifier = Classifier::new(&catalog).unwrap();
        let view = ViewConfig::default();
        let vm = ViewModel::new(
            catalog,
            classifier,
            LoaderSettings::default(),
            view.size_model(),
            view.overscan,
        );
        AppState::new(vm, view)
    }

    /// Execute every queued job synchronously against a synthetic provider.
    pub(crate) fn drain(app: &mut AppState, provider: &SyntheticProvider, now: Instant) {
        loop {
            let jobs = app.take_outbox();
            if jobs.is_empty() {
                break;
            }
            for job in jobs {
                let result = execute(provider, &job.target);
                app.handle_response(
                    WorkerResponse::Done {
                        id: job.id,
                        result,
                        elapsed: std::time::Duration::ZERO,
                    },
                    now,
                );
            }
        }
    }

    pub(crate) fn provider() -> SyntheticProvider {
        SyntheticProvider::new(Catalog::default_catalog().navigation_order(), 12, 5)
    }

    #[test]
    fn tabs_start_with_all_then_categories() {
        let app = app();
        assert_eq!(app.tabs[0].label, "All");
        assert_eq!(app.tabs.len(), 1 + Catalog::default_catalog().categories.len());
    }

    #[test]
    fn mount_selects_default_tab_and_queues_jobs() {
        let mut app = app();
        app.mount("oracles", Instant::now());
        assert_eq!(app.active().category.as_deref(), Some("oracles"));
        assert_eq!(app.take_outbox().len(), 2);
    }

    #[test]
    fn tab_cycle_wraps() {
        let mut app = app();
        let now = Instant::now();
        app.prev_tab(now);
        assert_eq!(app.active_tab, app.tabs.len() - 1);
        app.next_tab(now);
        assert_eq!(app.active_tab, 0);
    }

    #[test]
    fn source_cycle_returns_to_none() {
        let mut app = app();
        let now = Instant::now();
        app.mount("crypto", now);
        app.cycle_source(true, now);
        assert_eq!(app.vm.filters().source.as_deref(), Some("coingecko"));
        app.cycle_source(true, now);
        assert_eq!(app.vm.filters().source.as_deref(), Some("coinbase"));
        app.cycle_source(true, now);
        assert_eq!(app.vm.filters().source, None);
        app.cycle_source(false, now);
        assert_eq!(app.vm.filters().source.as_deref(), Some("coinbase"));
    }

    #[test]
    fn failed_fetch_lands_in_history() {
        let mut app = app();
        let now = Instant::now();
        app.mount("weather", now);
        let provider = provider().with_failing_source("weather");
        drain(&mut app, &provider, now);
        assert_eq!(app.error_history.len(), 1);
        let record = &app.error_history[0];
        assert!(record.context.contains("weather"));
        assert!(matches!(app.status_message, Some((_, StatusLevel::Error))));
    }

    #[test]
    fn error_history_is_capped() {
        let mut app = app();
        for i in 0..(MAX_ERROR_HISTORY + 10) {
            app.push_error(ErrorCategory::Other, format!("e{i}"), String::new());
        }
        assert_eq!(app.error_history.len(), MAX_ERROR_HISTORY);
        assert_eq!(app.error_history[0].message, format!("e{}", MAX_ERROR_HISTORY + 9));
    }

    #[test]
    fn search_edits_filter_live() {
        let mut app = app();
        let now = Instant::now();
        app.begin_search();
        app.push_search('b', now);
        app.push_search('t', now);
        assert_eq!(app.vm.filters().search.as_deref(), Some("bt"));
        app.pop_search(now);
        assert_eq!(app.vm.filters().search.as_deref(), Some("b"));
        app.cancel_search(now);
        assert!(!app.search_mode);
        assert_eq!(app.vm.filters().search, None);
    }
}
