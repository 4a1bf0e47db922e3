//! Progressive loader.
//!
//! Drives what gets fetched and when, without doing any I/O itself. Every
//! operation returns the [`FetchJob`]s the host must execute; the host hands
//! each outcome back through [`ProgressiveLoader::complete`]. Time is passed
//! in explicitly, so the whole state machine is testable without threads.
//!
//! Policy:
//! - `mount` asks for the metadata and the default category at once.
//! - When the first category resolves, every other category is queued for
//!   prefetch, one every `stagger`, released by `poll`.
//! - A stale active scope is refreshed in the background while its data stays
//!   on screen. Failed scopes are retried only by `retry`, or once the
//!   freshness window has passed since the failure while the scope is active.
//! - Reads never block: own data, else a cached superset filtered down, else
//!   metadata counts only.

use std::collections::{BTreeSet, HashMap, VecDeque};
use std::sync::Arc;
use std::time::{Duration, Instant};

use pricewall_core::catalog::Catalog;
use pricewall_core::data::DataError;
use pricewall_core::domain::{AssetRecord, ScopeKey, Snapshot, SnapshotMeta, SourceSchedule};

use crate::scope_cache::{Applied, LoadState, RequestId, ScopeCache};

/// What a fetch asks for.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum FetchTarget {
    Meta,
    Scope(ScopeKey),
}

/// Why a fetch was issued.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FetchPurpose {
    Active,
    Prefetch,
    Refresh,
    Retry,
}

/// One unit of work for the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchJob {
    pub id: RequestId,
    pub target: FetchTarget,
    pub purpose: FetchPurpose,
}

/// Successful fetch result as reported back by the host.
#[derive(Debug, Clone)]
pub enum FetchPayload {
    Meta(SnapshotMeta),
    Snapshot(Snapshot),
}

/// Which stage backs the current view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadStage {
    /// Counts only.
    Meta,
    /// Records for one category, or a subset of all sources.
    CategoryDetail,
    /// Records for every known source.
    Full,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoaderSettings {
    pub freshness: Duration,
    pub prefetch_stagger: Duration,
}

impl Default for LoaderSettings {
    fn default() -> Self {
        Self {
            freshness: Duration::from_secs(60),
            prefetch_stagger: Duration::from_millis(200),
        }
    }
}

/// The view the host should display right now.
#[derive(Debug, Clone)]
pub struct LoadedView {
    pub scope: ScopeKey,
    pub stage: LoadStage,
    /// Identity of `records`; changes whenever the record set changes.
    pub generation: u64,
    pub records: Arc<Vec<Arc<AssetRecord>>>,
    pub sources: Vec<SourceSchedule>,
    pub meta: Option<SnapshotMeta>,
    pub state: LoadState,
    pub is_loading: bool,
    pub error: Option<String>,
}

impl LoadedView {
    pub fn is_stale(&self) -> bool {
        self.state == LoadState::Stale
    }

    /// Expected asset count for the scope, from metadata. Useful before
    /// records arrive.
    pub fn expected_count(&self) -> Option<usize> {
        self.meta.as_ref().map(|m| m.count_in(&self.scope))
    }
}

#[derive(Debug, Clone)]
struct ViewMemo {
    active: ScopeKey,
    backing: Option<(ScopeKey, u64)>,
    generation: u64,
    records: Arc<Vec<Arc<AssetRecord>>>,
    sources: Vec<SourceSchedule>,
}

#[derive(Debug, Clone, PartialEq)]
struct ViewSignature {
    backing: Option<(ScopeKey, u64)>,
    state: LoadState,
    is_loading: bool,
    error: Option<String>,
    has_meta: bool,
}

#[derive(Debug)]
pub struct ProgressiveLoader {
    catalog: Arc<Catalog>,
    settings: LoaderSettings,
    cache: ScopeCache,
    next_id: RequestId,
    in_flight: HashMap<RequestId, (FetchTarget, FetchPurpose)>,

    meta: Option<SnapshotMeta>,
    meta_in_flight: Option<RequestId>,
    meta_error: Option<DataError>,
    disabled: BTreeSet<String>,

    active: ScopeKey,
    prefetch_scheduled: bool,
    prefetch_queue: VecDeque<(Instant, ScopeKey)>,

    view_generation: u64,
    memo: Option<ViewMemo>,
}

impl ProgressiveLoader {
    pub fn new(catalog: Arc<Catalog>, settings: LoaderSettings) -> Self {
        Self {
            catalog,
            settings,
            cache: ScopeCache::new(),
            next_id: 0,
            in_flight: HashMap::new(),
            meta: None,
            meta_in_flight: None,
            meta_error: None,
            disabled: BTreeSet::new(),
            active: ScopeKey::default(),
            prefetch_scheduled: false,
            prefetch_queue: VecDeque::new(),
            view_generation: 0,
            memo: None,
        }
    }

    pub fn settings(&self) -> LoaderSettings {
        self.settings
    }

    pub fn cache(&self) -> &ScopeCache {
        &self.cache
    }

    pub fn meta(&self) -> Option<&SnapshotMeta> {
        self.meta.as_ref()
    }

    pub fn active_scope(&self) -> &ScopeKey {
        &self.active
    }

    pub fn in_flight_count(&self) -> usize {
        self.in_flight.len()
    }

    pub fn pending_prefetches(&self) -> usize {
        self.prefetch_queue.len()
    }

    pub fn scope_state(&self, scope: &ScopeKey, now: Instant) -> LoadState {
        self.cache.state(scope, now, self.settings.freshness)
    }

    /// Request scope for a category, or for every known source when `None`.
    /// Sources the metadata reports as disabled are left out.
    pub fn scope_for(&self, category: Option<&str>) -> ScopeKey {
        let sources: Vec<&str> = match category {
            Some(id) => self.catalog.sources_in(id).iter().map(String::as_str).collect(),
            None => self.catalog.navigation_order(),
        };
        ScopeKey::new(
            sources
                .into_iter()
                .filter(|s| !self.disabled.contains(*s)),
        )
    }

    fn full_scope(&self) -> ScopeKey {
        self.scope_for(None)
    }

    fn issue(&mut self, target: FetchTarget, purpose: FetchPurpose) -> FetchJob {
        self.next_id += 1;
        let id = self.next_id;
        match &target {
            FetchTarget::Meta => self.meta_in_flight = Some(id),
            FetchTarget::Scope(scope) => self.cache.begin(scope, id),
        }
        tracing::debug!(id, ?target, ?purpose, "fetch issued");
        self.in_flight.insert(id, (target.clone(), purpose));
        FetchJob {
            id,
            target,
            purpose,
        }
    }

    /// Initial mount: metadata and the default category, concurrently.
    pub fn mount(&mut self, default_category: &str, now: Instant) -> Vec<FetchJob> {
        let mut jobs = Vec::new();
        jobs.extend(self.request_meta());
        let scope = self.scope_for(Some(default_category));
        jobs.extend(self.request(scope, now));
        jobs
    }

    /// Ask for metadata unless it is already cached or in flight.
    pub fn request_meta(&mut self) -> Option<FetchJob> {
        if self.meta.is_some() || self.meta_in_flight.is_some() {
            return None;
        }
        Some(self.issue(FetchTarget::Meta, FetchPurpose::Active))
    }

    /// Make `scope` the displayed scope. Returns a job only when the scope
    /// has never been requested, or its data went stale.
    pub fn request(&mut self, scope: ScopeKey, now: Instant) -> Option<FetchJob> {
        if self.active != scope {
            self.active = scope.clone();
            self.memo = None;
        }
        if scope.is_empty() {
            return None;
        }
        self.maintain_active(now)
    }

    /// Fire-and-forget fetch that only populates the cache.
    pub fn prefetch(&mut self, scope: ScopeKey) -> Option<FetchJob> {
        if scope.is_empty() || self.cache.get(&scope).is_some() {
            return None;
        }
        Some(self.issue(FetchTarget::Scope(scope), FetchPurpose::Prefetch))
    }

    /// Release prefetches that are due and keep the active scope fresh.
    pub fn poll(&mut self, now: Instant) -> Vec<FetchJob> {
        let mut jobs = Vec::new();
        while self
            .prefetch_queue
            .front()
            .is_some_and(|(due, _)| *due <= now)
        {
            if let Some((_, scope)) = self.prefetch_queue.pop_front() {
                jobs.extend(self.prefetch(scope));
            }
        }
        jobs.extend(self.maintain_active(now));
        jobs
    }

    /// Issue a refresh for a stale active scope, the first request for an
    /// unrequested one, or a retry once the window after a failure elapsed.
    fn maintain_active(&mut self, now: Instant) -> Option<FetchJob> {
        if self.active.is_empty() {
            return None;
        }
        let window = self.settings.freshness;
        let scope = self.active.clone();
        let Some(entry) = self.cache.get(&scope) else {
            return Some(self.issue(FetchTarget::Scope(scope), FetchPurpose::Active));
        };
        if entry.in_flight.is_some() {
            return None;
        }
        let failed_recently = entry.failed_at.is_some() && !entry.retry_due(now, window);
        match entry.state(now, window) {
            LoadState::Unrequested => Some(self.issue(FetchTarget::Scope(scope), FetchPurpose::Active)),
            LoadState::Stale if !failed_recently => {
                Some(self.issue(FetchTarget::Scope(scope), FetchPurpose::Refresh))
            }
            LoadState::Failed if !failed_recently => {
                Some(self.issue(FetchTarget::Scope(scope), FetchPurpose::Retry))
            }
            _ => None,
        }
    }

    /// Explicit user retry: re-request the active scope if it failed (or
    /// carries an error from a failed refresh), and the metadata if that failed.
    pub fn retry(&mut self, now: Instant) -> Vec<FetchJob> {
        let mut jobs = Vec::new();
        if self.meta.is_none() && self.meta_error.is_some() && self.meta_in_flight.is_none() {
            self.meta_error = None;
            jobs.push(self.issue(FetchTarget::Meta, FetchPurpose::Retry));
        }
        let scope = self.active.clone();
        let needs_retry = self.cache.get(&scope).is_some_and(|e| e.error.is_some())
            || self.scope_state(&scope, now) == LoadState::Failed;
        if needs_retry && !scope.is_empty() {
            jobs.push(self.issue(FetchTarget::Scope(scope), FetchPurpose::Retry));
        }
        jobs
    }

    /// Apply a finished job. Returns true when the displayed view changed.
    pub fn complete(
        &mut self,
        id: RequestId,
        result: Result<FetchPayload, DataError>,
        now: Instant,
    ) -> bool {
        let Some((target, purpose)) = self.in_flight.remove(&id) else {
            tracing::debug!(id, "ignoring response for unknown request");
            return false;
        };
        let before = self.signature(now);

        match (target, result) {
            (FetchTarget::Meta, result) => {
                if self.meta_in_flight != Some(id) {
                    tracing::debug!(id, "ignoring superseded meta response");
                    return false;
                }
                self.meta_in_flight = None;
                match result {
                    Ok(FetchPayload::Meta(meta)) => {
                        tracing::info!(id, total = meta.total_assets, "meta resolved");
                        self.disabled = meta
                            .sources
                            .iter()
                            .filter(|s| !s.is_requestable())
                            .map(|s| s.source_id.clone())
                            .collect();
                        self.meta = Some(meta);
                        self.meta_error = None;
                    }
                    Ok(FetchPayload::Snapshot(snapshot)) => {
                        self.meta = Some(snapshot.to_meta());
                        self.meta_error = None;
                    }
                    Err(e) => {
                        tracing::warn!(id, error = %e, "meta fetch failed");
                        self.meta_error = Some(e);
                    }
                }
            }
            (FetchTarget::Scope(scope), result) => {
                let applied = match result {
                    Ok(FetchPayload::Snapshot(snapshot)) => {
                        let count = snapshot.prices.len();
                        let applied = self.cache.resolve(&scope, id, snapshot, now);
                        if applied == Applied::Accepted {
                            tracing::info!(id, %scope, count, ?purpose, "scope resolved");
                            if !self.prefetch_scheduled {
                                self.schedule_prefetches(&scope, now);
                            }
                        }
                        applied
                    }
                    Ok(FetchPayload::Meta(_)) => {
                        let error = DataError::ResponseFormatChanged(
                            "expected snapshot, got metadata".into(),
                        );
                        self.cache.fail(&scope, id, error, now)
                    }
                    Err(e) => {
                        let applied = self.cache.fail(&scope, id, e.clone(), now);
                        if applied == Applied::Accepted {
                            tracing::warn!(id, %scope, error = %e, ?purpose, "scope fetch failed");
                        }
                        applied
                    }
                };
                if applied == Applied::Superseded {
                    tracing::debug!(id, %scope, "ignoring superseded response");
                    return false;
                }
            }
        }

        self.signature(now) != before
    }

    /// Queue every other category behind the one that just resolved.
    fn schedule_prefetches(&mut self, resolved: &ScopeKey, now: Instant) {
        self.prefetch_scheduled = true;
        let mut k: u32 = 0;
        let ids: Vec<String> = self.catalog.categories.iter().map(|c| c.id.clone()).collect();
        for id in ids {
            let scope = self.scope_for(Some(&id));
            if scope.is_empty() || &scope == resolved {
                continue;
            }
            k += 1;
            let due = now + self.settings.prefetch_stagger * k;
            self.prefetch_queue.push_back((due, scope));
        }
        tracing::debug!(queued = k, "prefetches scheduled");
    }

    fn backing(&self) -> Option<(ScopeKey, u64)> {
        if let Some(data) = self.cache.get(&self.active).and_then(|e| e.data.as_ref()) {
            return Some((self.active.clone(), data.generation));
        }
        self.cache
            .best_superset(&self.active)
            .map(|(key, data)| (key.clone(), data.generation))
    }

    fn signature(&self, now: Instant) -> ViewSignature {
        let entry = self.cache.get(&self.active);
        ViewSignature {
            backing: self.backing(),
            state: self.scope_state(&self.active, now),
            is_loading: entry.is_some_and(|e| e.in_flight.is_some() && e.data.is_none()),
            error: entry.and_then(|e| e.error.as_ref()).map(|e| e.to_string()),
            has_meta: self.meta.is_some(),
        }
    }

    /// Best available view of the active scope. Never blocks; records are
    /// only rebuilt when their backing data changed.
    pub fn view(&mut self, now: Instant) -> LoadedView {
        let backing = self.backing();
        let memo_valid = self
            .memo
            .as_ref()
            .is_some_and(|m| m.active == self.active && m.backing == backing);

        if !memo_valid {
            let (records, sources) = match &backing {
                Some((key, _)) if *key == self.active => self
                    .cache
                    .get(key)
                    .and_then(|e| e.data.as_ref())
                    .map(|d| (Arc::clone(&d.records), d.sources.clone()))
                    .unwrap_or_default(),
                Some((key, _)) => self
                    .cache
                    .get(key)
                    .and_then(|e| e.data.as_ref())
                    .map(|d| {
                        let sources = d
                            .sources
                            .iter()
                            .filter(|s| self.active.contains(&s.source_id))
                            .cloned()
                            .collect();
                        (Arc::new(d.restricted_to(&self.active)), sources)
                    })
                    .unwrap_or_default(),
                None => (Arc::new(Vec::new()), Vec::new()),
            };
            self.view_generation += 1;
            self.memo = Some(ViewMemo {
                active: self.active.clone(),
                backing: backing.clone(),
                generation: self.view_generation,
                records,
                sources,
            });
        }

        let sig = self.signature(now);
        let full = self.full_scope();
        let stage = match &backing {
            Some((key, _)) if full.is_subset_of(key) => LoadStage::Full,
            Some(_) => LoadStage::CategoryDetail,
            None => LoadStage::Meta,
        };
        let (generation, records, mut sources) = match &self.memo {
            Some(m) => (m.generation, Arc::clone(&m.records), m.sources.clone()),
            None => (0, Arc::new(Vec::new()), Vec::new()),
        };
        if sources.is_empty() {
            if let Some(meta) = &self.meta {
                sources = meta
                    .sources
                    .iter()
                    .filter(|s| self.active.contains(&s.source_id))
                    .cloned()
                    .collect();
            }
        }
        // Before the first scope request only the metadata can be in flight.
        let is_loading = sig.is_loading
            || (sig.backing.is_none() && sig.state == LoadState::Unrequested && self.meta_in_flight.is_some());

        LoadedView {
            scope: self.active.clone(),
            stage,
            generation,
            records,
            sources,
            meta: self.meta.clone(),
            state: sig.state,
            is_loading,
            error: sig.error.or_else(|| {
                if self.meta.is_none() && backing.is_none() {
                    self.meta_error.as_ref().map(|e| e.to_string())
                } else {
                    None
                }
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use pricewall_core::domain::AssetRecord;

    fn loader() -> ProgressiveLoader {
        ProgressiveLoader::new(
            Arc::new(Catalog::default_catalog()),
            LoaderSettings {
                freshness: Duration::from_secs(60),
                prefetch_stagger: Duration::from_millis(100),
            },
        )
    }

    fn snapshot_for(scope: &ScopeKey) -> Snapshot {
        Snapshot {
            generated_at: Utc::now(),
            sources: vec![],
            prices: scope
                .sources()
                .iter()
                .map(|s| AssetRecord {
                    source: s.clone(),
                    asset_id: format!("{s}-a"),
                    symbol: "A".into(),
                    name: "A".into(),
                    value: "1".into(),
                    change_pct: None,
                    market_cap: None,
                })
                .collect(),
        }
    }

    fn scope_job(jobs: &[FetchJob]) -> &FetchJob {
        jobs.iter()
            .find(|j| matches!(j.target, FetchTarget::Scope(_)))
            .unwrap()
    }

    #[test]
    fn mount_issues_meta_and_default_category() {
        let mut l = loader();
        let jobs = l.mount("crypto", Instant::now());
        assert_eq!(jobs.len(), 2);
        assert_eq!(jobs[0].target, FetchTarget::Meta);
        assert_eq!(
            jobs[1].target,
            FetchTarget::Scope(ScopeKey::new(["coingecko", "coinbase"]))
        );
        assert_eq!(jobs[1].purpose, FetchPurpose::Active);
    }

    #[test]
    fn mount_view_is_loading() {
        let mut l = loader();
        let t0 = Instant::now();
        l.mount("crypto", t0);
        let view = l.view(t0);
        assert!(view.is_loading);
        assert_eq!(view.stage, LoadStage::Meta);
        assert!(view.records.is_empty());
    }

    #[test]
    fn unknown_request_id_is_ignored() {
        let mut l = loader();
        let changed = l.complete(99, Err(DataError::Other("x".into())), Instant::now());
        assert!(!changed);
    }

    #[test]
    fn view_memo_keeps_generation_until_data_changes() {
        let mut l = loader();
        let t0 = Instant::now();
        let jobs = l.mount("crypto", t0);
        let job = scope_job(&jobs).clone();
        let FetchTarget::Scope(scope) = &job.target else { unreachable!() };
        assert!(l.complete(job.id, Ok(FetchPayload::Snapshot(snapshot_for(scope))), t0));

        let a = l.view(t0);
        let b = l.view(t0);
        assert_eq!(a.generation, b.generation);
        assert_eq!(a.records.len(), 2);
        assert_eq!(a.stage, LoadStage::CategoryDetail);
    }

    #[test]
    fn disabled_sources_leave_scopes() {
        use pricewall_core::domain::{SourceSchedule, SourceStatus};
        let mut l = loader();
        let t0 = Instant::now();
        let jobs = l.mount("crypto", t0);
        let meta = SnapshotMeta {
            total_assets: 0,
            asset_counts: Default::default(),
            sources: vec![SourceSchedule {
                source_id: "coinbase".into(),
                display_name: "Coinbase".into(),
                status: SourceStatus::Disabled,
                enabled: false,
                last_sync: None,
                estimated_next_update: None,
                sync_interval_secs: 60,
            }],
            generated_at: Utc::now(),
        };
        l.complete(jobs[0].id, Ok(FetchPayload::Meta(meta)), t0);
        assert_eq!(l.scope_for(Some("crypto")), ScopeKey::new(["coingecko"]));
    }
}
