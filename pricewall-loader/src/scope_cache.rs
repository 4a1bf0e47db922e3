//! Scope-keyed snapshot cache.
//!
//! One entry per [`ScopeKey`]. Entries are created on first request and then
//! only ever updated: data is replaced by newer data, never removed, so a
//! scope that resolved once stays displayable for the rest of the session.
//!
//! Every entry tracks the id of its in-flight request. A response is applied
//! only if it carries that id; anything else is a superseded response.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};

use pricewall_core::data::DataError;
use pricewall_core::domain::{AssetRecord, ScopeKey, Snapshot, SourceSchedule};

pub type RequestId = u64;

/// Lifecycle of one scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadState {
    Unrequested,
    Pending,
    Resolved,
    /// Data older than the freshness window. Still displayable.
    Stale,
    /// No data and the last request failed.
    Failed,
}

impl LoadState {
    pub fn has_data(self) -> bool {
        matches!(self, LoadState::Resolved | LoadState::Stale)
    }
}

/// Records of one resolved scope.
#[derive(Debug, Clone)]
pub struct ScopeData {
    pub records: Arc<Vec<Arc<AssetRecord>>>,
    pub sources: Vec<SourceSchedule>,
    pub generated_at: DateTime<Utc>,
    /// Cache-wide unique stamp; changes whenever the records change.
    pub generation: u64,
}

impl ScopeData {
    /// Records restricted to a narrower scope.
    pub fn restricted_to(&self, scope: &ScopeKey) -> Vec<Arc<AssetRecord>> {
        self.records
            .iter()
            .filter(|r| scope.contains(&r.source))
            .cloned()
            .collect()
    }
}

#[derive(Debug, Clone, Default)]
pub struct ScopeEntry {
    pub data: Option<ScopeData>,
    pub resolved_at: Option<Instant>,
    pub in_flight: Option<RequestId>,
    pub error: Option<DataError>,
    pub failed_at: Option<Instant>,
}

impl ScopeEntry {
    pub fn state(&self, now: Instant, freshness: Duration) -> LoadState {
        match (&self.data, self.resolved_at) {
            (Some(_), Some(at)) if now.saturating_duration_since(at) < freshness => {
                LoadState::Resolved
            }
            (Some(_), _) => LoadState::Stale,
            (None, _) if self.in_flight.is_some() => LoadState::Pending,
            (None, _) if self.error.is_some() => LoadState::Failed,
            (None, _) => LoadState::Unrequested,
        }
    }

    /// Whether the refresh window has passed since the last failure.
    pub fn retry_due(&self, now: Instant, window: Duration) -> bool {
        self.in_flight.is_none()
            && self
                .failed_at
                .is_some_and(|at| now.saturating_duration_since(at) >= window)
    }
}

/// Outcome of applying a response to the cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Applied {
    Accepted,
    /// The id was not the scope's current in-flight request.
    Superseded,
}

#[derive(Debug, Default)]
pub struct ScopeCache {
    entries: HashMap<ScopeKey, ScopeEntry>,
    next_generation: u64,
}

impl ScopeCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, scope: &ScopeKey) -> Option<&ScopeEntry> {
        self.entries.get(scope)
    }

    pub fn state(&self, scope: &ScopeKey, now: Instant, freshness: Duration) -> LoadState {
        self.entries
            .get(scope)
            .map_or(LoadState::Unrequested, |e| e.state(now, freshness))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn scopes(&self) -> impl Iterator<Item = &ScopeKey> {
        self.entries.keys()
    }

    /// Record a request as in flight. A previous in-flight id for the same
    /// scope is superseded.
    pub fn begin(&mut self, scope: &ScopeKey, id: RequestId) {
        self.entries.entry(scope.clone()).or_default().in_flight = Some(id);
    }

    pub fn resolve(
        &mut self,
        scope: &ScopeKey,
        id: RequestId,
        snapshot: Snapshot,
        now: Instant,
    ) -> Applied {
        let Some(entry) = self.entries.get_mut(scope) else {
            return Applied::Superseded;
        };
        if entry.in_flight != Some(id) {
            return Applied::Superseded;
        }
        self.next_generation += 1;
        entry.data = Some(ScopeData {
            records: Arc::new(snapshot.prices.into_iter().map(Arc::new).collect()),
            sources: snapshot.sources,
            generated_at: snapshot.generated_at,
            generation: self.next_generation,
        });
        entry.resolved_at = Some(now);
        entry.in_flight = None;
        entry.error = None;
        entry.failed_at = None;
        Applied::Accepted
    }

    /// Record a failure. Existing data is kept.
    pub fn fail(&mut self, scope: &ScopeKey, id: RequestId, error: DataError, now: Instant) -> Applied {
        let Some(entry) = self.entries.get_mut(scope) else {
            return Applied::Superseded;
        };
        if entry.in_flight != Some(id) {
            return Applied::Superseded;
        }
        entry.in_flight = None;
        entry.error = Some(error);
        entry.failed_at = Some(now);
        Applied::Accepted
    }

    /// Smallest scope with data that covers `scope`, excluding `scope`
    /// itself. Ties go to the lowest key so the choice is stable.
    pub fn best_superset(&self, scope: &ScopeKey) -> Option<(&ScopeKey, &ScopeData)> {
        self.entries
            .iter()
            .filter(|(key, _)| *key != scope && scope.is_subset_of(key))
            .filter_map(|(key, entry)| entry.data.as_ref().map(|d| (key, d)))
            .min_by(|(a, _), (b, _)| a.len().cmp(&b.len()).then_with(|| a.cmp(b)))
    }
}
