use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::asset::AssetRecord;
use super::scope::ScopeKey;
use super::source::SourceSchedule;

/// Point-in-time batch of asset records plus per-source sync metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    pub generated_at: DateTime<Utc>,
    #[serde(default)]
    pub sources: Vec<SourceSchedule>,
    #[serde(default)]
    pub prices: Vec<AssetRecord>,
}

impl Snapshot {
    /// Keep only records and schedules whose source is in `scope`.
    pub fn restricted_to(&self, scope: &ScopeKey) -> Snapshot {
        Snapshot {
            generated_at: self.generated_at,
            sources: self
                .sources
                .iter()
                .filter(|s| scope.contains(&s.source_id))
                .cloned()
                .collect(),
            prices: self
                .prices
                .iter()
                .filter(|p| scope.contains(&p.source))
                .cloned()
                .collect(),
        }
    }

    /// Counts-only view of this snapshot.
    pub fn to_meta(&self) -> SnapshotMeta {
        let mut asset_counts: BTreeMap<String, usize> = BTreeMap::new();
        for price in &self.prices {
            *asset_counts.entry(price.source.clone()).or_default() += 1;
        }
        SnapshotMeta {
            total_assets: self.prices.len(),
            asset_counts,
            sources: self.sources.clone(),
            generated_at: self.generated_at,
        }
    }
}

/// Lightweight counts-only payload used for the instant first paint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotMeta {
    pub total_assets: usize,
    #[serde(default)]
    pub asset_counts: BTreeMap<String, usize>,
    #[serde(default)]
    pub sources: Vec<SourceSchedule>,
    pub generated_at: DateTime<Utc>,
}

impl SnapshotMeta {
    /// Sum of asset counts for the sources in `scope`.
    pub fn count_in(&self, scope: &ScopeKey) -> usize {
        scope
            .sources()
            .iter()
            .filter_map(|s| self.asset_counts.get(s))
            .sum()
    }
}
