use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Sync health of an upstream source, as reported by the data provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceStatus {
    Healthy,
    Stale,
    Pending,
    Disabled,
}

impl SourceStatus {
    pub fn label(self) -> &'static str {
        match self {
            SourceStatus::Healthy => "healthy",
            SourceStatus::Stale => "stale",
            SourceStatus::Pending => "pending",
            SourceStatus::Disabled => "disabled",
        }
    }
}

/// Per-source sync schedule. Owned by the provider; read-only here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceSchedule {
    pub source_id: String,
    pub display_name: String,
    pub status: SourceStatus,
    pub enabled: bool,
    #[serde(default)]
    pub last_sync: Option<DateTime<Utc>>,
    #[serde(default)]
    pub estimated_next_update: Option<DateTime<Utc>>,
    pub sync_interval_secs: u64,
}

impl SourceSchedule {
    /// Whether this source should be included in data requests.
    pub fn is_requestable(&self) -> bool {
        self.enabled && self.status != SourceStatus::Disabled
    }
}
