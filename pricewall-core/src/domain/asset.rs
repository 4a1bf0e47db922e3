use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// One priced asset as delivered by the snapshot endpoint.
///
/// Numeric fields stay as strings on the wire; they are parsed on read with
/// [`parse_numeric`], which never fails.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetRecord {
    pub source: String,
    pub asset_id: String,
    pub symbol: String,
    pub name: String,
    pub value: String,
    #[serde(default)]
    pub change_pct: Option<String>,
    #[serde(default)]
    pub market_cap: Option<String>,
}

impl AssetRecord {
    /// Identity of the record: `(source, asset_id)`.
    pub fn key(&self) -> (&str, &str) {
        (&self.source, &self.asset_id)
    }

    pub fn value_f64(&self) -> f64 {
        parse_numeric(&self.value)
    }

    pub fn change_pct_f64(&self) -> Option<f64> {
        self.change_pct.as_deref().map(parse_numeric)
    }

    pub fn market_cap_f64(&self) -> Option<f64> {
        self.market_cap.as_deref().map(parse_numeric)
    }

    /// Ranking key used inside a source group: market cap when present,
    /// otherwise the value.
    pub fn rank_key(&self) -> f64 {
        match self.market_cap.as_deref() {
            Some(cap) => parse_numeric(cap),
            None => self.value_f64(),
        }
    }
}

/// Parse a numeric string. Anything unparseable or non-finite is `0.0`.
pub fn parse_numeric(raw: &str) -> f64 {
    match raw.trim().parse::<f64>() {
        Ok(v) if v.is_finite() => v,
        _ => 0.0,
    }
}

/// An asset record with its derived category.
///
/// The record is shared, never copied or mutated by classification.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassifiedAsset {
    pub record: Arc<AssetRecord>,
    pub category: Option<String>,
}

impl ClassifiedAsset {
    pub fn new(record: Arc<AssetRecord>, category: Option<String>) -> Self {
        Self { record, category }
    }

    pub fn source(&self) -> &str {
        &self.record.source
    }

    pub fn asset_id(&self) -> &str {
        &self.record.asset_id
    }

    pub fn symbol(&self) -> &str {
        &self.record.symbol
    }

    pub fn name(&self) -> &str {
        &self.record.name
    }
}
