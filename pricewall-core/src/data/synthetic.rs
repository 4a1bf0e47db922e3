//! Deterministic synthetic snapshots for offline use, demos and benchmarks.
//!
//! Each source gets its own `StdRng` seeded from the blake3 hash of the
//! provider seed and the source id, so a source's records do not depend on
//! which other sources are requested alongside it. The generated ids and
//! titles follow the shape of the real feeds, so the classifier sub-groups
//! them the same way.

use std::collections::BTreeSet;

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::provider::{DataError, SnapshotProvider};
use crate::domain::{AssetRecord, ScopeKey, Snapshot, SnapshotMeta, SourceSchedule, SourceStatus};

const WEATHER_KINDS: &[&str] = &["temp", "precip", "wind", "humidity", "pressure", "visibility"];
const CITIES: &[&str] = &[
    "New York", "Chicago", "Denver", "Seattle", "Miami", "Boston", "Austin", "Phoenix",
];
const PYTH_CLASSES: &[&str] = &["Crypto", "Equity", "FX", "Metal", "Rates", "Commodities"];
const MARKET_TITLES: &[&str] = &[
    "Will the {} win the NBA Finals?",
    "Will {} win the presidential election?",
    "Will Bitcoin close above ${}k this month?",
    "Will the Fed announce a rate cut in {}?",
    "Will OpenAI release a new model before {}?",
    "Will {} top the Billboard chart?",
    "Will a hurricane make landfall in {}?",
    "Will {} happen this year?",
];
const FILLERS: &[&str] = &["Texas", "June", "2027", "Taylor", "Lakers", "Ohio", "March", "Nova"];

#[derive(Debug, Clone)]
pub struct SyntheticProvider {
    sources: Vec<String>,
    assets_per_source: usize,
    seed: u64,
    generated_at: DateTime<Utc>,
    failing: BTreeSet<String>,
}

impl SyntheticProvider {
    pub fn new<I, S>(sources: I, assets_per_source: usize, seed: u64) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            sources: sources.into_iter().map(Into::into).collect(),
            assets_per_source,
            seed,
            generated_at: Utc::now(),
            failing: BTreeSet::new(),
        }
    }

    pub fn with_generated_at(mut self, at: DateTime<Utc>) -> Self {
        self.generated_at = at;
        self
    }

    /// Make every fetch touching `source` fail, for exercising error paths.
    pub fn with_failing_source(mut self, source: impl Into<String>) -> Self {
        self.failing.insert(source.into());
        self
    }

    fn rng_for(&self, source: &str) -> StdRng {
        let seed_bytes = blake3::hash(format!("{}:{source}", self.seed).as_bytes());
        StdRng::from_seed(*seed_bytes.as_bytes())
    }

    fn schedule(&self, source: &str) -> SourceSchedule {
        SourceSchedule {
            source_id: source.to_string(),
            display_name: source.to_string(),
            status: SourceStatus::Healthy,
            enabled: true,
            last_sync: Some(self.generated_at),
            estimated_next_update: Some(self.generated_at + ChronoDuration::seconds(60)),
            sync_interval_secs: 60,
        }
    }

    /// Records for one source.
    pub fn generate_source(&self, source: &str) -> Vec<AssetRecord> {
        let mut rng = self.rng_for(source);
        (0..self.assets_per_source)
            .map(|i| generate_asset(&mut rng, source, i))
            .collect()
    }

    fn selected<'a>(&'a self, scope: &'a ScopeKey) -> impl Iterator<Item = &'a String> + 'a {
        self.sources
            .iter()
            .filter(move |s| scope.is_empty() || scope.contains(s))
    }
}

fn generate_asset(rng: &mut StdRng, source: &str, i: usize) -> AssetRecord {
    let change: f64 = rng.gen_range(-12.0..12.0);
    let (asset_id, symbol, name, value, market_cap) = match source {
        "weather" => {
            let kind = WEATHER_KINDS[rng.gen_range(0..WEATHER_KINDS.len())];
            let city = CITIES[rng.gen_range(0..CITIES.len())];
            let station = format!("K{}", ticker(rng, 3));
            let value = match kind {
                "temp" => rng.gen_range(-10.0..40.0),
                "humidity" => rng.gen_range(10.0..100.0),
                "pressure" => rng.gen_range(980.0..1040.0),
                _ => rng.gen_range(0.0..50.0),
            };
            (
                format!("{station}-{i}:{kind}"),
                station,
                format!("{city} {kind}"),
                value,
                None,
            )
        }
        "pyth" => {
            let class = PYTH_CLASSES[rng.gen_range(0..PYTH_CLASSES.len())];
            let sym = ticker(rng, 3);
            (
                format!("{class}.{sym}{i}/USD"),
                format!("{sym}/USD"),
                format!("{sym} / US Dollar"),
                rng.gen_range(0.01..5_000.0),
                None,
            )
        }
        "polymarket" | "kalshi" => {
            let template = MARKET_TITLES[rng.gen_range(0..MARKET_TITLES.len())];
            let filler = FILLERS[rng.gen_range(0..FILLERS.len())];
            (
                format!("{source}-market-{i}"),
                format!("M{i}"),
                template.replace("{}", filler),
                rng.gen_range(0.01..0.99),
                Some(rng.gen_range(1_000.0..5_000_000.0)),
            )
        }
        "npm" | "pypi" | "crates" => {
            let pkg = ticker(rng, 6).to_lowercase();
            (
                format!("{pkg}-{i}"),
                pkg.clone(),
                format!("{pkg} package"),
                rng.gen_range(100.0..50_000_000.0f64).round(),
                None,
            )
        }
        _ => {
            let sym = ticker(rng, 4);
            let price: f64 = rng.gen_range(0.5..2_000.0);
            (
                format!("{}-{i}", sym.to_lowercase()),
                sym.clone(),
                format!("{sym} Holdings"),
                price,
                Some(price * rng.gen_range(1e6..5e9)),
            )
        }
    };

    AssetRecord {
        source: source.to_string(),
        asset_id,
        symbol,
        name,
        value: format!("{value:.4}"),
        change_pct: Some(format!("{change:.2}")),
        market_cap: market_cap.map(|c: f64| format!("{c:.0}")),
    }
}

fn ticker(rng: &mut StdRng, len: usize) -> String {
    (0..len)
        .map(|_| char::from(b'A' + rng.gen_range(0..26u8)))
        .collect()
}

impl SnapshotProvider for SyntheticProvider {
    fn name(&self) -> &str {
        "synthetic"
    }

    fn fetch_meta(&self) -> Result<SnapshotMeta, DataError> {
        let sources: Vec<SourceSchedule> = self.sources.iter().map(|s| self.schedule(s)).collect();
        Ok(SnapshotMeta {
            total_assets: self.sources.len() * self.assets_per_source,
            asset_counts: self
                .sources
                .iter()
                .map(|s| (s.clone(), self.assets_per_source))
                .collect(),
            sources,
            generated_at: self.generated_at,
        })
    }

    fn fetch_snapshot(&self, scope: &ScopeKey) -> Result<Snapshot, DataError> {
        if let Some(bad) = self.selected(scope).find(|s| self.failing.contains(*s)) {
            return Err(DataError::Other(format!("synthetic failure for source '{bad}'")));
        }
        let mut prices = Vec::new();
        let mut sources = Vec::new();
        for source in self.selected(scope) {
            prices.extend(self.generate_source(source));
            sources.push(self.schedule(source));
        }
        Ok(Snapshot {
            generated_at: self.generated_at,
            sources,
            prices,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Catalog;
    use crate::classify::Classifier;

    fn provider() -> SyntheticProvider {
        SyntheticProvider::new(["coingecko", "weather", "polymarket", "npm"], 25, 7)
    }

    #[test]
    fn deterministic_per_source() {
        let a = provider().generate_source("weather");
        let b = provider().generate_source("weather");
        assert_eq!(a, b);
        assert_ne!(a, provider().generate_source("npm"));
    }

    #[test]
    fn source_data_independent_of_scope() {
        let p = provider();
        let alone = p.fetch_snapshot(&ScopeKey::new(["npm"])).unwrap();
        let both = p.fetch_snapshot(&ScopeKey::new(["npm", "weather"])).unwrap();
        let npm_in_both: Vec<_> = both.prices.into_iter().filter(|r| r.source == "npm").collect();
        assert_eq!(alone.prices, npm_in_both);
    }

    #[test]
    fn meta_matches_snapshot() {
        let p = provider();
        let meta = p.fetch_meta().unwrap();
        let full = p.fetch_snapshot(&ScopeKey::default()).unwrap();
        assert_eq!(meta.total_assets, full.prices.len());
        assert_eq!(meta.asset_counts, full.to_meta().asset_counts);
    }

    #[test]
    fn ids_are_classifiable() {
        let p = provider();
        let classifier = Classifier::new(&Catalog::default_catalog()).unwrap();
        let weather = p.generate_source("weather");
        assert!(weather.iter().all(|r| classifier.classify(r).is_some()));
    }

    #[test]
    fn failing_source_errors_only_when_requested() {
        let p = provider().with_failing_source("npm");
        assert!(p.fetch_snapshot(&ScopeKey::new(["npm"])).is_err());
        assert!(p.fetch_snapshot(&ScopeKey::new(["weather"])).is_ok());
    }
}
