//! Catalog: the single typed lookup structure for display rules.
//!
//! Holds the category groups shown as navigation tabs, source display names,
//! and per-source sub-taxonomies. The catalog is built once at startup (the
//! built-in default or a TOML file) and shared read-only by the classifier
//! and the grouping engine.
//!
//! A source maps to at most one category: if a source is ever listed under
//! two categories, the first one in catalog order wins.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::path::Path;
use thiserror::Error;

/// Errors raised while loading or validating a catalog.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("read catalog file: {0}")]
    Read(String),

    #[error("parse catalog TOML: {0}")]
    Parse(String),

    #[error("serialize catalog: {0}")]
    Serialize(String),

    #[error("duplicate category id '{0}'")]
    DuplicateCategory(String),

    #[error("taxonomy for '{source_id}' has an empty delimiter")]
    EmptyDelimiter { source_id: String },

    #[error("keyword rule '{category}' for '{source_id}' has no keywords")]
    EmptyRule { source_id: String, category: String },

    #[error("invalid keyword pattern for '{source_id}': {reason}")]
    InvalidPattern { source_id: String, reason: String },
}

/// A navigation category grouping one or more sources.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryGroup {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub icon: String,
    pub sources: Vec<String>,
}

/// Which delimited segment of an asset id carries the feed type.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SegmentPick {
    First,
    #[default]
    Last,
}

/// One ordered keyword rule of a natural-language taxonomy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeywordRule {
    pub category: String,
    pub label: String,
    pub keywords: Vec<String>,
}

/// Per-source sub-taxonomy. Sources without an entry are never sub-grouped.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Taxonomy {
    /// The asset id encodes a feed type: split on `delimiter`, pick a
    /// segment, map it through `labels`.
    IdSegment {
        delimiter: String,
        #[serde(default)]
        segment: SegmentPick,
        #[serde(default)]
        labels: BTreeMap<String, String>,
    },
    /// Free-text titles: the first rule whose keywords match wins.
    Keywords {
        rules: Vec<KeywordRule>,
        fallback: String,
        fallback_label: String,
    },
}

/// The complete catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Catalog {
    pub categories: Vec<CategoryGroup>,
    #[serde(default)]
    pub source_names: BTreeMap<String, String>,
    #[serde(default)]
    pub taxonomies: BTreeMap<String, Taxonomy>,
}

impl Default for Catalog {
    fn default() -> Self {
        Self::default_catalog()
    }
}

impl Catalog {
    /// Load a catalog from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, CatalogError> {
        let content =
            std::fs::read_to_string(path).map_err(|e| CatalogError::Read(e.to_string()))?;
        Self::from_toml(&content)
    }

    /// Parse and validate a catalog from a TOML string.
    pub fn from_toml(content: &str) -> Result<Self, CatalogError> {
        let catalog: Catalog =
            toml::from_str(content).map_err(|e| CatalogError::Parse(e.to_string()))?;
        catalog.validate()?;
        Ok(catalog)
    }

    /// Serialize the catalog to TOML.
    pub fn to_toml(&self) -> Result<String, CatalogError> {
        toml::to_string_pretty(self).map_err(|e| CatalogError::Serialize(e.to_string()))
    }

    pub fn validate(&self) -> Result<(), CatalogError> {
        let mut seen = HashSet::new();
        for group in &self.categories {
            if !seen.insert(group.id.as_str()) {
                return Err(CatalogError::DuplicateCategory(group.id.clone()));
            }
        }
        for (source_id, taxonomy) in &self.taxonomies {
            match taxonomy {
                Taxonomy::IdSegment { delimiter, .. } if delimiter.is_empty() => {
                    return Err(CatalogError::EmptyDelimiter {
                        source_id: source_id.clone(),
                    });
                }
                Taxonomy::Keywords { rules, .. } => {
                    if let Some(rule) = rules
                        .iter()
                        .find(|r| r.keywords.iter().all(|k| k.trim().is_empty()))
                    {
                        return Err(CatalogError::EmptyRule {
                            source_id: source_id.clone(),
                            category: rule.category.clone(),
                        });
                    }
                }
                _ => {}
            }
        }
        Ok(())
    }

    pub fn category(&self, id: &str) -> Option<&CategoryGroup> {
        self.categories.iter().find(|c| c.id == id)
    }

    /// The category a source belongs to. First match in catalog order wins.
    pub fn category_for_source(&self, source: &str) -> Option<&CategoryGroup> {
        self.categories
            .iter()
            .find(|c| c.sources.iter().any(|s| s == source))
    }

    /// Sources listed under a category, or an empty slice for unknown ids.
    pub fn sources_in(&self, category: &str) -> &[String] {
        self.category(category)
            .map(|c| c.sources.as_slice())
            .unwrap_or(&[])
    }

    /// Whether `source` belongs to `category` under first-match-wins.
    pub fn source_in_category(&self, source: &str, category: &str) -> bool {
        self.category_for_source(source)
            .is_some_and(|c| c.id == category)
    }

    /// All known sources in navigation order (category order, then listing
    /// order), each appearing once.
    pub fn navigation_order(&self) -> Vec<&str> {
        let mut seen = HashSet::new();
        self.categories
            .iter()
            .flat_map(|c| c.sources.iter())
            .filter(|s| seen.insert(s.as_str()))
            .map(|s| s.as_str())
            .collect()
    }

    /// Position of a source in navigation order, if known.
    pub fn navigation_rank(&self, source: &str) -> Option<usize> {
        self.navigation_order().iter().position(|s| *s == source)
    }

    /// Display name of a source, falling back to the raw id.
    pub fn source_name<'a>(&'a self, source: &'a str) -> &'a str {
        self.source_names
            .get(source)
            .map(|s| s.as_str())
            .unwrap_or(source)
    }

    pub fn taxonomy(&self, source: &str) -> Option<&Taxonomy> {
        self.taxonomies.get(source)
    }

    /// Display label for a known subcategory, `None` if the category is not
    /// in the source's dictionary.
    pub fn subcategory_label(&self, source: &str, category: &str) -> Option<&str> {
        match self.taxonomies.get(source)? {
            Taxonomy::IdSegment { labels, .. } => labels
                .values()
                .find(|label| label.as_str() == category)
                .map(|s| s.as_str()),
            Taxonomy::Keywords {
                rules,
                fallback,
                fallback_label,
            } => {
                if category == fallback {
                    return Some(fallback_label.as_str());
                }
                rules
                    .iter()
                    .find(|r| r.category == category)
                    .map(|r| r.label.as_str())
            }
        }
    }

    /// Built-in catalog covering the sources the public snapshot serves.
    pub fn default_catalog() -> Self {
        let group = |id: &str, name: &str, icon: &str, sources: &[&str]| CategoryGroup {
            id: id.into(),
            name: name.into(),
            icon: icon.into(),
            sources: sources.iter().map(|s| s.to_string()).collect(),
        };

        let categories = vec![
            group("crypto", "Crypto", "₿", &["coingecko", "coinbase"]),
            group("equities", "Stocks", "$", &["stocks", "etfs"]),
            group("oracles", "Oracles", "◎", &["pyth"]),
            group("predictions", "Predictions", "%", &["polymarket", "kalshi"]),
            group("weather", "Weather", "☁", &["weather"]),
            group("packages", "Packages", "⬢", &["npm", "pypi", "crates"]),
        ];

        let source_names = [
            ("coingecko", "CoinGecko"),
            ("coinbase", "Coinbase"),
            ("stocks", "US Stocks"),
            ("etfs", "ETFs"),
            ("pyth", "Pyth Network"),
            ("polymarket", "Polymarket"),
            ("kalshi", "Kalshi"),
            ("weather", "Weather Stations"),
            ("npm", "npm"),
            ("pypi", "PyPI"),
            ("crates", "crates.io"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();

        let labels = |pairs: &[(&str, &str)]| -> BTreeMap<String, String> {
            pairs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect()
        };

        let mut taxonomies = BTreeMap::new();
        taxonomies.insert(
            "weather".to_string(),
            Taxonomy::IdSegment {
                delimiter: ":".into(),
                segment: SegmentPick::Last,
                labels: labels(&[
                    ("temp", "Temperature"),
                    ("precip", "Precipitation"),
                    ("wind", "Wind Speed"),
                    ("humidity", "Humidity"),
                    ("pressure", "Pressure"),
                ]),
            },
        );
        taxonomies.insert(
            "pyth".to_string(),
            Taxonomy::IdSegment {
                delimiter: ".".into(),
                segment: SegmentPick::First,
                labels: labels(&[
                    ("Crypto", "Crypto"),
                    ("Equity", "Equities"),
                    ("FX", "Foreign Exchange"),
                    ("Metal", "Metals"),
                    ("Rates", "Rates"),
                    ("Commodities", "Commodities"),
                ]),
            },
        );
        taxonomies.insert("polymarket".to_string(), prediction_market_taxonomy());
        taxonomies.insert("kalshi".to_string(), prediction_market_taxonomy());

        Self {
            categories,
            source_names,
            taxonomies,
        }
    }
}

/// Ordered keyword rules for prediction-market titles.
///
/// Order is the tie-break: a title matching several rules takes the earliest.
fn prediction_market_taxonomy() -> Taxonomy {
    let rule = |category: &str, label: &str, keywords: &[&str]| KeywordRule {
        category: category.into(),
        label: label.into(),
        keywords: keywords.iter().map(|k| k.to_string()).collect(),
    };

    Taxonomy::Keywords {
        rules: vec![
            rule(
                "sports",
                "Sports",
                &[
                    "nfl", "nba", "mlb", "nhl", "ufc", "super bowl", "world cup", "world series",
                    "stanley cup", "premier league", "champions league", "grand prix", "f1",
                    "championship", "playoffs", "finals", "match",
                ],
            ),
            rule(
                "politics",
                "Politics",
                &[
                    "election", "president", "presidential", "senate", "congress", "governor",
                    "parliament", "prime minister", "nominee", "primary", "impeach", "vote",
                    "trump", "biden", "democrat", "republican",
                ],
            ),
            rule(
                "crypto",
                "Crypto",
                &[
                    "bitcoin", "btc", "ethereum", "eth", "solana", "sol", "crypto", "token",
                    "stablecoin", "etf approval", "halving",
                ],
            ),
            rule(
                "economics",
                "Economics",
                &[
                    "fed", "interest rate", "rate cut", "inflation", "cpi", "gdp", "recession",
                    "unemployment", "jobs report", "s&p 500", "nasdaq",
                ],
            ),
            rule(
                "tech",
                "Tech",
                &[
                    "openai", "gpt", "ai", "apple", "google", "microsoft", "nvidia", "tesla",
                    "spacex", "iphone", "launch",
                ],
            ),
            rule(
                "culture",
                "Culture",
                &[
                    "oscar", "oscars", "grammy", "emmy", "movie", "album", "box office", "billboard",
                    "netflix", "spotify",
                ],
            ),
            rule(
                "weather",
                "Weather & Climate",
                &["hurricane", "temperature", "snow", "rainfall", "heat", "climate"],
            ),
        ],
        fallback: "other".into(),
        fallback_label: "Other".into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_catalog_is_valid() {
        let c = Catalog::default_catalog();
        c.validate().unwrap();
        assert_eq!(c.categories.len(), 6);
        assert!(c.navigation_order().contains(&"npm"));
    }

    #[test]
    fn first_listing_wins_for_duplicated_source() {
        let mut c = Catalog::default_catalog();
        // List coingecko a second time under packages.
        c.categories[5].sources.push("coingecko".into());
        assert_eq!(c.category_for_source("coingecko").unwrap().id, "crypto");
        assert!(c.source_in_category("coingecko", "crypto"));
        assert!(!c.source_in_category("coingecko", "packages"));
        // And it still appears only once in navigation order.
        let order = c.navigation_order();
        assert_eq!(order.iter().filter(|s| **s == "coingecko").count(), 1);
    }

    #[test]
    fn toml_roundtrip() {
        let c = Catalog::default_catalog();
        let text = c.to_toml().unwrap();
        let parsed = Catalog::from_toml(&text).unwrap();
        assert_eq!(c, parsed);
    }

    #[test]
    fn rejects_duplicate_category_ids() {
        let text = r#"
            [[categories]]
            id = "a"
            name = "A"
            sources = ["x"]

            [[categories]]
            id = "a"
            name = "Again"
            sources = ["y"]
        "#;
        assert!(matches!(
            Catalog::from_toml(text),
            Err(CatalogError::DuplicateCategory(id)) if id == "a"
        ));
    }

    #[test]
    fn rejects_empty_keyword_rule() {
        let text = r#"
            [[categories]]
            id = "p"
            name = "P"
            sources = ["markets"]

            [taxonomies.markets]
            kind = "keywords"
            fallback = "other"
            fallback_label = "Other"

            [[taxonomies.markets.rules]]
            category = "sports"
            label = "Sports"
            keywords = ["  "]
        "#;
        assert!(matches!(
            Catalog::from_toml(text),
            Err(CatalogError::EmptyRule { .. })
        ));
    }

    #[test]
    fn subcategory_labels() {
        let c = Catalog::default_catalog();
        assert_eq!(c.subcategory_label("weather", "Temperature"), Some("Temperature"));
        assert_eq!(c.subcategory_label("weather", "visibility"), None);
        assert_eq!(c.subcategory_label("polymarket", "sports"), Some("Sports"));
        assert_eq!(c.subcategory_label("polymarket", "other"), Some("Other"));
        assert_eq!(c.subcategory_label("npm", "anything"), None);
    }

    #[test]
    fn source_name_falls_back_to_id() {
        let c = Catalog::default_catalog();
        assert_eq!(c.source_name("pypi"), "PyPI");
        assert_eq!(c.source_name("mystery"), "mystery");
    }
}
