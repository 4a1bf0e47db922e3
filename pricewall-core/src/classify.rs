//! Classifier: maps an asset record to its subcategory label.
//!
//! Three strategies, selected per source by the catalog:
//! - no taxonomy: always `None`, the asset stays directly under its source
//! - id segment: split the asset id on a fixed delimiter, pick a segment and
//!   map it through a dictionary; unknown segments pass through verbatim
//! - keywords: ordered rules over the free-text name; first match wins,
//!   no match lands in the fallback bucket
//!
//! Classification is pure. A `Classifier` compiles its keyword patterns once
//! and is then immutable, so calling it repeatedly or in any order always
//! yields the same answer for the same record.

use regex::{Regex, RegexBuilder};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use crate::catalog::{Catalog, CatalogError, SegmentPick, Taxonomy};
use crate::domain::{AssetRecord, ClassifiedAsset};

#[derive(Debug, Clone)]
enum CompiledTaxonomy {
    IdSegment {
        delimiter: String,
        segment: SegmentPick,
        labels: BTreeMap<String, String>,
    },
    Keywords {
        rules: Vec<(String, Regex)>,
        fallback: String,
    },
}

/// Compiled, read-only classifier built from a [`Catalog`].
#[derive(Debug, Clone)]
pub struct Classifier {
    taxonomies: HashMap<String, CompiledTaxonomy>,
}

impl Classifier {
    pub fn new(catalog: &Catalog) -> Result<Self, CatalogError> {
        let mut taxonomies = HashMap::with_capacity(catalog.taxonomies.len());
        for (source_id, taxonomy) in &catalog.taxonomies {
            let compiled = match taxonomy {
                Taxonomy::IdSegment {
                    delimiter,
                    segment,
                    labels,
                } => CompiledTaxonomy::IdSegment {
                    delimiter: delimiter.clone(),
                    segment: *segment,
                    labels: labels.clone(),
                },
                Taxonomy::Keywords {
                    rules, fallback, ..
                } => {
                    let mut compiled_rules = Vec::with_capacity(rules.len());
                    for rule in rules {
                        let regex = keyword_regex(&rule.keywords).map_err(|e| {
                            CatalogError::InvalidPattern {
                                source_id: source_id.clone(),
                                reason: e.to_string(),
                            }
                        })?;
                        compiled_rules.push((rule.category.clone(), regex));
                    }
                    CompiledTaxonomy::Keywords {
                        rules: compiled_rules,
                        fallback: fallback.clone(),
                    }
                }
            };
            taxonomies.insert(source_id.clone(), compiled);
        }
        Ok(Self { taxonomies })
    }

    /// Category label for one record, or `None` when the source has no
    /// sub-taxonomy or the id carries no segment.
    pub fn classify(&self, asset: &AssetRecord) -> Option<String> {
        match self.taxonomies.get(&asset.source)? {
            CompiledTaxonomy::IdSegment {
                delimiter,
                segment,
                labels,
            } => {
                let raw = id_segment(&asset.asset_id, delimiter, *segment)?;
                Some(labels.get(raw).cloned().unwrap_or_else(|| raw.to_string()))
            }
            CompiledTaxonomy::Keywords { rules, fallback } => {
                let category = rules
                    .iter()
                    .find(|(_, regex)| regex.is_match(&asset.name))
                    .map(|(category, _)| category)
                    .unwrap_or(fallback);
                Some(category.clone())
            }
        }
    }

    /// Classify a batch of shared records, preserving order.
    pub fn classify_all(&self, records: &[Arc<AssetRecord>]) -> Vec<ClassifiedAsset> {
        records
            .iter()
            .map(|r| ClassifiedAsset::new(Arc::clone(r), self.classify(r)))
            .collect()
    }

    /// Whether this source is sub-grouped at all.
    pub fn has_taxonomy(&self, source: &str) -> bool {
        self.taxonomies.contains_key(source)
    }
}

/// Extract the feed-type segment of a composite id. An id without the
/// delimiter, or whose picked segment is empty, has no segment.
fn id_segment<'a>(asset_id: &'a str, delimiter: &str, pick: SegmentPick) -> Option<&'a str> {
    if !asset_id.contains(delimiter) {
        return None;
    }
    let segment = match pick {
        SegmentPick::First => asset_id.split(delimiter).next(),
        SegmentPick::Last => asset_id.rsplit(delimiter).next(),
    }?;
    let segment = segment.trim();
    (!segment.is_empty()).then_some(segment)
}

/// One case-insensitive alternation over all keywords of a rule. Word
/// boundaries are only asserted on edges that are word characters, so
/// keywords like `s&p 500` still anchor correctly.
fn keyword_regex(keywords: &[String]) -> Result<Regex, regex::Error> {
    let alternatives: Vec<String> = keywords
        .iter()
        .map(|k| k.trim())
        .filter(|k| !k.is_empty())
        .map(|k| {
            let starts_word = k.chars().next().is_some_and(is_word_char);
            let ends_word = k.chars().last().is_some_and(is_word_char);
            format!(
                "{}{}{}",
                if starts_word { r"\b" } else { "" },
                regex::escape(k),
                if ends_word { r"\b" } else { "" },
            )
        })
        .collect();
    RegexBuilder::new(&format!("(?:{})", alternatives.join("|")))
        .case_insensitive(true)
        .build()
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

#[cfg(test)]
mod tests {
    use super::*;

    fn asset(source: &str, id: &str, name: &str) -> AssetRecord {
        AssetRecord {
            source: source.into(),
            asset_id: id.into(),
            symbol: id.into(),
            name: name.into(),
            value: "1".into(),
            change_pct: None,
            market_cap: None,
        }
    }

    fn classifier() -> Classifier {
        Classifier::new(&Catalog::default_catalog()).unwrap()
    }

    #[test]
    fn source_without_taxonomy_is_ungrouped() {
        let c = classifier();
        assert_eq!(c.classify(&asset("npm", "react", "React")), None);
        assert_eq!(c.classify(&asset("unknown-source", "x", "Bitcoin NBA")), None);
    }

    #[test]
    fn id_segment_maps_known_labels() {
        let c = classifier();
        assert_eq!(
            c.classify(&asset("weather", "KNYC:temp", "New York")),
            Some("Temperature".into())
        );
        assert_eq!(
            c.classify(&asset("pyth", "Crypto.BTC/USD", "BTC/USD")),
            Some("Crypto".into())
        );
        assert_eq!(
            c.classify(&asset("pyth", "FX.EUR/USD", "EUR/USD")),
            Some("Foreign Exchange".into())
        );
    }

    #[test]
    fn unknown_segment_passes_through_raw() {
        let c = classifier();
        assert_eq!(
            c.classify(&asset("weather", "KSEA:visibility", "Seattle")),
            Some("visibility".into())
        );
    }

    #[test]
    fn id_without_delimiter_has_no_segment() {
        let c = classifier();
        assert_eq!(c.classify(&asset("weather", "KSEA", "Seattle")), None);
        assert_eq!(c.classify(&asset("weather", "KSEA:", "Seattle")), None);
    }

    #[test]
    fn keywords_first_rule_wins() {
        let c = classifier();
        // Sports precedes crypto in the rule list.
        let title = "Will the Crypto.com Arena host the NBA Finals?";
        assert_eq!(c.classify(&asset("polymarket", "m1", title)), Some("sports".into()));
        // Politics precedes crypto.
        let title = "Will the president sign a bitcoin reserve bill?";
        assert_eq!(c.classify(&asset("kalshi", "m2", title)), Some("politics".into()));
    }

    #[test]
    fn keywords_respect_word_boundaries() {
        let c = classifier();
        // "method" contains "eth" but is not a crypto keyword match.
        assert_eq!(
            c.classify(&asset("polymarket", "m3", "New method for counting")),
            Some("other".into())
        );
        assert_eq!(
            c.classify(&asset("polymarket", "m4", "ETH above $5k by June?")),
            Some("crypto".into())
        );
        assert_eq!(
            c.classify(&asset("polymarket", "m5", "Will the S&P 500 close higher?")),
            Some("economics".into())
        );
    }

    #[test]
    fn no_match_goes_to_fallback() {
        let c = classifier();
        assert_eq!(
            c.classify(&asset("kalshi", "m6", "Will it be a quiet week?")),
            Some("other".into())
        );
    }

    #[test]
    fn classification_is_repeatable() {
        let c = classifier();
        let a = asset("polymarket", "m7", "Bitcoin sponsor at the Super Bowl");
        let first = c.classify(&a);
        for _ in 0..10 {
            assert_eq!(c.classify(&a), first);
        }
        assert_eq!(first, Some("sports".into()));
    }

    #[test]
    fn classify_all_keeps_records_shared() {
        let c = classifier();
        let records = vec![Arc::new(asset("weather", "KBOS:wind", "Boston"))];
        let classified = c.classify_all(&records);
        assert!(Arc::ptr_eq(&classified[0].record, &records[0]));
        assert_eq!(classified[0].category.as_deref(), Some("Wind Speed"));
    }
}
