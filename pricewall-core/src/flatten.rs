//! Grouping and row flattening.
//!
//! Turns a classified asset list into the flat row list the virtualizer
//! addresses by index:
//!
//! ```text
//! Header(source, count)
//!   Subheader(label, count)     only for sources with subcategories
//!   Tiles([a, b, c, d])         exactly `columns` per row, last may be short
//!   Tiles([e])
//! Header(next source, count)
//!   ...
//! ```
//!
//! The row list is rebuilt from scratch on every input change; it is never
//! patched. Output order is fully determined by the inputs, so flattening
//! the same list with the same filters twice yields identical rows.

use std::cmp::Ordering;
use std::collections::HashMap;

use crate::catalog::Catalog;
use crate::domain::ClassifiedAsset;

/// Label used for members without a category in a sub-grouped source.
pub const UNCATEGORIZED_LABEL: &str = "Uncategorized";

/// Transient view filters. All optional; applied as successive narrowing
/// passes in field order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Filters {
    pub category: Option<String>,
    pub source: Option<String>,
    pub search: Option<String>,
}

impl Filters {
    pub fn category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    pub fn source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    pub fn search(mut self, text: impl Into<String>) -> Self {
        self.search = Some(text.into());
        self
    }

    /// Lowercased, trimmed search needle. Blank text means no search filter.
    fn search_needle(&self) -> Option<String> {
        self.search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_lowercase)
    }
}

/// One addressable unit of the flattened display list.
#[derive(Debug, Clone, PartialEq)]
pub enum VirtualRow {
    Header {
        source: String,
        count: usize,
    },
    Subheader {
        source: String,
        label: String,
        count: usize,
    },
    Tiles {
        prices: Vec<ClassifiedAsset>,
        column_count: usize,
    },
}

impl VirtualRow {
    pub fn is_tiles(&self) -> bool {
        matches!(self, VirtualRow::Tiles { .. })
    }

    /// Number of assets carried by this row (zero for headers).
    pub fn tile_count(&self) -> usize {
        match self {
            VirtualRow::Tiles { prices, .. } => prices.len(),
            _ => 0,
        }
    }
}

/// Result of one flattening pass.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FlattenOutput {
    pub rows: Vec<VirtualRow>,
    pub total_matched: usize,
}

impl FlattenOutput {
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Group, sort and flatten `assets` under `filters` into rows of `columns`
/// tiles. A `columns` of zero is treated as one.
pub fn flatten(
    assets: &[ClassifiedAsset],
    filters: &Filters,
    columns: usize,
    catalog: &Catalog,
) -> FlattenOutput {
    let columns = columns.max(1);
    let needle = filters.search_needle();

    // 1. Narrowing passes: category, source, search.
    let matched = assets.iter().filter(|a| {
        filters
            .category
            .as_deref()
            .map_or(true, |c| catalog.source_in_category(a.source(), c))
            && filters.source.as_deref().map_or(true, |s| a.source() == s)
            && needle.as_deref().map_or(true, |n| matches_search(a, n))
    });

    // 2. Partition by source.
    let mut by_source: HashMap<&str, Vec<&ClassifiedAsset>> = HashMap::new();
    for asset in matched {
        by_source.entry(asset.source()).or_default().push(asset);
    }

    let mut sources: Vec<&str> = by_source.keys().copied().collect();
    sources.sort_by(|a, b| compare_sources(catalog, a, b));

    let mut rows = Vec::new();
    let mut total_matched = 0;

    for source in sources {
        let Some(mut members) = by_source.remove(source) else {
            continue;
        };
        if members.is_empty() {
            continue;
        }

        // 3. Rank descending within the source.
        members.sort_by(|a, b| compare_rank(a, b));

        total_matched += members.len();
        rows.push(VirtualRow::Header {
            source: source.to_string(),
            count: members.len(),
        });

        // 4. Sub-partition when any member carries a category.
        if members.iter().any(|a| a.category.is_some()) {
            for group in subgroups(source, members, catalog) {
                rows.push(VirtualRow::Subheader {
                    source: source.to_string(),
                    label: group.label,
                    count: group.members.len(),
                });
                push_tiles(&mut rows, &group.members, columns);
            }
        } else {
            push_tiles(&mut rows, &members, columns);
        }
    }

    FlattenOutput {
        rows,
        total_matched,
    }
}

fn matches_search(asset: &ClassifiedAsset, needle: &str) -> bool {
    asset.symbol().to_lowercase().contains(needle) || asset.name().to_lowercase().contains(needle)
}

/// Known sources in navigation order, then unknown sources alphabetically.
fn compare_sources(catalog: &Catalog, a: &str, b: &str) -> Ordering {
    match (catalog.navigation_rank(a), catalog.navigation_rank(b)) {
        (Some(x), Some(y)) => x.cmp(&y),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => a.cmp(b),
    }
}

/// Descending rank key; ties broken by asset id so the order is total.
fn compare_rank(a: &ClassifiedAsset, b: &ClassifiedAsset) -> Ordering {
    b.record
        .rank_key()
        .total_cmp(&a.record.rank_key())
        .then_with(|| a.asset_id().cmp(b.asset_id()))
}

struct Subgroup<'a> {
    label: String,
    known: bool,
    members: Vec<&'a ClassifiedAsset>,
}

/// Split ranked members by category. Known categories first, then unknown
/// ones, each tier by member count descending then label; members without
/// a category trail under [`UNCATEGORIZED_LABEL`]. Member rank order is
/// preserved inside each group.
fn subgroups<'a>(
    source: &str,
    members: Vec<&'a ClassifiedAsset>,
    catalog: &Catalog,
) -> Vec<Subgroup<'a>> {
    let mut index: HashMap<&str, usize> = HashMap::new();
    let mut groups: Vec<Subgroup<'a>> = Vec::new();
    let mut uncategorized: Vec<&'a ClassifiedAsset> = Vec::new();

    for asset in members {
        let Some(category) = asset.category.as_deref() else {
            uncategorized.push(asset);
            continue;
        };
        let slot = *index.entry(category).or_insert_with(|| {
            let label = catalog.subcategory_label(source, category);
            groups.push(Subgroup {
                label: label.unwrap_or(category).to_string(),
                known: label.is_some(),
                members: Vec::new(),
            });
            groups.len() - 1
        });
        groups[slot].members.push(asset);
    }

    groups.sort_by(|a, b| {
        b.known
            .cmp(&a.known)
            .then_with(|| b.members.len().cmp(&a.members.len()))
            .then_with(|| a.label.cmp(&b.label))
    });

    if !uncategorized.is_empty() {
        groups.push(Subgroup {
            label: UNCATEGORIZED_LABEL.to_string(),
            known: false,
            members: uncategorized,
        });
    }
    groups
}

fn push_tiles(rows: &mut Vec<VirtualRow>, members: &[&ClassifiedAsset], columns: usize) {
    for chunk in members.chunks(columns) {
        rows.push(VirtualRow::Tiles {
            prices: chunk.iter().map(|a| (*a).clone()).collect(),
            column_count: columns,
        });
    }
}

/// Column count for a viewport width: how many tiles of `min_tile_width`
/// fit, clamped to `1..=max_columns`.
pub fn columns_for_width(width: u32, min_tile_width: u32, max_columns: usize) -> usize {
    let fit = if min_tile_width == 0 {
        max_columns
    } else {
        (width / min_tile_width) as usize
    };
    fit.clamp(1, max_columns.max(1))
}
