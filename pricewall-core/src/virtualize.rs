//! Windowed virtualizer over variable-height rows.
//!
//! An [`OffsetTable`] holds the prefix sum of row sizes: `starts[i]` is the
//! offset of row `i` and `starts[n]` is the total extent. Building is O(rows);
//! every scroll query is a binary search over the table, so the cost of a
//! query does not depend on how many rows sit above the viewport.

use std::ops::Range;

use crate::flatten::VirtualRow;

/// Rows rendered beyond each edge of the viewport.
pub const DEFAULT_OVERSCAN: usize = 4;

/// Size of each row kind, in whatever unit the host scrolls in (pixels,
/// terminal lines).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SizeModel {
    pub header: u32,
    pub subheader: u32,
    pub tile_row: u32,
}

impl SizeModel {
    pub const fn new(header: u32, subheader: u32, tile_row: u32) -> Self {
        Self {
            header,
            subheader,
            tile_row,
        }
    }

    pub fn size_of(&self, row: &VirtualRow) -> u32 {
        match row {
            VirtualRow::Header { .. } => self.header,
            VirtualRow::Subheader { .. } => self.subheader,
            VirtualRow::Tiles { .. } => self.tile_row,
        }
    }
}

impl Default for SizeModel {
    /// Terminal-line sizes: a two-line source header, a one-line subheader and
    /// three-line tiles.
    fn default() -> Self {
        Self::new(2, 1, 3)
    }
}

/// Monotone prefix-sum table over row sizes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OffsetTable {
    starts: Vec<u64>,
}

impl OffsetTable {
    pub fn build<T>(rows: &[T], mut size_of: impl FnMut(&T) -> u32) -> Self {
        let mut starts = Vec::with_capacity(rows.len() + 1);
        let mut acc = 0u64;
        starts.push(acc);
        for row in rows {
            acc += u64::from(size_of(row));
            starts.push(acc);
        }
        Self { starts }
    }

    pub fn for_rows(rows: &[VirtualRow], sizes: &SizeModel) -> Self {
        Self::build(rows, |r| sizes.size_of(r))
    }

    pub fn len(&self) -> usize {
        self.starts.len().saturating_sub(1)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn total_extent(&self) -> u64 {
        self.starts.last().copied().unwrap_or(0)
    }

    /// Start offset of row `index`. Indices past the end map to the extent.
    pub fn offset_of(&self, index: usize) -> u64 {
        self.starts
            .get(index.min(self.len()))
            .copied()
            .unwrap_or(0)
    }

    pub fn size_of(&self, index: usize) -> u64 {
        if index >= self.len() {
            return 0;
        }
        self.starts[index + 1] - self.starts[index]
    }

    /// Row containing `offset`: the first row that ends past it, or a
    /// zero-sized row sitting exactly at it. Offsets past the extent map to
    /// the last row. `None` for an empty table.
    pub fn index_at(&self, offset: u64) -> Option<usize> {
        let n = self.len();
        if n == 0 {
            return None;
        }
        let ends_after = self.starts[1..].partition_point(|&e| e <= offset);
        let starts_at = self.starts[..n].partition_point(|&s| s < offset);
        Some(ends_after.min(starts_at).min(n - 1))
    }

    /// Visible and rendered rows for a viewport. The scroll offset is clamped
    /// so the viewport never starts past the last full screen of content.
    /// The visible range always holds at least the row at the scroll offset.
    pub fn window(&self, scroll: u64, viewport: u64, overscan: usize) -> VirtualWindow {
        let total_extent = self.total_extent();
        let n = self.len();
        if n == 0 {
            return VirtualWindow {
                scroll: 0,
                visible: 0..0,
                rendered: 0..0,
                items: Vec::new(),
                total_extent,
            };
        }

        let scroll = scroll.min(total_extent.saturating_sub(viewport));
        let first = self.index_at(scroll).unwrap_or(0);
        let bottom = scroll.saturating_add(viewport);
        let end = self.starts[..n]
            .partition_point(|&s| s < bottom)
            .max(first + 1);

        let rendered = first.saturating_sub(overscan)..(end + overscan).min(n);
        let items = rendered
            .clone()
            .map(|index| VirtualItem {
                index,
                start: self.starts[index],
                size: self.size_of(index),
            })
            .collect();

        VirtualWindow {
            scroll,
            visible: first..end,
            rendered,
            items,
            total_extent,
        }
    }
}

/// A materialized row position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VirtualItem {
    pub index: usize,
    pub start: u64,
    pub size: u64,
}

/// What a host needs to draw one frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VirtualWindow {
    /// Effective (clamped) scroll offset.
    pub scroll: u64,
    pub visible: Range<usize>,
    pub rendered: Range<usize>,
    pub items: Vec<VirtualItem>,
    pub total_extent: u64,
}

impl VirtualWindow {
    /// Offset of an item relative to the top of the viewport. Negative for
    /// overscan rows above it.
    pub fn relative_start(&self, item: &VirtualItem) -> i64 {
        item.start as i64 - self.scroll as i64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(sizes: &[u32]) -> OffsetTable {
        OffsetTable::build(sizes, |s| *s)
    }

    #[test]
    fn empty_table() {
        let t = table(&[]);
        assert_eq!(t.total_extent(), 0);
        assert_eq!(t.index_at(0), None);
        let w = t.window(10, 100, 3);
        assert!(w.visible.is_empty());
        assert!(w.rendered.is_empty());
        assert!(w.items.is_empty());
    }

    #[test]
    fn prefix_sums_and_lookup() {
        let t = table(&[2, 3, 3, 1]);
        assert_eq!(t.total_extent(), 9);
        assert_eq!(t.offset_of(0), 0);
        assert_eq!(t.offset_of(2), 5);
        assert_eq!(t.offset_of(99), 9);
        assert_eq!(t.size_of(1), 3);
        assert_eq!(t.size_of(4), 0);
        assert_eq!(t.index_at(0), Some(0));
        assert_eq!(t.index_at(1), Some(0));
        assert_eq!(t.index_at(2), Some(1));
        assert_eq!(t.index_at(7), Some(2));
        assert_eq!(t.index_at(8), Some(3));
        assert_eq!(t.index_at(1000), Some(3));
    }

    #[test]
    fn offset_zero_includes_first_row() {
        let t = table(&[5, 5, 5]);
        let w = t.window(0, 4, 0);
        assert_eq!(w.visible, 0..1);
        assert_eq!(w.items[0].index, 0);
    }

    #[test]
    fn zero_sized_leading_row_is_visible_at_top() {
        let rows = vec![
            VirtualRow::Header {
                source: "npm".into(),
                count: 1,
            },
            VirtualRow::Tiles {
                prices: vec![],
                column_count: 2,
            },
        ];
        let t = OffsetTable::for_rows(&rows, &SizeModel::new(0, 1, 3));
        assert_eq!(t.index_at(0), Some(0));
        let w = t.window(0, 10, 0);
        assert_eq!(w.visible, 0..2);
        assert_eq!(w.items[0].index, 0);
    }

    #[test]
    fn zero_sized_rows_in_the_middle() {
        let t = table(&[5, 0, 5]);
        assert_eq!(t.index_at(4), Some(0));
        assert_eq!(t.index_at(5), Some(1));
        assert_eq!(t.index_at(6), Some(2));
    }

    #[test]
    fn zero_viewport_still_shows_the_row_at_scroll() {
        let t = table(&[3, 3, 3]);
        let w = t.window(0, 0, 0);
        assert_eq!(w.visible, 0..1);
        let w = t.window(4, 0, 1);
        assert_eq!(w.visible, 1..2);
        assert_eq!(w.rendered, 0..3);
    }

    #[test]
    fn overscan_extends_rendered_range() {
        let t = table(&[1; 100]);
        let w = t.window(50, 10, 3);
        assert_eq!(w.visible, 50..60);
        assert_eq!(w.rendered, 47..63);
        assert_eq!(w.items.len(), 16);
        assert_eq!(w.relative_start(&w.items[0]), -3);
    }

    #[test]
    fn scroll_is_clamped_to_last_screen() {
        let t = table(&[1; 20]);
        let w = t.window(1_000, 5, 0);
        assert_eq!(w.scroll, 15);
        assert_eq!(w.visible, 15..20);
    }

    #[test]
    fn partially_visible_rows_are_included() {
        let t = table(&[3, 3, 3, 3]);
        // Lines 4..8 touch rows 1 and 2.
        let w = t.window(4, 4, 0);
        assert_eq!(w.visible, 1..3);
    }

    #[test]
    fn size_model_from_rows() {
        let rows = vec![
            VirtualRow::Header {
                source: "npm".into(),
                count: 0,
            },
            VirtualRow::Tiles {
                prices: vec![],
                column_count: 2,
            },
        ];
        let t = OffsetTable::for_rows(&rows, &SizeModel::new(40, 24, 120));
        assert_eq!(t.total_extent(), 160);
    }
}
