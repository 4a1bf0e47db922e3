//! Tile grid: draws only the rows in the virtual window.
//!
//! Each window item is placed at its offset relative to the scroll position.
//! Overscan rows above or below the area are clipped line by line, so a tile
//! row half off-screen still shows its visible lines.

use chrono::Utc;
use ratatui::Frame;
use ratatui::layout::{Alignment, Rect};
use ratatui::style::Modifier;
use ratatui::text::{Line, Span};
use ratatui::widgets::{Paragraph, Wrap};

use pricewall_core::domain::ClassifiedAsset;
use pricewall_core::flatten::VirtualRow;
use pricewall_core::pipeline::ViewStatus;
use pricewall_loader::relative_time;

use crate::app::AppState;
use crate::theme;

pub fn render(f: &mut Frame, area: Rect, app: &AppState) {
    let derived = app.vm.derived();
    match derived.status() {
        ViewStatus::Ready => {}
        ViewStatus::Loading => {
            let expected = app.vm.loaded().and_then(|l| l.expected_count());
            let msg = match expected {
                Some(n) => format!("Loading {} ({n} assets)…", app.active().label),
                None => format!("Loading {}…", app.active().label),
            };
            return centered_message(f, area, Line::from(Span::styled(msg, theme::warning())));
        }
        ViewStatus::Failed(reason) => {
            let line = Line::from(vec![
                Span::styled(format!("Failed to load: {reason}"), theme::negative()),
                Span::styled("  [r]etry", theme::muted()),
            ]);
            return centered_message(f, area, line);
        }
        ViewStatus::Empty => {
            let msg = if app.vm.filters().search.is_some() {
                "No assets match the search"
            } else {
                "No assets"
            };
            return centered_message(f, area, Line::from(Span::styled(msg, theme::muted())));
        }
    }

    let window = app.vm.window();
    let rows = app.vm.rows();
    let height = i64::from(area.height);
    for item in &window.items {
        let Some(row) = rows.get(item.index) else {
            continue;
        };
        let top = window.relative_start(item);
        for line_idx in 0..item.size {
            let y = top + line_idx as i64;
            if y < 0 || y >= height {
                continue;
            }
            let line = row_line(app, row, line_idx as usize, area.width);
            let rect = Rect::new(area.x, area.y + y as u16, area.width, 1);
            f.render_widget(Paragraph::new(line), rect);
        }
    }
}

fn centered_message(f: &mut Frame, area: Rect, line: Line) {
    let y = area.y + area.height / 2;
    let rect = Rect::new(area.x, y, area.width, area.height.min(1));
    f.render_widget(
        Paragraph::new(line)
            .alignment(Alignment::Center)
            .wrap(Wrap { trim: true }),
        rect,
    );
}

/// One terminal line of a row. Lines past a row's content are blank.
fn row_line(app: &AppState, row: &VirtualRow, line: usize, width: u16) -> Line<'static> {
    match row {
        VirtualRow::Header { source, count } => match line {
            0 => header_line(app, source, *count),
            1 => Line::from(Span::styled(
                "─".repeat(width as usize),
                theme::muted(),
            )),
            _ => Line::default(),
        },
        VirtualRow::Subheader { label, count, .. } => match line {
            0 => Line::from(vec![
                Span::styled(format!("  {label}"), theme::neutral().add_modifier(Modifier::BOLD)),
                Span::styled(format!(" · {count}"), theme::muted()),
            ]),
            _ => Line::default(),
        },
        VirtualRow::Tiles {
            prices,
            column_count,
        } => tile_line(prices, *column_count, line, width),
    }
}

fn header_line(app: &AppState, source: &str, count: usize) -> Line<'static> {
    let catalog = app.vm.catalog();
    let mut spans = vec![
        Span::styled("▍", theme::accent()),
        Span::styled(
            catalog.source_name(source).to_string(),
            theme::accent_bold(),
        ),
        Span::styled(format!("  {count}"), theme::text_secondary()),
    ];
    let schedule = app
        .vm
        .loaded()
        .and_then(|l| l.sources.iter().find(|s| s.source_id == source));
    if let Some(schedule) = schedule {
        if let Some(last) = schedule.last_sync {
            spans.push(Span::styled(
                format!("  synced {}", relative_time(last, Utc::now())),
                theme::muted(),
            ));
        }
        if !schedule.is_requestable() {
            spans.push(Span::styled(
                format!("  {}", schedule.status.label()),
                theme::warning(),
            ));
        }
    }
    Line::from(spans)
}

fn tile_line(prices: &[ClassifiedAsset], columns: usize, line: usize, width: u16) -> Line<'static> {
    let columns = columns.max(1);
    let cell = (width as usize / columns).max(1);
    // One space gutter between tiles.
    let inner = cell.saturating_sub(1).max(1);
    let mut spans = Vec::with_capacity(prices.len() * 2);
    for asset in prices {
        let record = &asset.record;
        match line {
            0 => {
                let value = format_value(record.value_f64());
                let symbol_width = inner.saturating_sub(value.chars().count() + 1).max(1);
                spans.push(Span::styled(
                    format!("{:<symbol_width$} ", fit(&record.symbol, symbol_width)),
                    theme::text().add_modifier(Modifier::BOLD),
                ));
                spans.push(Span::styled(
                    fit(&value, inner.saturating_sub(symbol_width + 1)),
                    theme::accent(),
                ));
            }
            1 => spans.push(Span::styled(
                format!("{:<inner$}", fit(&record.name, inner)),
                theme::text_secondary(),
            )),
            2 => {
                let change = record.change_pct_f64();
                let text = change.map(format_change).unwrap_or_default();
                spans.push(Span::styled(format!("{:<inner$}", fit(&text, inner)), theme::change(change)));
            }
            _ => spans.push(Span::raw(" ".repeat(inner))),
        }
        spans.push(Span::raw(" "));
    }
    Line::from(spans)
}

/// Truncate to `width` chars, marking the cut with an ellipsis.
pub fn fit(s: &str, width: usize) -> String {
    if s.chars().count() <= width {
        return s.to_string();
    }
    if width == 0 {
        return String::new();
    }
    let mut out: String = s.chars().take(width - 1).collect();
    out.push('…');
    out
}

/// Compact price display: scaled suffixes for large values, more decimals
/// for small ones.
pub fn format_value(v: f64) -> String {
    let abs = v.abs();
    if abs >= 1e12 {
        format!("{:.2}T", v / 1e12)
    } else if abs >= 1e9 {
        format!("{:.2}B", v / 1e9)
    } else if abs >= 1e6 {
        format!("{:.2}M", v / 1e6)
    } else if abs >= 1e3 {
        format!("{v:.0}")
    } else if abs >= 1.0 || abs == 0.0 {
        format!("{v:.2}")
    } else {
        format!("{v:.4}")
    }
}

pub fn format_change(pct: f64) -> String {
    format!("{pct:+.2}%")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::tests::{app, drain, provider};
    use crate::ui::grid_area;
    use crate::ui::tests::render_to_string;
    use ratatui::layout::Rect;
    use std::time::Instant;

    #[test]
    fn fit_truncates_with_ellipsis() {
        assert_eq!(fit("bitcoin", 10), "bitcoin");
        assert_eq!(fit("bitcoin", 4), "bit…");
        assert_eq!(fit("bitcoin", 0), "");
    }

    #[test]
    fn value_formatting() {
        assert_eq!(format_value(2_500_000.0), "2.50M");
        assert_eq!(format_value(64_210.4), "64210");
        assert_eq!(format_value(12.0), "12.00");
        assert_eq!(format_value(0.012345), "0.0123");
        assert_eq!(format_value(0.0), "0.00");
        assert_eq!(format_change(1.234), "+1.23%");
        assert_eq!(format_change(-0.5), "-0.50%");
    }

    #[test]
    fn loading_message_before_data() {
        let mut app = app();
        let now = Instant::now();
        app.mount("crypto", now);
        let text = render_to_string(&app, 100, 20);
        assert!(text.contains("Loading Crypto"));
    }

    #[test]
    fn resolved_grid_shows_source_headers() {
        let mut app = app();
        let now = Instant::now();
        let grid = grid_area(Rect::new(0, 0, 100, 30), &app);
        app.resize(grid.width, grid.height, now);
        app.mount("crypto", now);
        drain(&mut app, &provider(), now);

        let text = render_to_string(&app, 100, 30);
        let name = app.vm.catalog().source_name("coingecko").to_string();
        assert!(text.contains(&name), "header missing:\n{text}");
    }

    #[test]
    fn failed_scope_shows_reason() {
        let mut app = app();
        let now = Instant::now();
        app.mount("weather", now);
        drain(&mut app, &provider().with_failing_source("weather"), now);
        let text = render_to_string(&app, 120, 20);
        assert!(text.contains("Failed to load"));
    }
}
