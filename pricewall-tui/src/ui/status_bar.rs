//! Bottom status bar: load stage, counts, freshness, last status message.
//! In search mode the whole line becomes the search prompt.

use chrono::Utc;
use ratatui::Frame;
use ratatui::layout::Rect;
use ratatui::text::{Line, Span};
use ratatui::widgets::Paragraph;

use pricewall_loader::{relative_time, LoadStage, LoadState};

use crate::app::{AppState, StatusLevel};
use crate::theme;

pub fn render(f: &mut Frame, area: Rect, app: &AppState) {
    if app.search_mode {
        let line = Line::from(vec![
            Span::styled("/", theme::accent_bold()),
            Span::styled(app.search_input.as_str(), theme::text()),
            Span::styled("▏", theme::accent()),
            Span::styled("  [Enter]keep [Esc]clear", theme::muted()),
        ]);
        f.render_widget(Paragraph::new(line), area);
        return;
    }

    let mut spans: Vec<Span> = Vec::new();
    let derived = app.vm.derived();

    if let Some(loaded) = app.vm.loaded() {
        let (stage, style) = match loaded.stage {
            LoadStage::Meta => ("meta", theme::warning()),
            LoadStage::CategoryDetail => ("category", theme::accent()),
            LoadStage::Full => ("full", theme::positive()),
        };
        spans.push(Span::styled(format!(" [{stage}]"), style));
        if loaded.state == LoadState::Stale {
            spans.push(Span::styled(" stale", theme::warning()));
        }

        let shown = derived.total_filtered;
        match loaded.expected_count() {
            Some(expected) if loaded.records.is_empty() => {
                spans.push(Span::styled(format!(" 0/{expected}"), theme::text_secondary()));
            }
            _ => spans.push(Span::styled(format!(" {shown} shown"), theme::text_secondary())),
        }

        let synced = loaded
            .sources
            .iter()
            .filter_map(|s| s.last_sync)
            .max()
            .or(loaded.meta.as_ref().map(|m| m.generated_at));
        if let Some(ts) = synced {
            spans.push(Span::styled(
                format!(" · updated {}", relative_time(ts, Utc::now())),
                theme::muted(),
            ));
        }
    }

    let in_flight = app.vm.loader().in_flight_count();
    if in_flight > 0 {
        spans.push(Span::styled(format!(" · ⟳{in_flight}"), theme::warning()));
    }
    if let Some(search) = &app.vm.filters().search {
        spans.push(Span::styled(format!(" · /{search}"), theme::neutral()));
    }

    spans.push(Span::raw(" | "));

    if let Some((msg, level)) = &app.status_message {
        let style = match level {
            StatusLevel::Info => theme::accent(),
            StatusLevel::Warning => theme::warning(),
            StatusLevel::Error => theme::negative(),
        };
        spans.push(Span::styled(msg.as_str(), style));
    } else {
        spans.push(Span::styled(
            "Tab:category s:source /:search r:retry e:errors ?:help q:quit",
            theme::muted(),
        ));
    }

    f.render_widget(Paragraph::new(Line::from(spans)), area);
}
