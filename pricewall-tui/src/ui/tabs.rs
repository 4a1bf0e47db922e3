//! Category tab bar with per-tab asset counts once metadata arrives.

use ratatui::Frame;
use ratatui::layout::Rect;
use ratatui::text::{Line, Span};
use ratatui::widgets::Tabs;

use crate::app::AppState;
use crate::theme;

pub fn render(f: &mut Frame, area: Rect, app: &AppState) {
    let meta = app.vm.loader().meta();
    let titles: Vec<Line> = app
        .tabs
        .iter()
        .enumerate()
        .map(|(i, tab)| {
            let mut spans = vec![
                Span::styled(format!("{i}:"), theme::muted()),
                Span::raw(tab.label.clone()),
            ];
            if let Some(meta) = meta {
                let scope = app.vm.loader().scope_for(tab.category.as_deref());
                spans.push(Span::styled(
                    format!(" {}", meta.count_in(&scope)),
                    theme::text_secondary(),
                ));
            }
            Line::from(spans)
        })
        .collect();

    let tabs = Tabs::new(titles)
        .select(app.active_tab)
        .style(theme::muted())
        .highlight_style(theme::accent_bold())
        .divider(Span::styled("│", theme::muted()));
    f.render_widget(tabs, area);
}
