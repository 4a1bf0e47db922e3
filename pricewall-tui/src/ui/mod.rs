//! Top-level UI layout: tab bar, tile grid, status bar.

pub mod grid;
pub mod overlays;
pub mod status_bar;
pub mod tabs;

use ratatui::Frame;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::widgets::{Block, Borders};

use crate::app::{AppState, Overlay};
use crate::theme;

/// Screen regions: tab bar, grid panel, status line.
pub struct Regions {
    pub tabs: Rect,
    pub panel: Rect,
    pub status: Rect,
}

pub fn regions(area: Rect) -> Regions {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),
            Constraint::Min(3),
            Constraint::Length(1),
        ])
        .split(area);
    Regions {
        tabs: chunks[0],
        panel: chunks[1],
        status: chunks[2],
    }
}

fn panel_block(app: &AppState) -> Block<'static> {
    let tab = app.active();
    let mut title = format!(" {} ", tab.label);
    if let Some(source) = &app.vm.filters().source {
        title.push_str(&format!("› {} ", app.vm.catalog().source_name(source)));
    }
    Block::default()
        .borders(Borders::ALL)
        .border_style(theme::panel_border(true))
        .title(title)
        .title_style(theme::panel_title(true))
}

/// The area rows are laid out in, for a terminal of size `area`.
pub fn grid_area(area: Rect, app: &AppState) -> Rect {
    panel_block(app).inner(regions(area).panel)
}

/// Draw the entire UI.
pub fn draw(f: &mut Frame, app: &AppState) {
    let r = regions(f.area());

    tabs::render(f, r.tabs, app);

    let block = panel_block(app);
    let inner = block.inner(r.panel);
    f.render_widget(block, r.panel);
    grid::render(f, inner, app);

    status_bar::render(f, r.status, app);

    match app.overlay {
        Overlay::Help => overlays::render_help(f, r.panel),
        Overlay::ErrorHistory => overlays::render_error_history(f, r.panel, app),
        Overlay::None => {}
    }
}

/// Compute a centered rect for overlays.
pub fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(area);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use ratatui::Terminal;
    use ratatui::backend::TestBackend;

    /// Render the whole UI into an in-memory buffer and return its text.
    pub(crate) fn render_to_string(app: &AppState, width: u16, height: u16) -> String {
        let mut terminal = Terminal::new(TestBackend::new(width, height)).unwrap();
        terminal.draw(|f| draw(f, app)).unwrap();
        let buffer = terminal.backend().buffer().clone();
        let mut out = String::new();
        for y in 0..buffer.area.height {
            for x in 0..buffer.area.width {
                out.push_str(buffer[(x, y)].symbol());
            }
            out.push('\n');
        }
        out
    }

    #[test]
    fn regions_reserve_bars() {
        let r = regions(Rect::new(0, 0, 80, 24));
        assert_eq!(r.tabs.height, 1);
        assert_eq!(r.status.height, 1);
        assert_eq!(r.panel.height, 22);
    }
}
