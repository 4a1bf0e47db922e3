//! Overlay widgets: key help and error history.

use ratatui::Frame;
use ratatui::layout::Rect;
use ratatui::style::Modifier;
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Clear, List, ListItem, Paragraph};

use crate::app::AppState;
use crate::theme;
use crate::ui::centered_rect;

pub fn render_help(f: &mut Frame, area: Rect) {
    let popup = centered_rect(70, 80, area);
    f.render_widget(Clear, popup);

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(theme::accent())
        .title(" Keys [Esc]close ")
        .title_style(theme::accent_bold());

    let mut lines: Vec<Line> = Vec::new();
    section(&mut lines, "Categories");
    key(&mut lines, "Tab / Shift+Tab", "Next / previous category");
    key(&mut lines, "0-9", "Jump to tab (0 = All)");
    key(&mut lines, "s / S", "Cycle source filter forward / back");
    key(&mut lines, "Esc", "Clear source filter, then search");
    lines.push(Line::from(""));

    section(&mut lines, "Scrolling");
    key(&mut lines, "j / k", "Line down / up");
    key(&mut lines, "PgDn / PgUp", "Page down / up");
    key(&mut lines, "Ctrl+d / Ctrl+u", "Half page down / up");
    key(&mut lines, "g / G", "Top / bottom");
    lines.push(Line::from(""));

    section(&mut lines, "Data");
    key(&mut lines, "/", "Search symbol and name");
    key(&mut lines, "r", "Retry failed loads");
    key(&mut lines, "e", "Error history");
    key(&mut lines, "q", "Quit");

    let para = Paragraph::new(lines).block(block);
    f.render_widget(para, popup);
}

fn section(lines: &mut Vec<Line<'_>>, title: &str) {
    lines.push(Line::from(Span::styled(title.to_string(), theme::accent_bold())));
}

fn key(lines: &mut Vec<Line<'_>>, keys: &str, desc: &str) {
    lines.push(Line::from(vec![
        Span::styled(format!("  {keys:>16}  "), theme::accent()),
        Span::styled(desc.to_string(), theme::muted()),
    ]));
}

/// Newest failures first; the selected entry is highlighted.
pub fn render_error_history(f: &mut Frame, area: Rect, app: &AppState) {
    let popup = centered_rect(85, 70, area);
    f.render_widget(Clear, popup);

    let title = format!(" Failed fetches: {} [j/k] [Esc] ", app.error_history.len());
    let block = Block::bordered()
        .border_style(theme::negative())
        .title(Span::styled(title, theme::negative().add_modifier(Modifier::BOLD)));

    if app.error_history.is_empty() {
        let empty = Paragraph::new(Span::styled("Nothing has failed.", theme::muted())).block(block);
        f.render_widget(empty, popup);
        return;
    }

    let items: Vec<ListItem> = app
        .error_history
        .iter()
        .enumerate()
        .skip(app.error_scroll)
        .map(|(i, record)| {
            let message_style = if i == app.error_scroll {
                theme::negative().add_modifier(Modifier::BOLD)
            } else {
                theme::text_secondary()
            };
            let mut head = vec![
                Span::styled(record.timestamp.format("%H:%M:%S ").to_string(), theme::muted()),
                Span::styled(format!("{:<5}", record.category.label()), theme::warning()),
                Span::styled(record.message.clone(), message_style),
            ];
            if !record.context.is_empty() {
                head.push(Span::styled(format!("  ({})", record.context), theme::muted()));
            }
            ListItem::new(Line::from(head))
        })
        .collect();

    f.render_widget(List::new(items).block(block), popup);
}

#[cfg(test)]
mod tests {
    use crate::app::{ErrorCategory, Overlay};
    use crate::app::tests::app;
    use crate::ui::tests::render_to_string;

    #[test]
    fn error_history_lists_newest_first() {
        let mut app = app();
        app.push_error(ErrorCategory::Network, "first".into(), String::new());
        app.push_error(ErrorCategory::Data, "second".into(), "sources npm".into());
        app.overlay = Overlay::ErrorHistory;
        let text = render_to_string(&app, 100, 30);
        let second = text.find("second").unwrap();
        let first = text.find("first").unwrap();
        assert!(second < first);
        assert!(text.contains("DATA"));
    }

    #[test]
    fn help_lists_quit() {
        let mut app = app();
        app.overlay = Overlay::Help;
        let text = render_to_string(&app, 100, 40);
        assert!(text.contains("Quit"));
    }
}
