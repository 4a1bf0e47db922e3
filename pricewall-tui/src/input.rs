//! Keyboard input dispatch: overlays → search → global keys → grid keys.

use std::time::Instant;

use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

use crate::app::{AppState, Overlay};

/// Handle a key event.
pub fn handle_key(app: &mut AppState, key: KeyEvent, now: Instant) {
    // Only handle key press events (Windows sends both Press and Release).
    if key.kind != KeyEventKind::Press {
        return;
    }

    // 1. Overlays consume input first.
    match app.overlay {
        Overlay::Help => {
            if matches!(key.code, KeyCode::Esc | KeyCode::Char('?') | KeyCode::Char('q')) {
                app.overlay = Overlay::None;
            }
            return;
        }
        Overlay::ErrorHistory => {
            handle_error_overlay(app, key);
            return;
        }
        Overlay::None => {}
    }

    // 2. Search line edits the filter live.
    if app.search_mode {
        handle_search(app, key, now);
        return;
    }

    // 3. Global keys.
    match key.code {
        KeyCode::Char('q') => {
            app.running = false;
            return;
        }
        KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
            app.running = false;
            return;
        }
        KeyCode::Char('?') => {
            app.overlay = Overlay::Help;
            return;
        }
        KeyCode::Char('e') => {
            app.error_scroll = 0;
            app.overlay = Overlay::ErrorHistory;
            return;
        }
        KeyCode::Char('/') => {
            app.begin_search();
            return;
        }
        KeyCode::Char('r') => {
            app.retry(now);
            return;
        }
        KeyCode::Tab => {
            app.next_tab(now);
            return;
        }
        KeyCode::BackTab => {
            app.prev_tab(now);
            return;
        }
        KeyCode::Char(c @ '0'..='9') => {
            // 0 is "All", 1.. are categories in catalog order.
            if let Some(index) = c.to_digit(10) {
                app.select_tab(index as usize, now);
            }
            return;
        }
        _ => {}
    }

    // 4. Grid keys.
    handle_grid_key(app, key, now);
}

fn handle_grid_key(app: &mut AppState, key: KeyEvent, now: Instant) {
    let page = app.page();
    match key.code {
        KeyCode::Char('j') | KeyCode::Down => app.vm.scroll_by(1),
        KeyCode::Char('k') | KeyCode::Up => app.vm.scroll_by(-1),
        KeyCode::PageDown | KeyCode::Char(' ') => app.vm.scroll_by(page),
        KeyCode::PageUp => app.vm.scroll_by(-page),
        KeyCode::Char('d') if key.modifiers.contains(KeyModifiers::CONTROL) => {
            app.vm.scroll_by(page / 2)
        }
        KeyCode::Char('u') if key.modifiers.contains(KeyModifiers::CONTROL) => {
            app.vm.scroll_by(-page / 2)
        }
        KeyCode::Char('g') | KeyCode::Home => app.vm.scroll_to(0),
        KeyCode::Char('G') | KeyCode::End => app.vm.scroll_to_end(),
        KeyCode::Char('s') | KeyCode::Right | KeyCode::Char('l') => app.cycle_source(true, now),
        KeyCode::Char('S') | KeyCode::Left | KeyCode::Char('h') => app.cycle_source(false, now),
        KeyCode::Esc => {
            // Clear filters narrower than the tab.
            if app.vm.filters().source.is_some() {
                app.vm.select_source(None, now);
            } else if app.vm.filters().search.is_some() {
                app.cancel_search(now);
            }
        }
        _ => {}
    }
}

fn handle_search(app: &mut AppState, key: KeyEvent, now: Instant) {
    match key.code {
        KeyCode::Esc => app.cancel_search(now),
        KeyCode::Enter => app.confirm_search(),
        KeyCode::Backspace => app.pop_search(now),
        KeyCode::Char(c) => app.push_search(c, now),
        _ => {}
    }
}

fn handle_error_overlay(app: &mut AppState, key: KeyEvent) {
    match key.code {
        KeyCode::Esc | KeyCode::Char('q') | KeyCode::Char('e') => {
            app.overlay = Overlay::None;
        }
        KeyCode::Char('j') | KeyCode::Down => {
            if app.error_scroll + 1 < app.error_history.len() {
                app.error_scroll += 1;
            }
        }
        KeyCode::Char('k') | KeyCode::Up => {
            app.error_scroll = app.error_scroll.saturating_sub(1);
        }
        _ => {}
    }
}
