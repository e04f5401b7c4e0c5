//! Keyboard input dispatch: overlays → global keys → panel-specific handlers.

use std::path::PathBuf;

use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

use crate::app::{AppState, Overlay, Panel, QueryField, QueryTrigger};

/// Rows moved by PageUp/PageDown in the rankings table.
const PAGE: usize = 10;

/// Handle a key event.
pub fn handle_key(app: &mut AppState, key: KeyEvent) {
    // Only handle key press events (Windows sends both Press and Release).
    if key.kind != KeyEventKind::Press {
        return;
    }

    // 1. Overlays consume input first.
    match &app.overlay {
        Overlay::Welcome => {
            app.overlay = Overlay::None;
            return;
        }
        Overlay::ErrorDialog { .. } => {
            if matches!(key.code, KeyCode::Enter | KeyCode::Esc) {
                app.overlay = Overlay::None;
            }
            return;
        }
        Overlay::ErrorHistory => {
            handle_error_overlay(app, key);
            return;
        }
        Overlay::Filter => {
            handle_filter_overlay(app, key);
            return;
        }
        Overlay::Export => {
            handle_export_overlay(app, key);
            return;
        }
        Overlay::Detail(_) => {
            if matches!(key.code, KeyCode::Esc | KeyCode::Enter | KeyCode::Char('q')) {
                app.overlay = Overlay::None;
            }
            return;
        }
        Overlay::None => {}
    }

    // 2. Global keys (always available).
    match key.code {
        KeyCode::Char('q') => {
            app.running = false;
            return;
        }
        KeyCode::Char(c @ '1'..='4') => {
            if let Some(panel) = Panel::from_index(c as usize - '1' as usize) {
                app.active_panel = panel;
            }
            return;
        }
        KeyCode::Tab => {
            if key.modifiers.contains(KeyModifiers::SHIFT) {
                app.active_panel = app.active_panel.prev();
            } else {
                app.active_panel = app.active_panel.next();
            }
            return;
        }
        KeyCode::BackTab => {
            app.active_panel = app.active_panel.prev();
            return;
        }
        KeyCode::Char('r') => {
            app.start_query(QueryTrigger::Manual);
            return;
        }
        KeyCode::Char('a') => {
            app.toggle_auto_refresh();
            return;
        }
        _ => {}
    }

    // 3. Panel-specific keys.
    match app.active_panel {
        Panel::Query => handle_query_key(app, key),
        Panel::Rankings => handle_rankings_key(app, key),
        Panel::Charts => {} // display only
        Panel::Help => handle_help_key(app, key),
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

/// Live filter: every keystroke re-applies. Esc clears, Enter keeps.
fn handle_filter_overlay(app: &mut AppState, key: KeyEvent) {
    match key.code {
        KeyCode::Esc => {
            app.filter_input.clear();
            app.update_filter();
            app.overlay = Overlay::None;
        }
        KeyCode::Enter => {
            app.overlay = Overlay::None;
        }
        KeyCode::Backspace => {
            app.filter_input.pop();
            app.update_filter();
        }
        KeyCode::Char(c) => {
            app.filter_input.push(c);
            app.update_filter();
        }
        _ => {}
    }
}

fn handle_export_overlay(app: &mut AppState, key: KeyEvent) {
    match key.code {
        KeyCode::Esc => {
            app.overlay = Overlay::None;
        }
        KeyCode::Enter => {
            let input = app.export_input.trim().to_string();
            app.overlay = Overlay::None;
            if input.is_empty() {
                app.set_warning("Export cancelled: no path given");
                return;
            }
            // Failures replace the overlay with the error dialog.
            app.export_current(&PathBuf::from(input));
        }
        KeyCode::Backspace => {
            app.export_input.pop();
        }
        KeyCode::Char(c) => {
            app.export_input.push(c);
        }
        _ => {}
    }
}

fn handle_query_key(app: &mut AppState, key: KeyEvent) {
    let form = &mut app.query;
    match key.code {
        KeyCode::Char('j') | KeyCode::Down => {
            if form.cursor + 1 < QueryField::ALL.len() {
                form.cursor += 1;
            }
        }
        KeyCode::Char('k') | KeyCode::Up => {
            form.cursor = form.cursor.saturating_sub(1);
        }
        KeyCode::Char('l') | KeyCode::Right => form.adjust(1, false),
        KeyCode::Char('h') | KeyCode::Left => form.adjust(-1, false),
        KeyCode::Char('L') => form.adjust(1, true),
        KeyCode::Char('H') => form.adjust(-1, true),
        KeyCode::Char(' ') => form.params.include_negative = !form.params.include_negative,
        KeyCode::Enter => {
            app.start_query(QueryTrigger::Manual);
        }
        _ => {}
    }
}

fn handle_rankings_key(app: &mut AppState, key: KeyEvent) {
    let len = app.results.table.visible_len();
    match key.code {
        KeyCode::Char('j') | KeyCode::Down => {
            if app.results.cursor + 1 < len {
                app.results.cursor += 1;
            }
        }
        KeyCode::Char('k') | KeyCode::Up => {
            app.results.cursor = app.results.cursor.saturating_sub(1);
        }
        KeyCode::PageDown => {
            app.results.cursor = (app.results.cursor + PAGE).min(len.saturating_sub(1));
        }
        KeyCode::PageUp => {
            app.results.cursor = app.results.cursor.saturating_sub(PAGE);
        }
        KeyCode::Char('g') | KeyCode::Home => app.results.cursor = 0,
        KeyCode::Char('G') | KeyCode::End => app.results.cursor = len.saturating_sub(1),
        KeyCode::Char('s') => app.results.cycle_sort_column(),
        KeyCode::Char('o') => app.results.flip_sort_direction(),
        KeyCode::Char('c') => {
            app.results.table.clear_sort();
            app.set_status("Sort cleared");
        }
        KeyCode::Char('/') => {
            app.overlay = Overlay::Filter;
        }
        KeyCode::Char('x') => {
            app.export_input = app.default_export_path().display().to_string();
            app.overlay = Overlay::Export;
        }
        KeyCode::Enter => {
            if let Some(id) = app.results.selected_id() {
                app.overlay = Overlay::Detail(id);
            }
        }
        KeyCode::Esc => {
            if !app.filter_input.is_empty() {
                app.filter_input.clear();
                app.update_filter();
            }
        }
        _ => {}
    }
}

fn handle_help_key(app: &mut AppState, key: KeyEvent) {
    if key.code == KeyCode::Char('e') {
        app.error_scroll = 0;
        app.overlay = Overlay::ErrorHistory;
    }
}
