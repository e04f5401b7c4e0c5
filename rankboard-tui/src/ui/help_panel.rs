//! Panel 4 (Help): keyboard shortcuts.

use ratatui::Frame;
use ratatui::layout::Rect;
use ratatui::text::{Line, Span};
use ratatui::widgets::Paragraph;

use crate::app::AppState;
use crate::theme;

pub fn render(f: &mut Frame, area: Rect, app: &AppState) {
    let mut lines: Vec<Line> = Vec::new();

    section(&mut lines, "Global Navigation");
    key(&mut lines, "1-4", "Switch to panel by number");
    key(&mut lines, "Tab / Shift+Tab", "Cycle panels forward / back");
    key(&mut lines, "r", "Run the query (replaces one already running)");
    key(&mut lines, "a", "Toggle auto-refresh");
    key(&mut lines, "q", "Quit");
    lines.push(Line::from(""));

    section(&mut lines, "Panel 1 — Query");
    key(&mut lines, "j / k", "Move between fields");
    key(&mut lines, "h / l", "Adjust field (dates by one day)");
    key(&mut lines, "H / L", "Move dates by one month");
    key(&mut lines, "Space", "Toggle include negative returns");
    key(&mut lines, "Enter", "Run the query");
    lines.push(Line::from(""));

    section(&mut lines, "Panel 2 — Rankings");
    key(&mut lines, "j / k, PgUp / PgDn", "Move cursor");
    key(&mut lines, "s", "Sort by the next column");
    key(&mut lines, "o", "Reverse sort order");
    key(&mut lines, "c", "Clear sort (back to rank order)");
    key(&mut lines, "/", "Filter by ticker or name (live)");
    key(&mut lines, "x", "Export to .csv or .xlsx");
    key(&mut lines, "Enter", "Show row detail");
    lines.push(Line::from(""));

    section(&mut lines, "Panel 3 — Charts");
    key(&mut lines, "", "Top and bottom performers by latest return");
    lines.push(Line::from(""));

    section(&mut lines, "Panel 4 — Help (this panel)");
    key(&mut lines, "e", "Open error history overlay");
    lines.push(Line::from(""));

    lines.push(Line::from(vec![
        Span::styled("  Errors this session: ", theme::muted()),
        Span::styled(
            app.error_history.len().to_string(),
            if app.error_history.is_empty() { theme::positive() } else { theme::negative() },
        ),
    ]));

    let para = Paragraph::new(lines);
    f.render_widget(para, area);
}

fn section<'a>(lines: &mut Vec<Line<'a>>, title: &str) {
    lines.push(Line::from(Span::styled(title.to_string(), theme::accent_bold())));
}

fn key<'a>(lines: &mut Vec<Line<'a>>, keys: &str, desc: &str) {
    lines.push(Line::from(vec![
        Span::styled(format!("  {:>20}  ", keys), theme::accent()),
        Span::styled(desc.to_string(), theme::muted()),
    ]));
}
