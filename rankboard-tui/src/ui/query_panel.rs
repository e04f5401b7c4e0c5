//! Panel 1 (Query): frequency, date window, top N and the positive-only switch.

use ratatui::Frame;
use ratatui::layout::Rect;
use ratatui::style::Modifier;
use ratatui::text::{Line, Span};
use ratatui::widgets::Paragraph;

use crate::app::{AppState, QueryField};
use crate::theme;

pub fn render(f: &mut Frame, area: Rect, app: &AppState) {
    let form = &app.query;
    let p = &form.params;
    let mut lines: Vec<Line> = Vec::new();

    lines.push(Line::from(Span::styled(
        "  [j/k]field [h/l]adjust [H/L]±1 month [Space]negatives [Enter/r]run",
        theme::muted(),
    )));
    lines.push(Line::from(""));

    for (i, field) in QueryField::ALL.iter().enumerate() {
        let value = match field {
            QueryField::Frequency => p.frequency.label().to_string(),
            QueryField::StartDate => p.start_date.to_string(),
            QueryField::EndDate => p.end_date.to_string(),
            QueryField::TopN => p.top_n.to_string(),
            QueryField::IncludeNegative => {
                if p.include_negative { "[x] yes" } else { "[ ] no (positive only)" }.to_string()
            }
        };
        let is_cursor = i == form.cursor;
        let marker = if is_cursor { "▸ " } else { "  " };
        let value_style = if is_cursor {
            theme::accent().add_modifier(Modifier::REVERSED)
        } else {
            theme::accent()
        };
        lines.push(Line::from(vec![
            Span::styled(marker, theme::accent()),
            Span::styled(format!("{:<18}", field.label()), theme::muted()),
            Span::styled(format!(" {value} "), value_style),
        ]));
    }

    lines.push(Line::from(""));
    if p.start_date > p.end_date {
        lines.push(Line::from(Span::styled(
            "  Start date is after end date",
            theme::warning(),
        )));
    }

    // Source and query state
    let db = &app.config.database;
    lines.push(Line::from(vec![
        Span::styled("  Database: ", theme::muted()),
        Span::styled(db.path.display().to_string(), theme::secondary()),
        Span::styled(
            format!("  ({} / {})", db.returns_table, db.names_table),
            theme::muted(),
        ),
    ]));
    let state = match (&app.progress, app.query_running()) {
        (Some(msg), _) => Span::styled(msg.clone(), theme::warning()),
        (None, true) => Span::styled("running...", theme::warning()),
        (None, false) => Span::styled("idle", theme::positive()),
    };
    lines.push(Line::from(vec![Span::styled("  Query: ", theme::muted()), state]));

    let refresh = if app.refresh.enabled {
        format!(
            "on, every {}s (next in {}s)",
            app.refresh.interval.as_secs(),
            app.refresh.remaining(std::time::Instant::now()).as_secs()
        )
    } else {
        "off [a] to enable".to_string()
    };
    lines.push(Line::from(vec![
        Span::styled("  Auto-refresh: ", theme::muted()),
        Span::styled(refresh, theme::neutral()),
    ]));

    f.render_widget(Paragraph::new(lines), area);
}
