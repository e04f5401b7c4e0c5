//! Bottom status bar: query state, last status message, panel hints.

use ratatui::Frame;
use ratatui::layout::Rect;
use ratatui::text::{Line, Span};
use ratatui::widgets::Paragraph;

use crate::app::{AppState, StatusLevel};
use crate::theme;

pub fn render(f: &mut Frame, area: Rect, app: &AppState) {
    let mut spans: Vec<Span> = Vec::new();

    // Panel hints
    spans.push(Span::styled(
        " 1:Query 2:Rankings 3:Charts 4:Help",
        theme::muted(),
    ));
    spans.push(Span::raw(" | "));

    if app.query_running() {
        spans.push(Span::styled("● running ", theme::warning()));
    } else if let Some(at) = app.results.received_at {
        spans.push(Span::styled(
            format!("updated {} ", at.format("%H:%M:%S")),
            theme::muted(),
        ));
    }
    if app.refresh.enabled {
        spans.push(Span::styled("⟳ ", theme::neutral()));
    }

    // Status message
    if let Some((msg, level)) = &app.status_message {
        let style = match level {
            StatusLevel::Info => theme::accent(),
            StatusLevel::Warning => theme::warning(),
            StatusLevel::Error => theme::negative(),
        };
        spans.push(Span::styled(msg.as_str(), style));
    }

    let line = Line::from(spans);
    let para = Paragraph::new(line);
    f.render_widget(para, area);
}
