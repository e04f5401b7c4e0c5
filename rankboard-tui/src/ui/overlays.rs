//! Overlay widgets: welcome, row detail, error dialog, error history, prompts.

use ratatui::Frame;
use ratatui::layout::Rect;
use ratatui::style::Modifier;
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Clear, Paragraph, Wrap};

use rankboard_core::domain::format_signed_pct;

use crate::app::AppState;
use crate::theme;
use crate::ui::centered_rect;

/// First-run welcome overlay.
pub fn render_welcome(f: &mut Frame, area: Rect) {
    let popup = centered_rect(60, 40, area);
    f.render_widget(Clear, popup);

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(theme::accent())
        .title(" Welcome to Rankboard ")
        .title_style(theme::accent_bold());

    let text = vec![
        Line::from(""),
        Line::from(Span::styled("Getting started:", theme::accent_bold())),
        Line::from(""),
        Line::from(Span::styled(
            "  1. Press 1 and pick a frequency and date window",
            theme::muted(),
        )),
        Line::from(Span::styled("  2. Press r to run the ranking", theme::muted())),
        Line::from(Span::styled(
            "  3. Press 2 for the table, 3 for the charts",
            theme::muted(),
        )),
        Line::from(Span::styled(
            "  4. In the table, x exports to CSV or Excel",
            theme::muted(),
        )),
        Line::from(""),
        Line::from(Span::styled("Press any key to dismiss...", theme::neutral())),
    ];

    let para = Paragraph::new(text).block(block).wrap(Wrap { trim: true });
    f.render_widget(para, popup);
}

/// Blocking error dialog: title, message and how to dismiss it.
pub fn render_error_dialog(f: &mut Frame, area: Rect, title: &str, message: &str) {
    let popup = centered_rect(60, 30, area);
    f.render_widget(Clear, popup);

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(theme::negative())
        .title(format!(" {title} "))
        .title_style(theme::negative().add_modifier(Modifier::BOLD));

    let text = vec![
        Line::from(""),
        Line::from(Span::styled(message, theme::negative())),
        Line::from(""),
        Line::from(Span::styled(
            "[Enter/Esc] dismiss  (Help panel: e for history)",
            theme::muted(),
        )),
    ];

    let para = Paragraph::new(text).block(block).wrap(Wrap { trim: true });
    f.render_widget(para, popup);
}

/// Error history overlay.
pub fn render_error_history(f: &mut Frame, area: Rect, app: &AppState) {
    let popup = centered_rect(80, 70, area);
    f.render_widget(Clear, popup);

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(theme::negative())
        .title(format!(
            " Error History ({}) [Esc]close [j/k]scroll ",
            app.error_history.len()
        ))
        .title_style(theme::negative());

    let inner = block.inner(popup);
    f.render_widget(block, popup);

    if app.error_history.is_empty() {
        let text = Paragraph::new(Span::styled("No errors recorded.", theme::muted()));
        f.render_widget(text, inner);
        return;
    }

    let mut lines: Vec<Line> = Vec::new();
    for (i, err) in app
        .error_history
        .iter()
        .enumerate()
        .skip(app.error_scroll)
        .take(inner.height as usize)
    {
        let style = if i == app.error_scroll {
            theme::negative().add_modifier(Modifier::BOLD)
        } else {
            theme::muted()
        };

        lines.push(Line::from(vec![
            Span::styled(
                format!("[{}] ", err.timestamp.format("%H:%M:%S")),
                theme::muted(),
            ),
            Span::styled(format!("[{}] ", err.category.label()), theme::warning()),
            Span::styled(err.message.as_str(), style),
        ]));

        if !err.context.is_empty() {
            lines.push(Line::from(vec![
                Span::raw("  "),
                Span::styled(err.context.as_str(), theme::muted()),
            ]));
        }
    }

    f.render_widget(Paragraph::new(lines), inner);
}

/// Single-line text prompt, used for the filter and the export path.
pub fn render_prompt(f: &mut Frame, area: Rect, title: &str, label: &str, input: &str) {
    let popup = centered_rect(60, 20, area);
    f.render_widget(Clear, popup);

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(theme::accent())
        .title(title)
        .title_style(theme::accent_bold());

    let inner = block.inner(popup);
    f.render_widget(block, popup);

    let text = vec![
        Line::from(""),
        Line::from(Span::styled(label, theme::muted())),
        Line::from(""),
        Line::from(vec![
            Span::styled("> ", theme::accent()),
            Span::styled(input, theme::accent_bold()),
            Span::styled("_", theme::accent()),
        ]),
    ];

    f.render_widget(Paragraph::new(text), inner);
}

/// Detail overlay for one ranking row.
pub fn render_detail(f: &mut Frame, area: Rect, app: &AppState, id: usize) {
    let popup = centered_rect(60, 60, area);
    f.render_widget(Clear, popup);

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(theme::accent())
        .title(" Ticker Detail [Esc]close ")
        .title_style(theme::accent_bold());

    let inner = block.inner(popup);
    f.render_widget(block, popup);

    let Some(record) = app.results.set.as_ref().and_then(|s| s.records.get(id)) else {
        let text = Paragraph::new(Span::styled("Entry not found.", theme::muted()));
        f.render_widget(text, inner);
        return;
    };

    let mut lines: Vec<Line> = Vec::new();
    lines.push(Line::from(vec![
        Span::styled(format!("#{} ", id + 1), theme::neutral()),
        Span::styled(record.ticker.as_str(), theme::accent_bold()),
        Span::raw("  "),
        Span::styled(record.name.as_str(), theme::secondary()),
    ]));
    lines.push(Line::from(""));

    let latest = record.latest_return_pct();
    let avg = record.avg_return_pct();
    metric_pct(&mut lines, "Latest return", latest);
    metric_line(&mut lines, "Latest date", &record.latest_date.to_string());
    metric_pct(&mut lines, "Average return", avg);
    metric_line(&mut lines, "Data points", &record.data_points.to_string());
    metric_line(
        &mut lines,
        "Period",
        &format!("{} ~ {}", record.first_date, record.last_date),
    );

    let para = Paragraph::new(lines).wrap(Wrap { trim: false });
    f.render_widget(para, inner);
}

fn metric_line(lines: &mut Vec<Line<'_>>, label: &str, value: &str) {
    lines.push(Line::from(vec![
        Span::styled(format!("  {:<18}", label), theme::muted()),
        Span::styled(value.to_string(), theme::accent()),
    ]));
}

fn metric_pct(lines: &mut Vec<Line<'_>>, label: &str, pct: f64) {
    lines.push(Line::from(vec![
        Span::styled(format!("  {:<18}", label), theme::muted()),
        Span::styled(format!("{}%", format_signed_pct(pct)), theme::return_style(pct)),
    ]));
}
