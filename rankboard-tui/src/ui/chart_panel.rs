//! Panel 3 (Charts): top and bottom performers as horizontal bars.
//!
//! Both charts share one scale so bar lengths compare across them. Gains
//! draw to the right of the zero column and losses to the left.

use ratatui::Frame;
use ratatui::buffer::Buffer;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::Style;
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph, Widget};

use rankboard_core::chart::BarDatum;

use crate::app::AppState;
use crate::theme::{self, Theme};

/// Columns reserved for the ticker label on the left of each bar.
const LABEL_WIDTH: u16 = 9;
/// Columns reserved for the value text on the right of each bar.
const VALUE_WIDTH: u16 = 9;

pub fn render(f: &mut Frame, area: Rect, app: &AppState) {
    let Some(chart) = &app.results.chart else {
        render_empty(f, area);
        return;
    };

    let halves = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(area);

    let scale = chart.max_abs_pct();
    let theme = Theme::default();
    f.render_widget(
        PerformerBars::new(" Top performers ", &chart.top, scale, &theme),
        halves[0],
    );
    f.render_widget(
        PerformerBars::new(" Bottom performers ", &chart.bottom, scale, &theme),
        halves[1],
    );
}

fn render_empty(f: &mut Frame, area: Rect) {
    let lines = vec![
        Line::from(""),
        Line::from(""),
        Line::from(Span::styled("No data", theme::warning())),
        Line::from(""),
        Line::from(Span::styled(
            "Run a query from panel 1 (press r) to chart the best and worst performers.",
            theme::muted(),
        )),
    ];
    f.render_widget(Paragraph::new(lines), area);
}

/// Horizontal bar chart widget, one row per ticker.
pub struct PerformerBars<'a> {
    title: &'a str,
    bars: &'a [BarDatum],
    /// Absolute percentage that maps to a full half-width bar.
    scale: f64,
    theme: &'a Theme,
}

impl<'a> PerformerBars<'a> {
    pub fn new(title: &'a str, bars: &'a [BarDatum], scale: f64, theme: &'a Theme) -> Self {
        Self {
            title,
            bars,
            scale,
            theme,
        }
    }
}

impl<'a> Widget for PerformerBars<'a> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let block = Block::default()
            .title(self.title)
            .borders(Borders::ALL)
            .border_style(Style::default().fg(self.theme.neutral))
            .style(Style::default().bg(self.theme.background));

        let inner = block.inner(area);
        block.render(area, buf);

        if inner.width <= LABEL_WIDTH + VALUE_WIDTH + 2 || inner.height == 0 {
            return;
        }
        if self.bars.is_empty() {
            buf.set_string(
                inner.x,
                inner.y,
                "No data",
                Style::default().fg(self.theme.warning),
            );
            return;
        }

        let plot_left = inner.x + LABEL_WIDTH;
        let plot_width = inner.width - LABEL_WIDTH - VALUE_WIDTH;
        let half = (plot_width / 2).max(1);
        let zero_x = plot_left + half;

        for (row, bar) in self.bars.iter().take(inner.height as usize).enumerate() {
            let y = inner.y + row as u16;
            let color = self.theme.pnl_color(bar.value_pct);

            buf.set_string(
                inner.x,
                y,
                format!("{:<width$}", bar.ticker, width = LABEL_WIDTH as usize - 1),
                Style::default().fg(self.theme.text_primary),
            );

            let len = bar_len(bar.value_pct, self.scale, half);
            let start = if bar.value_pct >= 0.0 { zero_x } else { zero_x - len };
            for x in start..start + len {
                buf.set_string(x, y, "█", Style::default().fg(color));
            }
            if len == 0 {
                buf.set_string(zero_x, y, "│", Style::default().fg(self.theme.muted));
            }

            buf.set_string(
                plot_left + plot_width + 1,
                y,
                format!("{:+.2}%", bar.value_pct),
                Style::default().fg(color),
            );
        }
    }
}

/// Bar length in cells; any non-zero value gets at least one cell.
fn bar_len(value_pct: f64, scale: f64, half: u16) -> u16 {
    if scale <= 0.0 || value_pct == 0.0 {
        return 0;
    }
    let frac = (value_pct.abs() / scale).min(1.0);
    ((frac * half as f64).round() as u16).clamp(1, half)
}
