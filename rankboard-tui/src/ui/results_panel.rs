//! Panel 2 (Rankings): sortable, filterable table of the current result set.

use ratatui::Frame;
use ratatui::layout::Rect;
use ratatui::style::Modifier;
use ratatui::text::{Line, Span};
use ratatui::widgets::Paragraph;

use rankboard_core::table::{SortKey, TableRow};
use rankboard_core::Column;

use crate::app::AppState;
use crate::theme;
use crate::ui::truncate;

/// Rows taken by the header block above the table body.
const HEADER_ROWS: u16 = 3;

fn width(column: Column) -> usize {
    match column {
        Column::Rank => 4,
        Column::Ticker => 8,
        Column::Name => 22,
        Column::LatestReturn => 9,
        Column::LatestDate => 11,
        Column::AvgReturn => 9,
        Column::DataPoints => 6,
        Column::Period => 23,
    }
}

pub fn render(f: &mut Frame, area: Rect, app: &AppState) {
    let r = &app.results;
    let table = &r.table;
    let mut lines: Vec<Line> = Vec::new();

    // Summary line
    let mut summary = vec![];
    match &r.set {
        Some(set) => {
            summary.push(Span::styled(
                format!("{} | ", set.params.describe()),
                theme::muted(),
            ));
            summary.push(Span::styled(
                format!("{}/{} rows", table.visible_len(), table.len()),
                theme::accent(),
            ));
            if set.truncated {
                summary.push(Span::styled(
                    format!(" (middle of {} hidden)", set.total_matched),
                    theme::warning(),
                ));
            }
        }
        None => summary.push(Span::styled("No results", theme::muted())),
    }
    if !table.filter().is_empty() {
        summary.push(Span::styled(
            format!("  filter: \"{}\"", table.filter()),
            theme::neutral(),
        ));
    }
    lines.push(Line::from(summary));
    lines.push(Line::from(Span::styled(
        "  [j/k]move [s]ort column [o]rder [c]lear sort [/]filter [x]export [Enter]detail",
        theme::muted(),
    )));

    if table.is_empty() {
        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled(
            "No rankings yet. Set up a query in panel 1 and press r.",
            theme::muted(),
        )));
        f.render_widget(Paragraph::new(lines), area);
        return;
    }

    // Column headers, with the sort arrow on the sorted column
    let sort = table.sort_state();
    let header: Vec<Span> = Column::ALL
        .iter()
        .map(|&column| {
            let mut label = column.label().to_string();
            if let Some((sorted, direction)) = sort {
                if sorted == column {
                    label.push_str(direction.arrow());
                }
            }
            Span::styled(pad(&label, column), theme::accent_bold())
        })
        .collect();
    lines.push(Line::from(header));

    if table.visible_len() == 0 {
        lines.push(Line::from(Span::styled(
            "No rows match the filter.",
            theme::warning(),
        )));
        f.render_widget(Paragraph::new(lines), area);
        return;
    }

    // Keep the cursor row in view.
    let visible_height = area.height.saturating_sub(HEADER_ROWS).max(1) as usize;
    let start = (r.cursor + 1).saturating_sub(visible_height);

    for (i, row) in table.visible_rows().enumerate().skip(start).take(visible_height) {
        lines.push(row_line(row, i == r.cursor));
    }

    f.render_widget(Paragraph::new(lines), area);
}

fn row_line(row: &TableRow, is_cursor: bool) -> Line<'static> {
    let base = if is_cursor {
        theme::accent().add_modifier(Modifier::REVERSED)
    } else {
        theme::secondary()
    };
    let spans: Vec<Span> = Column::ALL
        .iter()
        .map(|&column| {
            let cell = row.cell(column);
            let style = match (&cell.key, is_cursor) {
                (SortKey::Number(v), false)
                    if matches!(column, Column::LatestReturn | Column::AvgReturn) =>
                {
                    theme::return_style(*v)
                }
                _ => base,
            };
            Span::styled(pad(&cell.display, column), style)
        })
        .collect();
    Line::from(spans)
}

fn pad(text: &str, column: Column) -> String {
    let w = width(column);
    let text = truncate(text, w);
    if column.is_numeric() {
        format!("{text:>w$} ")
    } else {
        format!("{text:<w$} ")
    }
}
