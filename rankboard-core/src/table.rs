//! Rank table model: formatted cells that sort by their underlying value.
//!
//! Every cell carries the text shown to the user and a separate [`SortKey`].
//! Sorting only ever looks at the key, so `"-5.00"` orders before `"10.00"`
//! even though it does not as a string. The model is independent of any UI
//! toolkit; the TUI renders [`RankTable::visible_rows`].
//!
//! Filtering hides rows instead of removing them, so row ids and the current
//! sort survive filter edits.

use std::cmp::Ordering;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::domain::{format_signed_pct, ReturnRecord};

/// Value a cell sorts by.
#[derive(Debug, Clone, PartialEq)]
pub enum SortKey {
    Text(String),
    Number(f64),
    Date(NaiveDate),
}

impl SortKey {
    fn variant_rank(&self) -> u8 {
        match self {
            SortKey::Number(_) => 0,
            SortKey::Date(_) => 1,
            SortKey::Text(_) => 2,
        }
    }

    pub fn compare(&self, other: &SortKey) -> Ordering {
        match (self, other) {
            (SortKey::Number(a), SortKey::Number(b)) => a.total_cmp(b),
            (SortKey::Date(a), SortKey::Date(b)) => a.cmp(b),
            (SortKey::Text(a), SortKey::Text(b)) => a.cmp(b),
            _ => self.variant_rank().cmp(&other.variant_rank()),
        }
    }
}

/// A displayed cell plus the key it sorts by.
#[derive(Debug, Clone, PartialEq)]
pub struct Cell {
    pub display: String,
    pub key: SortKey,
}

impl Cell {
    pub fn text(s: impl Into<String>) -> Self {
        let s = s.into();
        Self {
            key: SortKey::Text(s.clone()),
            display: s,
        }
    }

    pub fn number(display: impl Into<String>, value: f64) -> Self {
        Self {
            display: display.into(),
            key: SortKey::Number(value),
        }
    }

    /// Signed percentage cell, e.g. `+1.23`, keyed on the percentage.
    pub fn pct(value_pct: f64) -> Self {
        Self::number(format_signed_pct(value_pct), value_pct)
    }

    pub fn date(d: NaiveDate) -> Self {
        Self {
            display: d.to_string(),
            key: SortKey::Date(d),
        }
    }
}

/// Table columns, in display order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Column {
    Rank,
    Ticker,
    Name,
    LatestReturn,
    LatestDate,
    AvgReturn,
    DataPoints,
    Period,
}

impl Column {
    pub const ALL: [Column; 8] = [
        Column::Rank,
        Column::Ticker,
        Column::Name,
        Column::LatestReturn,
        Column::LatestDate,
        Column::AvgReturn,
        Column::DataPoints,
        Column::Period,
    ];

    pub fn index(self) -> usize {
        Column::ALL.iter().position(|c| *c == self).unwrap_or(0)
    }

    pub fn label(self) -> &'static str {
        match self {
            Column::Rank => "#",
            Column::Ticker => "Ticker",
            Column::Name => "Name",
            Column::LatestReturn => "Latest %",
            Column::LatestDate => "Latest Date",
            Column::AvgReturn => "Avg %",
            Column::DataPoints => "Points",
            Column::Period => "Period",
        }
    }

    pub fn is_numeric(self) -> bool {
        matches!(
            self,
            Column::Rank | Column::LatestReturn | Column::AvgReturn | Column::DataPoints
        )
    }

    pub fn next(self) -> Column {
        Column::ALL[(self.index() + 1) % Column::ALL.len()]
    }

    /// Direction a fresh sort on this column starts in: rank 1 first,
    /// largest values first for other numeric columns, A-Z for text.
    pub fn initial_direction(self) -> SortDirection {
        match self {
            Column::Rank => SortDirection::Ascending,
            c if c.is_numeric() => SortDirection::Descending,
            _ => SortDirection::Ascending,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SortDirection {
    Ascending,
    Descending,
}

impl SortDirection {
    pub fn flip(self) -> SortDirection {
        match self {
            SortDirection::Ascending => SortDirection::Descending,
            SortDirection::Descending => SortDirection::Ascending,
        }
    }

    pub fn arrow(self) -> &'static str {
        match self {
            SortDirection::Ascending => "▲",
            SortDirection::Descending => "▼",
        }
    }
}

/// One table row. `id` is its position in the populated record set.
#[derive(Debug, Clone)]
pub struct TableRow {
    pub id: usize,
    cells: Vec<Cell>,
    ticker_lower: String,
    name_lower: String,
}

impl TableRow {
    fn from_record(id: usize, record: &ReturnRecord) -> Self {
        let cells = vec![
            Cell::number((id + 1).to_string(), (id + 1) as f64),
            Cell::text(&record.ticker),
            Cell::text(&record.name),
            Cell::pct(record.latest_return_pct()),
            Cell::date(record.latest_date),
            Cell::pct(record.avg_return_pct()),
            Cell::number(record.data_points.to_string(), f64::from(record.data_points)),
            Cell::text(format!("{} ~ {}", record.first_date, record.last_date)),
        ];
        Self {
            id,
            cells,
            ticker_lower: record.ticker.to_lowercase(),
            name_lower: record.name.to_lowercase(),
        }
    }

    pub fn cell(&self, column: Column) -> &Cell {
        &self.cells[column.index()]
    }

    pub fn ticker(&self) -> &str {
        &self.cell(Column::Ticker).display
    }

    fn matches(&self, needle_lower: &str) -> bool {
        needle_lower.is_empty()
            || self.ticker_lower.contains(needle_lower)
            || self.name_lower.contains(needle_lower)
    }
}

/// Sortable, filterable view over the current result set.
#[derive(Debug, Clone)]
pub struct RankTable {
    rows: Vec<TableRow>,
    /// Row indices in display order.
    order: Vec<usize>,
    hidden: Vec<bool>,
    filter_lower: String,
    sort: Option<(Column, SortDirection)>,
    sorting_enabled: bool,
    sort_pending: bool,
    sort_passes: usize,
}

impl Default for RankTable {
    fn default() -> Self {
        Self::new()
    }
}

impl RankTable {
    pub fn new() -> Self {
        Self {
            rows: Vec::new(),
            order: Vec::new(),
            hidden: Vec::new(),
            filter_lower: String::new(),
            sort: None,
            sorting_enabled: true,
            sort_pending: false,
            sort_passes: 0,
        }
    }

    /// Replace all rows. Sorting is suspended while rows are inserted and the
    /// current sort is applied once at the end.
    pub fn populate(&mut self, records: &[ReturnRecord]) {
        self.set_sorting_enabled(false);
        self.rows.clear();
        self.order.clear();
        self.hidden.clear();
        for record in records {
            self.insert(record);
        }
        self.set_sorting_enabled(true);
    }

    fn insert(&mut self, record: &ReturnRecord) {
        let id = self.rows.len();
        let row = TableRow::from_record(id, record);
        self.hidden.push(!row.matches(&self.filter_lower));
        self.rows.push(row);
        self.order.push(id);
        self.request_sort();
    }

    pub fn set_sorting_enabled(&mut self, enabled: bool) {
        self.sorting_enabled = enabled;
        if enabled && self.sort_pending {
            self.apply_sort();
        }
    }

    pub fn sorting_enabled(&self) -> bool {
        self.sorting_enabled
    }

    pub fn sort_by(&mut self, column: Column, direction: SortDirection) {
        self.sort = Some((column, direction));
        self.request_sort();
    }

    /// Same column flips direction; a new column starts in its
    /// [`Column::initial_direction`].
    pub fn toggle_sort(&mut self, column: Column) {
        let direction = match self.sort {
            Some((current, dir)) if current == column => dir.flip(),
            _ => column.initial_direction(),
        };
        self.sort_by(column, direction);
    }

    /// Drop any sort and restore population order.
    pub fn clear_sort(&mut self) {
        self.sort = None;
        self.order.sort_unstable();
    }

    pub fn sort_state(&self) -> Option<(Column, SortDirection)> {
        self.sort
    }

    /// Number of sort passes performed so far.
    pub fn sort_passes(&self) -> usize {
        self.sort_passes
    }

    fn request_sort(&mut self) {
        if self.sort.is_none() {
            return;
        }
        if self.sorting_enabled {
            self.apply_sort();
        } else {
            self.sort_pending = true;
        }
    }

    fn apply_sort(&mut self) {
        self.sort_pending = false;
        let Some((column, direction)) = self.sort else {
            return;
        };
        let rows = &self.rows;
        self.order.sort_by(|&a, &b| {
            let ord = rows[a].cell(column).key.compare(&rows[b].cell(column).key);
            let ord = match direction {
                SortDirection::Ascending => ord,
                SortDirection::Descending => ord.reverse(),
            };
            ord.then_with(|| a.cmp(&b))
        });
        self.sort_passes += 1;
    }

    /// Hide rows whose ticker and name both lack `text` (case-insensitive).
    pub fn set_filter(&mut self, text: &str) {
        self.filter_lower = text.trim().to_lowercase();
        for (row, hidden) in self.rows.iter().zip(self.hidden.iter_mut()) {
            *hidden = !row.matches(&self.filter_lower);
        }
    }

    pub fn filter(&self) -> &str {
        &self.filter_lower
    }

    pub fn is_hidden(&self, id: usize) -> bool {
        self.hidden.get(id).copied().unwrap_or(true)
    }

    pub fn row(&self, id: usize) -> Option<&TableRow> {
        self.rows.get(id)
    }

    /// Visible rows in display order.
    pub fn visible_rows(&self) -> impl Iterator<Item = &TableRow> + '_ {
        self.order
            .iter()
            .filter(|&&i| !self.hidden[i])
            .map(|&i| &self.rows[i])
    }

    pub fn visible_row(&self, position: usize) -> Option<&TableRow> {
        self.visible_rows().nth(position)
    }

    pub fn visible_len(&self) -> usize {
        self.hidden.iter().filter(|h| !**h).count()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}
