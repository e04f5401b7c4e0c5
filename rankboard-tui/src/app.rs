//! Application state: single-owner, main-thread only.
//!
//! All TUI state lives here. The worker thread communicates via channels and
//! its responses are applied through [`AppState::apply_response`].

use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{Receiver, Sender};
use std::time::{Duration, Instant};

use chrono::{Local, Months, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use rankboard_core::chart::{performer_chart, PerformerChart, DEFAULT_BARS};
use rankboard_core::domain::{MAX_TOP_N, MIN_TOP_N};
use rankboard_core::export::export_records;
use rankboard_core::{AppConfig, Column, QueryParams, RankTable, RankedSet, SortDirection};

use crate::worker::{QueryGeneration, WorkerCommand, WorkerResponse};

/// Which panel is active.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Panel {
    Query,
    Rankings,
    Charts,
    Help,
}

impl Panel {
    const ALL: [Panel; 4] = [Panel::Query, Panel::Rankings, Panel::Charts, Panel::Help];

    pub fn index(self) -> usize {
        match self {
            Panel::Query => 0,
            Panel::Rankings => 1,
            Panel::Charts => 2,
            Panel::Help => 3,
        }
    }

    pub fn from_index(i: usize) -> Option<Self> {
        Panel::ALL.get(i).copied()
    }

    pub fn label(self) -> &'static str {
        match self {
            Panel::Query => "Query",
            Panel::Rankings => "Rankings",
            Panel::Charts => "Charts",
            Panel::Help => "Help",
        }
    }

    pub fn next(self) -> Panel {
        Panel::ALL[(self.index() + 1) % Panel::ALL.len()]
    }

    pub fn prev(self) -> Panel {
        Panel::ALL[(self.index() + Panel::ALL.len() - 1) % Panel::ALL.len()]
    }
}

/// Status message severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusLevel {
    Info,
    Warning,
    Error,
}

/// An error record for the error history overlay.
#[derive(Debug, Clone)]
pub struct ErrorRecord {
    pub timestamp: NaiveDateTime,
    pub category: ErrorCategory,
    pub message: String,
    pub context: String,
}

/// Error category for display.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Query,
    Export,
    Other,
}

impl ErrorCategory {
    pub fn label(self) -> &'static str {
        match self {
            ErrorCategory::Query => "SQL",
            ErrorCategory::Export => "EXP",
            ErrorCategory::Other => "ERR",
        }
    }
}

/// Editable fields of the query form, in display order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryField {
    Frequency,
    StartDate,
    EndDate,
    TopN,
    IncludeNegative,
}

impl QueryField {
    pub const ALL: [QueryField; 5] = [
        QueryField::Frequency,
        QueryField::StartDate,
        QueryField::EndDate,
        QueryField::TopN,
        QueryField::IncludeNegative,
    ];

    pub fn label(self) -> &'static str {
        match self {
            QueryField::Frequency => "Frequency",
            QueryField::StartDate => "Start date",
            QueryField::EndDate => "End date",
            QueryField::TopN => "Top / bottom N",
            QueryField::IncludeNegative => "Include negative",
        }
    }
}

/// Step applied to top N per key press.
const TOP_N_STEP: usize = 5;

/// Query panel state: the parameters of the next query.
#[derive(Debug, Clone)]
pub struct QueryFormState {
    pub params: QueryParams,
    pub cursor: usize,
}

impl QueryFormState {
    pub fn new(params: QueryParams) -> Self {
        Self { params, cursor: 0 }
    }

    pub fn field(&self) -> QueryField {
        QueryField::ALL[self.cursor.min(QueryField::ALL.len() - 1)]
    }

    /// Adjust the focused field. `big` moves dates by a month instead of a day.
    pub fn adjust(&mut self, direction: i32, big: bool) {
        let field = self.field();
        let p = &mut self.params;
        match field {
            QueryField::Frequency => {
                p.frequency = if direction > 0 { p.frequency.next() } else { p.frequency.prev() };
            }
            QueryField::StartDate => p.start_date = shift_date(p.start_date, direction, big),
            QueryField::EndDate => p.end_date = shift_date(p.end_date, direction, big),
            QueryField::TopN => {
                let next = p.top_n as i64 + direction as i64 * TOP_N_STEP as i64;
                p.top_n = next.clamp(MIN_TOP_N as i64, MAX_TOP_N as i64) as usize;
            }
            QueryField::IncludeNegative => p.include_negative = !p.include_negative,
        }
    }
}

fn shift_date(date: NaiveDate, direction: i32, big: bool) -> NaiveDate {
    let shifted = if big {
        if direction > 0 {
            date.checked_add_months(Months::new(1))
        } else {
            date.checked_sub_months(Months::new(1))
        }
    } else {
        date.checked_add_signed(chrono::Duration::days(direction.signum() as i64))
    };
    shifted.unwrap_or(date)
}

/// Rankings panel state: the current result set and its table view.
#[derive(Debug, Default)]
pub struct ResultsState {
    pub set: Option<RankedSet>,
    pub table: RankTable,
    pub chart: Option<PerformerChart>,
    pub cursor: usize,
    pub received_at: Option<NaiveDateTime>,
}

impl ResultsState {
    fn replace(&mut self, set: Option<RankedSet>) {
        let records = set.as_ref().map(|s| s.records.as_slice()).unwrap_or(&[]);
        self.table.populate(records);
        self.chart = performer_chart(records, DEFAULT_BARS);
        self.set = set;
        self.cursor = 0;
        self.received_at = Some(Local::now().naive_local());
    }

    /// `s` key: advance the sort to the next column.
    pub fn cycle_sort_column(&mut self) {
        let next = match self.table.sort_state() {
            Some((column, _)) => column.next(),
            None => Column::Rank,
        };
        self.table.toggle_sort(next);
        self.cursor = 0;
    }

    /// `o` key: reverse the current sort, or show the ranking worst first.
    pub fn flip_sort_direction(&mut self) {
        match self.table.sort_state() {
            Some((column, direction)) => self.table.sort_by(column, direction.flip()),
            None => self.table.sort_by(Column::Rank, SortDirection::Descending),
        }
    }

    /// Id of the row under the cursor, if any.
    pub fn selected_id(&self) -> Option<usize> {
        self.table.visible_row(self.cursor).map(|r| r.id)
    }
}

/// Fixed-interval re-query timer.
#[derive(Debug, Clone)]
pub struct RefreshTimer {
    pub enabled: bool,
    pub interval: Duration,
    last: Instant,
}

impl RefreshTimer {
    pub fn new(enabled: bool, interval: Duration, now: Instant) -> Self {
        Self {
            enabled,
            interval,
            last: now,
        }
    }

    pub fn due(&self, now: Instant) -> bool {
        self.enabled && now.saturating_duration_since(self.last) >= self.interval
    }

    pub fn reset(&mut self, now: Instant) {
        self.last = now;
    }

    pub fn toggle(&mut self, now: Instant) -> bool {
        self.enabled = !self.enabled;
        self.last = now;
        self.enabled
    }

    pub fn remaining(&self, now: Instant) -> Duration {
        self.interval
            .saturating_sub(now.saturating_duration_since(self.last))
    }
}

/// What started a query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryTrigger {
    Manual,
    Timer,
}

/// Which overlay (if any) is shown on top.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Overlay {
    None,
    Welcome,
    Detail(usize), // row id in the rank table
    ErrorHistory,
    Filter,
    Export,
    /// Blocking error dialog; dismissed with Enter or Esc.
    ErrorDialog { title: String, message: String },
}

/// Top-level application state.
pub struct AppState {
    // Navigation
    pub active_panel: Panel,
    pub running: bool,

    // Panel states
    pub config: AppConfig,
    pub query: QueryFormState,
    pub results: ResultsState,

    // Worker communication
    pub worker_tx: Sender<WorkerCommand>,
    pub worker_rx: Receiver<WorkerResponse>,
    pub generation: QueryGeneration,
    /// Generation of the query currently running, if any.
    pub in_flight: Option<u64>,
    pub progress: Option<String>,
    pub refresh: RefreshTimer,

    // Cross-cutting
    pub status_message: Option<(String, StatusLevel)>,
    pub error_history: VecDeque<ErrorRecord>,
    pub error_scroll: usize,
    pub overlay: Overlay,
    pub filter_input: String,
    pub export_input: String,
    pub last_export: Option<PathBuf>,
}

impl AppState {
    pub fn new(
        config: AppConfig,
        worker_tx: Sender<WorkerCommand>,
        worker_rx: Receiver<WorkerResponse>,
        generation: QueryGeneration,
    ) -> Self {
        let today = Local::now().date_naive();
        let params = config.query.params_ending(today);
        let refresh = RefreshTimer::new(
            config.refresh.enabled,
            config.refresh.interval(),
            Instant::now(),
        );
        Self {
            active_panel: Panel::Query,
            running: true,
            config,
            query: QueryFormState::new(params),
            results: ResultsState::default(),
            worker_tx,
            worker_rx,
            generation,
            in_flight: None,
            progress: None,
            refresh,
            status_message: None,
            error_history: VecDeque::with_capacity(50),
            error_scroll: 0,
            overlay: Overlay::None,
            filter_input: String::new(),
            export_input: String::new(),
            last_export: None,
        }
    }

    pub fn query_running(&self) -> bool {
        self.in_flight.is_some()
    }

    /// Send the form's parameters to the worker under a fresh generation.
    ///
    /// A manual trigger while a query is running supersedes it; a timer
    /// trigger while a query is running is skipped.
    pub fn start_query(&mut self, trigger: QueryTrigger) -> bool {
        if trigger == QueryTrigger::Timer && self.query_running() {
            return false;
        }
        let params = self.query.params.clone();
        if let Err(e) = params.validate() {
            self.set_warning(e.to_string());
            return false;
        }

        let generation = self.generation.advance();
        let command = WorkerCommand::RunQuery {
            generation,
            params: params.clone(),
            database: self.config.database.clone(),
        };
        if self.worker_tx.send(command).is_err() {
            self.push_error(
                ErrorCategory::Other,
                "background worker is not running".into(),
                params.describe(),
            );
            return false;
        }

        tracing::info!(generation, ?trigger, params = %params.describe(), "query started");
        self.in_flight = Some(generation);
        self.progress = None;
        self.refresh.reset(Instant::now());
        self.set_status(match trigger {
            QueryTrigger::Manual => format!("Querying {}...", params.describe()),
            QueryTrigger::Timer => format!("Auto-refresh: {}...", params.describe()),
        });
        true
    }

    /// Apply one worker response. Responses from superseded queries are dropped.
    pub fn apply_response(&mut self, resp: WorkerResponse) {
        if !self.generation.is_current(resp.generation()) {
            tracing::debug!(generation = resp.generation(), "dropping stale worker response");
            return;
        }
        match resp {
            WorkerResponse::Progress { message, .. } => {
                self.set_status(message.clone());
                self.progress = Some(message);
            }
            WorkerResponse::Ranked { set, .. } => {
                self.in_flight = None;
                self.progress = None;
                let summary = if set.truncated {
                    format!(
                        "{} records ({} matched; showing top and bottom {})",
                        set.len(),
                        set.total_matched,
                        set.params.top_n
                    )
                } else {
                    format!("{} records", set.len())
                };
                self.results.replace(Some(set));
                self.set_status(summary);
            }
            WorkerResponse::NoData { params, .. } => {
                self.in_flight = None;
                self.progress = None;
                self.results.replace(None);
                self.set_warning(format!("No data for {}", params.describe()));
            }
            WorkerResponse::Failed { params, error, .. } => {
                self.in_flight = None;
                self.progress = None;
                self.push_error(ErrorCategory::Query, error.clone(), params.describe());
                self.overlay = Overlay::ErrorDialog {
                    title: "Query error".into(),
                    message: error,
                };
            }
        }
    }

    /// Drain all pending worker responses without blocking.
    pub fn drain_worker(&mut self) {
        while let Ok(resp) = self.worker_rx.try_recv() {
            self.apply_response(resp);
        }
    }

    /// Periodic work: fire the refresh timer when due.
    pub fn tick(&mut self, now: Instant) {
        if self.refresh.due(now) {
            if self.query_running() {
                self.refresh.reset(now);
            } else {
                self.start_query(QueryTrigger::Timer);
            }
        }
    }

    pub fn toggle_auto_refresh(&mut self) {
        let enabled = self.refresh.toggle(Instant::now());
        if enabled {
            self.set_status(format!(
                "Auto-refresh on (every {}s)",
                self.refresh.interval.as_secs()
            ));
        } else {
            self.set_status("Auto-refresh off");
        }
    }

    /// Live filter update from the filter overlay input.
    pub fn update_filter(&mut self) {
        self.results.table.set_filter(&self.filter_input);
        self.results.cursor = 0;
    }

    /// Suggested export path: last one used, else a dated CSV in the export dir.
    pub fn default_export_path(&self) -> PathBuf {
        self.last_export.clone().unwrap_or_else(|| {
            self.config.export.dir.join(format!(
                "rankings_{}_{}.csv",
                self.query.params.frequency.key(),
                Local::now().format("%Y%m%d")
            ))
        })
    }

    /// Export the current result set. Failures open the error dialog.
    pub fn export_current(&mut self, path: &Path) -> bool {
        let records = self
            .results
            .set
            .as_ref()
            .map(|s| s.records.as_slice())
            .unwrap_or(&[]);
        match export_records(records, path) {
            Ok(format) => {
                let rows = records.len();
                self.last_export = Some(path.to_path_buf());
                self.set_status(format!(
                    "Exported {rows} rows as {format:?} to {}",
                    path.display()
                ));
                true
            }
            Err(e) => {
                let message = e.to_string();
                self.push_error(ErrorCategory::Export, message.clone(), path.display().to_string());
                self.overlay = Overlay::ErrorDialog {
                    title: "Export failed".into(),
                    message,
                };
                false
            }
        }
    }

    /// Push an error to the history, capping at 50.
    pub fn push_error(&mut self, category: ErrorCategory, message: String, context: String) {
        let record = ErrorRecord {
            timestamp: Local::now().naive_local(),
            category,
            message: message.clone(),
            context,
        };
        self.error_history.push_front(record);
        if self.error_history.len() > 50 {
            self.error_history.pop_back();
        }
        self.status_message = Some((message, StatusLevel::Error));
    }

    /// Set an info status message.
    pub fn set_status(&mut self, msg: impl Into<String>) {
        self.status_message = Some((msg.into(), StatusLevel::Info));
    }

    /// Set a warning status message.
    pub fn set_warning(&mut self, msg: impl Into<String>) {
        self.status_message = Some((msg.into(), StatusLevel::Warning));
    }
}
