//! Test helpers for building app state and mock results

use std::sync::mpsc::{self, Receiver, Sender};

use chrono::NaiveDate;
use ratatui::Terminal;
use ratatui::backend::TestBackend;
use rankboard_core::{AppConfig, Frequency, QueryParams, RankedSet, ReturnRecord};

use crate::app::AppState;
use crate::worker::{QueryGeneration, WorkerCommand, WorkerResponse};

fn day(d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 6, d).unwrap()
}

pub fn test_params() -> QueryParams {
    QueryParams {
        frequency: Frequency::Daily,
        start_date: day(1),
        end_date: day(28),
        top_n: 10,
        include_negative: true,
    }
}

pub fn record(ticker: &str, latest: f64) -> ReturnRecord {
    ReturnRecord {
        ticker: ticker.to_string(),
        name: format!("{ticker} Corp"),
        latest_return: latest,
        latest_date: day(28),
        avg_return: latest / 2.0,
        data_points: 20,
        first_date: day(3),
        last_date: day(28),
    }
}

/// A ranked set in the given order; callers pass tickers best first.
pub fn ranked_set(rows: &[(&str, f64)]) -> RankedSet {
    let records: Vec<ReturnRecord> = rows.iter().map(|(t, r)| record(t, *r)).collect();
    RankedSet {
        params: test_params(),
        total_matched: records.len(),
        truncated: false,
        records,
    }
}

/// App wired to in-process channels with no worker thread. The caller keeps
/// the command receiver to observe what the app sends.
pub fn app_with_channels() -> (AppState, Receiver<WorkerCommand>, Sender<WorkerResponse>) {
    let (cmd_tx, cmd_rx) = mpsc::channel();
    let (resp_tx, resp_rx) = mpsc::channel();
    let mut app = AppState::new(
        AppConfig::default(),
        cmd_tx,
        resp_rx,
        QueryGeneration::new(),
    );
    app.query.params = test_params();
    (app, cmd_rx, resp_tx)
}

/// Render the whole UI into a test backend and return the screen as text.
pub fn screen_text(app: &AppState, width: u16, height: u16) -> String {
    let backend = TestBackend::new(width, height);
    let mut terminal = Terminal::new(backend).unwrap();
    terminal.draw(|f| crate::ui::draw(f, app)).unwrap();
    let buf = terminal.backend().buffer();
    let mut out = String::new();
    for y in 0..buf.area.height {
        for x in 0..buf.area.width {
            out.push_str(buf[(x, y)].symbol());
        }
        out.push('\n');
    }
    out
}
