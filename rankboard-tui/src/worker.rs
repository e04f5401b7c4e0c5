//! Background worker thread: all database work runs here.
//!
//! Communication with the TUI main thread is via `mpsc` channels. Each query
//! opens its own connection. Every command carries a generation number from
//! [`QueryGeneration`]; the worker skips commands that are already stale and
//! the UI ignores responses from anything but the current generation.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{Receiver, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use rankboard_core::config::DatabaseConfig;
use rankboard_core::{run_ranking, QueryParams, RankedSet, SqliteStore};

/// Monotonic query counter shared by the UI and the worker.
#[derive(Debug, Clone, Default)]
pub struct QueryGeneration(Arc<AtomicU64>);

impl QueryGeneration {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a new generation, superseding every earlier one.
    pub fn advance(&self) -> u64 {
        self.0.fetch_add(1, Ordering::SeqCst) + 1
    }

    pub fn current(&self) -> u64 {
        self.0.load(Ordering::SeqCst)
    }

    pub fn is_current(&self, generation: u64) -> bool {
        self.current() == generation
    }
}

/// Commands sent from the TUI to the worker.
#[derive(Debug)]
pub enum WorkerCommand {
    RunQuery {
        generation: u64,
        params: QueryParams,
        database: DatabaseConfig,
    },
    Shutdown,
}

/// Responses sent from the worker back to the TUI.
#[derive(Debug, Clone)]
pub enum WorkerResponse {
    Progress { generation: u64, message: String },
    Ranked { generation: u64, set: RankedSet },
    /// The query succeeded but nothing matched.
    NoData { generation: u64, params: QueryParams },
    Failed {
        generation: u64,
        params: QueryParams,
        error: String,
    },
}

impl WorkerResponse {
    pub fn generation(&self) -> u64 {
        match self {
            WorkerResponse::Progress { generation, .. }
            | WorkerResponse::Ranked { generation, .. }
            | WorkerResponse::NoData { generation, .. }
            | WorkerResponse::Failed { generation, .. } => *generation,
        }
    }
}

/// Spawn the background worker thread.
pub fn spawn_worker(
    rx: Receiver<WorkerCommand>,
    tx: Sender<WorkerResponse>,
    generation: QueryGeneration,
) -> std::io::Result<JoinHandle<()>> {
    thread::Builder::new()
        .name("rankboard-worker".into())
        .spawn(move || worker_loop(rx, tx, generation))
}

fn worker_loop(rx: Receiver<WorkerCommand>, tx: Sender<WorkerResponse>, generation: QueryGeneration) {
    loop {
        match rx.recv() {
            Ok(WorkerCommand::Shutdown) | Err(_) => break,
            Ok(WorkerCommand::RunQuery { generation: g, params, database }) => {
                if !generation.is_current(g) {
                    tracing::debug!(generation = g, current = generation.current(), "skipping stale query");
                    continue;
                }
                handle_query(g, &params, &database, &tx);
            }
        }
    }
    tracing::debug!("worker stopped");
}

fn handle_query(
    generation: u64,
    params: &QueryParams,
    database: &DatabaseConfig,
    tx: &Sender<WorkerResponse>,
) {
    let progress = |message: &str| {
        let _ = tx.send(WorkerResponse::Progress {
            generation,
            message: message.to_string(),
        });
    };

    let result = SqliteStore::open(database).and_then(|store| {
        run_ranking(&store, params, database.name_placeholder.as_deref(), &progress)
    });

    let response = match result {
        Ok(set) if set.is_empty() => WorkerResponse::NoData {
            generation,
            params: params.clone(),
        },
        Ok(set) => WorkerResponse::Ranked { generation, set },
        Err(e) => {
            tracing::error!(generation, error = %e, "ranking query failed");
            WorkerResponse::Failed {
                generation,
                params: params.clone(),
                error: e.to_string(),
            }
        }
    };
    let _ = tx.send(response);
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use rankboard_core::sample_data::{seed_store, SampleSpec};
    use rankboard_core::Frequency;
    use std::sync::mpsc;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn params(start: NaiveDate, end: NaiveDate) -> QueryParams {
        QueryParams {
            frequency: Frequency::Monthly,
            start_date: start,
            end_date: end,
            top_n: 10,
            include_negative: true,
        }
    }

    fn seeded_db(dir: &tempfile::TempDir) -> DatabaseConfig {
        let config = DatabaseConfig {
            path: dir.path().join("r.db"),
            ..DatabaseConfig::default()
        };
        let mut store = SqliteStore::create(&config).unwrap();
        let spec = SampleSpec {
            tickers: 5,
            start: d(2024, 1, 1),
            end: d(2024, 6, 28),
            seed: 3,
        };
        seed_store(&mut store, &spec).unwrap();
        config
    }

    /// Collect responses until a terminal one arrives.
    fn until_terminal(rx: &Receiver<WorkerResponse>) -> Vec<WorkerResponse> {
        let mut out = Vec::new();
        loop {
            let resp = rx
                .recv_timeout(std::time::Duration::from_secs(10))
                .expect("worker response");
            let done = !matches!(resp, WorkerResponse::Progress { .. });
            out.push(resp);
            if done {
                return out;
            }
        }
    }

    #[test]
    fn worker_shutdown() {
        let (cmd_tx, cmd_rx) = mpsc::channel();
        let (resp_tx, _resp_rx) = mpsc::channel();
        let handle = spawn_worker(cmd_rx, resp_tx, QueryGeneration::new()).unwrap();
        cmd_tx.send(WorkerCommand::Shutdown).unwrap();
        handle.join().expect("worker should join cleanly");
    }

    #[test]
    fn generation_counter_advances() {
        let g = QueryGeneration::new();
        assert_eq!(g.current(), 0);
        assert_eq!(g.advance(), 1);
        assert_eq!(g.advance(), 2);
        assert!(g.is_current(2));
        assert!(!g.is_current(1));
        // Clones share the counter.
        let other = g.clone();
        other.advance();
        assert_eq!(g.current(), 3);
    }

    #[test]
    fn query_reports_progress_then_ranked() {
        let dir = tempfile::tempdir().unwrap();
        let database = seeded_db(&dir);
        let (cmd_tx, cmd_rx) = mpsc::channel();
        let (resp_tx, resp_rx) = mpsc::channel();
        let generation = QueryGeneration::new();
        let handle = spawn_worker(cmd_rx, resp_tx, generation.clone()).unwrap();

        let g = generation.advance();
        cmd_tx
            .send(WorkerCommand::RunQuery {
                generation: g,
                params: params(d(2024, 1, 1), d(2024, 6, 30)),
                database,
            })
            .unwrap();

        let responses = until_terminal(&resp_rx);
        assert!(responses.len() >= 2);
        assert!(responses.iter().all(|r| r.generation() == g));
        assert!(matches!(responses[0], WorkerResponse::Progress { .. }));
        match responses.last().unwrap() {
            WorkerResponse::Ranked { set, .. } => assert_eq!(set.len(), 5),
            other => panic!("expected Ranked, got {other:?}"),
        }

        cmd_tx.send(WorkerCommand::Shutdown).unwrap();
        handle.join().unwrap();
    }

    #[test]
    fn empty_window_reports_no_data() {
        let dir = tempfile::tempdir().unwrap();
        let database = seeded_db(&dir);
        let (cmd_tx, cmd_rx) = mpsc::channel();
        let (resp_tx, resp_rx) = mpsc::channel();
        let generation = QueryGeneration::new();
        let handle = spawn_worker(cmd_rx, resp_tx, generation.clone()).unwrap();

        cmd_tx
            .send(WorkerCommand::RunQuery {
                generation: generation.advance(),
                params: params(d(2031, 1, 1), d(2031, 6, 30)),
                database,
            })
            .unwrap();
        let responses = until_terminal(&resp_rx);
        assert!(matches!(responses.last(), Some(WorkerResponse::NoData { .. })));

        cmd_tx.send(WorkerCommand::Shutdown).unwrap();
        handle.join().unwrap();
    }

    #[test]
    fn missing_database_reports_failure() {
        let (cmd_tx, cmd_rx) = mpsc::channel();
        let (resp_tx, resp_rx) = mpsc::channel();
        let generation = QueryGeneration::new();
        let handle = spawn_worker(cmd_rx, resp_tx, generation.clone()).unwrap();

        cmd_tx
            .send(WorkerCommand::RunQuery {
                generation: generation.advance(),
                params: params(d(2024, 1, 1), d(2024, 6, 30)),
                database: DatabaseConfig {
                    path: "/nonexistent/rankboard/returns.db".into(),
                    ..DatabaseConfig::default()
                },
            })
            .unwrap();
        let responses = until_terminal(&resp_rx);
        match responses.last().unwrap() {
            WorkerResponse::Failed { error, .. } => assert!(error.contains("cannot open database")),
            other => panic!("expected Failed, got {other:?}"),
        }

        cmd_tx.send(WorkerCommand::Shutdown).unwrap();
        handle.join().unwrap();
    }

    #[test]
    fn stale_commands_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let database = seeded_db(&dir);
        let (cmd_tx, cmd_rx) = mpsc::channel();
        let (resp_tx, resp_rx) = mpsc::channel();
        let generation = QueryGeneration::new();

        // Both commands are queued before the worker starts; only the newer runs.
        let old = generation.advance();
        let new = generation.advance();
        for g in [old, new] {
            cmd_tx
                .send(WorkerCommand::RunQuery {
                    generation: g,
                    params: params(d(2024, 1, 1), d(2024, 6, 30)),
                    database: database.clone(),
                })
                .unwrap();
        }
        cmd_tx.send(WorkerCommand::Shutdown).unwrap();

        let handle = spawn_worker(cmd_rx, resp_tx, generation).unwrap();
        handle.join().unwrap();

        let responses: Vec<_> = resp_rx.try_iter().collect();
        assert!(!responses.is_empty());
        assert!(responses.iter().all(|r| r.generation() == new));
    }
}
