//! Ranking pipeline: latest/average returns per ticker, named, filtered and
//! cut down to the best and worst performers.
//!
//! Pipeline:
//! 1. Fetch latest observation + window aggregates per ticker from the store
//! 2. Order by latest return descending (ties by ticker)
//! 3. Resolve display names in batches; a failing batch falls back to the placeholder
//! 4. Optionally drop non-positive latest returns
//! 5. Keep only the head and tail `top_n` when more than `2 × top_n` remain

use std::cmp::Ordering;
use std::collections::HashMap;
use std::time::Instant;

use crate::domain::{QueryParams, RankedSet, ReturnRecord};
use crate::error::QueryError;
use crate::store::{LatestReturnRow, ReturnStore};

/// Run the full ranking query against `store`.
///
/// `placeholder` is the name given to tickers whose name can't be resolved;
/// `None` uses the ticker itself. `progress` receives informational messages.
pub fn run_ranking(
    store: &dyn ReturnStore,
    params: &QueryParams,
    placeholder: Option<&str>,
    progress: &dyn Fn(&str),
) -> Result<RankedSet, QueryError> {
    params.validate()?;
    let started = Instant::now();

    progress(&format!(
        "Querying {} returns {} → {}",
        params.frequency.key(),
        params.start_date,
        params.end_date
    ));
    let mut rows = store.latest_with_stats(params)?;
    rows.sort_by(|a, b| by_latest_desc(a.latest_return, &a.ticker, b.latest_return, &b.ticker));

    let tickers: Vec<String> = rows.iter().map(|r| r.ticker.clone()).collect();
    progress(&format!("Resolving names for {} tickers", tickers.len()));
    let names = resolve_all_names(store, &tickers);

    progress(&format!("Ranking {} records", rows.len()));
    let mut records: Vec<ReturnRecord> = rows
        .into_iter()
        .map(|row| {
            let name = names
                .get(&row.ticker)
                .cloned()
                .unwrap_or_else(|| placeholder.unwrap_or(&row.ticker).to_string());
            into_record(row, name)
        })
        .collect();

    if !params.include_negative {
        records = drop_non_positive(records);
    }
    let total_matched = records.len();
    let (records, truncated) = keep_extremes(records, params.top_n);

    tracing::info!(
        params = %params.describe(),
        matched = total_matched,
        kept = records.len(),
        truncated,
        elapsed_ms = started.elapsed().as_millis() as u64,
        "ranking query complete"
    );

    Ok(RankedSet {
        params: params.clone(),
        records,
        total_matched,
        truncated,
    })
}

fn into_record(row: LatestReturnRow, name: String) -> ReturnRecord {
    ReturnRecord {
        ticker: row.ticker,
        name,
        latest_return: row.latest_return,
        latest_date: row.latest_date,
        avg_return: row.avg_return,
        data_points: row.data_points,
        first_date: row.first_date,
        last_date: row.last_date,
    }
}

fn by_latest_desc(a: f64, a_ticker: &str, b: f64, b_ticker: &str) -> Ordering {
    b.total_cmp(&a).then_with(|| a_ticker.cmp(b_ticker))
}

/// Resolve names batch by batch. Failed batches are logged and skipped.
pub fn resolve_all_names(store: &dyn ReturnStore, tickers: &[String]) -> HashMap<String, String> {
    let mut unique: Vec<String> = tickers.to_vec();
    unique.sort();
    unique.dedup();

    let mut names = HashMap::with_capacity(unique.len());
    for (i, batch) in unique.chunks(store.name_batch_size().max(1)).enumerate() {
        match store.resolve_names(batch) {
            Ok(found) => names.extend(found),
            Err(e) => {
                tracing::warn!(batch = i, size = batch.len(), error = %e, "name lookup failed");
            }
        }
    }
    names
}

/// Order records by latest return, best first.
pub fn sort_by_latest_desc(records: &mut [ReturnRecord]) {
    records.sort_by(|a, b| by_latest_desc(a.latest_return, &a.ticker, b.latest_return, &b.ticker));
}

/// Remove records whose latest return is zero or negative.
pub fn drop_non_positive(records: Vec<ReturnRecord>) -> Vec<ReturnRecord> {
    records.into_iter().filter(|r| r.latest_return > 0.0).collect()
}

/// Keep the first and last `top_n` records when there are more than `2 × top_n`.
///
/// Returns the kept records and whether anything was discarded.
pub fn keep_extremes(mut records: Vec<ReturnRecord>, top_n: usize) -> (Vec<ReturnRecord>, bool) {
    let limit = top_n.saturating_mul(2);
    if records.len() <= limit {
        return (records, false);
    }
    let tail = records.split_off(records.len() - top_n);
    records.truncate(top_n);
    records.extend(tail);
    (records, true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Frequency;
    use chrono::NaiveDate;
    use std::cell::RefCell;

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, d).unwrap()
    }

    fn row(ticker: &str, latest: f64) -> LatestReturnRow {
        LatestReturnRow {
            ticker: ticker.into(),
            latest_return: latest,
            latest_date: date(10),
            avg_return: latest / 2.0,
            data_points: 5,
            first_date: date(1),
            last_date: date(10),
        }
    }

    fn record(ticker: &str, latest: f64) -> ReturnRecord {
        into_record(row(ticker, latest), ticker.into())
    }

    fn params(top_n: usize, include_negative: bool) -> QueryParams {
        QueryParams {
            frequency: Frequency::Daily,
            start_date: date(1),
            end_date: date(31),
            top_n,
            include_negative,
        }
    }

    /// In-memory store with scripted name batches.
    struct StubStore {
        rows: Vec<LatestReturnRow>,
        names: HashMap<String, String>,
        batch_size: usize,
        fail_batch_containing: Option<String>,
        batches_seen: RefCell<Vec<usize>>,
    }

    impl StubStore {
        fn new(rows: Vec<LatestReturnRow>) -> Self {
            Self {
                rows,
                names: HashMap::new(),
                batch_size: 500,
                fail_batch_containing: None,
                batches_seen: RefCell::new(Vec::new()),
            }
        }
    }

    impl ReturnStore for StubStore {
        fn latest_with_stats(&self, _: &QueryParams) -> Result<Vec<LatestReturnRow>, QueryError> {
            Ok(self.rows.clone())
        }

        fn resolve_names(&self, tickers: &[String]) -> Result<HashMap<String, String>, QueryError> {
            self.batches_seen.borrow_mut().push(tickers.len());
            if let Some(bad) = &self.fail_batch_containing {
                if tickers.contains(bad) {
                    return Err(QueryError::InvalidParams("batch refused".into()));
                }
            }
            Ok(tickers
                .iter()
                .filter_map(|t| self.names.get(t).map(|n| (t.clone(), n.clone())))
                .collect())
        }

        fn name_batch_size(&self) -> usize {
            self.batch_size
        }
    }

    fn no_progress(_: &str) {}

    #[test]
    fn sorts_descending_even_if_store_does_not() {
        let store = StubStore::new(vec![row("B", 0.01), row("A", 0.05), row("C", -0.02)]);
        let set = run_ranking(&store, &params(10, true), None, &no_progress).unwrap();
        let tickers: Vec<_> = set.records.iter().map(|r| r.ticker.as_str()).collect();
        assert_eq!(tickers, ["A", "B", "C"]);
        assert!(!set.truncated);
        assert_eq!(set.total_matched, 3);
    }

    #[test]
    fn ties_broken_by_ticker() {
        let mut records = vec![record("ZZZ", 0.01), record("AAA", 0.01)];
        sort_by_latest_desc(&mut records);
        assert_eq!(records[0].ticker, "AAA");
    }

    #[test]
    fn positive_only_drops_zero_and_negative() {
        let store = StubStore::new(vec![row("A", 0.05), row("B", 0.0), row("C", -0.02)]);
        let set = run_ranking(&store, &params(10, false), None, &no_progress).unwrap();
        assert_eq!(set.records.len(), 1);
        assert_eq!(set.records[0].ticker, "A");
    }

    #[test]
    fn all_filtered_out_is_empty_not_error() {
        let store = StubStore::new(vec![row("B", 0.0), row("C", -0.02)]);
        let set = run_ranking(&store, &params(10, false), None, &no_progress).unwrap();
        assert!(set.is_empty());
    }

    #[test]
    fn keep_extremes_discards_middle() {
        let records: Vec<_> = (0..25).map(|i| record(&format!("T{i:02}"), 1.0 - i as f64 * 0.01)).collect();
        let (kept, truncated) = keep_extremes(records, 10);
        assert!(truncated);
        assert_eq!(kept.len(), 20);
        assert_eq!(kept[0].ticker, "T00");
        assert_eq!(kept[9].ticker, "T09");
        assert_eq!(kept[10].ticker, "T15");
        assert_eq!(kept[19].ticker, "T24");
    }

    #[test]
    fn keep_extremes_at_limit_keeps_all() {
        let records: Vec<_> = (0..20).map(|i| record(&format!("T{i:02}"), i as f64)).collect();
        let (kept, truncated) = keep_extremes(records, 10);
        assert!(!truncated);
        assert_eq!(kept.len(), 20);
    }

    #[test]
    fn names_resolved_in_batches_with_fallbacks() {
        let rows: Vec<_> = (0..7).map(|i| row(&format!("T{i}"), i as f64)).collect();
        let mut store = StubStore::new(rows);
        store.batch_size = 3;
        store.names.insert("T0".into(), "Zero".into());
        store.names.insert("T4".into(), "Four".into());
        store.fail_batch_containing = Some("T4".into());

        let set = run_ranking(&store, &params(10, true), Some("N/A"), &no_progress).unwrap();
        assert_eq!(*store.batches_seen.borrow(), vec![3, 3, 1]);

        let name_of = |t: &str| {
            set.records
                .iter()
                .find(|r| r.ticker == t)
                .map(|r| r.name.clone())
                .unwrap()
        };
        assert_eq!(name_of("T0"), "Zero");
        // T4's batch failed: placeholder, and the query still succeeds.
        assert_eq!(name_of("T4"), "N/A");
        assert_eq!(name_of("T6"), "N/A");
    }

    #[test]
    fn ticker_used_when_no_placeholder() {
        let store = StubStore::new(vec![row("2330", 0.01)]);
        let set = run_ranking(&store, &params(10, true), None, &no_progress).unwrap();
        assert_eq!(set.records[0].name, "2330");
    }

    #[test]
    fn progress_reported_in_order() {
        let store = StubStore::new(vec![row("A", 0.01)]);
        let seen = RefCell::new(Vec::new());
        let progress = |m: &str| seen.borrow_mut().push(m.to_string());
        run_ranking(&store, &params(10, true), None, &progress).unwrap();
        let seen = seen.into_inner();
        assert_eq!(seen.len(), 3);
        assert!(seen[0].starts_with("Querying daily returns"));
        assert!(seen[1].contains("1 tickers"));
        assert!(seen[2].contains("1 records"));
    }

    #[test]
    fn invalid_params_fail_before_store_access() {
        let store = StubStore::new(vec![row("A", 0.01)]);
        let err = run_ranking(&store, &params(5, true), None, &no_progress).unwrap_err();
        assert!(matches!(err, QueryError::InvalidParams(_)));
        assert!(store.batches_seen.borrow().is_empty());
    }
}
