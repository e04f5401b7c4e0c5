//! Return store trait and the SQLite implementation.
//!
//! The store answers two questions: "latest observation plus window
//! statistics per ticker" and "display names for these tickers". The ranking
//! pipeline in [`crate::ranking`] builds everything else on top.

use std::collections::HashMap;

use chrono::NaiveDate;
use rusqlite::{params, params_from_iter, Connection, OpenFlags};

use crate::config::DatabaseConfig;
use crate::domain::{Frequency, QueryParams};
use crate::error::QueryError;

/// One ticker's latest observation joined with its window aggregates.
#[derive(Debug, Clone, PartialEq)]
pub struct LatestReturnRow {
    pub ticker: String,
    pub latest_return: f64,
    pub latest_date: NaiveDate,
    pub avg_return: f64,
    pub data_points: u32,
    pub first_date: NaiveDate,
    pub last_date: NaiveDate,
}

/// Source of return statistics and display names.
///
/// Abstracted so the ranking pipeline can run against a stub in tests.
pub trait ReturnStore {
    /// Latest observation and aggregates per ticker within the window,
    /// ordered by latest return descending.
    fn latest_with_stats(&self, params: &QueryParams) -> Result<Vec<LatestReturnRow>, QueryError>;

    /// Resolve names for a single batch. Tickers without a name are absent.
    fn resolve_names(&self, tickers: &[String]) -> Result<HashMap<String, String>, QueryError>;

    /// Maximum number of tickers passed to one `resolve_names` call.
    fn name_batch_size(&self) -> usize;
}

/// Table names, checked to be plain SQL identifiers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableNames {
    returns: String,
    names: String,
}

impl TableNames {
    pub fn new(returns: &str, names: &str) -> Result<Self, QueryError> {
        Ok(Self {
            returns: checked_identifier(returns)?,
            names: checked_identifier(names)?,
        })
    }

    pub fn returns(&self) -> &str {
        &self.returns
    }

    pub fn names(&self) -> &str {
        &self.names
    }
}

impl Default for TableNames {
    fn default() -> Self {
        Self {
            returns: "stock_returns".into(),
            names: "stock_prices".into(),
        }
    }
}

/// Table names cannot be bound as parameters, so they are restricted to
/// `[A-Za-z_][A-Za-z0-9_]*` before being placed in statement text.
fn checked_identifier(name: &str) -> Result<String, QueryError> {
    let mut chars = name.chars();
    let valid = match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {
            chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        _ => false,
    };
    if valid {
        Ok(name.to_string())
    } else {
        Err(QueryError::InvalidIdentifier(name.to_string()))
    }
}

/// SQLite-backed store. One instance per query invocation.
#[derive(Debug)]
pub struct SqliteStore {
    conn: Connection,
    tables: TableNames,
    batch_size: usize,
}

impl SqliteStore {
    /// Open an existing database read-only.
    pub fn open(config: &DatabaseConfig) -> Result<Self, QueryError> {
        let conn = Connection::open_with_flags(
            &config.path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )
        .map_err(|source| QueryError::Open {
            path: config.path.clone(),
            source,
        })?;
        Self::with_connection(conn, config)
    }

    /// Open (creating if needed) a writable database and ensure the schema exists.
    pub fn create(config: &DatabaseConfig) -> Result<Self, QueryError> {
        if let Some(parent) = config.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let conn = Connection::open(&config.path).map_err(|source| QueryError::Open {
            path: config.path.clone(),
            source,
        })?;
        let store = Self::with_connection(conn, config)?;
        store.ensure_schema()?;
        Ok(store)
    }

    /// In-memory database with the schema applied. Useful for testing.
    pub fn in_memory(config: &DatabaseConfig) -> Result<Self, QueryError> {
        let conn = Connection::open_in_memory()?;
        let store = Self::with_connection(conn, config)?;
        store.ensure_schema()?;
        Ok(store)
    }

    fn with_connection(conn: Connection, config: &DatabaseConfig) -> Result<Self, QueryError> {
        Ok(Self {
            conn,
            tables: TableNames::new(&config.returns_table, &config.names_table)?,
            batch_size: config.name_batch_size.max(1),
        })
    }

    pub fn tables(&self) -> &TableNames {
        &self.tables
    }

    /// Create the returns and names tables if they don't exist.
    pub fn ensure_schema(&self) -> Result<(), QueryError> {
        let returns = self.tables.returns();
        let names = self.tables.names();
        self.conn.execute_batch(&format!(
            "CREATE TABLE IF NOT EXISTS {returns} (
                ticker TEXT NOT NULL,
                date TEXT NOT NULL,
                frequency TEXT NOT NULL,
                return_value REAL,
                PRIMARY KEY (ticker, date, frequency)
            );
            CREATE INDEX IF NOT EXISTS idx_{returns}_freq_date ON {returns}(frequency, date);
            CREATE TABLE IF NOT EXISTS {names} (
                ticker TEXT NOT NULL,
                date TEXT NOT NULL,
                name TEXT,
                close REAL,
                PRIMARY KEY (ticker, date)
            );"
        ))?;
        Ok(())
    }

    /// Insert or replace return observations in one transaction.
    pub fn insert_returns(
        &mut self,
        rows: &[(String, NaiveDate, Frequency, f64)],
    ) -> Result<usize, QueryError> {
        let sql = format!(
            "INSERT OR REPLACE INTO {} (ticker, date, frequency, return_value) VALUES (?1, ?2, ?3, ?4)",
            self.tables.returns()
        );
        let tx = self.conn.transaction()?;
        {
            let mut stmt = tx.prepare(&sql)?;
            for (ticker, date, freq, value) in rows {
                stmt.execute(params![ticker, date, freq.key(), value])?;
            }
        }
        tx.commit()?;
        Ok(rows.len())
    }

    /// Insert or replace price rows (ticker, date, name, close) in one transaction.
    pub fn insert_prices(
        &mut self,
        rows: &[(String, NaiveDate, Option<String>, f64)],
    ) -> Result<usize, QueryError> {
        let sql = format!(
            "INSERT OR REPLACE INTO {} (ticker, date, name, close) VALUES (?1, ?2, ?3, ?4)",
            self.tables.names()
        );
        let tx = self.conn.transaction()?;
        {
            let mut stmt = tx.prepare(&sql)?;
            for (ticker, date, name, close) in rows {
                stmt.execute(params![ticker, date, name, close])?;
            }
        }
        tx.commit()?;
        Ok(rows.len())
    }

    fn latest_sql(&self) -> String {
        let returns = self.tables.returns();
        format!(
            "WITH windowed AS (
                SELECT ticker, date, return_value
                FROM {returns}
                WHERE frequency = ?1 AND date >= ?2 AND date < date(?3, '+1 day')
                  AND return_value IS NOT NULL
            ),
            latest AS (
                SELECT ticker, date, return_value,
                       ROW_NUMBER() OVER (PARTITION BY ticker ORDER BY date DESC) AS rn
                FROM windowed
            ),
            stats AS (
                SELECT ticker,
                       AVG(return_value) AS avg_return,
                       COUNT(*) AS data_points,
                       MIN(date) AS first_date,
                       MAX(date) AS last_date
                FROM windowed
                GROUP BY ticker
            )
            SELECT l.ticker, l.return_value, l.date,
                   s.avg_return, s.data_points, s.first_date, s.last_date
            FROM latest l
            JOIN stats s ON s.ticker = l.ticker
            WHERE l.rn = 1
            ORDER BY l.return_value DESC, l.ticker ASC"
        )
    }
}

fn parse_date(text: &str) -> Result<NaiveDate, QueryError> {
    // Accept both plain dates and timestamps whose first ten chars are a date.
    let head = text.get(..10).unwrap_or(text);
    NaiveDate::parse_from_str(head, "%Y-%m-%d").map_err(|_| QueryError::DateParse(text.to_string()))
}

impl ReturnStore for SqliteStore {
    fn latest_with_stats(&self, params: &QueryParams) -> Result<Vec<LatestReturnRow>, QueryError> {
        let sql = self.latest_sql();
        tracing::debug!(%sql, "latest-return query");

        let mut stmt = self.conn.prepare(&sql)?;
        let raw = stmt
            .query_map(
                params![params.frequency.key(), params.start_date, params.end_date],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, f64>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, f64>(3)?,
                        row.get::<_, i64>(4)?,
                        row.get::<_, String>(5)?,
                        row.get::<_, String>(6)?,
                    ))
                },
            )?
            .collect::<Result<Vec<_>, _>>()?;

        raw.into_iter()
            .map(|(ticker, latest_return, latest, avg_return, count, first, last)| {
                Ok(LatestReturnRow {
                    ticker,
                    latest_return,
                    latest_date: parse_date(&latest)?,
                    avg_return,
                    data_points: u32::try_from(count).unwrap_or(u32::MAX),
                    first_date: parse_date(&first)?,
                    last_date: parse_date(&last)?,
                })
            })
            .collect()
    }

    fn resolve_names(&self, tickers: &[String]) -> Result<HashMap<String, String>, QueryError> {
        if tickers.is_empty() {
            return Ok(HashMap::new());
        }
        let placeholders = vec!["?"; tickers.len()].join(", ");
        let sql = format!(
            "SELECT ticker, name FROM (
                SELECT ticker, TRIM(name) AS name,
                       ROW_NUMBER() OVER (PARTITION BY ticker ORDER BY date DESC) AS rn
                FROM {}
                WHERE ticker IN ({placeholders})
                  AND name IS NOT NULL AND TRIM(name) <> ''
            )
            WHERE rn = 1",
            self.tables.names()
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let names = stmt
            .query_map(params_from_iter(tickers.iter()), |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
            })?
            .collect::<Result<HashMap<_, _>, _>>()?;
        Ok(names)
    }

    fn name_batch_size(&self) -> usize {
        self.batch_size
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn store() -> SqliteStore {
        SqliteStore::in_memory(&DatabaseConfig::default()).unwrap()
    }

    fn params(start: NaiveDate, end: NaiveDate) -> QueryParams {
        QueryParams {
            frequency: Frequency::Daily,
            start_date: start,
            end_date: end,
            top_n: 10,
            include_negative: true,
        }
    }

    #[test]
    fn identifiers_are_checked() {
        assert!(TableNames::new("stock_returns", "_prices2").is_ok());
        assert!(matches!(
            TableNames::new("returns; DROP TABLE x", "p"),
            Err(QueryError::InvalidIdentifier(_))
        ));
        assert!(TableNames::new("1returns", "p").is_err());
        assert!(TableNames::new("", "p").is_err());
    }

    #[test]
    fn latest_row_per_ticker_with_window_stats() {
        let mut s = store();
        s.insert_returns(&[
            ("AAA".into(), date(2024, 1, 2), Frequency::Daily, 0.01),
            ("AAA".into(), date(2024, 1, 3), Frequency::Daily, 0.03),
            ("AAA".into(), date(2024, 1, 9), Frequency::Daily, 0.50), // out of range
            ("BBB".into(), date(2024, 1, 2), Frequency::Daily, -0.02),
            ("BBB".into(), date(2024, 1, 2), Frequency::Weekly, 0.90), // other frequency
        ])
        .unwrap();

        let rows = s
            .latest_with_stats(&params(date(2024, 1, 1), date(2024, 1, 5)))
            .unwrap();
        assert_eq!(rows.len(), 2);

        let aaa = &rows[0];
        assert_eq!(aaa.ticker, "AAA");
        assert_eq!(aaa.latest_date, date(2024, 1, 3));
        assert!((aaa.latest_return - 0.03).abs() < 1e-12);
        assert!((aaa.avg_return - 0.02).abs() < 1e-12);
        assert_eq!(aaa.data_points, 2);
        assert_eq!(aaa.first_date, date(2024, 1, 2));
        assert_eq!(aaa.last_date, date(2024, 1, 3));

        assert_eq!(rows[1].ticker, "BBB");
        assert!((rows[1].latest_return + 0.02).abs() < 1e-12);
    }

    #[test]
    fn null_returns_are_ignored() {
        let s = store();
        s.conn
            .execute(
                "INSERT INTO stock_returns VALUES ('AAA', '2024-01-04', 'daily', NULL)",
                [],
            )
            .unwrap();
        let rows = s
            .latest_with_stats(&params(date(2024, 1, 1), date(2024, 1, 5)))
            .unwrap();
        assert!(rows.is_empty());
    }

    #[test]
    fn latest_name_wins_and_blank_names_skipped() {
        let mut s = store();
        s.insert_prices(&[
            ("AAA".into(), date(2024, 1, 1), Some("Old Name".into()), 10.0),
            ("AAA".into(), date(2024, 1, 2), Some("New Name".into()), 11.0),
            ("BBB".into(), date(2024, 1, 2), Some("   ".into()), 5.0),
            ("CCC".into(), date(2024, 1, 2), None, 5.0),
        ])
        .unwrap();
        let names = s
            .resolve_names(&["AAA".into(), "BBB".into(), "CCC".into(), "DDD".into()])
            .unwrap();
        assert_eq!(names.get("AAA").map(String::as_str), Some("New Name"));
        assert!(!names.contains_key("BBB"));
        assert!(!names.contains_key("CCC"));
        assert!(!names.contains_key("DDD"));
    }

    #[test]
    fn newer_blank_name_keeps_last_real_name() {
        let mut s = store();
        s.insert_prices(&[
            ("AAA".into(), date(2024, 1, 1), Some("  Alpha Corp ".into()), 10.0),
            ("AAA".into(), date(2024, 1, 2), Some("".into()), 11.0),
            ("AAA".into(), date(2024, 1, 3), None, 12.0),
        ])
        .unwrap();
        let names = s.resolve_names(&["AAA".into()]).unwrap();
        assert_eq!(names.len(), 1);
        assert_eq!(names.get("AAA").map(String::as_str), Some("Alpha Corp"));
    }

    #[test]
    fn timestamped_rows_on_end_date_are_in_window() {
        let s = store();
        s.conn
            .execute_batch(
                "INSERT INTO stock_returns VALUES ('AAA', '2024-01-04 00:00:00', 'daily', 0.01);
                 INSERT INTO stock_returns VALUES ('AAA', '2024-01-05 15:30:00', 'daily', 0.09);
                 INSERT INTO stock_returns VALUES ('AAA', '2024-01-06 00:00:00', 'daily', 0.50);",
            )
            .unwrap();
        let rows = s
            .latest_with_stats(&params(date(2024, 1, 1), date(2024, 1, 5)))
            .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].latest_date, date(2024, 1, 5));
        assert!((rows[0].latest_return - 0.09).abs() < 1e-12);
        assert_eq!(rows[0].data_points, 2);
        assert_eq!(rows[0].first_date, date(2024, 1, 4));
        assert_eq!(rows[0].last_date, date(2024, 1, 5));
    }

    #[test]
    fn open_missing_database_fails() {
        let config = DatabaseConfig {
            path: "/nonexistent/dir/returns.db".into(),
            ..DatabaseConfig::default()
        };
        assert!(matches!(SqliteStore::open(&config), Err(QueryError::Open { .. })));
    }

    #[test]
    fn create_then_open_read_only() {
        let dir = tempfile::tempdir().unwrap();
        let config = DatabaseConfig {
            path: dir.path().join("nested").join("r.db"),
            ..DatabaseConfig::default()
        };
        {
            let mut s = SqliteStore::create(&config).unwrap();
            s.insert_returns(&[("AAA".into(), date(2024, 1, 2), Frequency::Daily, 0.01)])
                .unwrap();
        }
        let s = SqliteStore::open(&config).unwrap();
        let rows = s
            .latest_with_stats(&params(date(2024, 1, 1), date(2024, 1, 5)))
            .unwrap();
        assert_eq!(rows.len(), 1);
    }
}
