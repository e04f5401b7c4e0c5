//! Rankboard Core: stock return rankings over a relational store.
//!
//! This crate contains everything below the UI:
//! - Domain types (frequency, query parameters, return records)
//! - SQLite return store with bound parameters and batched name lookup
//! - Ranking pipeline (latest/average returns, positive filter, head/tail cut)
//! - Rank table model that sorts formatted cells by their numeric value
//! - Chart series for best/worst performers
//! - CSV / xlsx export
//! - TOML configuration and deterministic demo data

pub mod chart;
pub mod config;
pub mod domain;
pub mod error;
pub mod export;
pub mod ranking;
pub mod sample_data;
pub mod store;
pub mod table;

pub use config::AppConfig;
pub use domain::{Frequency, QueryParams, RankedSet, ReturnRecord};
pub use error::{ConfigError, ExportError, QueryError};
pub use ranking::run_ranking;
pub use store::{ReturnStore, SqliteStore};
pub use table::{Column, RankTable, SortDirection};

#[cfg(test)]
mod tests {
    use super::*;

    /// Compile-time check: types handed between the worker and UI threads are Send.
    #[allow(dead_code)]
    fn assert_send() {
        fn require_send<T: Send>() {}

        require_send::<QueryParams>();
        require_send::<RankedSet>();
        require_send::<ReturnRecord>();
        require_send::<QueryError>();
        require_send::<AppConfig>();
    }
}
