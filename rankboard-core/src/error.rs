//! Structured error types.
//!
//! These are designed to be displayable in both CLI and TUI contexts.

use std::path::PathBuf;

use thiserror::Error;

/// Failure of a ranking query. "No data" is not an error; see `RankedSet::is_empty`.
#[derive(Debug, Error)]
pub enum QueryError {
    #[error("invalid query parameters: {0}")]
    InvalidParams(String),

    #[error("invalid table name '{0}': only letters, digits and '_' are allowed")]
    InvalidIdentifier(String),

    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("cannot open database {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },

    #[error("bad date '{0}' in returns table")]
    DateParse(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("unsupported export format for {0} (use .csv or .xlsx)")]
    UnsupportedFormat(PathBuf),

    #[error("nothing to export: the result set is empty")]
    Empty,

    #[error("I/O error writing export: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("spreadsheet error: {0}")]
    Xlsx(#[from] rust_xlsxwriter::XlsxError),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}
