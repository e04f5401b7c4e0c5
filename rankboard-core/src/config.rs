//! Application configuration, stored as TOML.
//!
//! Every section is optional; missing keys take the defaults below.

use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::domain::{Frequency, QueryParams, MAX_LOOKBACK_DAYS};
use crate::error::ConfigError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub query: QueryDefaults,
    pub refresh: RefreshConfig,
    pub export: ExportConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub path: PathBuf,
    pub returns_table: String,
    pub names_table: String,
    /// Identifiers per name-lookup statement.
    pub name_batch_size: usize,
    /// Name shown when a ticker has no resolvable name. `None` shows the ticker.
    pub name_placeholder: Option<String>,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("data/returns.db"),
            returns_table: "stock_returns".into(),
            names_table: "stock_prices".into(),
            name_batch_size: 500,
            name_placeholder: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueryDefaults {
    pub frequency: Frequency,
    pub lookback_days: i64,
    pub top_n: usize,
    pub include_negative: bool,
}

impl Default for QueryDefaults {
    fn default() -> Self {
        Self {
            frequency: Frequency::Monthly,
            lookback_days: 365,
            top_n: 20,
            include_negative: true,
        }
    }
}

impl QueryDefaults {
    /// Default parameters for a window ending on `today`.
    pub fn params_ending(&self, today: NaiveDate) -> QueryParams {
        QueryParams::trailing(
            self.frequency,
            today,
            self.lookback_days,
            self.top_n,
            self.include_negative,
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RefreshConfig {
    pub enabled: bool,
    pub interval_secs: u64,
}

impl Default for RefreshConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            interval_secs: 300,
        }
    }
}

impl RefreshConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs.max(1))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    pub dir: PathBuf,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("exports"),
        }
    }
}

impl AppConfig {
    /// Load a config from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content)
    }

    /// Load from `path` if it exists, otherwise return defaults.
    pub fn load_or_default(path: &Path) -> Result<Self, ConfigError> {
        if path.exists() {
            Self::from_file(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Parse a config from a TOML string.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: AppConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml(&self) -> Result<String, String> {
        toml::to_string_pretty(self).map_err(|e| format!("serialize config: {e}"))
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.database.name_batch_size == 0 {
            return Err(ConfigError::Invalid(
                "database.name_batch_size must be at least 1".into(),
            ));
        }
        if !(0..=MAX_LOOKBACK_DAYS).contains(&self.query.lookback_days) {
            return Err(ConfigError::Invalid(format!(
                "query.lookback_days must be between 0 and {MAX_LOOKBACK_DAYS}"
            )));
        }
        Ok(())
    }
}
