//! Domain types: return frequency, query parameters, ranked records.

use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::QueryError;

/// Smallest accepted top/bottom-N.
pub const MIN_TOP_N: usize = 10;
/// Largest accepted top/bottom-N.
pub const MAX_TOP_N: usize = 100;
/// Longest accepted query window, in days.
pub const MAX_LOOKBACK_DAYS: i64 = 36_500;

/// Start of a window reaching `lookback_days` back from `end_date`.
///
/// The lookback is clamped to `0..=MAX_LOOKBACK_DAYS`; dates before the
/// calendar minimum saturate to `NaiveDate::MIN`.
pub fn lookback_start(end_date: NaiveDate, lookback_days: i64) -> NaiveDate {
    let days = lookback_days.clamp(0, MAX_LOOKBACK_DAYS).unsigned_abs();
    end_date
        .checked_sub_days(chrono::Days::new(days))
        .unwrap_or(NaiveDate::MIN)
}

/// Granularity the stored returns were computed at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Frequency {
    Daily,
    Weekly,
    Monthly,
    Quarterly,
    Yearly,
}

impl Frequency {
    pub const ALL: [Frequency; 5] = [
        Frequency::Daily,
        Frequency::Weekly,
        Frequency::Monthly,
        Frequency::Quarterly,
        Frequency::Yearly,
    ];

    /// Value stored in the returns table's `frequency` column.
    pub fn key(self) -> &'static str {
        match self {
            Frequency::Daily => "daily",
            Frequency::Weekly => "weekly",
            Frequency::Monthly => "monthly",
            Frequency::Quarterly => "quarterly",
            Frequency::Yearly => "yearly",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Frequency::Daily => "Daily",
            Frequency::Weekly => "Weekly",
            Frequency::Monthly => "Monthly",
            Frequency::Quarterly => "Quarterly",
            Frequency::Yearly => "Yearly",
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        let key = key.trim().to_ascii_lowercase();
        Frequency::ALL.into_iter().find(|f| f.key() == key)
    }

    fn index(self) -> usize {
        Frequency::ALL.iter().position(|f| *f == self).unwrap_or(0)
    }

    pub fn next(self) -> Frequency {
        Frequency::ALL[(self.index() + 1) % Frequency::ALL.len()]
    }

    pub fn prev(self) -> Frequency {
        let len = Frequency::ALL.len();
        Frequency::ALL[(self.index() + len - 1) % len]
    }
}

impl fmt::Display for Frequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Inputs to one ranking query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryParams {
    pub frequency: Frequency,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub top_n: usize,
    pub include_negative: bool,
}

impl QueryParams {
    /// Parameters covering `lookback_days` up to and including `end_date`.
    pub fn trailing(
        frequency: Frequency,
        end_date: NaiveDate,
        lookback_days: i64,
        top_n: usize,
        include_negative: bool,
    ) -> Self {
        let start_date = lookback_start(end_date, lookback_days);
        Self {
            frequency,
            start_date,
            end_date,
            top_n: top_n.clamp(MIN_TOP_N, MAX_TOP_N),
            include_negative,
        }
    }

    pub fn validate(&self) -> Result<(), QueryError> {
        if self.start_date > self.end_date {
            return Err(QueryError::InvalidParams(format!(
                "start date {} is after end date {}",
                self.start_date, self.end_date
            )));
        }
        if !(MIN_TOP_N..=MAX_TOP_N).contains(&self.top_n) {
            return Err(QueryError::InvalidParams(format!(
                "top N must be between {MIN_TOP_N} and {MAX_TOP_N}, got {}",
                self.top_n
            )));
        }
        Ok(())
    }

    /// Short human-readable summary, used in status lines and logs.
    pub fn describe(&self) -> String {
        format!(
            "{} {} → {} (top {}{})",
            self.frequency,
            self.start_date,
            self.end_date,
            self.top_n,
            if self.include_negative { "" } else { ", positive only" }
        )
    }
}

/// One instrument's statistics within the query window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReturnRecord {
    pub ticker: String,
    pub name: String,
    /// Most recent observation in range, as a fraction.
    pub latest_return: f64,
    pub latest_date: NaiveDate,
    /// Mean of all observations in range, as a fraction.
    pub avg_return: f64,
    pub data_points: u32,
    pub first_date: NaiveDate,
    pub last_date: NaiveDate,
}

impl ReturnRecord {
    pub fn latest_return_pct(&self) -> f64 {
        self.latest_return * 100.0
    }

    pub fn avg_return_pct(&self) -> f64 {
        self.avg_return * 100.0
    }
}

/// Successful result of a ranking query.
#[derive(Debug, Clone, PartialEq)]
pub struct RankedSet {
    pub params: QueryParams,
    /// Ordered by latest return descending.
    pub records: Vec<ReturnRecord>,
    /// Records that survived the positive-only filter, before truncation.
    pub total_matched: usize,
    /// True when the middle of the ranking was discarded.
    pub truncated: bool,
}

impl RankedSet {
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }
}

/// Signed percentage with two decimals, e.g. `+1.23`.
pub fn format_signed_pct(pct: f64) -> String {
    format!("{pct:+.2}")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn frequency_keys_roundtrip() {
        for f in Frequency::ALL {
            assert_eq!(Frequency::from_key(f.key()), Some(f));
        }
        assert_eq!(Frequency::from_key(" Monthly "), Some(Frequency::Monthly));
        assert_eq!(Frequency::from_key("hourly"), None);
    }

    #[test]
    fn frequency_cycle() {
        assert_eq!(Frequency::Daily.next(), Frequency::Weekly);
        assert_eq!(Frequency::Yearly.next(), Frequency::Daily);
        assert_eq!(Frequency::Daily.prev(), Frequency::Yearly);
    }

    #[test]
    fn validate_rejects_reversed_range() {
        let params = QueryParams {
            frequency: Frequency::Daily,
            start_date: date(2024, 2, 1),
            end_date: date(2024, 1, 1),
            top_n: 20,
            include_negative: true,
        };
        assert!(matches!(params.validate(), Err(QueryError::InvalidParams(_))));
    }

    #[test]
    fn validate_bounds_top_n() {
        let mut params = QueryParams {
            frequency: Frequency::Daily,
            start_date: date(2024, 1, 1),
            end_date: date(2024, 2, 1),
            top_n: 10,
            include_negative: true,
        };
        assert!(params.validate().is_ok());
        params.top_n = 100;
        assert!(params.validate().is_ok());
        params.top_n = 9;
        assert!(params.validate().is_err());
        params.top_n = 101;
        assert!(params.validate().is_err());
    }

    #[test]
    fn trailing_clamps_top_n() {
        let p = QueryParams::trailing(Frequency::Monthly, date(2024, 12, 31), 30, 500, false);
        assert_eq!(p.start_date, date(2024, 12, 1));
        assert_eq!(p.top_n, MAX_TOP_N);
    }

    #[test]
    fn huge_lookback_is_clamped() {
        let end = date(2024, 1, 1);
        let p = QueryParams::trailing(Frequency::Daily, end, 100_000_000, 20, true);
        assert_eq!(p.start_date, end - chrono::Duration::days(MAX_LOOKBACK_DAYS));
        assert_eq!(lookback_start(end, i64::MAX), p.start_date);
        assert_eq!(lookback_start(end, -5), end);
        assert_eq!(lookback_start(NaiveDate::MIN, 10), NaiveDate::MIN);
    }

    #[test]
    fn signed_pct_format() {
        assert_eq!(format_signed_pct(1.234), "+1.23");
        assert_eq!(format_signed_pct(-5.0), "-5.00");
        assert_eq!(format_signed_pct(0.0), "+0.00");
    }
}
