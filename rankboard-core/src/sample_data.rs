//! Deterministic demo data: random-walk closes and the returns derived from
//! them at every frequency.
//!
//! Used by `rankboard init-db --demo` and by tests that need a populated
//! database. Every seventh ticker has no name so the placeholder path is
//! visible in the UI.

use chrono::{Datelike, NaiveDate, Weekday};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::domain::Frequency;
use crate::error::QueryError;
use crate::store::SqliteStore;

#[derive(Debug, Clone)]
pub struct SampleSpec {
    pub tickers: usize,
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub seed: u64,
}

impl Default for SampleSpec {
    fn default() -> Self {
        Self {
            tickers: 60,
            start: NaiveDate::from_ymd_opt(2022, 1, 3).unwrap_or_default(),
            end: NaiveDate::from_ymd_opt(2024, 12, 31).unwrap_or_default(),
            seed: 42,
        }
    }
}

pub type PriceRow = (String, NaiveDate, Option<String>, f64);
pub type ReturnRow = (String, NaiveDate, Frequency, f64);

#[derive(Debug, Clone, Default)]
pub struct SampleData {
    pub prices: Vec<PriceRow>,
    pub returns: Vec<ReturnRow>,
}

pub fn sample_ticker(i: usize) -> String {
    format!("{:04}", 1101 + i)
}

/// Generate closes for each ticker on weekdays in `[start, end]` and the
/// period returns at every frequency.
pub fn generate(spec: &SampleSpec) -> SampleData {
    let mut data = SampleData::default();
    let days = trading_days(spec.start, spec.end);

    for i in 0..spec.tickers {
        let ticker = sample_ticker(i);
        let name = (i % 7 != 6).then(|| format!("Demo Industries {i:03}"));
        let mut rng = StdRng::seed_from_u64(spec.seed.wrapping_mul(1_000_003).wrapping_add(i as u64));

        let drift: f64 = rng.gen_range(-0.0008..0.0010);
        let vol: f64 = rng.gen_range(0.008..0.03);
        let mut close: f64 = rng.gen_range(20.0..500.0);

        let mut closes = Vec::with_capacity(days.len());
        for &day in &days {
            let shock: f64 = rng.gen_range(-1.0..1.0);
            close = (close * (1.0 + drift + vol * shock * 1.7)).max(0.01);
            let close = (close * 100.0).round() / 100.0;
            closes.push((day, close));
            data.prices.push((ticker.clone(), day, name.clone(), close));
        }

        for freq in Frequency::ALL {
            for (date, ret) in period_returns(&closes, freq) {
                data.returns.push((ticker.clone(), date, freq, ret));
            }
        }
    }
    data
}

/// Write generated data into `store`. Returns (price rows, return rows).
pub fn seed_store(store: &mut SqliteStore, spec: &SampleSpec) -> Result<(usize, usize), QueryError> {
    let data = generate(spec);
    let prices = store.insert_prices(&data.prices)?;
    let returns = store.insert_returns(&data.returns)?;
    tracing::info!(prices, returns, tickers = spec.tickers, "seeded demo data");
    Ok((prices, returns))
}

fn trading_days(start: NaiveDate, end: NaiveDate) -> Vec<NaiveDate> {
    start
        .iter_days()
        .take_while(|d| *d <= end)
        .filter(|d| !matches!(d.weekday(), Weekday::Sat | Weekday::Sun))
        .collect()
}

fn period_key(freq: Frequency, d: NaiveDate) -> (i32, u32) {
    match freq {
        Frequency::Daily => (d.num_days_from_ce(), 0),
        Frequency::Weekly => {
            let w = d.iso_week();
            (w.year(), w.week())
        }
        Frequency::Monthly => (d.year(), d.month()),
        Frequency::Quarterly => (d.year(), (d.month() - 1) / 3),
        Frequency::Yearly => (d.year(), 0),
    }
}

/// Period-over-period returns, dated at the last close of each period.
/// The first period has no predecessor and yields no return.
pub fn period_returns(closes: &[(NaiveDate, f64)], freq: Frequency) -> Vec<(NaiveDate, f64)> {
    let mut period_ends: Vec<(NaiveDate, f64)> = Vec::new();
    let mut last_key = None;
    for &(date, close) in closes {
        let key = period_key(freq, date);
        if last_key == Some(key) {
            if let Some(end) = period_ends.last_mut() {
                *end = (date, close);
            }
        } else {
            period_ends.push((date, close));
            last_key = Some(key);
        }
    }
    period_ends
        .windows(2)
        .map(|w| (w[1].0, w[1].1 / w[0].1 - 1.0))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn deterministic_for_seed() {
        let spec = SampleSpec {
            tickers: 3,
            start: d(2024, 1, 1),
            end: d(2024, 3, 31),
            seed: 7,
        };
        let a = generate(&spec);
        let b = generate(&spec);
        assert_eq!(a.prices, b.prices);
        assert_eq!(a.returns.len(), b.returns.len());
    }

    #[test]
    fn weekends_skipped() {
        let days = trading_days(d(2024, 1, 5), d(2024, 1, 8));
        assert_eq!(days, vec![d(2024, 1, 5), d(2024, 1, 8)]);
    }

    #[test]
    fn monthly_returns_use_last_close() {
        let closes = vec![
            (d(2024, 1, 30), 9.0),
            (d(2024, 1, 31), 10.0),
            (d(2024, 2, 15), 11.0),
            (d(2024, 2, 29), 12.0),
            (d(2024, 3, 1), 6.0),
        ];
        let rets = period_returns(&closes, Frequency::Monthly);
        assert_eq!(rets.len(), 2);
        assert_eq!(rets[0].0, d(2024, 2, 29));
        assert!((rets[0].1 - 0.2).abs() < 1e-12);
        assert_eq!(rets[1].0, d(2024, 3, 1));
        assert!((rets[1].1 + 0.5).abs() < 1e-12);
    }

    #[test]
    fn every_seventh_ticker_unnamed() {
        let spec = SampleSpec {
            tickers: 7,
            start: d(2024, 1, 1),
            end: d(2024, 1, 5),
            seed: 1,
        };
        let data = generate(&spec);
        let unnamed: Vec<_> = data
            .prices
            .iter()
            .filter(|p| p.2.is_none())
            .map(|p| p.0.as_str())
            .collect();
        assert!(!unnamed.is_empty());
        assert!(unnamed.iter().all(|t| *t == sample_ticker(6)));
    }
}
