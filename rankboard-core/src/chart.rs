//! Bar series for the top/bottom performer charts.

use crate::domain::ReturnRecord;
use crate::ranking::sort_by_latest_desc;

/// Default number of bars per chart.
pub const DEFAULT_BARS: usize = 10;

#[derive(Debug, Clone, PartialEq)]
pub struct BarDatum {
    pub ticker: String,
    pub name: String,
    /// Latest return in percent.
    pub value_pct: f64,
}

/// Best performers (best first) and worst performers (worst first).
///
/// The two halves never share a record: with fewer than `2 × limit` records
/// the best half goes to `top` and the remainder to `bottom`.
#[derive(Debug, Clone, PartialEq)]
pub struct PerformerChart {
    pub top: Vec<BarDatum>,
    pub bottom: Vec<BarDatum>,
}

impl PerformerChart {
    /// Largest absolute value across both series, for a shared scale.
    pub fn max_abs_pct(&self) -> f64 {
        self.top
            .iter()
            .chain(self.bottom.iter())
            .map(|b| b.value_pct.abs())
            .fold(0.0, f64::max)
    }
}

/// Build chart series; `None` means there is nothing to draw.
pub fn performer_chart(records: &[ReturnRecord], limit: usize) -> Option<PerformerChart> {
    if records.is_empty() || limit == 0 {
        return None;
    }
    let mut sorted = records.to_vec();
    sort_by_latest_desc(&mut sorted);

    let top_len = limit.min(sorted.len().div_ceil(2));
    let bottom_len = limit.min(sorted.len() - top_len);

    let datum = |r: &ReturnRecord| BarDatum {
        ticker: r.ticker.clone(),
        name: r.name.clone(),
        value_pct: r.latest_return_pct(),
    };
    let top = sorted[..top_len].iter().map(datum).collect();
    let bottom = sorted[sorted.len() - bottom_len..]
        .iter()
        .rev()
        .map(datum)
        .collect();
    Some(PerformerChart { top, bottom })
}
