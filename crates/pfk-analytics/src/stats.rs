use serde::{Deserialize, Serialize};

use crate::series::DateSeries;

/// Average year length used to annualize elapsed calendar days.
pub const DAYS_PER_YEAR: f64 = 365.25;

/// Summary of a value series.
///
/// Field names on the wire match what the dashboard reads.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PerformanceStats {
    /// Compound annual growth rate (fraction).
    #[serde(rename = "CAGR")]
    pub cagr: f64,
    /// Maximum drawdown (fraction, <= 0).
    #[serde(rename = "MDD")]
    pub mdd: f64,
    #[serde(rename = "Final Value")]
    pub final_value: f64,
}

/// CAGR, maximum drawdown and final value of `series`.
///
/// Returns `None` only for an empty series. A single-point series or a
/// non-positive starting value yields a degenerate (non-finite) CAGR;
/// callers are expected to pass a multi-day series starting above zero.
pub fn compute_stats(series: &DateSeries) -> Option<PerformanceStats> {
    let first = series.first()?;
    let last = series.last()?;

    let years = (last.date - first.date).num_days() as f64 / DAYS_PER_YEAR;
    let cagr = (last.value / first.value).powf(1.0 / years) - 1.0;

    let mdd = series.drawdowns().into_iter().fold(0.0_f64, f64::min);

    Some(PerformanceStats {
        cagr,
        mdd,
        final_value: last.value,
    })
}
