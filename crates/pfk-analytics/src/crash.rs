//! Benchmark crash windows and portfolio behaviour inside them.
//!
//! Every return here is `Option<f64>`: `None` means the window could not be
//! resolved against the data (outside coverage, no as-of value, or a
//! non-finite ratio). It is never conflated with a genuine 0% return.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use pfk_backtest::PortfolioSnapshot;

use crate::series::DateSeries;

/// Caller-named date range to evaluate.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrashPeriodSpec {
    pub name: String,
    pub start: NaiveDate,
    pub end: NaiveDate,
}

/// Returns of the benchmark, the portfolio and its three components over one window.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PeriodAnalysisResult {
    /// Set for caller-named windows; absent for the drawdown window.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub benchmark_return: Option<f64>,
    pub portfolio_return: Option<f64>,
    pub stock_return: Option<f64>,
    pub bond_return: Option<f64>,
    pub cash_return: Option<f64>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WorstDayAnalysis {
    pub date: NaiveDate,
    pub benchmark_return: f64,
    pub portfolio_return: Option<f64>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CrashAnalysis {
    pub mdd_period_analysis: PeriodAnalysisResult,
    pub worst_day_analysis: WorstDayAnalysis,
    pub user_period_analyses: Vec<PeriodAnalysisResult>,
}

/// The analyzer needs a benchmark with at least two finite points.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AnalysisError {
    EmptyBenchmark,
    NoDailyReturns,
}

impl core::fmt::Display for AnalysisError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            AnalysisError::EmptyBenchmark => write!(f, "benchmark history has no usable values"),
            AnalysisError::NoDailyReturns => {
                write!(f, "benchmark history has no day-over-day returns")
            }
        }
    }
}

impl std::error::Error for AnalysisError {}

/// Portfolio history split into one series per value column.
#[derive(Clone, Debug, Default)]
pub struct PortfolioSeries {
    pub value: DateSeries,
    pub stock: DateSeries,
    pub bond: DateSeries,
    pub cash: DateSeries,
}

impl PortfolioSeries {
    pub fn from_history(history: &[PortfolioSnapshot]) -> Self {
        let col = |f: fn(&PortfolioSnapshot) -> f64| {
            DateSeries::from_pairs(history.iter().map(|s| (s.date, f(s))))
        };
        Self {
            value: col(|s| s.value),
            stock: col(|s| s.stock_value),
            bond: col(|s| s.bond_value),
            cash: col(|s| s.cash_value),
        }
    }

    fn period(
        &self,
        benchmark: &DateSeries,
        name: Option<String>,
        start: NaiveDate,
        end: NaiveDate,
    ) -> PeriodAnalysisResult {
        PeriodAnalysisResult {
            name,
            start_date: start,
            end_date: end,
            benchmark_return: get_period_return(benchmark, start, end),
            portfolio_return: get_period_return(&self.value, start, end),
            stock_return: get_period_return(&self.stock, start, end),
            bond_return: get_period_return(&self.bond, start, end),
            cash_return: get_period_return(&self.cash, start, end),
        }
    }
}

/// `asof(end) / asof(start) - 1`, or `None` when the window can't be resolved.
pub fn get_period_return(series: &DateSeries, start: NaiveDate, end: NaiveDate) -> Option<f64> {
    series.period_return(start, end)
}

/// Locate the benchmark's worst peak-to-trough window and worst single day,
/// and evaluate those plus `crash_specs` against the portfolio.
///
/// Specs whose benchmark return is unresolvable are left out of
/// `user_period_analyses`.
pub fn find_analysis_data(
    portfolio_history: &[PortfolioSnapshot],
    benchmark_history: &DateSeries,
    crash_specs: &[CrashPeriodSpec],
) -> Result<CrashAnalysis, AnalysisError> {
    let portfolio = PortfolioSeries::from_history(portfolio_history);

    let (trough_date, _) = benchmark_history
        .max_drawdown_point()
        .ok_or(AnalysisError::EmptyBenchmark)?;
    // Peak search never looks past the trough.
    let peak_date = benchmark_history
        .argmax_through(trough_date)
        .ok_or(AnalysisError::EmptyBenchmark)?;
    let mdd_period_analysis = portfolio.period(benchmark_history, None, peak_date, trough_date);

    let mut worst: Option<(NaiveDate, f64)> = None;
    for (date, ret) in benchmark_history.pct_change() {
        let Some(ret) = ret else { continue };
        match worst {
            Some((_, w)) if ret >= w => {}
            _ => worst = Some((date, ret)),
        }
    }
    let (worst_date, worst_ret) = worst.ok_or(AnalysisError::NoDailyReturns)?;
    let worst_day_analysis = WorstDayAnalysis {
        date: worst_date,
        benchmark_return: worst_ret,
        portfolio_return: portfolio.value.pct_change_on(worst_date),
    };

    let user_period_analyses = crash_specs
        .iter()
        .map(|spec| portfolio.period(benchmark_history, Some(spec.name.clone()), spec.start, spec.end))
        .filter(|r| r.benchmark_return.is_some())
        .collect();

    Ok(CrashAnalysis {
        mdd_period_analysis,
        worst_day_analysis,
        user_period_analyses,
    })
}
