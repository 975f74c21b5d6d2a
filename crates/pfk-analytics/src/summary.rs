use serde::{Deserialize, Serialize};

use pfk_backtest::{PortfolioSnapshot, PriceTable};

use crate::crash::{
    find_analysis_data, AnalysisError, CrashAnalysis, CrashPeriodSpec, PeriodAnalysisResult,
};
use crate::series::DateSeries;
use crate::stats::{compute_stats, PerformanceStats};

/// Benchmark column rescaled so its first value equals `initial_capital`.
pub fn benchmark_history(table: &PriceTable, initial_capital: f64) -> DateSeries {
    let Some(base) = table.rows().first().map(|r| r.benchmark) else {
        return DateSeries::default();
    };
    DateSeries::from_pairs(
        table
            .rows()
            .iter()
            .map(|r| (r.date, r.benchmark / base * initial_capital)),
    )
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RunStats {
    pub portfolio: PerformanceStats,
    pub benchmark: PerformanceStats,
}

#[derive(Clone, Debug)]
pub struct RunSummary {
    pub stats: RunStats,
    /// Analyzer failure does not fail the run; callers decide how to surface it.
    pub analysis: Result<CrashAnalysis, AnalysisError>,
}

impl RunSummary {
    /// Caller-named window results, empty when the analyzer failed.
    pub fn crash_period_results(&self) -> &[PeriodAnalysisResult] {
        match &self.analysis {
            Ok(a) => &a.user_period_analyses,
            Err(_) => &[],
        }
    }
}

/// Statistics for both series plus crash analysis.
///
/// `None` when either series is empty.
pub fn summarize_run(
    history: &[PortfolioSnapshot],
    benchmark: &DateSeries,
    crash_specs: &[CrashPeriodSpec],
) -> Option<RunSummary> {
    let portfolio = DateSeries::from_pairs(history.iter().map(|s| (s.date, s.value)));
    let stats = RunStats {
        portfolio: compute_stats(&portfolio)?,
        benchmark: compute_stats(benchmark)?,
    };
    Some(RunSummary {
        stats,
        analysis: find_analysis_data(history, benchmark, crash_specs),
    })
}
