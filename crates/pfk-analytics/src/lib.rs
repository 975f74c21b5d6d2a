//! pfk-analytics
//!
//! Reductions over a backtest's output:
//! - dated value series with as-of lookup ([`series`])
//! - CAGR / maximum drawdown ([`stats`])
//! - benchmark crash windows and how the portfolio fared in them ([`crash`])
//! - one-call run summary used by the daemon and CLI ([`summary`])

pub mod crash;
pub mod series;
pub mod stats;
pub mod summary;

pub use crash::{
    find_analysis_data, get_period_return, AnalysisError, CrashAnalysis, CrashPeriodSpec,
    PeriodAnalysisResult, PortfolioSeries, WorstDayAnalysis,
};
pub use series::{DateSeries, DatedValue};
pub use stats::{compute_stats, PerformanceStats};
pub use summary::{benchmark_history, summarize_run, RunStats, RunSummary};
