//! Request and response types for all pfk-daemon HTTP endpoints.
//!
//! `Serialize + Deserialize` so tests can decode them. No business logic here.

use serde::{Deserialize, Serialize};

use pfk_analytics::{DatedValue, PeriodAnalysisResult, RunStats};
use pfk_backtest::PortfolioSnapshot;

// ---------------------------------------------------------------------------
// /v1/health
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub ok: bool,
    pub service: String,
    pub version: String,
}

// ---------------------------------------------------------------------------
// /v1/status
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusResponse {
    pub daemon_uptime_secs: u64,
    /// A backtest result has been computed and cached.
    pub backtest_cached: bool,
    /// A report prompt is available to `/api/analyze_stream`.
    pub prompt_cached: bool,
    /// `None` when no generator is configured.
    pub report_model: Option<String>,
}

// ---------------------------------------------------------------------------
// /api/backtest
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BacktestResponse {
    pub portfolio_history: Vec<PortfolioSnapshot>,
    pub benchmark_history: Vec<DatedValue>,
    pub stats: RunStats,
    pub crash_period_results: Vec<PeriodAnalysisResult>,
}

/// Body of every 500 response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}
