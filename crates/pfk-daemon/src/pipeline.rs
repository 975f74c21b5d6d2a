//! Backtest runs as the daemon caches and serves them.

use pfk_report::{compute_run, PipelineError, RunInputs, RunResult};

use crate::api_types::BacktestResponse;

/// What the run cache holds.
#[derive(Debug, Clone)]
pub struct RunOutput {
    pub response: BacktestResponse,
    /// `None` when crash analysis failed.
    pub prompt: Option<String>,
}

impl From<RunResult> for RunOutput {
    fn from(run: RunResult) -> Self {
        let crash_period_results = run.summary.crash_period_results().to_vec();
        Self {
            response: BacktestResponse {
                portfolio_history: run.report.history,
                benchmark_history: run.benchmark.points().to_vec(),
                stats: run.summary.stats,
                crash_period_results,
            },
            prompt: run.prompt,
        }
    }
}

/// Run the backtest on the blocking pool; the price source reads files.
pub async fn compute_run_blocking(inputs: RunInputs) -> Result<RunOutput, RunError> {
    tokio::task::spawn_blocking(move || compute_run(&inputs).map(RunOutput::from))
        .await
        .map_err(|e| RunError::Join(e.to_string()))?
        .map_err(RunError::Pipeline)
}

#[derive(Debug, Clone, PartialEq)]
pub enum RunError {
    Pipeline(PipelineError),
    /// The blocking task panicked or was cancelled.
    Join(String),
}

impl std::fmt::Display for RunError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RunError::Pipeline(e) => write!(f, "{e}"),
            RunError::Join(msg) => write!(f, "backtest task failed: {msg}"),
        }
    }
}

impl std::error::Error for RunError {}
