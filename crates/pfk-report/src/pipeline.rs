//! One backtest run: load -> simulate -> summarize -> prompt.
//!
//! Shared by the daemon's cached `/api/backtest` and the CLI `backtest`
//! command. Blocking: the price source reads files.

use std::sync::Arc;

use chrono::NaiveDate;
use tracing::{info, warn};

use pfk_analytics::{benchmark_history, summarize_run, CrashPeriodSpec, DateSeries, RunSummary};
use pfk_backtest::{
    BacktestConfig, BacktestEngine, BacktestError, BacktestReport, LoadError, PriceTableSource,
};

use crate::prompt::{build_prompt, PromptInput};

/// Fixed inputs of one backtest run.
#[derive(Clone)]
pub struct RunInputs {
    pub source: Arc<dyn PriceTableSource>,
    pub config: BacktestConfig,
    pub crash_periods: Vec<CrashPeriodSpec>,
    pub benchmark_name: String,
    pub currency: String,
    pub start: NaiveDate,
    pub end: NaiveDate,
}

#[derive(Debug, Clone)]
pub struct RunResult {
    pub report: BacktestReport,
    /// Benchmark rescaled to the initial capital.
    pub benchmark: DateSeries,
    pub summary: RunSummary,
    /// `None` when crash analysis failed.
    pub prompt: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum PipelineError {
    Load(LoadError),
    Backtest(BacktestError),
    /// The table produced no snapshots.
    EmptyHistory,
}

impl From<LoadError> for PipelineError {
    fn from(e: LoadError) -> Self {
        PipelineError::Load(e)
    }
}

impl From<BacktestError> for PipelineError {
    fn from(e: BacktestError) -> Self {
        PipelineError::Backtest(e)
    }
}

impl std::fmt::Display for PipelineError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PipelineError::Load(e) => write!(f, "price data could not be loaded: {e}"),
            PipelineError::Backtest(e) => write!(f, "backtest rejected its inputs: {e}"),
            PipelineError::EmptyHistory => write!(f, "backtest produced no history"),
        }
    }
}

impl std::error::Error for PipelineError {}

pub fn compute_run(inputs: &RunInputs) -> Result<RunResult, PipelineError> {
    let table = inputs.source.load()?;
    let report = BacktestEngine::new(inputs.config.clone()).run(&table)?;
    let benchmark = benchmark_history(&table, inputs.config.initial_capital);

    let summary = summarize_run(&report.history, &benchmark, &inputs.crash_periods)
        .ok_or(PipelineError::EmptyHistory)?;

    let prompt = match &summary.analysis {
        Ok(analysis) => Some(build_prompt(&PromptInput::from_run(
            &inputs.config,
            &inputs.benchmark_name,
            &inputs.currency,
            inputs.start,
            inputs.end,
            &summary.stats,
            analysis,
        ))),
        Err(e) => {
            warn!(error = %e, "crash analysis failed; no report prompt");
            None
        }
    };

    info!(
        rows = report.history.len(),
        rebalances = report.rebalances.len(),
        prompt = prompt.is_some(),
        "backtest computed"
    );

    Ok(RunResult {
        report,
        benchmark,
        summary,
        prompt,
    })
}
