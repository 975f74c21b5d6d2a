//! Typed view of the merged config.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use serde::Deserialize;

use pfk_analytics::CrashPeriodSpec;
use pfk_backtest::{
    AssetGrouping, BacktestConfig, Calendar, CsvSourceSpec, RateSchedule, RebalanceTrigger,
    TargetWeights,
};
use pfk_report::RunInputs;

use crate::LoadedConfig;

#[derive(Debug, Clone, Deserialize)]
pub struct AppSettings {
    pub backtest: BacktestSettings,
    pub data: DataSettings,
    #[serde(default)]
    pub analysis: AnalysisSettings,
    #[serde(default)]
    pub report: ReportSettings,
    #[serde(default)]
    pub server: ServerSettings,
    #[serde(default)]
    pub md: MdSettings,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BacktestSettings {
    pub initial_capital: f64,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    #[serde(default)]
    pub rebalance: RebalanceTrigger,
    /// Asset id -> fraction; the key `cash` holds the cash weight.
    pub weights: BTreeMap<String, f64>,
    pub groups: GroupSettings,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct GroupSettings {
    #[serde(default)]
    pub equity: Vec<String>,
    #[serde(default)]
    pub fixed_income: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DataSettings {
    pub asset_prices_csv: PathBuf,
    pub benchmark_csv: PathBuf,
    #[serde(default)]
    pub benchmark_column: Option<String>,
    #[serde(default)]
    pub calendar: Calendar,
    #[serde(default)]
    pub base_rate_history: Vec<RateEntry>,
}

/// Policy rate in percent, effective from `effective`.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct RateEntry {
    pub effective: NaiveDate,
    pub percent: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AnalysisSettings {
    #[serde(default = "default_benchmark_name")]
    pub benchmark_name: String,
    #[serde(default)]
    pub crash_periods: Vec<CrashPeriodSpec>,
}

impl Default for AnalysisSettings {
    fn default() -> Self {
        Self {
            benchmark_name: default_benchmark_name(),
            crash_periods: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReportSettings {
    #[serde(default = "default_model")]
    pub model: String,
    /// Name of the env var holding the generator API key.
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
    #[serde(default = "default_report_base_url")]
    pub base_url: String,
    #[serde(default = "default_chunk_delay_ms")]
    pub chunk_delay_ms: u64,
    #[serde(default = "default_currency")]
    pub currency: String,
}

impl Default for ReportSettings {
    fn default() -> Self {
        Self {
            model: default_model(),
            api_key_env: default_api_key_env(),
            base_url: default_report_base_url(),
            chunk_delay_ms: default_chunk_delay_ms(),
            currency: default_currency(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerSettings {
    #[serde(default = "default_addr")]
    pub addr: String,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            addr: default_addr(),
        }
    }
}

/// Brokerage quotation API used by `md fetch`. Credentials are env var names.
#[derive(Debug, Clone, Deserialize)]
pub struct MdSettings {
    #[serde(default = "default_md_base_url")]
    pub base_url: String,
    #[serde(default = "default_app_key_env")]
    pub app_key_env: String,
    #[serde(default = "default_app_secret_env")]
    pub app_secret_env: String,
    #[serde(default = "default_access_token_env")]
    pub access_token_env: String,
    #[serde(default = "default_page_delay_ms")]
    pub page_delay_ms: u64,
}

impl Default for MdSettings {
    fn default() -> Self {
        Self {
            base_url: default_md_base_url(),
            app_key_env: default_app_key_env(),
            app_secret_env: default_app_secret_env(),
            access_token_env: default_access_token_env(),
            page_delay_ms: default_page_delay_ms(),
        }
    }
}

fn default_benchmark_name() -> String {
    "KOSPI".to_string()
}
fn default_model() -> String {
    "models/gemini-flash-latest".to_string()
}
fn default_api_key_env() -> String {
    "GEMINI_API_KEY".to_string()
}
fn default_report_base_url() -> String {
    "https://generativelanguage.googleapis.com".to_string()
}
fn default_chunk_delay_ms() -> u64 {
    20
}
fn default_currency() -> String {
    "KRW".to_string()
}
fn default_addr() -> String {
    "127.0.0.1:8899".to_string()
}
fn default_md_base_url() -> String {
    "https://openapi.koreainvestment.com:9443".to_string()
}
fn default_app_key_env() -> String {
    "KIS_APP_KEY".to_string()
}
fn default_app_secret_env() -> String {
    "KIS_APP_SECRET".to_string()
}
fn default_access_token_env() -> String {
    "KIS_ACCESS_TOKEN".to_string()
}
fn default_page_delay_ms() -> u64 {
    100
}

impl AppSettings {
    /// Deserialize and sanity-check the merged config.
    pub fn from_loaded(loaded: &LoadedConfig) -> Result<Self> {
        let settings: AppSettings = serde_json::from_value(loaded.config_json.clone())
            .context("config does not match the settings schema")?;
        settings.validate()?;
        Ok(settings)
    }

    fn validate(&self) -> Result<()> {
        let bt = &self.backtest;
        if !bt.initial_capital.is_finite() || bt.initial_capital <= 0.0 {
            bail!("backtest.initial_capital must be positive");
        }
        if bt.end_date < bt.start_date {
            bail!(
                "backtest.end_date {} precedes start_date {}",
                bt.end_date,
                bt.start_date
            );
        }
        for (asset, w) in &bt.weights {
            if !w.is_finite() || *w < 0.0 {
                bail!("backtest.weights.{asset} must be a non-negative number");
            }
        }
        for p in &self.analysis.crash_periods {
            if p.end < p.start {
                bail!("analysis.crash_periods '{}' ends before it starts", p.name);
            }
        }
        Ok(())
    }

    /// Every grouped asset id: equity first, then fixed income.
    pub fn asset_ids(&self) -> Vec<String> {
        let g = &self.backtest.groups;
        g.equity.iter().chain(g.fixed_income.iter()).cloned().collect()
    }

    pub fn to_backtest_config(&self) -> BacktestConfig {
        let bt = &self.backtest;
        BacktestConfig {
            initial_capital: bt.initial_capital,
            weights: TargetWeights::from_map(bt.weights.clone()),
            grouping: AssetGrouping::new(bt.groups.equity.clone(), bt.groups.fixed_income.clone()),
            rebalance: bt.rebalance,
        }
    }

    pub fn rate_schedule(&self) -> RateSchedule {
        RateSchedule::from_percent_history(
            self.data
                .base_rate_history
                .iter()
                .map(|e| (e.effective, e.percent)),
        )
    }

    pub fn to_source_spec(&self) -> CsvSourceSpec {
        CsvSourceSpec {
            asset_prices_csv: self.data.asset_prices_csv.clone(),
            benchmark_csv: self.data.benchmark_csv.clone(),
            benchmark_column: self.data.benchmark_column.clone(),
            assets: self.asset_ids(),
            start: self.backtest.start_date,
            end: self.backtest.end_date,
            calendar: self.data.calendar,
            rates: self.rate_schedule(),
        }
    }

    /// Everything one backtest run needs, reading prices from the configured CSVs.
    pub fn to_run_inputs(&self) -> RunInputs {
        RunInputs {
            source: Arc::new(self.to_source_spec()),
            config: self.to_backtest_config(),
            crash_periods: self.analysis.crash_periods.clone(),
            benchmark_name: self.analysis.benchmark_name.clone(),
            currency: self.report.currency.clone(),
            start: self.backtest.start_date,
            end: self.backtest.end_date,
        }
    }
}
