//! Run artifact directory: `exports/<run_id>/`.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use uuid::Uuid;

use pfk_analytics::{CrashAnalysis, DateSeries, RunStats, RunSummary};
use pfk_backtest::PortfolioSnapshot;

pub const SCHEMA_VERSION: i32 = 1;

const MANIFEST_JSON: &str = "manifest.json";
const PORTFOLIO_HISTORY_CSV: &str = "portfolio_history.csv";
const BENCHMARK_HISTORY_CSV: &str = "benchmark_history.csv";
const SUMMARY_JSON: &str = "summary.json";
const PROMPT_TXT: &str = "prompt.txt";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunManifest {
    pub schema_version: i32,
    pub run_id: Uuid,
    pub config_hash: String,
    pub created_at_utc: DateTime<Utc>,
    pub artifacts: ArtifactList,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArtifactList {
    pub manifest_json: String,
    pub portfolio_history_csv: String,
    pub benchmark_history_csv: String,
    pub summary_json: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt_txt: Option<String>,
}

/// `summary.json` contents.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SummaryDoc {
    pub stats: RunStats,
    pub crash_analysis: Option<CrashAnalysis>,
    /// Why `crash_analysis` is absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub analysis_error: Option<String>,
    pub rebalance_count: usize,
}

impl SummaryDoc {
    pub fn from_summary(summary: &RunSummary, rebalance_count: usize) -> Self {
        let (crash_analysis, analysis_error) = match &summary.analysis {
            Ok(a) => (Some(a.clone()), None),
            Err(e) => (None, Some(e.to_string())),
        };
        Self {
            stats: summary.stats.clone(),
            crash_analysis,
            analysis_error,
            rebalance_count,
        }
    }
}

pub struct WriteRunArtifactsArgs<'a> {
    pub exports_root: &'a Path, // e.g. ./exports
    pub run_id: Uuid,
    pub config_hash: &'a str,
    pub portfolio_history: &'a [PortfolioSnapshot],
    pub benchmark_history: &'a DateSeries,
    pub summary: &'a SummaryDoc,
    pub prompt: Option<&'a str>,
}

pub struct WriteRunArtifactsResult {
    pub run_dir: PathBuf,
    pub manifest_path: PathBuf,
}

pub fn write_run_artifacts(args: WriteRunArtifactsArgs<'_>) -> Result<WriteRunArtifactsResult> {
    // exports/<run_id>/
    let run_dir = args.exports_root.join(args.run_id.to_string());
    fs::create_dir_all(&run_dir)
        .with_context(|| format!("create exports dir failed: {}", run_dir.display()))?;

    write_csv_rows(&run_dir.join(PORTFOLIO_HISTORY_CSV), args.portfolio_history)?;
    write_csv_rows(
        &run_dir.join(BENCHMARK_HISTORY_CSV),
        args.benchmark_history.points(),
    )?;
    write_json(&run_dir.join(SUMMARY_JSON), args.summary)?;

    if let Some(prompt) = args.prompt {
        let path = run_dir.join(PROMPT_TXT);
        fs::write(&path, prompt)
            .with_context(|| format!("write prompt failed: {}", path.display()))?;
    }

    // Written last so a manifest only exists for a complete directory.
    let manifest = RunManifest {
        schema_version: SCHEMA_VERSION,
        run_id: args.run_id,
        config_hash: args.config_hash.to_string(),
        created_at_utc: Utc::now(),
        artifacts: ArtifactList {
            manifest_json: MANIFEST_JSON.to_string(),
            portfolio_history_csv: PORTFOLIO_HISTORY_CSV.to_string(),
            benchmark_history_csv: BENCHMARK_HISTORY_CSV.to_string(),
            summary_json: SUMMARY_JSON.to_string(),
            prompt_txt: args.prompt.map(|_| PROMPT_TXT.to_string()),
        },
    };
    let manifest_path = run_dir.join(MANIFEST_JSON);
    write_json(&manifest_path, &manifest)?;

    Ok(WriteRunArtifactsResult {
        run_dir,
        manifest_path,
    })
}

pub fn read_manifest(run_dir: &Path) -> Result<RunManifest> {
    let path = run_dir.join(MANIFEST_JSON);
    let text = fs::read_to_string(&path)
        .with_context(|| format!("read manifest failed: {}", path.display()))?;
    serde_json::from_str(&text).context("parse manifest failed")
}

fn write_csv_rows<T: Serialize>(path: &Path, rows: &[T]) -> Result<()> {
    let mut w = csv::Writer::from_path(path)
        .with_context(|| format!("open csv for write failed: {}", path.display()))?;
    for row in rows {
        w.serialize(row)
            .with_context(|| format!("write csv row failed: {}", path.display()))?;
    }
    w.flush()
        .with_context(|| format!("flush csv failed: {}", path.display()))?;
    Ok(())
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value).context("serialize json failed")?;
    fs::write(path, format!("{json}\n"))
        .with_context(|| format!("write json failed: {}", path.display()))
}
