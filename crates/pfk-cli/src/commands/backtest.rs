use std::path::Path;

use anyhow::{Context, Result};
use uuid::Uuid;

use pfk_analytics::PerformanceStats;
use pfk_artifacts::{write_run_artifacts, SummaryDoc, WriteRunArtifactsArgs};
use pfk_report::{compute_run, format_pct};

use super::load_settings;

pub(crate) fn run(config_paths: &[String], exports_root: Option<&Path>) -> Result<()> {
    let (loaded, settings) = load_settings(config_paths)?;

    let run = compute_run(&settings.to_run_inputs()).context("backtest run failed")?;
    let (report, summary) = (&run.report, &run.summary);

    println!("config_hash={}", loaded.config_hash);
    println!("rows={}", report.history.len());
    println!("rebalances={}", report.rebalances.len());
    print_stats("portfolio", &summary.stats.portfolio);
    print_stats("benchmark", &summary.stats.benchmark);
    for r in summary.crash_period_results() {
        println!(
            "crash_period name={:?} benchmark={} portfolio={}",
            r.name.as_deref().unwrap_or(""),
            format_pct(r.benchmark_return),
            format_pct(r.portfolio_return)
        );
    }

    let Some(exports_root) = exports_root else {
        return Ok(());
    };

    let run_id = Uuid::new_v4();
    let doc = SummaryDoc::from_summary(summary, report.rebalances.len());
    let out = write_run_artifacts(WriteRunArtifactsArgs {
        exports_root,
        run_id,
        config_hash: &loaded.config_hash,
        portfolio_history: &report.history,
        benchmark_history: &run.benchmark,
        summary: &doc,
        prompt: run.prompt.as_deref(),
    })?;

    println!("run_id={}", run_id);
    println!("run_dir={}", out.run_dir.display());
    Ok(())
}

fn print_stats(side: &str, s: &PerformanceStats) {
    println!("{side}_cagr={}", format_pct(Some(s.cagr)));
    println!("{side}_mdd={}", format_pct(Some(s.mdd)));
    println!("{side}_final_value={:.0}", s.final_value);
}
