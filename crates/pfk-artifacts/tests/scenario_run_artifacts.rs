use chrono::NaiveDate;
use pfk_analytics::{benchmark_history, summarize_run};
use pfk_artifacts::{read_manifest, write_run_artifacts, SummaryDoc, WriteRunArtifactsArgs};
use pfk_backtest::{BacktestConfig, BacktestEngine, PriceRow, PriceTable};
use uuid::Uuid;

fn d(y: i32, m: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, day).unwrap()
}

fn table() -> PriceTable {
    let rows = [
        (d(2024, 1, 30), 2_500.0, 10.0),
        (d(2024, 1, 31), 2_400.0, 9.0),
        (d(2024, 2, 1), 2_000.0, 7.0),
        (d(2024, 2, 2), 2_200.0, 8.0),
    ];
    PriceTable::new(
        rows.iter()
            .map(|(date, bm, a)| {
                PriceRow::new(*date, *bm, 0.035)
                    .with_price("A", *a)
                    .with_price("B", 100.0)
                    .with_price("C", 50.0)
            })
            .collect(),
    )
    .unwrap()
}

struct Fixture {
    report: pfk_backtest::BacktestReport,
    bench: pfk_analytics::DateSeries,
    doc: SummaryDoc,
}

fn fixture() -> Fixture {
    let t = table();
    let cfg = BacktestConfig::test_defaults();
    let capital = cfg.initial_capital;
    let report = BacktestEngine::new(cfg).run(&t).unwrap();
    let bench = benchmark_history(&t, capital);
    let summary = summarize_run(&report.history, &bench, &[]).unwrap();
    let doc = SummaryDoc::from_summary(&summary, report.rebalances.len());
    Fixture { report, bench, doc }
}

#[test]
fn run_directory_has_all_files_and_manifest_lists_them() {
    let tmp = tempfile::tempdir().unwrap();
    let fx = fixture();
    let run_id = Uuid::new_v4();

    let out = write_run_artifacts(WriteRunArtifactsArgs {
        exports_root: tmp.path(),
        run_id,
        config_hash: "abc123",
        portfolio_history: &fx.report.history,
        benchmark_history: &fx.bench,
        summary: &fx.doc,
        prompt: Some("hello prompt"),
    })
    .unwrap();

    assert_eq!(out.run_dir, tmp.path().join(run_id.to_string()));
    for f in [
        "manifest.json",
        "portfolio_history.csv",
        "benchmark_history.csv",
        "summary.json",
        "prompt.txt",
    ] {
        assert!(out.run_dir.join(f).is_file(), "missing {f}");
    }

    let manifest = read_manifest(&out.run_dir).unwrap();
    assert_eq!(manifest.run_id, run_id);
    assert_eq!(manifest.config_hash, "abc123");
    assert_eq!(manifest.artifacts.prompt_txt.as_deref(), Some("prompt.txt"));

    let csv = std::fs::read_to_string(out.run_dir.join("portfolio_history.csv")).unwrap();
    let mut lines = csv.lines();
    assert_eq!(
        lines.next(),
        Some("date,value,stock_value,bond_value,cash_value")
    );
    assert_eq!(lines.count(), 4);

    let bench_csv = std::fs::read_to_string(out.run_dir.join("benchmark_history.csv")).unwrap();
    assert!(bench_csv.starts_with("date,value\n2024-01-30,100000000"));

    let summary: serde_json::Value = serde_json::from_str(
        &std::fs::read_to_string(out.run_dir.join("summary.json")).unwrap(),
    )
    .unwrap();
    assert!(summary["stats"]["portfolio"]["CAGR"].is_number());
    assert!(summary["crash_analysis"]["mdd_period_analysis"].is_object());
}

#[test]
fn prompt_is_optional() {
    let tmp = tempfile::tempdir().unwrap();
    let fx = fixture();

    let out = write_run_artifacts(WriteRunArtifactsArgs {
        exports_root: tmp.path(),
        run_id: Uuid::new_v4(),
        config_hash: "h",
        portfolio_history: &fx.report.history,
        benchmark_history: &fx.bench,
        summary: &fx.doc,
        prompt: None,
    })
    .unwrap();

    assert!(!out.run_dir.join("prompt.txt").exists());
    let raw = std::fs::read_to_string(&out.manifest_path).unwrap();
    assert!(!raw.contains("prompt_txt"));
}
