//! Load -> simulate -> summarize -> prompt as one call.

use std::sync::Arc;

use chrono::NaiveDate;
use pfk_analytics::CrashPeriodSpec;
use pfk_backtest::{
    BacktestConfig, BacktestError, LoadError, PriceRow, PriceTable, PriceTableSource,
};
use pfk_report::{compute_run, PipelineError, RunInputs};

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

struct MissingFile;

impl PriceTableSource for MissingFile {
    fn load(&self) -> Result<PriceTable, LoadError> {
        Err(LoadError::Io("assets.csv not found".to_string()))
    }
}

fn inputs(source: Arc<dyn PriceTableSource>) -> RunInputs {
    RunInputs {
        source,
        config: BacktestConfig::test_defaults(),
        crash_periods: vec![CrashPeriodSpec {
            name: "month turn".into(),
            start: d(2024, 1, 31),
            end: d(2024, 2, 1),
        }],
        benchmark_name: "KOSPI".into(),
        currency: "KRW".into(),
        start: d(2024, 1, 30),
        end: d(2024, 2, 2),
    }
}

#[test]
fn run_produces_history_benchmark_summary_and_prompt() {
    let run = compute_run(&inputs(Arc::new(table()))).unwrap();

    assert_eq!(run.report.history.len(), 4);
    assert_eq!(run.benchmark.points().len(), 4);
    assert_eq!(run.benchmark.points()[0].value, 100_000_000.0);
    assert_eq!(run.summary.crash_period_results().len(), 1);

    let prompt = run.prompt.expect("analysis succeeded, so a prompt exists");
    assert!(prompt.contains("KOSPI"));
    assert!(prompt.contains("month turn"));
}

#[test]
fn load_failure_is_reported_as_load_error() {
    let err = compute_run(&inputs(Arc::new(MissingFile))).unwrap_err();
    assert!(matches!(err, PipelineError::Load(LoadError::Io(_))));
    assert!(err.to_string().starts_with("price data could not be loaded"));
}

#[test]
fn rejected_config_is_reported_as_backtest_error() {
    let mut i = inputs(Arc::new(table()));
    i.config.grouping.equity.push("MISSING".into());
    let err = compute_run(&i).unwrap_err();
    assert!(matches!(
        err,
        PipelineError::Backtest(
            BacktestError::UnknownAsset { .. } | BacktestError::MissingWeight { .. }
        )
    ));
}
