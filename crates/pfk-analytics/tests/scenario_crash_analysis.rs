//! Scenario: crash-window analysis against a hand-built benchmark and portfolio.
//!
//! Benchmark (trading days only, 2024-01-03 is a holiday):
//!   01-02 100, 01-04 110, 01-05 120, 01-08 90, 01-09 96, 01-10 60, 01-11 70
//! Peak before the trough is 01-05 (120); trough is 01-10 (60, -50%).
//! Worst single day is 01-10 (96 -> 60, -37.5%).

use chrono::NaiveDate;
use pfk_analytics::{
    find_analysis_data, get_period_return, AnalysisError, CrashPeriodSpec, DateSeries,
};
use pfk_backtest::PortfolioSnapshot;

fn d(y: i32, m: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, day).unwrap()
}

fn benchmark() -> DateSeries {
    DateSeries::from_pairs([
        (d(2024, 1, 2), 100.0),
        (d(2024, 1, 4), 110.0),
        (d(2024, 1, 5), 120.0),
        (d(2024, 1, 8), 90.0),
        (d(2024, 1, 9), 96.0),
        (d(2024, 1, 10), 60.0),
        (d(2024, 1, 11), 70.0),
    ])
}

fn snap(date: NaiveDate, stock: f64, bond: f64, cash: f64) -> PortfolioSnapshot {
    PortfolioSnapshot {
        date,
        value: stock + bond + cash,
        stock_value: stock,
        bond_value: bond,
        cash_value: cash,
    }
}

fn portfolio() -> Vec<PortfolioSnapshot> {
    vec![
        snap(d(2024, 1, 2), 60.0, 30.0, 10.0),
        snap(d(2024, 1, 4), 66.0, 30.0, 10.0),
        snap(d(2024, 1, 5), 72.0, 30.0, 10.0),
        snap(d(2024, 1, 8), 54.0, 31.0, 10.0),
        snap(d(2024, 1, 9), 57.6, 31.0, 10.0),
        snap(d(2024, 1, 10), 36.0, 32.0, 10.0),
        snap(d(2024, 1, 11), 42.0, 32.0, 10.0),
    ]
}

fn close(a: Option<f64>, b: f64) -> bool {
    a.map(|a| (a - b).abs() < 1e-12).unwrap_or(false)
}

#[test]
fn holiday_boundary_resolves_to_prior_trading_day() {
    let s = DateSeries::from_pairs([(d(2024, 1, 2), 100.0), (d(2024, 1, 4), 105.0)]);
    let r = get_period_return(&s, d(2024, 1, 3), d(2024, 1, 4));
    assert!(close(r, 0.05), "r={r:?}");
}

#[test]
fn window_outside_coverage_is_missing_not_zero() {
    let s = benchmark();
    assert_eq!(get_period_return(&s, d(2023, 1, 1), d(2023, 6, 1)), None);
    assert_eq!(get_period_return(&s, d(2025, 1, 1), d(2025, 6, 1)), None);
    // Start before coverage but end inside: the start has no as-of value.
    assert_eq!(get_period_return(&s, d(2023, 12, 1), d(2024, 1, 5)), None);
    // A flat window is a genuine zero.
    assert_eq!(get_period_return(&s, d(2024, 1, 5), d(2024, 1, 6)), Some(0.0));
}

#[test]
fn mdd_window_runs_from_prior_peak_to_trough() {
    let a = find_analysis_data(&portfolio(), &benchmark(), &[]).unwrap();
    let mdd = &a.mdd_period_analysis;

    assert_eq!(mdd.name, None);
    assert_eq!(mdd.start_date, d(2024, 1, 5));
    assert_eq!(mdd.end_date, d(2024, 1, 10));
    assert!(close(mdd.benchmark_return, -0.5));
    assert!(close(mdd.stock_return, -0.5));
    assert!(close(mdd.bond_return, 32.0 / 30.0 - 1.0));
    assert!(close(mdd.cash_return, 0.0));
    assert!(close(mdd.portfolio_return, 78.0 / 112.0 - 1.0));
}

#[test]
fn worst_day_is_the_steepest_single_drop() {
    let a = find_analysis_data(&portfolio(), &benchmark(), &[]).unwrap();
    let w = &a.worst_day_analysis;

    assert_eq!(w.date, d(2024, 1, 10));
    assert!((w.benchmark_return - (60.0 / 96.0 - 1.0)).abs() < 1e-12);
    assert!(close(w.portfolio_return, 78.0 / 98.6 - 1.0));
}

#[test]
fn user_periods_outside_coverage_are_dropped_silently() {
    let specs = vec![
        CrashPeriodSpec {
            name: "before data".into(),
            start: d(2020, 2, 14),
            end: d(2020, 3, 19),
        },
        CrashPeriodSpec {
            name: "mid-week slide".into(),
            start: d(2024, 1, 6),
            end: d(2024, 1, 9),
        },
        CrashPeriodSpec {
            name: "after data".into(),
            start: d(2025, 3, 26),
            end: d(2025, 4, 9),
        },
    ];

    let a = find_analysis_data(&portfolio(), &benchmark(), &specs).unwrap();
    assert_eq!(a.user_period_analyses.len(), 1);

    let p = &a.user_period_analyses[0];
    assert_eq!(p.name.as_deref(), Some("mid-week slide"));
    assert_eq!(p.start_date, d(2024, 1, 6));
    // 01-06 is a Saturday: as-of resolves to Friday 01-05 (120).
    assert!(close(p.benchmark_return, 96.0 / 120.0 - 1.0));
    assert!(close(p.portfolio_return, 98.6 / 112.0 - 1.0));
}

#[test]
fn single_point_benchmark_has_no_daily_returns() {
    let b = DateSeries::from_pairs([(d(2024, 1, 2), 100.0)]);
    let err = find_analysis_data(&portfolio()[..1], &b, &[]).unwrap_err();
    assert_eq!(err, AnalysisError::NoDailyReturns);

    let err = find_analysis_data(&[], &DateSeries::default(), &[]).unwrap_err();
    assert_eq!(err, AnalysisError::EmptyBenchmark);
}

#[test]
fn results_serialize_missing_returns_as_null() {
    let specs = vec![CrashPeriodSpec {
        name: "partial".into(),
        start: d(2024, 1, 2),
        end: d(2024, 1, 5),
    }];
    // Portfolio starts later than the benchmark: its start lookup has no value.
    let late: Vec<_> = portfolio().into_iter().skip(1).collect();
    let a = find_analysis_data(&late, &benchmark(), &specs).unwrap();

    let v = serde_json::to_value(&a.user_period_analyses[0]).unwrap();
    assert_eq!(v["name"], "partial");
    assert_eq!(v["start_date"], "2024-01-02");
    assert!(v["benchmark_return"].is_number());
    assert!(v["portfolio_return"].is_null());
}
