use std::io::Write;

use chrono::NaiveDate;
use pfk_backtest::{
    build_price_table, load_price_table, Calendar, CsvSourceSpec, LoadError, PriceTableSource,
    RateSchedule,
};

fn d(y: i32, m: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, day).unwrap()
}

const ETF_CSV: &str = "\
Date,226490,114260,363570,999999
2024-01-02,10000,110000,,1
2024-01-03,,110100,99000,1
2024-01-05,10100,110200,99100,1
";

const KOSPI_CSV: &str = "\
Date,KOSPI
2024-01-02,2669.81
2024-01-03,2607.31
2024-01-04,2587.02
2024-01-05,2578.08
";

fn spec(calendar: Calendar) -> CsvSourceSpec {
    CsvSourceSpec {
        asset_prices_csv: "unused".into(),
        benchmark_csv: "unused".into(),
        benchmark_column: Some("KOSPI".to_string()),
        assets: vec!["226490".into(), "114260".into(), "363570".into()],
        start: d(2024, 1, 1),
        end: d(2024, 12, 31),
        calendar,
        rates: RateSchedule::from_percent_history([(d(2023, 1, 13), 3.50), (d(2024, 1, 4), 3.25)]),
    }
}

#[test]
fn outer_join_fills_forward_then_backward() {
    let table = build_price_table(ETF_CSV, KOSPI_CSV, &spec(Calendar::TradingDays)).unwrap();

    let dates: Vec<NaiveDate> = table.rows().iter().map(|r| r.date).collect();
    assert_eq!(
        dates,
        vec![d(2024, 1, 2), d(2024, 1, 3), d(2024, 1, 4), d(2024, 1, 5)]
    );

    let rows = table.rows();
    // Leading gap back-filled from the first observation.
    assert_eq!(rows[0].price("363570"), Some(99_000.0));
    // Inner gap forward-filled.
    assert_eq!(rows[1].price("226490"), Some(10_000.0));
    // Benchmark-only date carries asset prices forward.
    assert_eq!(rows[2].price("114260"), Some(110_100.0));
    assert_eq!(rows[2].benchmark, 2587.02);
    // Unrequested columns are dropped.
    assert_eq!(rows[0].price("999999"), None);
}

#[test]
fn cash_rate_follows_schedule() {
    let table = build_price_table(ETF_CSV, KOSPI_CSV, &spec(Calendar::TradingDays)).unwrap();
    let rates: Vec<f64> = table.rows().iter().map(|r| r.cash_rate).collect();
    assert_eq!(rates, vec![0.035, 0.035, 0.0325, 0.0325]);
}

#[test]
fn every_day_calendar_inserts_missing_days() {
    let etf = "Date,226490,114260,363570\n2024-01-05,1,2,3\n2024-01-08,4,5,6\n";
    let kospi = "Date,KOSPI\n2024-01-05,100\n2024-01-08,90\n";

    let table = build_price_table(etf, kospi, &spec(Calendar::EveryDay)).unwrap();
    assert_eq!(table.len(), 4);
    let sunday = &table.rows()[2];
    assert_eq!(sunday.date, d(2024, 1, 7));
    assert_eq!(sunday.price("226490"), Some(1.0));
    assert_eq!(sunday.benchmark, 100.0);
}

#[test]
fn rows_are_clipped_to_range() {
    let mut s = spec(Calendar::TradingDays);
    s.start = d(2024, 1, 3);
    s.end = d(2024, 1, 4);

    let table = build_price_table(ETF_CSV, KOSPI_CSV, &s).unwrap();
    assert_eq!(table.first_date(), Some(d(2024, 1, 3)));
    assert_eq!(table.last_date(), Some(d(2024, 1, 4)));
}

#[test]
fn benchmark_falls_back_to_first_column() {
    let mut s = spec(Calendar::TradingDays);
    s.benchmark_column = Some("KOSPI".to_string());
    let kospi = "Date,0001\n2024-01-02,2669.81\n";

    let table = build_price_table(ETF_CSV, kospi, &s).unwrap();
    assert_eq!(table.rows()[0].benchmark, 2669.81);
}

#[test]
fn missing_asset_column_is_an_error() {
    let mut s = spec(Calendar::TradingDays);
    s.assets.push("069500".to_string());

    let err = build_price_table(ETF_CSV, KOSPI_CSV, &s).unwrap_err();
    assert_eq!(err, LoadError::MissingColumn("069500".to_string()));
}

#[test]
fn range_without_rows_is_an_error() {
    let mut s = spec(Calendar::TradingDays);
    s.start = d(2030, 1, 1);
    s.end = d(2030, 12, 31);

    let err = build_price_table(ETF_CSV, KOSPI_CSV, &s).unwrap_err();
    assert!(matches!(err, LoadError::NoRowsInRange { .. }));
}

#[test]
fn garbage_number_reports_line_and_column() {
    let etf = "Date,226490,114260,363570\n2024-01-02,1,2,3\n2024-01-03,x,2,3\n";
    let err = build_price_table(etf, KOSPI_CSV, &spec(Calendar::TradingDays)).unwrap_err();
    assert_eq!(
        err,
        LoadError::ParseNumber {
            line: 3,
            column: "226490".to_string(),
            value: "x".to_string(),
        }
    );
}

#[test]
fn files_on_disk_load_through_the_source_trait() {
    let dir = tempfile::tempdir().unwrap();
    let etf_path = dir.path().join("etf.csv");
    let kospi_path = dir.path().join("kospi.csv");
    std::fs::File::create(&etf_path)
        .unwrap()
        .write_all(ETF_CSV.as_bytes())
        .unwrap();
    std::fs::File::create(&kospi_path)
        .unwrap()
        .write_all(KOSPI_CSV.as_bytes())
        .unwrap();

    let mut s = spec(Calendar::TradingDays);
    s.asset_prices_csv = etf_path;
    s.benchmark_csv = kospi_path;

    let direct = load_price_table(&s).unwrap();
    let via_trait = s.load().unwrap();
    assert_eq!(direct, via_trait);
    assert_eq!(direct.len(), 4);
}

#[test]
fn missing_file_is_an_io_error() {
    let mut s = spec(Calendar::TradingDays);
    s.asset_prices_csv = "/nonexistent/etf.csv".into();
    assert!(matches!(load_price_table(&s), Err(LoadError::Io(_))));
}
