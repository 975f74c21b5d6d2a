//! Scenario: drawdown stays within [-1, 0] and CAGR annualizes on 365.25-day years.

use chrono::{Duration, NaiveDate};
use pfk_analytics::{compute_stats, DateSeries};

fn d(y: i32, m: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, day).unwrap()
}

fn daily(start: NaiveDate, values: &[f64]) -> DateSeries {
    DateSeries::from_pairs(
        values
            .iter()
            .enumerate()
            .map(|(i, v)| (start + Duration::days(i as i64), *v)),
    )
}

#[test]
fn non_decreasing_series_has_zero_drawdown() {
    let s = daily(d(2024, 1, 1), &[100.0, 100.0, 101.0, 105.0, 105.0, 120.0]);
    let stats = compute_stats(&s).unwrap();
    assert_eq!(stats.mdd, 0.0);
    assert_eq!(stats.final_value, 120.0);
}

#[test]
fn any_dip_gives_negative_drawdown_bounded_by_minus_one() {
    let s = daily(d(2024, 1, 1), &[100.0, 150.0, 75.0, 200.0, 190.0]);
    let stats = compute_stats(&s).unwrap();
    // Deepest: 150 -> 75.
    assert!((stats.mdd + 0.5).abs() < 1e-12, "mdd={}", stats.mdd);
    assert!(stats.mdd >= -1.0 && stats.mdd < 0.0);

    let wiped = daily(d(2024, 1, 1), &[100.0, 50.0, 0.0]);
    assert_eq!(compute_stats(&wiped).unwrap().mdd, -1.0);
}

#[test]
fn drawdown_uses_running_peak_not_global_peak() {
    // A later, higher peak must not deepen an earlier dip.
    let s = daily(d(2024, 1, 1), &[100.0, 90.0, 300.0, 280.0]);
    let stats = compute_stats(&s).unwrap();
    assert!((stats.mdd + 0.1).abs() < 1e-12, "mdd={}", stats.mdd);
}

#[test]
fn four_calendar_years_annualize_to_the_yearly_rate() {
    // 1461 days = 4 * 365.25, the nearest whole-day analogue of one average year.
    let d0 = d(2020, 1, 1);
    let d1 = d0 + Duration::days(1461);
    let v1 = 100.0 * 1.1_f64.powi(4);
    let s = DateSeries::from_pairs([(d0, 100.0), (d1, v1)]);

    let stats = compute_stats(&s).unwrap();
    assert!((stats.cagr - 0.1).abs() < 1e-12, "cagr={}", stats.cagr);
    assert_eq!(stats.mdd, 0.0);
}

#[test]
fn empty_series_has_no_stats() {
    assert!(compute_stats(&DateSeries::default()).is_none());
}

#[test]
fn stats_serialize_with_dashboard_keys() {
    let s = daily(d(2024, 1, 1), &[100.0, 110.0]);
    let v = serde_json::to_value(compute_stats(&s).unwrap()).unwrap();
    assert!(v.get("CAGR").is_some());
    assert!(v.get("MDD").is_some());
    assert_eq!(v["Final Value"], serde_json::json!(110.0));
}
