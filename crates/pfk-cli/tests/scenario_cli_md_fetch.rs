use assert_cmd::prelude::*;
use httpmock::prelude::*;
use predicates::prelude::*;
use serde_json::json;
use std::fs;
use std::process::Command;

const STOCK_PATH: &str = "/uapi/domestic-stock/v1/quotations/inquire-daily-price";
const INDEX_PATH: &str = "/uapi/domestic-stock/v1/quotations/inquire-daily-indexchartprice";

fn config(dir: &std::path::Path, base_url: &str) -> std::path::PathBuf {
    let yaml = format!(
        r#"
backtest:
  initial_capital: 1000
  start_date: "2024-01-02"
  end_date: "2024-01-05"
  weights: {{ A: 1.0 }}
  groups:
    equity: [A]
    fixed_income: []
data:
  asset_prices_csv: "unused.csv"
  benchmark_csv: "unused.csv"
md:
  base_url: "{base_url}"
  page_delay_ms: 0
"#
    );
    let path = dir.join("config.yaml");
    fs::write(&path, yaml).unwrap();
    path
}

#[test]
fn fetch_merges_stock_and_index_into_wide_csv() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path(STOCK_PATH).query_param("FID_INPUT_ISCD", "226490");
        then.status(200).json_body(json!({
            "rt_cd": "0",
            "output2": [
                {"stck_bsop_date": "20240105", "stck_clpr": "10,100"},
                {"stck_bsop_date": "20240103", "stck_clpr": "10,000"},
                {"stck_bsop_date": "20240102", "stck_clpr": "9,900"}
            ]
        }));
    });
    server.mock(|when, then| {
        when.method(GET).path(INDEX_PATH).query_param("FID_INPUT_ISCD", "0001");
        then.status(200).json_body(json!({
            "rt_cd": "0",
            "output2": [
                {"stck_bsop_date": "20240105", "bstp_nmix_prpr": "2578.08"},
                {"stck_bsop_date": "20240104", "bstp_nmix_prpr": "2587.02"},
                {"stck_bsop_date": "20240102", "bstp_nmix_prpr": "2669.81"}
            ]
        }));
    });

    let tmp = tempfile::tempdir().unwrap();
    let cfg = config(tmp.path(), &server.base_url());
    let out = tmp.path().join("md").join("wide.csv");

    Command::cargo_bin("pfk")
        .unwrap()
        .current_dir(tmp.path())
        .env("KIS_APP_KEY", "k")
        .env("KIS_APP_SECRET", "s")
        .env("KIS_ACCESS_TOKEN", "t")
        .args(["md", "fetch", "--stock", "226490", "--index", "0001=KOSPI"])
        .args(["--start", "2024-01-02", "--end", "2024-01-05", "--config"])
        .arg(&cfg)
        .arg("--out")
        .arg(&out)
        .assert()
        .success()
        .stdout(predicate::str::contains("symbol=226490 rows=3 complete=true"))
        .stdout(predicate::str::contains("symbol=KOSPI rows=3 complete=true"))
        .stdout(predicate::str::contains("rows=4"));

    let csv = fs::read_to_string(&out).unwrap();
    let lines: Vec<&str> = csv.lines().collect();
    assert_eq!(lines[0], "Date,226490,KOSPI");
    assert_eq!(lines.len(), 5);
    // 2024-01-04 has no stock close: carried forward from 2024-01-03.
    assert_eq!(lines[3], "2024-01-04,10000,2587.02");
}

#[test]
fn fetch_without_credentials_names_the_missing_variable() {
    let tmp = tempfile::tempdir().unwrap();
    let cfg = config(tmp.path(), "http://127.0.0.1:9");

    Command::cargo_bin("pfk")
        .unwrap()
        .current_dir(tmp.path())
        .env_remove("KIS_APP_KEY")
        .env_remove("KIS_APP_SECRET")
        .env_remove("KIS_ACCESS_TOKEN")
        .args(["md", "fetch", "--stock", "226490"])
        .args(["--start", "2024-01-02", "--end", "2024-01-05", "--config"])
        .arg(&cfg)
        .arg("--out")
        .arg(tmp.path().join("x.csv"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("KIS_APP_KEY"));
}
