//! Price table loader (CSV).
//!
//! Inputs
//!
//! - asset CSV: `Date` column plus one column per asset id (wide layout)
//! - benchmark CSV: `Date` column plus the benchmark column; when the named
//!   column is absent the first non-date column is used
//!
//! Dates may be `YYYY-MM-DD`, `YYYYMMDD` or `YYYY-MM-DD HH:MM:SS`. Empty
//! cells are gaps. Both files are outer-joined on date, every column is
//! forward-filled then back-filled, the result is clipped to the requested
//! range and the cash rate is attached from a [`RateSchedule`].

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::PathBuf;

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::rates::RateSchedule;
use crate::types::{PriceRow, PriceTable, PriceTableError};

/// Loader errors are small, explicit, and test-friendly.
#[derive(Debug, Clone, PartialEq)]
pub enum LoadError {
    EmptyInput,
    MissingColumn(String),
    /// A column has no value on any date, so it cannot be filled.
    EmptyColumn(String),
    BadDate { line: usize, value: String },
    ParseNumber { line: usize, column: String, value: String },
    NoRowsInRange { start: NaiveDate, end: NaiveDate },
    Table(PriceTableError),
    Csv(String),
    Io(String),
}

impl From<std::io::Error> for LoadError {
    fn from(e: std::io::Error) -> Self {
        LoadError::Io(e.to_string())
    }
}

impl From<csv::Error> for LoadError {
    fn from(e: csv::Error) -> Self {
        LoadError::Csv(e.to_string())
    }
}

impl std::fmt::Display for LoadError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LoadError::EmptyInput => write!(f, "empty input"),
            LoadError::MissingColumn(c) => write!(f, "missing column: {}", c),
            LoadError::EmptyColumn(c) => write!(f, "column has no values: {}", c),
            LoadError::BadDate { line, value } => {
                write!(f, "bad date at line {}: {}", line, value)
            }
            LoadError::ParseNumber {
                line,
                column,
                value,
            } => write!(
                f,
                "failed to parse number in column {} at line {}: {}",
                column, line, value
            ),
            LoadError::NoRowsInRange { start, end } => {
                write!(f, "no rows between {} and {}", start, end)
            }
            LoadError::Table(e) => write!(f, "invalid price table: {}", e),
            LoadError::Csv(e) => write!(f, "csv error: {}", e),
            LoadError::Io(e) => write!(f, "io error: {}", e),
        }
    }
}

impl std::error::Error for LoadError {}

/// Row calendar of the built table.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Calendar {
    /// Only dates present in either source file.
    #[default]
    TradingDays,
    /// Every calendar day between the first and last source date; inserted
    /// days repeat the previous row.
    EveryDay,
}

/// Everything the CSV loader needs to build a table.
#[derive(Clone, Debug)]
pub struct CsvSourceSpec {
    pub asset_prices_csv: PathBuf,
    pub benchmark_csv: PathBuf,
    pub benchmark_column: Option<String>,
    /// Asset columns to keep (others in the file are ignored).
    pub assets: Vec<String>,
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub calendar: Calendar,
    pub rates: RateSchedule,
}

/// Boundary for anything that can produce a price table.
pub trait PriceTableSource: Send + Sync {
    fn load(&self) -> Result<PriceTable, LoadError>;
}

impl PriceTableSource for CsvSourceSpec {
    fn load(&self) -> Result<PriceTable, LoadError> {
        load_price_table(self)
    }
}

impl PriceTableSource for PriceTable {
    fn load(&self) -> Result<PriceTable, LoadError> {
        Ok(self.clone())
    }
}

/// Parsed wide CSV: one optional value per (date, column).
#[derive(Clone, Debug, Default, PartialEq)]
pub struct WideFrame {
    pub columns: Vec<String>,
    pub rows: BTreeMap<NaiveDate, Vec<Option<f64>>>,
}

impl WideFrame {
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    fn value(&self, date: &NaiveDate, col: usize) -> Option<f64> {
        self.rows.get(date).and_then(|r| r.get(col).copied().flatten())
    }
}

/// Load and build the table from the files named in `spec`.
pub fn load_price_table(spec: &CsvSourceSpec) -> Result<PriceTable, LoadError> {
    let asset_csv = fs::read_to_string(&spec.asset_prices_csv)?;
    let benchmark_csv = fs::read_to_string(&spec.benchmark_csv)?;
    let table = build_price_table(&asset_csv, &benchmark_csv, spec)?;
    debug!(
        rows = table.len(),
        assets = spec.assets.len(),
        "price table loaded"
    );
    Ok(table)
}

/// Build the table from CSV contents (pure, deterministic).
pub fn build_price_table(
    asset_csv: &str,
    benchmark_csv: &str,
    spec: &CsvSourceSpec,
) -> Result<PriceTable, LoadError> {
    let assets = parse_wide_csv(asset_csv)?;
    let bench = parse_wide_csv(benchmark_csv)?;

    let asset_cols = spec
        .assets
        .iter()
        .map(|a| {
            assets
                .column_index(a)
                .ok_or_else(|| LoadError::MissingColumn(a.clone()))
        })
        .collect::<Result<Vec<usize>, LoadError>>()?;

    let bench_col = spec
        .benchmark_column
        .as_deref()
        .and_then(|name| bench.column_index(name))
        .or(if bench.columns.is_empty() { None } else { Some(0) })
        .ok_or_else(|| {
            LoadError::MissingColumn(
                spec.benchmark_column
                    .clone()
                    .unwrap_or_else(|| "benchmark".to_string()),
            )
        })?;

    let dates: Vec<NaiveDate> = assets
        .rows
        .keys()
        .chain(bench.rows.keys())
        .copied()
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();

    // Column-major: assets in spec order, benchmark last.
    let mut columns: Vec<Vec<Option<f64>>> = asset_cols
        .iter()
        .map(|&c| dates.iter().map(|d| assets.value(d, c)).collect())
        .collect();
    columns.push(dates.iter().map(|d| bench.value(d, bench_col)).collect());

    let mut names: Vec<String> = spec.assets.clone();
    names.push(bench.columns[bench_col].clone());

    let mut filled: Vec<Vec<f64>> = Vec::with_capacity(columns.len());
    for (col, name) in columns.iter().zip(names.iter()) {
        let col = fill_forward_then_backward(col)
            .ok_or_else(|| LoadError::EmptyColumn(name.clone()))?;
        filled.push(col);
    }

    let (dates, filled) = match spec.calendar {
        Calendar::TradingDays => (dates, filled),
        Calendar::EveryDay => expand_to_every_day(&dates, &filled),
    };

    let bench_idx = filled.len() - 1;
    let mut rows = Vec::new();
    for (i, date) in dates.iter().enumerate() {
        if *date < spec.start || *date > spec.end {
            continue;
        }
        let mut row = PriceRow::new(*date, filled[bench_idx][i], spec.rates.rate_on(*date));
        for (j, asset) in spec.assets.iter().enumerate() {
            row = row.with_price(asset.clone(), filled[j][i]);
        }
        rows.push(row);
    }

    if rows.is_empty() {
        return Err(LoadError::NoRowsInRange {
            start: spec.start,
            end: spec.end,
        });
    }

    PriceTable::new(rows).map_err(LoadError::Table)
}

/// Parse a `Date,<col>...` CSV. Duplicate dates keep the first row.
pub fn parse_wide_csv(text: &str) -> Result<WideFrame, LoadError> {
    if text.trim().is_empty() {
        return Err(LoadError::EmptyInput);
    }

    let mut rdr = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(text.as_bytes());

    let headers: Vec<String> = rdr
        .headers()?
        .iter()
        .map(|h| h.trim_start_matches('\u{feff}').trim().to_string())
        .collect();

    let date_idx = headers
        .iter()
        .position(|h| h.eq_ignore_ascii_case("date"))
        .ok_or_else(|| LoadError::MissingColumn("Date".to_string()))?;

    let value_idx: Vec<usize> = (0..headers.len()).filter(|&i| i != date_idx).collect();
    let columns: Vec<String> = value_idx.iter().map(|&i| headers[i].clone()).collect();

    let mut rows: BTreeMap<NaiveDate, Vec<Option<f64>>> = BTreeMap::new();
    for (i, rec) in rdr.records().enumerate() {
        let rec = rec?;
        let line = i + 2; // 1-based, counting header as line 1

        let raw_date = rec.get(date_idx).unwrap_or("");
        if raw_date.is_empty() {
            continue;
        }
        let date = parse_date(raw_date).ok_or_else(|| LoadError::BadDate {
            line,
            value: raw_date.to_string(),
        })?;

        let mut values = Vec::with_capacity(value_idx.len());
        for &c in &value_idx {
            let raw = rec.get(c).unwrap_or("");
            values.push(parse_cell(raw).map_err(|_| LoadError::ParseNumber {
                line,
                column: headers[c].clone(),
                value: raw.to_string(),
            })?);
        }

        rows.entry(date).or_insert(values);
    }

    Ok(WideFrame { columns, rows })
}

pub(crate) fn parse_date(raw: &str) -> Option<NaiveDate> {
    let s = raw.trim();
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(s, "%Y%m%d"))
        .or_else(|_| NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S").map(|dt| dt.date()))
        .ok()
}

fn parse_cell(raw: &str) -> Result<Option<f64>, std::num::ParseFloatError> {
    let s = raw.trim();
    if s.is_empty() || s.eq_ignore_ascii_case("nan") {
        return Ok(None);
    }
    s.replace(',', "").parse::<f64>().map(Some)
}

/// Forward fill, then back fill the leading gap. `None` if every cell is a gap.
fn fill_forward_then_backward(col: &[Option<f64>]) -> Option<Vec<f64>> {
    let first = col.iter().flatten().next().copied()?;
    let mut last = first;
    Some(
        col.iter()
            .map(|v| {
                if let Some(v) = v {
                    last = *v;
                }
                last
            })
            .collect(),
    )
}

fn expand_to_every_day(dates: &[NaiveDate], cols: &[Vec<f64>]) -> (Vec<NaiveDate>, Vec<Vec<f64>>) {
    let (Some(&first), Some(&last)) = (dates.first(), dates.last()) else {
        return (dates.to_vec(), cols.to_vec());
    };

    let mut out_dates = Vec::new();
    let mut out_cols: Vec<Vec<f64>> = vec![Vec::new(); cols.len()];
    let mut src = 0usize;
    let mut day = first;
    while day <= last {
        if src + 1 < dates.len() && dates[src + 1] <= day {
            src += 1;
        }
        out_dates.push(day);
        for (out, col) in out_cols.iter_mut().zip(cols.iter()) {
            out.push(col[src]);
        }
        match day.succ_opt() {
            Some(next) => day = next,
            None => break,
        }
    }
    (out_dates, out_cols)
}
