//! Merge per-symbol close histories into one `Date,<col>...` CSV.

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use anyhow::{Context, Result};
use chrono::NaiveDate;

use crate::provider::DailyClose;

/// One output column: header label and its history.
#[derive(Debug, Clone)]
pub struct WideColumn {
    pub label: String,
    pub closes: Vec<DailyClose>,
}

/// Outer-join `columns` on date, then forward-fill and back-fill each column.
///
/// Columns with no data at all are dropped. Returned rows are ascending by
/// date; each row has one value per kept column, in input order.
pub fn merge_wide(columns: &[WideColumn]) -> (Vec<String>, Vec<(NaiveDate, Vec<f64>)>) {
    let kept: Vec<&WideColumn> = columns.iter().filter(|c| !c.closes.is_empty()).collect();

    let dates: BTreeSet<NaiveDate> = kept
        .iter()
        .flat_map(|c| c.closes.iter().map(|d| d.date))
        .collect();

    let mut filled: Vec<Vec<f64>> = Vec::with_capacity(kept.len());
    for col in &kept {
        let by_date: BTreeMap<NaiveDate, f64> =
            col.closes.iter().map(|d| (d.date, d.close)).collect();
        let first = col.closes.iter().min_by_key(|d| d.date).map(|d| d.close);

        let mut last: Option<f64> = None;
        let values = dates
            .iter()
            .map(|date| {
                if let Some(v) = by_date.get(date) {
                    last = Some(*v);
                }
                // Before the column's first observation: back-fill.
                last.or(first).unwrap_or(f64::NAN)
            })
            .collect();
        filled.push(values);
    }

    let labels = kept.iter().map(|c| c.label.clone()).collect();
    let rows = dates
        .into_iter()
        .enumerate()
        .map(|(i, date)| (date, filled.iter().map(|col| col[i]).collect()))
        .collect();
    (labels, rows)
}

/// Write the merged table; returns the number of data rows written.
pub fn write_wide_csv(path: &Path, columns: &[WideColumn]) -> Result<usize> {
    let (labels, rows) = merge_wide(columns);

    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("create output dir failed: {}", dir.display()))?;
    }

    let mut w = csv::Writer::from_path(path)
        .with_context(|| format!("open csv for write failed: {}", path.display()))?;

    let mut header = vec!["Date".to_string()];
    header.extend(labels);
    w.write_record(&header).context("write csv header failed")?;

    for (date, values) in &rows {
        let mut record = vec![date.format("%Y-%m-%d").to_string()];
        record.extend(values.iter().map(|v| v.to_string()));
        w.write_record(&record).context("write csv row failed")?;
    }
    w.flush().context("flush csv failed")?;

    tracing::info!(path = %path.display(), rows = rows.len(), "wide csv written");
    Ok(rows.len())
}
