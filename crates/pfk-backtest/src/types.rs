use std::collections::BTreeMap;

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

/// Reserved identifier for the cash sleeve in a weight map.
pub const CASH_ID: &str = "cash";

// ---------------------------------------------------------------------------
// Price table
// ---------------------------------------------------------------------------

/// One daily row of the price table.
#[derive(Clone, Debug, PartialEq)]
pub struct PriceRow {
    pub date: NaiveDate,
    /// Price per tracked asset identifier.
    pub prices: BTreeMap<String, f64>,
    /// Benchmark index level.
    pub benchmark: f64,
    /// Annualized cash-accrual rate as a fraction (0.0325 = 3.25%).
    pub cash_rate: f64,
}

impl PriceRow {
    pub fn new(date: NaiveDate, benchmark: f64, cash_rate: f64) -> Self {
        Self {
            date,
            prices: BTreeMap::new(),
            benchmark,
            cash_rate,
        }
    }

    pub fn with_price(mut self, asset: impl Into<String>, price: f64) -> Self {
        self.prices.insert(asset.into(), price);
        self
    }

    pub fn price(&self, asset: &str) -> Option<f64> {
        self.prices.get(asset).copied()
    }
}

/// Price table validation errors.
#[derive(Clone, Debug, PartialEq)]
pub enum PriceTableError {
    /// Dates must be strictly ascending (which also rules out duplicates).
    NotAscending { prev: NaiveDate, next: NaiveDate },
    /// A row lacks an asset carried by the first row.
    MissingPrice { date: NaiveDate, asset: String },
    /// A row carries an asset the first row does not.
    UnexpectedAsset { date: NaiveDate, asset: String },
    /// A price or benchmark value is NaN or infinite.
    NonFinite { date: NaiveDate, column: String },
}

impl std::fmt::Display for PriceTableError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PriceTableError::NotAscending { prev, next } => {
                write!(f, "dates not strictly ascending: {} then {}", prev, next)
            }
            PriceTableError::MissingPrice { date, asset } => {
                write!(f, "missing price for {} on {}", asset, date)
            }
            PriceTableError::UnexpectedAsset { date, asset } => {
                write!(f, "unexpected asset {} on {}", asset, date)
            }
            PriceTableError::NonFinite { date, column } => {
                write!(f, "non-finite value in column {} on {}", column, date)
            }
        }
    }
}

impl std::error::Error for PriceTableError {}

/// Date-ascending daily price table. Immutable once built.
///
/// Every row carries the same asset set as the first row, a benchmark level,
/// and a cash rate.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PriceTable {
    rows: Vec<PriceRow>,
}

impl PriceTable {
    pub fn new(rows: Vec<PriceRow>) -> Result<Self, PriceTableError> {
        if let Some(first) = rows.first() {
            for pair in rows.windows(2) {
                if pair[1].date <= pair[0].date {
                    return Err(PriceTableError::NotAscending {
                        prev: pair[0].date,
                        next: pair[1].date,
                    });
                }
            }

            for row in &rows {
                for asset in first.prices.keys() {
                    match row.prices.get(asset) {
                        None => {
                            return Err(PriceTableError::MissingPrice {
                                date: row.date,
                                asset: asset.clone(),
                            })
                        }
                        Some(p) if !p.is_finite() => {
                            return Err(PriceTableError::NonFinite {
                                date: row.date,
                                column: asset.clone(),
                            })
                        }
                        Some(_) => {}
                    }
                }
                if let Some(extra) = row.prices.keys().find(|a| !first.prices.contains_key(*a)) {
                    return Err(PriceTableError::UnexpectedAsset {
                        date: row.date,
                        asset: extra.clone(),
                    });
                }
                if !row.benchmark.is_finite() {
                    return Err(PriceTableError::NonFinite {
                        date: row.date,
                        column: "benchmark".to_string(),
                    });
                }
            }
        }
        Ok(Self { rows })
    }

    pub fn rows(&self) -> &[PriceRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn first_date(&self) -> Option<NaiveDate> {
        self.rows.first().map(|r| r.date)
    }

    pub fn last_date(&self) -> Option<NaiveDate> {
        self.rows.last().map(|r| r.date)
    }

    /// True if the table carries a price column for `asset`.
    pub fn has_asset(&self, asset: &str) -> bool {
        self.rows
            .first()
            .map(|r| r.prices.contains_key(asset))
            .unwrap_or(false)
    }
}

// ---------------------------------------------------------------------------
// Allocation inputs
// ---------------------------------------------------------------------------

/// Target portfolio fractions per asset plus the cash sleeve.
///
/// Weights are expected to sum to 1.0. This is not enforced: each weight is
/// applied independently at rebalance time.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TargetWeights {
    assets: BTreeMap<String, f64>,
    cash: f64,
}

impl TargetWeights {
    pub fn new<I, S>(assets: I, cash: f64) -> Self
    where
        I: IntoIterator<Item = (S, f64)>,
        S: Into<String>,
    {
        Self {
            assets: assets.into_iter().map(|(k, v)| (k.into(), v)).collect(),
            cash,
        }
    }

    /// Build from a flat map where the cash sleeve is keyed by [`CASH_ID`]
    /// (matched case-insensitively). A map without a cash key has no cash.
    pub fn from_map(map: BTreeMap<String, f64>) -> Self {
        let mut cash = 0.0;
        let mut assets = BTreeMap::new();
        for (k, v) in map {
            if k.eq_ignore_ascii_case(CASH_ID) {
                cash = v;
            } else {
                assets.insert(k, v);
            }
        }
        Self { assets, cash }
    }

    pub fn asset(&self, asset: &str) -> Option<f64> {
        self.assets.get(asset).copied()
    }

    pub fn assets(&self) -> &BTreeMap<String, f64> {
        &self.assets
    }

    pub fn cash(&self) -> f64 {
        self.cash
    }

    pub fn total(&self) -> f64 {
        self.assets.values().sum::<f64>() + self.cash
    }
}

/// Partition of non-cash assets into equity and fixed-income classes.
///
/// Only used to aggregate snapshot sub-totals.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetGrouping {
    #[serde(default)]
    pub equity: Vec<String>,
    #[serde(default)]
    pub fixed_income: Vec<String>,
}

impl AssetGrouping {
    pub fn new<S: Into<String>>(equity: Vec<S>, fixed_income: Vec<S>) -> Self {
        Self {
            equity: equity.into_iter().map(Into::into).collect(),
            fixed_income: fixed_income.into_iter().map(Into::into).collect(),
        }
    }

    /// Equity assets first, then fixed income.
    pub fn all(&self) -> impl Iterator<Item = &String> {
        self.equity.iter().chain(self.fixed_income.iter())
    }

    pub fn contains(&self, asset: &str) -> bool {
        self.all().any(|a| a == asset)
    }
}

/// When to reset holdings back to target weights.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RebalanceTrigger {
    /// Rebalance when the next row of the table falls in a different month.
    LastRowOfMonth,
    /// Rebalance when tomorrow's calendar date falls in a different month.
    /// Fires only if the table actually holds the calendar month-end.
    #[default]
    CalendarMonthEnd,
}

impl RebalanceTrigger {
    /// `next` is the date of the following row; `None` on the final row,
    /// which never rebalances.
    pub fn fires(&self, today: NaiveDate, next: Option<NaiveDate>) -> bool {
        let Some(next) = next else {
            return false;
        };
        match self {
            RebalanceTrigger::LastRowOfMonth => {
                (next.year(), next.month()) != (today.year(), today.month())
            }
            RebalanceTrigger::CalendarMonthEnd => today
                .succ_opt()
                .map(|tomorrow| tomorrow.month() != today.month())
                .unwrap_or(true),
        }
    }
}

/// Backtest configuration.
#[derive(Clone, Debug, PartialEq)]
pub struct BacktestConfig {
    /// Starting capital (positive).
    pub initial_capital: f64,
    pub weights: TargetWeights,
    pub grouping: AssetGrouping,
    pub rebalance: RebalanceTrigger,
}

impl BacktestConfig {
    /// 60/15/15/10 stock/bond/bond/cash on 100M, rebalanced monthly.
    pub fn test_defaults() -> Self {
        Self {
            initial_capital: 100_000_000.0,
            weights: TargetWeights::new([("A", 0.60), ("B", 0.15), ("C", 0.15)], 0.10),
            grouping: AssetGrouping::new(vec!["A"], vec!["B", "C"]),
            rebalance: RebalanceTrigger::LastRowOfMonth,
        }
    }
}

// ---------------------------------------------------------------------------
// Outputs
// ---------------------------------------------------------------------------

/// One row of simulation output.
///
/// Invariant: `value == stock_value + bond_value + cash_value` within
/// floating-point tolerance.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PortfolioSnapshot {
    pub date: NaiveDate,
    pub value: f64,
    pub stock_value: f64,
    pub bond_value: f64,
    pub cash_value: f64,
}

/// Holdings immediately after a rebalance.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RebalanceEvent {
    pub date: NaiveDate,
    pub total_value: f64,
    pub cash_value: f64,
    pub shares: BTreeMap<String, f64>,
}

/// Backtest report produced after a run.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct BacktestReport {
    /// One snapshot per input row, in input order.
    pub history: Vec<PortfolioSnapshot>,
    pub rebalances: Vec<RebalanceEvent>,
}
