use std::collections::BTreeMap;

use crate::types::{
    BacktestConfig, BacktestReport, PortfolioSnapshot, PriceRow, PriceTable, RebalanceEvent,
};

/// Day count for daily cash compounding (actual/365).
const DAYS_PER_YEAR: f64 = 365.0;

/// Backtest error variants.
///
/// All of these are caller contract violations detected before the first
/// simulated day; the simulation itself does not fail.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BacktestError {
    /// A weighted or grouped asset has no price column in the table.
    UnknownAsset { asset: String },
    /// A grouped asset has no target weight.
    MissingWeight { asset: String },
    /// A weighted non-cash asset belongs to no group.
    UngroupedAsset { asset: String },
    /// An asset appears more than once across the groups.
    DuplicateGrouping { asset: String },
}

impl core::fmt::Display for BacktestError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            BacktestError::UnknownAsset { asset } => {
                write!(f, "asset not in price table: {}", asset)
            }
            BacktestError::MissingWeight { asset } => {
                write!(f, "grouped asset has no target weight: {}", asset)
            }
            BacktestError::UngroupedAsset { asset } => {
                write!(f, "weighted asset belongs to no group: {}", asset)
            }
            BacktestError::DuplicateGrouping { asset } => {
                write!(f, "asset grouped more than once: {}", asset)
            }
        }
    }
}

impl std::error::Error for BacktestError {}

/// Buy-and-hold with periodic rebalancing.
///
/// Per row after day 0: ACCRUE CASH -> MARK HOLDINGS -> SNAPSHOT -> MAYBE REBALANCE
pub struct BacktestEngine {
    config: BacktestConfig,
}

impl BacktestEngine {
    pub fn new(config: BacktestConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &BacktestConfig {
        &self.config
    }

    fn validate(&self, table: &PriceTable) -> Result<(), BacktestError> {
        let grouping = &self.config.grouping;
        let weights = &self.config.weights;

        let mut seen: Vec<&str> = Vec::new();
        for asset in grouping.all() {
            if seen.contains(&asset.as_str()) {
                return Err(BacktestError::DuplicateGrouping {
                    asset: asset.clone(),
                });
            }
            seen.push(asset);

            if weights.asset(asset).is_none() {
                return Err(BacktestError::MissingWeight {
                    asset: asset.clone(),
                });
            }
        }

        for asset in weights.assets().keys() {
            if !grouping.contains(asset) {
                return Err(BacktestError::UngroupedAsset {
                    asset: asset.clone(),
                });
            }
        }

        if !table.is_empty() {
            if let Some(asset) = grouping.all().find(|a| !table.has_asset(a)) {
                return Err(BacktestError::UnknownAsset {
                    asset: asset.clone(),
                });
            }
        }

        Ok(())
    }

    /// Run the simulation over `table`.
    ///
    /// Returns one snapshot per row. An empty table yields an empty history.
    pub fn run(&self, table: &PriceTable) -> Result<BacktestReport, BacktestError> {
        self.validate(table)?;

        let rows = table.rows();
        let Some(first) = rows.first() else {
            return Ok(BacktestReport::default());
        };

        let capital = self.config.initial_capital;
        let grouping = &self.config.grouping;
        let cash_weight = self.config.weights.cash();

        let mut history: Vec<PortfolioSnapshot> = Vec::with_capacity(rows.len());
        let mut rebalances: Vec<RebalanceEvent> = Vec::new();

        // Day 0: allocate at target weights. Sub-values are the allocations
        // themselves, not shares * price, so they are exact.
        let mut shares: BTreeMap<String, f64> = BTreeMap::new();
        let mut cash_value = capital * cash_weight;
        let mut stock_value = 0.0;
        let mut bond_value = 0.0;
        for asset in &grouping.equity {
            let target = capital * self.weight(asset)?;
            shares.insert(asset.clone(), target / price(first, asset)?);
            stock_value += target;
        }
        for asset in &grouping.fixed_income {
            let target = capital * self.weight(asset)?;
            shares.insert(asset.clone(), target / price(first, asset)?);
            bond_value += target;
        }
        history.push(PortfolioSnapshot {
            date: first.date,
            value: capital,
            stock_value,
            bond_value,
            cash_value,
        });

        for (i, row) in rows.iter().enumerate().skip(1) {
            cash_value *= 1.0 + row.cash_rate / DAYS_PER_YEAR;

            let stock_value = mark(&shares, &grouping.equity, row)?;
            let bond_value = mark(&shares, &grouping.fixed_income, row)?;
            let total_value = stock_value + bond_value + cash_value;

            history.push(PortfolioSnapshot {
                date: row.date,
                value: total_value,
                stock_value,
                bond_value,
                cash_value,
            });

            let next = rows.get(i + 1).map(|r| r.date);
            if self.config.rebalance.fires(row.date, next) {
                cash_value = total_value * cash_weight;
                for asset in grouping.all() {
                    let target = total_value * self.weight(asset)?;
                    shares.insert(asset.clone(), target / price(row, asset)?);
                }
                rebalances.push(RebalanceEvent {
                    date: row.date,
                    total_value,
                    cash_value,
                    shares: shares.clone(),
                });
            }
        }

        Ok(BacktestReport {
            history,
            rebalances,
        })
    }

    fn weight(&self, asset: &str) -> Result<f64, BacktestError> {
        self.config
            .weights
            .asset(asset)
            .ok_or_else(|| BacktestError::MissingWeight {
                asset: asset.to_string(),
            })
    }
}

fn price(row: &PriceRow, asset: &str) -> Result<f64, BacktestError> {
    row.price(asset).ok_or_else(|| BacktestError::UnknownAsset {
        asset: asset.to_string(),
    })
}

/// Σ shares * price over `assets`.
fn mark(
    shares: &BTreeMap<String, f64>,
    assets: &[String],
    row: &PriceRow,
) -> Result<f64, BacktestError> {
    let mut total = 0.0;
    for asset in assets {
        let qty = shares.get(asset).copied().unwrap_or(0.0);
        total += qty * price(row, asset)?;
    }
    Ok(total)
}
