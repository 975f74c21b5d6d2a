//! pfk-backtest
//!
//! Monthly-rebalanced portfolio simulation over a date-aligned price table.
//!
//! Pipeline: CSV SOURCES -> PRICE TABLE -> ENGINE -> PORTFOLIO HISTORY
//!
//! - Day 0 is fully invested at target weights
//! - Share counts are frozen between rebalances; only prices move value
//! - Cash compounds daily (actual/365) at the rate attached to each row
//! - Rebalance at the close of the last row of each month (configurable)
//! - Deterministic: same table + config => identical history

mod engine;
pub mod loader;
pub mod rates;
pub mod types;

pub use engine::{BacktestEngine, BacktestError};
pub use loader::{
    build_price_table, load_price_table, parse_wide_csv, Calendar, CsvSourceSpec, LoadError,
    PriceTableSource, WideFrame,
};
pub use rates::RateSchedule;
pub use types::{
    AssetGrouping, BacktestConfig, BacktestReport, PortfolioSnapshot, PriceRow, PriceTable,
    PriceTableError, RebalanceEvent, RebalanceTrigger, TargetWeights, CASH_ID,
};
