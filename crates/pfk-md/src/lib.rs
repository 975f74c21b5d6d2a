//! pfk-md
//!
//! Daily close history from the brokerage quotation API, and the wide CSV
//! files the backtest loader reads.
//!
//! This crate fetches and writes files only; it knows nothing about the
//! simulation. Callers (CLI) resolve credentials and hand them in.

pub mod kis;
pub mod provider;
pub mod wide_csv;

pub use kis::{KisCredentials, KisDailyClient, DEFAULT_PAGE_DELAY};
pub use provider::{
    DailyClose, DailyCloseProvider, FetchOutcome, FetchRequest, InstrumentKind, ProviderError,
};
pub use wide_csv::{merge_wide, write_wide_csv, WideColumn};
