//! Provider boundary for daily close history.

use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// One trading day's closing price (or index level).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DailyClose {
    pub date: NaiveDate,
    pub close: f64,
}

/// Listed instruments and indices use different endpoints and price fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InstrumentKind {
    /// Stocks and ETFs.
    Stock,
    /// Market indices (sector code, e.g. `0001` for KOSPI).
    Index,
}

#[derive(Debug, Clone)]
pub struct FetchRequest {
    pub symbol: String,
    pub kind: InstrumentKind,
    /// Inclusive.
    pub start: NaiveDate,
    /// Inclusive.
    pub end: NaiveDate,
}

/// Errors that a [`DailyCloseProvider`] may hit while paging.
#[derive(Debug, Clone, PartialEq)]
pub enum ProviderError {
    /// Network failure or non-success HTTP status.
    Transport(String),
    /// The upstream API answered with an application-level error.
    Api { code: String, message: String },
    /// A response payload could not be decoded.
    Decode(String),
}

impl fmt::Display for ProviderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProviderError::Transport(msg) => write!(f, "transport error: {msg}"),
            ProviderError::Api { code, message } => {
                write!(f, "provider api error rt_cd={code}: {message}")
            }
            ProviderError::Decode(msg) => write!(f, "decode error: {msg}"),
        }
    }
}

impl std::error::Error for ProviderError {}

/// Result of fetching one symbol.
///
/// Paging stops at the first failure; whatever was collected before it is
/// kept in `closes` and the failure is reported in `halted`.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchOutcome {
    pub symbol: String,
    /// Ascending by date, one entry per date.
    pub closes: Vec<DailyClose>,
    pub halted: Option<ProviderError>,
}

impl FetchOutcome {
    pub fn is_complete(&self) -> bool {
        self.halted.is_none()
    }
}

/// Upstream daily-close provider contract.
#[async_trait::async_trait]
pub trait DailyCloseProvider: Send + Sync {
    fn source_name(&self) -> &'static str;

    async fn fetch_daily_closes(&self, req: &FetchRequest) -> FetchOutcome;
}
