//! Korea Investment & Securities quotation API client.
//!
//! Each request returns at most ~100 trading days ending at `FID_INPUT_DATE_2`,
//! newest first. Full ranges are collected by walking the end date backwards.

use std::time::Duration;

use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::Value;

use crate::provider::{
    DailyClose, DailyCloseProvider, FetchOutcome, FetchRequest, InstrumentKind, ProviderError,
};

pub const DEFAULT_BASE_URL: &str = "https://openapi.koreainvestment.com:9443";
pub const DEFAULT_PAGE_DELAY: Duration = Duration::from_millis(100);

const STOCK_PATH: &str = "/uapi/domestic-stock/v1/quotations/inquire-daily-price";
const INDEX_PATH: &str = "/uapi/domestic-stock/v1/quotations/inquire-daily-indexchartprice";
const STOCK_TR_ID: &str = "FHKST03010100";
const INDEX_TR_ID: &str = "FHKUP03500100";

const DATE_FIELD: &str = "stck_bsop_date";
const STOCK_CLOSE_FIELD: &str = "stck_clpr";
const INDEX_CLOSE_FIELD: &str = "bstp_nmix_prpr";

/// App credentials and a pre-issued access token. Do not log.
#[derive(Clone)]
pub struct KisCredentials {
    pub app_key: String,
    pub app_secret: String,
    pub access_token: String,
}

impl std::fmt::Debug for KisCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("KisCredentials(<REDACTED>)")
    }
}

#[derive(Debug, Clone)]
pub struct KisDailyClient {
    creds: KisCredentials,
    http: reqwest::Client,
    base_url: String,
    page_delay: Duration,
}

impl KisDailyClient {
    pub fn new(creds: KisCredentials) -> Self {
        Self::new_with_base_url(creds, DEFAULT_BASE_URL.to_string())
    }

    pub fn new_with_base_url(creds: KisCredentials, base_url: String) -> Self {
        Self {
            creds,
            http: reqwest::Client::new(),
            base_url,
            page_delay: DEFAULT_PAGE_DELAY,
        }
    }

    /// Pause between consecutive pages of one symbol.
    pub fn with_page_delay(mut self, page_delay: Duration) -> Self {
        self.page_delay = page_delay;
        self
    }

    fn url(&self, kind: InstrumentKind) -> String {
        let path = match kind {
            InstrumentKind::Stock => STOCK_PATH,
            InstrumentKind::Index => INDEX_PATH,
        };
        format!("{}{}", self.base_url.trim_end_matches('/'), path)
    }

    /// One page ending at `cursor`. Returns the rows in response order.
    async fn fetch_page(
        &self,
        req: &FetchRequest,
        cursor: NaiveDate,
    ) -> Result<Vec<DailyClose>, ProviderError> {
        let start_s = req.start.format("%Y%m%d").to_string();
        let end_s = cursor.format("%Y%m%d").to_string();

        let (tr_id, market, close_field) = match req.kind {
            InstrumentKind::Stock => (STOCK_TR_ID, "J", STOCK_CLOSE_FIELD),
            InstrumentKind::Index => (INDEX_TR_ID, "U", INDEX_CLOSE_FIELD),
        };

        let mut query: Vec<(&str, &str)> = vec![
            ("FID_COND_MRKT_DIV_CODE", market),
            ("FID_INPUT_ISCD", req.symbol.as_str()),
            ("FID_INPUT_DATE_1", start_s.as_str()),
            ("FID_INPUT_DATE_2", end_s.as_str()),
            ("FID_PERIOD_DIV_CODE", "D"),
        ];
        if req.kind == InstrumentKind::Stock {
            query.push(("FID_ORG_ADJ_PRC", "0"));
        }

        let resp = self
            .http
            .get(self.url(req.kind))
            .header("authorization", format!("Bearer {}", self.creds.access_token))
            .header("appkey", &self.creds.app_key)
            .header("appsecret", &self.creds.app_secret)
            .header("tr_id", tr_id)
            .header("custtype", "P")
            .query(&query)
            .send()
            .await
            .map_err(|e| ProviderError::Transport(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(ProviderError::Transport(format!(
                "http status {}",
                status.as_u16()
            )));
        }

        let body: KisDailyResponse = resp
            .json()
            .await
            .map_err(|e| ProviderError::Decode(e.to_string()))?;

        if body.rt_cd != "0" {
            return Err(ProviderError::Api {
                code: body.rt_cd,
                message: body.msg1.unwrap_or_else(|| "no message".to_string()),
            });
        }

        Ok(body
            .output2
            .unwrap_or_default()
            .iter()
            .filter_map(|item| parse_row(item, close_field))
            .collect())
    }
}

#[async_trait::async_trait]
impl DailyCloseProvider for KisDailyClient {
    fn source_name(&self) -> &'static str {
        "kis"
    }

    async fn fetch_daily_closes(&self, req: &FetchRequest) -> FetchOutcome {
        let mut collected: Vec<DailyClose> = Vec::new();
        let mut halted: Option<ProviderError> = None;
        let mut cursor = req.end;

        while cursor >= req.start {
            let page = match self.fetch_page(req, cursor).await {
                Ok(page) => page,
                Err(err) => {
                    tracing::warn!(
                        symbol = %req.symbol,
                        cursor = %cursor,
                        error = %err,
                        "kis paging halted; keeping partial history"
                    );
                    halted = Some(err);
                    break;
                }
            };

            let Some(earliest) = page.iter().map(|c| c.date).min() else {
                tracing::debug!(symbol = %req.symbol, cursor = %cursor, "kis page empty");
                break;
            };
            tracing::debug!(
                symbol = %req.symbol,
                rows = page.len(),
                earliest = %earliest,
                "kis page received"
            );
            collected.extend(page);

            // Stop at the requested start, and never re-request a window the
            // API has already answered.
            if earliest <= req.start || earliest > cursor {
                break;
            }
            let Some(next) = earliest.pred_opt() else {
                break;
            };
            cursor = next;

            if !self.page_delay.is_zero() {
                tokio::time::sleep(self.page_delay).await;
            }
        }

        FetchOutcome {
            symbol: req.symbol.clone(),
            closes: dedup_sorted(collected, req.start, req.end),
            halted,
        }
    }
}

#[derive(Debug, Deserialize)]
struct KisDailyResponse {
    rt_cd: String,
    #[serde(default)]
    msg1: Option<String>,
    #[serde(default)]
    output2: Option<Vec<Value>>,
}

/// Rows without a date or price (the API pads short pages with blank
/// objects) are skipped.
fn parse_row(item: &Value, close_field: &str) -> Option<DailyClose> {
    let date_s = item.get(DATE_FIELD)?.as_str()?.trim();
    let date = NaiveDate::parse_from_str(date_s, "%Y%m%d").ok()?;
    let close_s = item.get(close_field)?.as_str()?;
    let close = close_s.trim().replace(',', "").parse::<f64>().ok()?;
    Some(DailyClose { date, close })
}

/// Ascending, first occurrence per date wins, clipped to `[start, end]`.
fn dedup_sorted(mut rows: Vec<DailyClose>, start: NaiveDate, end: NaiveDate) -> Vec<DailyClose> {
    rows.retain(|c| c.date >= start && c.date <= end);
    rows.sort_by_key(|c| c.date);
    rows.dedup_by_key(|c| c.date);
    rows
}
