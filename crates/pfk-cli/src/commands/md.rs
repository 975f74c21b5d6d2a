use std::path::Path;
use std::time::Duration;

use anyhow::Result;
use chrono::NaiveDate;

use pfk_config::resolve_secrets;
use pfk_md::{
    write_wide_csv, DailyCloseProvider, FetchRequest, InstrumentKind, KisCredentials,
    KisDailyClient, WideColumn,
};

use super::load_settings;

/// `CODE=LABEL` -> (code, label); a bare code is its own label.
fn split_index_arg(raw: &str) -> (String, String) {
    match raw.split_once('=') {
        Some((code, label)) if !label.trim().is_empty() => {
            (code.trim().to_string(), label.trim().to_string())
        }
        Some((code, _)) => (code.trim().to_string(), code.trim().to_string()),
        None => (raw.trim().to_string(), raw.trim().to_string()),
    }
}

pub(crate) async fn fetch(
    config_paths: &[String],
    stocks: &[String],
    indices: &[String],
    start: NaiveDate,
    end: NaiveDate,
    out: &Path,
) -> Result<()> {
    if stocks.is_empty() && indices.is_empty() {
        anyhow::bail!("nothing to fetch: pass --stock and/or --index");
    }

    let (_loaded, settings) = load_settings(config_paths)?;
    let kis = resolve_secrets(&settings).require_kis()?;
    let client = KisDailyClient::new_with_base_url(
        KisCredentials {
            app_key: kis.app_key,
            app_secret: kis.app_secret,
            access_token: kis.access_token,
        },
        settings.md.base_url.clone(),
    )
    .with_page_delay(Duration::from_millis(settings.md.page_delay_ms));

    let mut requests: Vec<(String, FetchRequest)> = stocks
        .iter()
        .map(|code| {
            (
                code.clone(),
                FetchRequest {
                    symbol: code.clone(),
                    kind: InstrumentKind::Stock,
                    start,
                    end,
                },
            )
        })
        .collect();
    for raw in indices {
        let (code, label) = split_index_arg(raw);
        requests.push((
            label,
            FetchRequest {
                symbol: code,
                kind: InstrumentKind::Index,
                start,
                end,
            },
        ));
    }

    let mut columns = Vec::with_capacity(requests.len());
    for (label, req) in &requests {
        let outcome = client.fetch_daily_closes(req).await;
        match &outcome.halted {
            Some(err) => println!(
                "symbol={} rows={} complete=false error={}",
                label,
                outcome.closes.len(),
                err
            ),
            None => println!("symbol={} rows={} complete=true", label, outcome.closes.len()),
        }
        columns.push(WideColumn {
            label: label.clone(),
            closes: outcome.closes,
        });
    }

    let rows = write_wide_csv(out, &columns)?;
    println!("out={} rows={}", out.display(), rows);
    Ok(())
}
