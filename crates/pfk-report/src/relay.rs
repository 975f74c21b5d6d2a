//! Paced relay from a text generator to an event channel.

use std::sync::Arc;
use std::time::Duration;

use futures_util::StreamExt;
use serde_json::{json, Value};
use tokio::sync::mpsc;

use crate::generator::TextGenerator;

pub const NO_GENERATOR_MESSAGE: &str =
    "error: model not loaded (check the report API key configuration)";
pub const NO_PROMPT_MESSAGE: &str = "call /api/backtest first";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RelayEvent {
    Text(String),
    Done,
}

impl RelayEvent {
    /// Wire payload: `{"text": ...}` or `{"event": "done"}`.
    pub fn to_json(&self) -> Value {
        match self {
            RelayEvent::Text(t) => json!({ "text": t }),
            RelayEvent::Done => json!({ "event": "done" }),
        }
    }
}

/// Stream the generator's answer to `prompt` into `tx`.
///
/// Exactly one `Done` is sent last. Any failure is reported as a single
/// `Text` event before it. Stops early if the receiver goes away.
pub async fn relay(
    generator: Option<Arc<dyn TextGenerator>>,
    prompt: Option<String>,
    chunk_delay: Duration,
    tx: mpsc::Sender<RelayEvent>,
) {
    let Some(generator) = generator else {
        let _ = tx.send(RelayEvent::Text(NO_GENERATOR_MESSAGE.to_string())).await;
        let _ = tx.send(RelayEvent::Done).await;
        return;
    };
    let Some(prompt) = prompt else {
        let _ = tx.send(RelayEvent::Text(NO_PROMPT_MESSAGE.to_string())).await;
        let _ = tx.send(RelayEvent::Done).await;
        return;
    };

    tracing::info!(model = generator.model_name(), prompt_len = prompt.len(), "relay start");

    let mut chunks = match generator.stream_text(&prompt).await {
        Ok(s) => s,
        Err(err) => {
            tracing::warn!(error = %err, "generation request failed");
            let _ = tx
                .send(RelayEvent::Text(format!("error during streaming: {err}")))
                .await;
            let _ = tx.send(RelayEvent::Done).await;
            return;
        }
    };

    let mut sent = 0usize;
    while let Some(item) = chunks.next().await {
        match item {
            Ok(text) if text.is_empty() => continue,
            Ok(text) => {
                if tx.send(RelayEvent::Text(text)).await.is_err() {
                    tracing::debug!(sent, "relay receiver dropped");
                    return;
                }
                sent += 1;
                if !chunk_delay.is_zero() {
                    tokio::time::sleep(chunk_delay).await;
                }
            }
            Err(err) => {
                tracing::warn!(error = %err, sent, "generation stream failed");
                let _ = tx
                    .send(RelayEvent::Text(format!("error during streaming: {err}")))
                    .await;
                break;
            }
        }
    }

    tracing::info!(sent, "relay done");
    let _ = tx.send(RelayEvent::Done).await;
}
