//! Relay ordering and failure reporting.

use std::sync::Arc;
use std::time::Duration;

use futures_util::stream;
use httpmock::prelude::*;
use pfk_report::{
    relay, GeminiGenerator, GenerationError, RelayEvent, TextGenerator, TextStream,
    NO_GENERATOR_MESSAGE, NO_PROMPT_MESSAGE,
};
use tokio::sync::mpsc;

/// Replays fixed items; `fail_open` rejects the request itself.
struct ScriptedGenerator {
    items: Vec<Result<String, GenerationError>>,
    fail_open: bool,
}

#[async_trait::async_trait]
impl TextGenerator for ScriptedGenerator {
    fn model_name(&self) -> &str {
        "scripted"
    }

    async fn stream_text(&self, _prompt: &str) -> Result<TextStream, GenerationError> {
        if self.fail_open {
            return Err(GenerationError::Stream("connection refused".into()));
        }
        Ok(Box::pin(stream::iter(self.items.clone())))
    }
}

async fn run(
    generator: Option<Arc<dyn TextGenerator>>,
    prompt: Option<&str>,
) -> Vec<RelayEvent> {
    let (tx, mut rx) = mpsc::channel(16);
    relay(generator, prompt.map(str::to_string), Duration::ZERO, tx).await;
    let mut out = Vec::new();
    while let Some(ev) = rx.recv().await {
        out.push(ev);
    }
    out
}

fn scripted(items: Vec<Result<String, GenerationError>>) -> Option<Arc<dyn TextGenerator>> {
    Some(Arc::new(ScriptedGenerator {
        items,
        fail_open: false,
    }))
}

#[tokio::test]
async fn missing_generator_yields_error_then_done() {
    let events = run(None, Some("prompt")).await;
    assert_eq!(
        events,
        vec![RelayEvent::Text(NO_GENERATOR_MESSAGE.into()), RelayEvent::Done]
    );
}

#[tokio::test]
async fn missing_prompt_yields_hint_then_done() {
    let events = run(scripted(vec![Ok("x".into())]), None).await;
    assert_eq!(
        events,
        vec![RelayEvent::Text(NO_PROMPT_MESSAGE.into()), RelayEvent::Done]
    );
}

#[tokio::test]
async fn chunks_are_relayed_in_order_and_empty_ones_skipped() {
    let events = run(
        scripted(vec![Ok("A".into()), Ok(String::new()), Ok("B".into())]),
        Some("prompt"),
    )
    .await;
    assert_eq!(
        events,
        vec![
            RelayEvent::Text("A".into()),
            RelayEvent::Text("B".into()),
            RelayEvent::Done
        ]
    );
}

#[tokio::test]
async fn mid_stream_failure_reports_once_and_still_finishes() {
    let events = run(
        scripted(vec![
            Ok("partial".into()),
            Err(GenerationError::Stream("bad event".into())),
            Ok("never".into()),
        ]),
        Some("prompt"),
    )
    .await;
    assert_eq!(events.len(), 3);
    assert_eq!(events[0], RelayEvent::Text("partial".into()));
    match &events[1] {
        RelayEvent::Text(t) => assert!(t.starts_with("error during streaming: ")),
        other => panic!("expected error text, got {other:?}"),
    }
    assert_eq!(events[2], RelayEvent::Done);
}

#[tokio::test]
async fn request_failure_reports_once_and_finishes() {
    let gen: Arc<dyn TextGenerator> = Arc::new(ScriptedGenerator {
        items: Vec::new(),
        fail_open: true,
    });
    let events = run(Some(gen), Some("prompt")).await;
    assert_eq!(events.len(), 2);
    assert!(matches!(&events[0], RelayEvent::Text(t) if t.contains("connection refused")));
    assert_eq!(events[1], RelayEvent::Done);
}

#[tokio::test]
async fn gemini_stream_request_reaches_the_configured_endpoint() {
    let server = MockServer::start_async().await;
    let body = concat!(
        "data: {\"candidates\":[{\"content\":{\"parts\":[{\"text\":\"Your portfolio \"}],\"role\":\"model\"}}]}\r\n\r\n",
        "data: {\"candidates\":[{\"content\":{\"parts\":[{\"text\":\"held up well.\"}],\"role\":\"model\"},\"finishReason\":\"STOP\"}]}\r\n\r\n",
    );
    let m = server
        .mock_async(|when, then| {
            when.method(POST)
                .path_contains("gemini-flash-latest:streamGenerateContent")
                .body_contains("analyse this");
            then.status(200)
                .header("content-type", "text/event-stream")
                .body(body);
        })
        .await;

    let gen: Arc<dyn TextGenerator> = Arc::new(GeminiGenerator::new_with_base_url(
        "test-key".into(),
        "models/gemini-flash-latest".into(),
        server.base_url(),
    ));
    let events = run(Some(gen), Some("analyse this")).await;

    m.assert_async().await;
    assert_eq!(events.last(), Some(&RelayEvent::Done));
    assert_eq!(events.iter().filter(|e| **e == RelayEvent::Done).count(), 1);
}

#[tokio::test]
async fn gemini_http_error_is_reported_once() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST);
            then.status(403)
                .json_body(serde_json::json!({"error": {"code": 403, "message": "API key not valid"}}));
        })
        .await;

    let gen: Arc<dyn TextGenerator> = Arc::new(GeminiGenerator::new_with_base_url(
        "bad".into(),
        "models/gemini-flash-latest".into(),
        server.base_url(),
    ));
    let events = run(Some(gen), Some("p")).await;
    assert_eq!(events.len(), 2);
    assert!(matches!(&events[0], RelayEvent::Text(t) if t.starts_with("error during streaming: ")));
    assert_eq!(events[1], RelayEvent::Done);
}
