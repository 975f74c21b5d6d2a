//! Axum router and all HTTP handlers for pfk-daemon.
//!
//! `build_router` is the single entry point; `main.rs` calls it and attaches
//! middleware layers.

use std::{convert::Infallible, sync::Arc};

use axum::{
    extract::State,
    http::{HeaderMap, HeaderValue, StatusCode},
    response::{
        sse::{Event, KeepAlive, Sse},
        IntoResponse, Response,
    },
    routing::get,
    Json, Router,
};
use futures_util::{Stream, StreamExt};
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tracing::{info, warn};

use pfk_report::{relay, RelayEvent};

use crate::{
    api_types::{ErrorResponse, HealthResponse, StatusResponse},
    pipeline::compute_run_blocking,
    state::{uptime_secs, AppState},
};

// ---------------------------------------------------------------------------
// Router
// ---------------------------------------------------------------------------

/// Build the complete application router wired to the given shared state.
///
/// Middleware layers (CORS, tracing) are **not** applied here; `main.rs`
/// attaches them after this call so tests can use the bare router.
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/v1/health", get(health))
        .route("/v1/status", get(status_handler))
        .route("/api/backtest", get(backtest))
        .route("/api/analyze_stream", get(analyze_stream))
        .with_state(state)
}

// ---------------------------------------------------------------------------
// GET /v1/health
// ---------------------------------------------------------------------------

pub(crate) async fn health(State(st): State<Arc<AppState>>) -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(HealthResponse {
            ok: true,
            service: st.build.service.to_string(),
            version: st.build.version.to_string(),
        }),
    )
}

// ---------------------------------------------------------------------------
// GET /v1/status
// ---------------------------------------------------------------------------

pub(crate) async fn status_handler(State(st): State<Arc<AppState>>) -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(StatusResponse {
            daemon_uptime_secs: uptime_secs(),
            backtest_cached: st.run_cache.is_populated(),
            prompt_cached: st.cached_prompt().is_some(),
            report_model: st.generator.as_ref().map(|g| g.model_name().to_string()),
        }),
    )
}

// ---------------------------------------------------------------------------
// GET /api/backtest
// ---------------------------------------------------------------------------

/// Run once, then serve the cached result to every later caller.
pub(crate) async fn backtest(State(st): State<Arc<AppState>>) -> Response {
    let result = st
        .run_cache
        .get_or_try_compute(|| {
            info!("computing backtest");
            compute_run_blocking(st.inputs.clone())
        })
        .await;

    match result {
        Ok(out) => (StatusCode::OK, Json(&out.response)).into_response(),
        Err(err) => {
            warn!(error = %err, "backtest failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    error: err.to_string(),
                }),
            )
                .into_response()
        }
    }
}

// ---------------------------------------------------------------------------
// GET /api/analyze_stream  (SSE)
// ---------------------------------------------------------------------------

pub(crate) async fn analyze_stream(State(st): State<Arc<AppState>>) -> Response {
    let mut headers = HeaderMap::new();
    headers.insert("Cache-Control", HeaderValue::from_static("no-cache"));
    headers.insert("Connection", HeaderValue::from_static("keep-alive"));

    let (tx, rx) = mpsc::channel::<RelayEvent>(64);
    tokio::spawn(relay(
        st.generator.clone(),
        st.cached_prompt(),
        st.chunk_delay,
        tx,
    ));

    (headers, Sse::new(relay_to_sse(rx)).keep_alive(KeepAlive::new())).into_response()
}

fn relay_to_sse(rx: mpsc::Receiver<RelayEvent>) -> impl Stream<Item = Result<Event, Infallible>> {
    ReceiverStream::new(rx)
        .map(|ev| Ok::<_, Infallible>(Event::default().data(ev.to_json().to_string())))
}
