//! pfk-daemon entry point.
//!
//! Sets up tracing, loads config, builds the shared state, wires middleware
//! and starts the HTTP server. Handlers live in `routes.rs`.

use std::{net::SocketAddr, sync::Arc};

use anyhow::Context;
use axum::http::Method;
use pfk_config::{
    config_paths_from_env, load_layered_yaml, report_unused_keys, resolve_secrets, AppSettings,
    UnusedKeyPolicy,
};
use pfk_daemon::{routes, state};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::{info, warn, Level};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Silent if the file does not exist; production injects env vars directly.
    let _ = dotenvy::from_filename(".env.local");

    init_tracing();

    let paths = config_paths_from_env();
    let path_refs: Vec<&str> = paths.iter().map(String::as_str).collect();
    let loaded = load_layered_yaml(&path_refs).context("load config failed")?;
    let unused = report_unused_keys(&loaded.config_json, UnusedKeyPolicy::Warn)?;
    for key in &unused.unused_leaf_pointers {
        warn!(key = %key, "config key is not used by any section");
    }
    let settings = AppSettings::from_loaded(&loaded)?;
    let secrets = resolve_secrets(&settings);
    info!(config_hash = %loaded.config_hash, paths = ?paths, "config loaded");

    let shared = Arc::new(state::AppState::from_settings(&settings, &secrets));

    let app = routes::build_router(Arc::clone(&shared))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(cors_any_origin_get());

    let addr = match bind_addr_from_env() {
        Some(addr) => addr,
        None => settings
            .server
            .addr
            .parse::<SocketAddr>()
            .with_context(|| format!("invalid server.addr: {}", settings.server.addr))?,
    };
    info!("pfk-daemon listening on http://{}", addr);

    axum::serve(tokio::net::TcpListener::bind(addr).await?, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server crashed")?;

    Ok(())
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .init();
}

fn bind_addr_from_env() -> Option<SocketAddr> {
    std::env::var("PFK_DAEMON_ADDR").ok()?.parse().ok()
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        info!("shutdown requested");
    }
}

/// The dashboard is served from another origin; every endpoint is read-only GET.
fn cors_any_origin_get() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET])
        .allow_headers(Any)
}
