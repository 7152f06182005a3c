//! fills-daemon entry point.
//!
//! Sets up tracing, config and the shared store, wires middleware, and starts
//! the HTTP server. Handlers live in `routes.rs`; state in `state.rs`.

use std::{net::SocketAddr, sync::Arc};

use anyhow::Context;
use axum::{
    body::Body,
    http::{HeaderValue, Method, Request},
};
use fills_config::{load_layered_yaml, report_unused_keys, ServiceConfig, UnusedKeyPolicy};
use fills_daemon::{routes, state};
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultOnResponse, TraceLayer},
};
use tracing::{info, info_span, warn, Level};
use uuid::Uuid;

/// Comma-separated YAML paths, merged in order.
const ENV_CONFIG_PATHS: &str = "FILLS_CONFIG";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Silent if the file does not exist; production injects env vars directly.
    let _ = dotenvy::from_filename(".env.local");

    init_tracing();

    let cfg = load_service_config()?;
    let shared = Arc::new(state::AppState::connect(&cfg.database).await);

    let app = routes::build_router(Arc::clone(&shared))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|req: &Request<Body>| {
                    info_span!(
                        "http",
                        method = %req.method(),
                        uri = %req.uri(),
                        request_id = %Uuid::new_v4()
                    )
                })
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(cors_layer(&cfg.server.cors_origins));

    let addr: SocketAddr = cfg
        .server
        .addr
        .parse()
        .with_context(|| format!("invalid server addr: {}", cfg.server.addr))?;
    info!("fills-daemon listening on http://{}", addr);

    axum::serve(tokio::net::TcpListener::bind(addr).await?, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server crashed")?;

    shared.shutdown().await;
    Ok(())
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .init();
}

/// Layered YAML from `FILLS_CONFIG` (if set), then `FILLS_*` env overrides.
fn load_service_config() -> anyhow::Result<ServiceConfig> {
    let base = match std::env::var(ENV_CONFIG_PATHS) {
        Ok(raw) if !raw.trim().is_empty() => {
            let paths: Vec<&str> = raw.split(',').map(str::trim).filter(|p| !p.is_empty()).collect();
            let loaded = load_layered_yaml(&paths)?;
            let report = report_unused_keys(&loaded.config_json, UnusedKeyPolicy::Warn)?;
            for p in &report.unused_leaf_pointers {
                warn!(pointer = %p, "config key is not used");
            }
            info!(config_hash = %loaded.config_hash, "config loaded");
            loaded.service()?
        }
        _ => ServiceConfig::default(),
    };
    base.with_env_overrides()
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "ctrl-c handler failed; shutting down");
    }
    info!("shutdown requested");
}

/// CORS: configured origins, or localhost-only when none are configured.
fn cors_layer(configured: &[String]) -> CorsLayer {
    const LOCALHOST: &[&str] = &[
        "http://localhost",
        "http://127.0.0.1",
        "http://localhost:3000",
        "http://127.0.0.1:3000",
        "http://localhost:5173",
        "http://127.0.0.1:5173",
    ];

    let origins: Vec<HeaderValue> = if configured.is_empty() {
        LOCALHOST
            .iter()
            .filter_map(|o| HeaderValue::from_str(o).ok())
            .collect()
    } else {
        configured
            .iter()
            .filter_map(|o| HeaderValue::from_str(o).ok())
            .collect()
    };

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers(tower_http::cors::Any)
}
