// SPDX-License-Identifier: EUPL-1.2
// Copyright (c) 2026 Benjamin Küttner <benjamin.kuettner@icloud.com>
// Patent Pending — DE Gebrauchsmuster, filed 2026-02-23

//! Axum-based HTTP gateway for the engine's trigger and request surface.
//!
//! - Request body size limit (64KB)
//! - Request timeouts (30s default, configurable)
//! - Per-request tracing spans
//! - Bearer-secret guard on administrative triggers
//! - Fail-closed service secret on the token endpoint

pub mod api;

use crate::config::Config;
use crate::engine::Engine;
use anyhow::{Context, Result};
use axum::{
    extract::{DefaultBodyLimit, State},
    http::{header, StatusCode},
    response::{IntoResponse, Json},
    routing::get,
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

/// Maximum request body size (64KB)
pub const MAX_BODY_SIZE: usize = 65_536;

#[derive(Clone)]
pub struct AppState {
    pub engine: Engine,
    pub trigger_secret: Option<Arc<str>>,
    pub service_secret: Option<Arc<str>>,
}

impl AppState {
    pub fn new(engine: Engine, trigger_secret: Option<&str>, service_secret: Option<&str>) -> Self {
        Self {
            engine,
            trigger_secret: trigger_secret.filter(|s| !s.is_empty()).map(Arc::from),
            service_secret: service_secret.filter(|s| !s.is_empty()).map(Arc::from),
        }
    }
}

pub fn router(state: AppState, request_timeout: Duration) -> Router {
    Router::new()
        .route("/health", get(handle_health))
        .route("/metrics", get(handle_metrics))
        .merge(api::routes())
        .with_state(state)
        .layer(DefaultBodyLimit::max(MAX_BODY_SIZE))
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            request_timeout,
        ))
        .layer(TraceLayer::new_for_http())
}

/// Bind and serve until `shutdown` resolves.
pub async fn run_gateway<F>(config: &Config, engine: Engine, shutdown: F) -> Result<()>
where
    F: std::future::Future<Output = ()> + Send + 'static,
{
    let addr: SocketAddr = format!("{}:{}", config.gateway.host, config.gateway.port)
        .parse()
        .with_context(|| {
            format!(
                "invalid gateway address {}:{}",
                config.gateway.host, config.gateway.port
            )
        })?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;

    let state = AppState::new(
        engine,
        config.scheduler.trigger_secret.as_deref(),
        config.gateway.service_secret.as_deref(),
    );
    if state.trigger_secret.is_none() {
        tracing::warn!("no trigger secret configured, administrative endpoints are open");
    }
    if state.service_secret.is_none() {
        tracing::warn!("no service secret configured, token endpoint will refuse every call");
    }
    let app = router(
        state,
        Duration::from_secs(config.gateway.request_timeout_secs),
    );

    tracing::info!(%addr, "gateway listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await
        .context("gateway server failed")?;
    Ok(())
}

/// Resolves on Ctrl+C.
pub async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("failed to listen for shutdown signal: {e}");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown signal received");
}

/// GET /health
async fn handle_health() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// GET /metrics — Prometheus text format
async fn handle_metrics(State(state): State<AppState>) -> impl IntoResponse {
    match state.engine.metrics.encode_text() {
        Ok(body) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            body,
        )
            .into_response(),
        Err(e) => {
            tracing::error!("metrics encoding failed: {e}");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}
