//! HTTP status and control API.
//!
//! A thin axum router over a [`MonitorHandle`].  Commands are queued and
//! answered with `202 Accepted`; their effect shows up in the next
//! `GET /api/status`.

use std::net::SocketAddr;

use anyhow::Context;
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;
use tracing::info;

use crate::monitor::{MonitorCommand, MonitorHandle};
use crate::source::SourceKind;
use crate::status::ServiceStatus;

#[derive(Clone)]
pub struct DashboardState {
    handle: MonitorHandle,
    /// Used when `POST /api/start` names no source.
    default_source: SourceKind,
}

pub fn router(handle: MonitorHandle, default_source: SourceKind) -> Router {
    let state = DashboardState { handle, default_source };

    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/api/status", get(status))
        .route("/api/start", post(start))
        .route("/api/stop", post(stop))
        .route("/api/check", post(check))
        .with_state(state)
}

/// Bind and serve until the process exits.
pub async fn serve(addr: SocketAddr, handle: MonitorHandle, default_source: SourceKind) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding dashboard to {addr}"))?;
    info!(%addr, "dashboard API listening");
    axum::serve(listener, router(handle, default_source))
        .await
        .context("dashboard server failed")
}

#[derive(Deserialize)]
struct StartReq {
    #[serde(default)]
    source: Option<SourceKind>,
}

async fn status(State(state): State<DashboardState>) -> Json<ServiceStatus> {
    Json(state.handle.status())
}

async fn start(State(state): State<DashboardState>, Json(body): Json<StartReq>) -> Response {
    let kind = body.source.unwrap_or(state.default_source);
    submit(&state.handle, MonitorCommand::Start(kind))
}

async fn stop(State(state): State<DashboardState>) -> Response {
    submit(&state.handle, MonitorCommand::Stop)
}

async fn check(State(state): State<DashboardState>) -> Response {
    submit(&state.handle, MonitorCommand::CheckNow)
}

fn submit(handle: &MonitorHandle, cmd: MonitorCommand) -> Response {
    match handle.send(cmd) {
        Ok(()) => (StatusCode::ACCEPTED, Json(json!({ "accepted": true }))).into_response(),
        Err(e) => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({ "accepted": false, "error": e.to_string() })),
        )
            .into_response(),
    }
}
