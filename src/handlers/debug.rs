//! Diagnostics endpoints under `/debug/pprof/`.

use std::time::Instant;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use metrics_exporter_prometheus::PrometheusHandle;
use serde::Serialize;

pub const PREFIX: &str = "/debug/pprof";

#[derive(Clone)]
struct DebugState {
    started: Instant,
    metrics: Option<PrometheusHandle>,
}

#[derive(Serialize)]
pub struct DebugIndex {
    pub version: &'static str,
    pub pid: u32,
    pub uptime_secs: u64,
    pub endpoints: Vec<String>,
}

pub fn router(metrics: Option<PrometheusHandle>) -> Router {
    let state = DebugState {
        started: Instant::now(),
        metrics,
    };
    Router::new()
        .route(&format!("{PREFIX}/"), get(index))
        .route(&format!("{PREFIX}/cmdline"), get(cmdline))
        .route(&format!("{PREFIX}/metrics"), get(render_metrics))
        .with_state(state)
}

async fn index(State(state): State<DebugState>) -> Json<DebugIndex> {
    Json(DebugIndex {
        version: env!("CARGO_PKG_VERSION"),
        pid: std::process::id(),
        uptime_secs: state.started.elapsed().as_secs(),
        endpoints: ["cmdline", "metrics"]
            .iter()
            .map(|name| format!("{PREFIX}/{name}"))
            .collect(),
    })
}

/// Process arguments, NUL-separated.
async fn cmdline() -> String {
    std::env::args().collect::<Vec<_>>().join("\0")
}

async fn render_metrics(State(state): State<DebugState>) -> Response {
    match &state.metrics {
        Some(handle) => handle.render().into_response(),
        None => (StatusCode::NOT_FOUND, "metrics disabled\n").into_response(),
    }
}
