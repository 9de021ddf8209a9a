//! Status endpoint.
//!
//! | Method | Path | Description |
//! |---|---|---|
//! | GET | `/` | HTML page with the active version |
//! | GET | `/status` | JSON: version, last cycle, counters |
//! | GET | `/healthz` | 200 unless a fatal cycle is still unresolved |
//!
//! Handlers only ever read the controller through `current_version`, which
//! never waits on an in-flight cycle.

use std::sync::Arc;

use axum::Json;
use axum::Router;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse};
use axum::routing::get;

use edgesync_core::VersionTag;
use edgesync_rollout::RolloutController;

use crate::driver::{CycleCounters, CycleRecord, StatusBoard};

#[derive(Clone)]
pub struct StatusState {
    pub controller: Arc<RolloutController>,
    pub board: StatusBoard,
}

#[derive(serde::Serialize)]
struct StatusResponse {
    version: Option<VersionTag>,
    active_link: String,
    last_cycle: Option<CycleRecord>,
    #[serde(skip_serializing_if = "Option::is_none")]
    unresolved_fatal: Option<CycleRecord>,
    counters: CycleCounters,
}

pub fn build_router(controller: Arc<RolloutController>, board: StatusBoard) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/status", get(status))
        .route("/healthz", get(healthz))
        .with_state(StatusState { controller, board })
}

/// GET /
pub async fn index(State(state): State<StatusState>) -> impl IntoResponse {
    let version = state
        .controller
        .current_version()
        .map(|v| escape_html(v.as_str()))
        .unwrap_or_else(|| "unknown".to_string());
    Html(format!(
        "<h1>edgesync agent status</h1><p>Current active model version: {version}</p>"
    ))
}

/// GET /status
pub async fn status(State(state): State<StatusState>) -> impl IntoResponse {
    Json(StatusResponse {
        version: state.controller.current_version(),
        active_link: state.controller.active_link().display().to_string(),
        last_cycle: state.board.last_cycle().await,
        unresolved_fatal: state.board.unresolved_fatal().await,
        counters: state.board.counters().await,
    })
}

/// GET /healthz
///
/// A fatal cycle keeps this failing until an activation supersedes it.
pub async fn healthz(State(state): State<StatusState>) -> impl IntoResponse {
    match state.board.unresolved_fatal().await {
        Some(record) => (
            StatusCode::SERVICE_UNAVAILABLE,
            record.error.unwrap_or_else(|| "fatal rollout failure".to_string()),
        ),
        _ => (StatusCode::OK, "ok".to_string()),
    }
}

fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '&' => out.push_str("&amp;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
    out
}
