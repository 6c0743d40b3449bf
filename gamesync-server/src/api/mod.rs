//! API Routes
//!
//! Read-only REST endpoints for observing a running server.

mod sync;

#[cfg(test)]
mod sync_tests;

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json},
    routing::get,
    Router,
};
use serde::Serialize;

use gamesync_core::BroadcastStats;

use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/status", get(get_status))
        .route("/state", get(sync::get_state))
        .route("/peers", get(sync::get_peers))
}

#[derive(Serialize)]
pub struct StatusResponse {
    pub version: &'static str,
    pub build_time: &'static str,
    pub instance_id: String,
    pub active_peers: usize,
    pub capacity: u16,
    pub state_version: u64,
    pub uptime_secs: u64,
    pub broadcasts: BroadcastStats,
}

pub async fn get_status(State(state): State<AppState>) -> Json<StatusResponse> {
    let engine = state.engine();
    Json(StatusResponse {
        version: env!("GIT_VERSION"),
        build_time: env!("BUILD_TIME"),
        instance_id: state.instance_id().to_string(),
        active_peers: engine.active_peers().len(),
        capacity: engine.capacity(),
        state_version: engine.snapshot().version,
        uptime_secs: state.uptime_secs(),
        broadcasts: engine.broadcast_stats(),
    })
}

pub async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, Json(serde_json::json!({"status": "ok"})))
}
