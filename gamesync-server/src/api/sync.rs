//! Shared state and peer handlers

use axum::{extract::State, response::Json};
use std::sync::Arc;

use gamesync_types::{PeerId, SharedState};

use crate::state::AppState;

pub async fn get_state(State(state): State<AppState>) -> Json<Arc<SharedState>> {
    Json(state.engine().snapshot())
}

pub async fn get_peers(State(state): State<AppState>) -> Json<Vec<PeerId>> {
    Json(state.engine().active_peers())
}
