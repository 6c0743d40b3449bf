//! Test helpers for gamesync-server unit tests.

use gamesync_core::SyncEngine;
use gamesync_types::SyncConfig;

use crate::state::AppState;

/// Create an `AppState` over a fresh engine with `max_peers` identities.
pub fn test_app_state(max_peers: u16) -> AppState {
    AppState::new(SyncEngine::new(SyncConfig { max_peers, ..Default::default() }))
}
