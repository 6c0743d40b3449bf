//! Core domain models for GameSync.
//!
//! This module contains the data structures exchanged between peers and the
//! server, plus the server configuration.

mod config;
mod peer;
mod shared;

// Re-export all models
pub use config::{
    default_max_peers, default_outbound_queue, default_port, default_send_timeout_ms, SyncConfig,
};
pub use peer::{Fields, PeerId, PeerState};
pub use shared::SharedState;
