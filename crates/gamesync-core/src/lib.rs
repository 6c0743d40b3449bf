//! # GameSync Core
//!
//! Server-side synchronization engine for GameSync.
//!
//! ## Architecture
//!
//! ```text
//! gamesync-core/src/
//! ├── slots.rs      # Slot Table: identity → last state, copy-on-write snapshots
//! ├── merger.rs     # State Merger: the single serialization point
//! ├── registry.rs   # Registry: identity assignment + outbound sinks (DashMap)
//! ├── broadcast.rs  # Broadcast Engine: non-blocking fan-out, failure isolation
//! ├── engine.rs     # SyncEngine facade: submit / deregister / snapshot
//! ├── session.rs    # Connection Lifecycle Controller (per-peer stream)
//! └── server.rs     # SyncServer: start / stop / wait over axum WebSockets
//! ```
//!
//! Control flow per inbound message: `session → engine.submit → merger.merge
//! → broadcaster.broadcast → reap failed sinks`.

#![allow(
    clippy::significant_drop_tightening,
    reason = "Merged intentionally keeps the merge lock across the fan-out"
)]
// Test-only lints: allow panic!, println!, etc. in test code
#![cfg_attr(
    test,
    allow(
        clippy::panic,
        clippy::print_stdout,
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::assertions_on_result_states
    )
)]

pub mod broadcast;
pub mod engine;
pub mod merger;
pub mod registry;
pub mod server;
pub mod session;
pub mod slots;

#[cfg(test)]
mod session_tests;

// Re-export commonly used types
pub use broadcast::{BroadcastReport, BroadcastStats, Broadcaster};
pub use engine::SyncEngine;
pub use merger::{Merged, StateMerger};
pub use registry::{Lease, Outbound, PeerSink, Registry};
pub use server::{build_sync_router, create_listener, SyncServer, SYNC_PATH};
pub use session::{PeerSession, SessionEnd, SessionState};
pub use slots::SlotTable;
