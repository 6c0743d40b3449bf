//! # GameSync Types
//!
//! Core types, wire models, and error definitions for GameSync.
//!
//! This crate provides the foundational type system shared by the engine,
//! the daemon and the peer SDK:
//!
//! - **`error`** - Typed error taxonomy for registration, merge, delivery and transport
//! - **`models`** - Domain models (PeerId, PeerState, SharedState, SyncConfig)
//! - **`protocol`** - Frames exchanged over the per-peer stream
//!
//! ## Architecture Role
//!
//! `gamesync-types` sits at the bottom of the dependency graph:
//!
//! ```text
//!                gamesync-types (this crate)
//!                        │
//!          ┌─────────────┼──────────────┐
//!          ▼             ▼              ▼
//!    gamesync-core  gamesync-client    ...
//!          │             │
//!          └──────┬──────┘
//!                 ▼
//!          gamesync-server
//! ```
//!
//! All types are designed to be:
//! - **Serializable** via serde for the wire and the REST API
//! - **Clone** for cheap sharing across async boundaries
//! - **PartialEq** for testing and comparison

pub mod error;
pub mod models;
pub mod protocol;

// Re-export error types for convenience
pub use error::{Result, SyncError};

// Re-export core model types
pub use models::{Fields, PeerId, PeerState, SharedState, SyncConfig};
pub use protocol::ServerFrame;
