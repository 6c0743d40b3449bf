//! Typed error definitions for GameSync.
//!
//! Every error here is contained to a single connection except
//! [`SyncError::TransportBindFailure`], which aborts startup. All variants are
//! serializable so they can travel inside a `rejected` frame or a REST body.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::PeerId;

/// WebSocket close code sent with a capacity rejection ("try again later").
pub const CLOSE_TRY_AGAIN_LATER: u16 = 1013;
/// WebSocket close code sent when the server is shutting down ("going away").
pub const CLOSE_GOING_AWAY: u16 = 1001;
/// WebSocket close code for a protocol violation.
pub const CLOSE_PROTOCOL_ERROR: u16 = 1002;
/// WebSocket close code for an internal failure (e.g. a stalled sink).
pub const CLOSE_INTERNAL_ERROR: u16 = 1011;

/// Errors that can occur while synchronizing peers.
#[derive(Debug, Clone, Error, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", content = "details")]
pub enum SyncError {
    /// Every identity in `[1, capacity]` is held by a live registration.
    #[error("All {capacity} peer slots are in use")]
    CapacityExceeded { capacity: u16 },

    /// A merge referenced an identity without a live registration.
    #[error("Peer {identity} has no live registration")]
    UnknownPeer { identity: PeerId },

    /// Delivery to one sink failed or timed out.
    #[error("Delivery to peer {identity} failed: {reason}")]
    SinkDeliveryFailure { identity: PeerId, reason: String },

    /// The listening endpoint could not be acquired.
    #[error("Failed to bind {addr}: {message}")]
    TransportBindFailure { addr: String, message: String },

    /// An inbound frame could not be decoded.
    #[error("Invalid frame: {message}")]
    InvalidFrame { message: String },
}

impl SyncError {
    /// Only bind failures take the whole process down.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::TransportBindFailure { .. })
    }

    /// Close code used when this error ends a peer's stream.
    pub fn close_code(&self) -> u16 {
        match self {
            Self::CapacityExceeded { .. } => CLOSE_TRY_AGAIN_LATER,
            Self::InvalidFrame { .. } => CLOSE_PROTOCOL_ERROR,
            Self::UnknownPeer { .. }
            | Self::SinkDeliveryFailure { .. }
            | Self::TransportBindFailure { .. } => CLOSE_INTERNAL_ERROR,
        }
    }
}

/// Standard Result type using SyncError.
pub type Result<T> = std::result::Result<T, SyncError>;
