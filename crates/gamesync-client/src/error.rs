//! Error types for the GameSync client.

use gamesync_types::SyncError;
use thiserror::Error;

/// Errors that can occur when talking to a GameSync server.
#[derive(Error, Debug)]
pub enum ClientError {
    /// Failed to establish the stream.
    #[error("Connection failed: {0}")]
    Connection(String),

    /// The server refused the registration.
    #[error("Rejected by server: {0}")]
    Rejected(SyncError),

    /// The server sent something that is not a valid frame.
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// The stream closed before the expected frame arrived.
    #[error("Stream closed{}", code.map(|c| format!(" (code {})", c)).unwrap_or_default())]
    Closed {
        /// Close code, if the server sent one.
        code: Option<u16>,
    },

    /// Transport failure on an established stream.
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),
}
