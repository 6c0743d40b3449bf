//! Connection Lifecycle Controller.
//!
//! One [`PeerSession`] drives one peer stream through
//! `Connecting → Active → Closed`:
//!
//! - **Connecting**: register with the engine; a refusal sends a `rejected`
//!   frame plus a close frame and goes straight to `Closed`.
//! - **Active**: a reader applies inbound updates one at a time (merge then
//!   broadcast, per-connection FIFO) while a writer drains the outbound queue
//!   with a bounded send timeout.
//! - **Closed**: entered on stream end, stream error, writer failure, eviction
//!   or server shutdown; the registration is torn down exactly once.
//!
//! The session is generic over any `Sink`/`Stream` of WebSocket messages so
//! it can be driven in-process as well as over a real socket.

use axum::extract::ws::{CloseFrame, Message};
use futures::{Sink, SinkExt, Stream, StreamExt};
use std::borrow::Cow;
use std::fmt::Display;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

use gamesync_types::error::{CLOSE_GOING_AWAY, CLOSE_INTERNAL_ERROR};
use gamesync_types::{PeerId, PeerState, ServerFrame, SyncError};

use crate::engine::SyncEngine;
use crate::registry::{Lease, Outbound};

/// Upper bound for flushing the final close frame.
const CLOSE_TIMEOUT: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Connecting,
    Active,
    Closed,
}

/// Why an active session ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEnd {
    /// The peer closed its stream.
    Completed,
    /// The inbound stream failed.
    StreamError(String),
    /// A write to the peer failed or timed out.
    SinkFailed(String),
    /// The registration was torn down elsewhere (failed broadcast delivery).
    Evicted,
    /// The server is stopping.
    Shutdown,
}

pub struct PeerSession {
    engine: Arc<SyncEngine>,
    state: SessionState,
    identity: Option<PeerId>,
}

impl PeerSession {
    pub fn new(engine: Arc<SyncEngine>) -> Self {
        Self { engine, state: SessionState::Connecting, identity: None }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Identity assigned at registration, if it succeeded.
    pub fn identity(&self) -> Option<PeerId> {
        self.identity
    }

    /// Drive the connection until it closes.
    ///
    /// Returns the registration error if the peer was never admitted.
    pub async fn run<S, R, E>(
        &mut self,
        mut sink: S,
        mut stream: R,
        mut shutdown: watch::Receiver<bool>,
    ) -> Result<SessionEnd, SyncError>
    where
        S: Sink<Message> + Unpin,
        S::Error: Display,
        R: Stream<Item = Result<Message, E>> + Unpin,
        E: Display,
    {
        let (lease, mut outbound) = match self.engine.register() {
            Ok(admitted) => admitted,
            Err(err) => {
                self.state = SessionState::Closed;
                reject(&mut sink, &err).await;
                return Err(err);
            }
        };
        self.identity = Some(lease.identity());
        self.state = SessionState::Active;

        let send_timeout = self.engine.config().send_timeout();
        let end = tokio::select! {
            end = forward(&mut sink, &mut outbound, send_timeout) => end,
            end = receive(&self.engine, &lease, &mut stream) => end,
            () = wait_for_stop(&mut shutdown) => SessionEnd::Shutdown,
        };

        self.state = SessionState::Closed;
        self.engine.deregister(&lease);

        match &end {
            SessionEnd::Completed => {
                tracing::info!(peer = %lease.identity(), "stream completed");
            }
            SessionEnd::StreamError(message) => {
                tracing::warn!(peer = %lease.identity(), "stream error: {}", message);
            }
            SessionEnd::SinkFailed(message) => {
                tracing::warn!(peer = %lease.identity(), "sink failed: {}", message);
                close(&mut sink, CLOSE_INTERNAL_ERROR, "delivery failed").await;
            }
            SessionEnd::Evicted => {
                tracing::warn!(peer = %lease.identity(), "evicted after failed delivery");
                close(&mut sink, CLOSE_INTERNAL_ERROR, "evicted").await;
            }
            SessionEnd::Shutdown => {
                tracing::info!(peer = %lease.identity(), "closing stream for shutdown");
                close(&mut sink, CLOSE_GOING_AWAY, "server shutting down").await;
            }
        }

        Ok(end)
    }
}

/// Resolves once the shutdown flag is raised or its sender is gone.
pub(crate) async fn wait_for_stop(shutdown: &mut watch::Receiver<bool>) {
    while !*shutdown.borrow_and_update() {
        if shutdown.changed().await.is_err() {
            return;
        }
    }
}

/// Writer half: drain the outbound queue into the stream.
async fn forward<S>(sink: &mut S, outbound: &mut Outbound, send_timeout: Duration) -> SessionEnd
where
    S: Sink<Message> + Unpin,
    S::Error: Display,
{
    while let Some(frame) = outbound.recv().await {
        let text = match serde_json::to_string(&frame) {
            Ok(text) => text,
            Err(e) => {
                tracing::error!("failed to encode frame: {}", e);
                continue;
            }
        };

        match tokio::time::timeout(send_timeout, sink.send(Message::Text(text))).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => return SessionEnd::SinkFailed(e.to_string()),
            Err(_) => {
                return SessionEnd::SinkFailed(format!("send timed out after {:?}", send_timeout))
            }
        }
    }

    // the registry dropped our sender
    SessionEnd::Evicted
}

/// Reader half: apply inbound updates in arrival order.
async fn receive<R, E>(engine: &SyncEngine, lease: &Lease, stream: &mut R) -> SessionEnd
where
    R: Stream<Item = Result<Message, E>> + Unpin,
    E: Display,
{
    while let Some(message) = stream.next().await {
        match message {
            Ok(Message::Text(text)) => {
                let update = match decode_update(lease, &text) {
                    Ok(update) => update,
                    Err(err) => {
                        tracing::warn!(peer = %lease.identity(), "{}", err);
                        continue;
                    }
                };
                if let Err(SyncError::UnknownPeer { .. }) = engine.submit(lease, update) {
                    return SessionEnd::Evicted;
                }
            }
            Ok(Message::Binary(data)) => {
                tracing::warn!(peer = %lease.identity(), "ignoring binary frame ({} bytes)", data.len());
            }
            Ok(Message::Ping(_) | Message::Pong(_)) => {}
            Ok(Message::Close(frame)) => {
                tracing::debug!(peer = %lease.identity(), "peer closed stream: {:?}", frame);
                return SessionEnd::Completed;
            }
            Err(e) => return SessionEnd::StreamError(e.to_string()),
        }
    }

    SessionEnd::Completed
}

/// Parse an inbound update and bind it to the connection's identity.
fn decode_update(lease: &Lease, text: &str) -> Result<PeerState, SyncError> {
    let update: PeerState =
        serde_json::from_str(text).map_err(|e| SyncError::InvalidFrame { message: e.to_string() })?;

    if let Some(claimed) = update.identity.filter(|claimed| *claimed != lease.identity()) {
        tracing::warn!(
            peer = %lease.identity(),
            claimed = %claimed,
            "update claims another identity, rebinding"
        );
    }
    Ok(update.bound_to(lease.identity()))
}

async fn reject<S>(sink: &mut S, err: &SyncError)
where
    S: Sink<Message> + Unpin,
    S::Error: Display,
{
    let frame = ServerFrame::Rejected { error: err.clone() };
    if let Ok(text) = serde_json::to_string(&frame) {
        let sent = tokio::time::timeout(CLOSE_TIMEOUT, sink.send(Message::Text(text))).await;
        if !matches!(sent, Ok(Ok(()))) {
            tracing::debug!("could not deliver rejection");
        }
    }
    close(sink, err.close_code(), "capacity exceeded").await;
}

async fn close<S>(sink: &mut S, code: u16, reason: &'static str)
where
    S: Sink<Message> + Unpin,
    S::Error: Display,
{
    let frame = CloseFrame { code, reason: Cow::Borrowed(reason) };
    match tokio::time::timeout(CLOSE_TIMEOUT, sink.send(Message::Close(Some(frame)))).await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => tracing::debug!("close frame not sent: {}", e),
        Err(_) => tracing::debug!("close frame timed out"),
    }
}
