use axum::{
    extract::{ws::WebSocketUpgrade, State},
    response::Response,
    routing::get,
    Router,
};
use futures::StreamExt;
use socket2::{Domain, Protocol, Socket, Type};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::task::TaskTracker;
use tower_http::trace::TraceLayer;

use gamesync_types::{SyncConfig, SyncError};

use crate::engine::SyncEngine;
use crate::session::{wait_for_stop, PeerSession, SessionEnd};

/// Path of the per-peer WebSocket stream.
pub const SYNC_PATH: &str = "/v1/sync";

/// Axum state for the stream route.
#[derive(Clone)]
pub struct StreamState {
    pub engine: Arc<SyncEngine>,
    pub shutdown: watch::Receiver<bool>,
    /// Upgraded sessions outlive the HTTP connection; they are counted here.
    pub sessions: TaskTracker,
}

/// Build the router exposing the peer stream endpoint.
pub fn build_sync_router(
    engine: Arc<SyncEngine>,
    shutdown: watch::Receiver<bool>,
    sessions: TaskTracker,
) -> Router<()> {
    Router::new()
        .route(SYNC_PATH, get(handle_stream))
        .with_state(StreamState { engine, shutdown, sessions })
}

async fn handle_stream(ws: WebSocketUpgrade, State(state): State<StreamState>) -> Response {
    // taken before the upgrade so wait() also covers handshakes in flight
    let token = state.sessions.token();
    ws.on_upgrade(move |socket| async move {
        let _token = token;
        let (sink, stream) = socket.split();
        let mut session = PeerSession::new(state.engine);
        match session.run(sink, stream, state.shutdown).await {
            Ok(SessionEnd::Completed | SessionEnd::Shutdown) => {}
            Ok(end) => tracing::debug!(peer = ?session.identity(), "session ended: {:?}", end),
            Err(err) => tracing::debug!("connection rejected: {}", err),
        }
    })
}

/// Bind a non-blocking listener with `SO_REUSEADDR`.
///
/// `SO_REUSEPORT` is deliberately left off: a second server on the same port
/// must fail to bind.
pub fn create_listener(addr: &str) -> std::io::Result<tokio::net::TcpListener> {
    let addr: SocketAddr = addr
        .parse()
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidInput, e))?;
    let domain = if addr.is_ipv4() { Domain::IPV4 } else { Domain::IPV6 };
    let socket = Socket::new(domain, Type::STREAM, Some(Protocol::TCP))?;

    socket.set_reuse_address(true)?;
    socket.set_nonblocking(true)?;
    socket.bind(&addr.into())?;
    socket.listen(1024)?;

    tokio::net::TcpListener::from_std(socket.into())
}

/// A running synchronization server.
///
/// `start` binds and begins accepting, `stop` stops accepting and asks every
/// session to close, `wait` resolves once the serve task has exited.
pub struct SyncServer {
    engine: Arc<SyncEngine>,
    local_addr: SocketAddr,
    shutdown_tx: watch::Sender<bool>,
    sessions: TaskTracker,
    task: JoinHandle<std::io::Result<()>>,
}

impl SyncServer {
    pub async fn start(config: SyncConfig) -> Result<Self, SyncError> {
        Self::start_with_router(SyncEngine::new(config), Router::new()).await
    }

    /// Start with extra routes (REST, health) served next to the stream.
    pub async fn start_with_router(engine: Arc<SyncEngine>, extra: Router<()>) -> Result<Self, SyncError> {
        let addr = engine.config().get_socket_addr();
        let bind_failure = |e: std::io::Error| {
            tracing::error!("failed to bind {}: {}", addr, e);
            SyncError::TransportBindFailure { addr: addr.clone(), message: e.to_string() }
        };
        let listener = create_listener(&addr).map_err(bind_failure)?;
        let local_addr = listener.local_addr().map_err(bind_failure)?;

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let sessions = TaskTracker::new();
        let app = build_sync_router(Arc::clone(&engine), shutdown_rx.clone(), sessions.clone())
            .merge(extra)
            .layer(TraceLayer::new_for_http());

        let mut stop_rx = shutdown_rx;
        let task = tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async move { wait_for_stop(&mut stop_rx).await })
                .await
        });

        tracing::info!(
            capacity = engine.capacity(),
            "🌐 Sync server listening on ws://{}{}",
            local_addr,
            SYNC_PATH
        );

        Ok(Self { engine, local_addr, shutdown_tx, sessions, task })
    }

    pub fn engine(&self) -> &Arc<SyncEngine> {
        &self.engine
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// WebSocket URL peers should connect to.
    pub fn stream_url(&self) -> String {
        format!("ws://{}{}", self.local_addr, SYNC_PATH)
    }

    /// Stop accepting and signal every session to close. Idempotent.
    pub fn stop(&self) {
        if !self.shutdown_tx.send_replace(true) {
            tracing::info!("🛑 Sync server stopping ({} peers connected)", self.engine.active_peers().len());
        }
    }

    /// Resolve once the server has fully stopped: the listener is closed and
    /// every peer session has been torn down.
    pub async fn wait(self) -> std::io::Result<()> {
        let result = self.task.await.map_err(std::io::Error::other)?;
        self.sessions.close();
        if !self.sessions.is_empty() {
            tracing::debug!("waiting for {} peer sessions to close", self.sessions.len());
        }
        self.sessions.wait().await;
        tracing::info!("Sync server stopped");
        result
    }
}
