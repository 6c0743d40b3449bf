use anyhow::Result;
use axum::{routing::get, Router};
use colored::Colorize;
use rand::Rng;
use std::path::Path;
use std::time::Duration;
use tokio::sync::watch;
use tower_http::cors::{Any, CorsLayer};

use gamesync_client::PeerClient;
use gamesync_core::{SyncEngine, SyncServer};
use gamesync_types::{PeerState, SyncConfig};

use crate::cli::{ConfigCommands, ServeArgs};
use crate::state::AppState;
use crate::{api, config, scheduler};

pub async fn handle_serve(config_file: Option<&Path>, args: &ServeArgs) -> Result<()> {
    let config = config::resolve(config_file, args)?;
    let log_every = config.state_log_interval();

    let engine = SyncEngine::new(config);
    let state = AppState::new(engine.clone());
    let routes = Router::new()
        .nest("/api", api::router())
        .route("/health", get(api::health_check))
        .route("/healthz", get(api::health_check))
        .with_state(state.clone())
        .layer(CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any));

    let server = SyncServer::start_with_router(engine, routes).await?;
    tracing::info!("🔌 API available at http://{}/api/", server.local_addr());

    let (stop_tx, stop_rx) = watch::channel(false);
    let logger = log_every.map(|every| scheduler::start_state_logger(state, every, stop_rx));

    shutdown_signal().await;
    server.stop();
    stop_tx.send_replace(true);

    server.wait().await?;
    if let Some(logger) = logger {
        logger.await?;
    }
    tracing::info!("✅ Shutdown complete");
    Ok(())
}

pub async fn handle_peer(url: &str, interval_ms: u64, count: Option<u64>) -> Result<()> {
    let client = PeerClient::connect(url).await?;
    let identity = client.identity();
    tracing::info!("🎮 Joined as peer {} (capacity {})", identity, client.capacity());

    let (mut sender, mut receiver) = client.into_split();
    let listener = tokio::spawn(async move {
        loop {
            match receiver.next_snapshot().await {
                Ok(Some(snapshot)) => tracing::info!(
                    peer = %identity,
                    version = snapshot.version,
                    peers = snapshot.len(),
                    "[PEER][RECEIVE]"
                ),
                Ok(None) => {
                    tracing::info!(peer = %identity, code = ?receiver.close_code(), "stream closed");
                    break;
                }
                Err(e) => {
                    tracing::warn!(peer = %identity, "stream error: {}", e);
                    break;
                }
            }
        }
    });

    let publish = async {
        let mut state = PeerState::default().with_field("x", 0).with_field("y", 0).with_field("hp", 100);
        let mut sent = 0_u64;
        while count.map_or(true, |limit| sent < limit) {
            tokio::time::sleep(Duration::from_millis(interval_ms)).await;
            state = random_action(state);
            sender.send(&state).await?;
            sent += 1;
            tracing::info!(peer = %identity, sent, "[PEER][SEND]");
        }
        anyhow::Ok(())
    };

    tokio::select! {
        result = publish => result?,
        () = shutdown_signal() => {}
    }

    sender.close().await?;
    if tokio::time::timeout(Duration::from_secs(2), listener).await.is_err() {
        tracing::debug!("stream did not close in time");
    }
    Ok(())
}

/// Resolves on Ctrl+C or SIGTERM.
#[allow(
    clippy::expect_used,
    reason = "without signal handlers the daemon could never stop cleanly"
)]
async fn shutdown_signal() {
    #[cfg(unix)]
    let mut terminate = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
        .expect("failed to install SIGTERM handler");

    #[cfg(unix)]
    let sigterm = terminate.recv();
    #[cfg(not(unix))]
    let sigterm = std::future::pending::<Option<()>>();

    tokio::select! {
        result = tokio::signal::ctrl_c() => {
            result.expect("failed to install Ctrl+C handler");
            tracing::info!("🛑 Ctrl+C received, closing peer streams...");
        }
        _ = sigterm => tracing::info!("🛑 SIGTERM received, closing peer streams..."),
    }
}

/// Apply one random move, hit or rest to a demo peer's state.
fn random_action(state: PeerState) -> PeerState {
    let mut rng = rand::thread_rng();
    let read = |key: &str| state.field(key).and_then(serde_json::Value::as_i64).unwrap_or_default();
    let (x, y, hp) = (read("x"), read("y"), read("hp"));

    match rng.gen_range(0..3) {
        0 => state
            .with_field("x", x + rng.gen_range(-1..=1))
            .with_field("y", y + rng.gen_range(-1..=1))
            .with_field("action", "move"),
        1 => state.with_field("hp", (hp - rng.gen_range(1..=10)).max(0)).with_field("action", "hit"),
        _ => state.with_field("hp", (hp + 5).min(100)).with_field("action", "rest"),
    }
}

pub fn handle_config_command(cmd: ConfigCommands, config_file: Option<&Path>, args: &ServeArgs) -> Result<()> {
    match cmd {
        ConfigCommands::Show { json } => show_config(&config::resolve(config_file, args)?, json),
    }
}

fn show_config(config: &SyncConfig, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(config)?);
    } else {
        println!("{}", "Sync Configuration:".cyan().bold());
        println!("  Bind: {}", config.get_socket_addr());
        println!("  Max peers: {}", config.max_peers);
        println!("  Send timeout: {} ms", config.send_timeout_ms);
        println!("  Outbound queue: {}", config.outbound_queue);
        match config.state_log_interval() {
            Some(every) => println!("  State log: every {}s", every.as_secs()),
            None => println!("  State log: {}", "off".dimmed()),
        }
    }
    Ok(())
}
