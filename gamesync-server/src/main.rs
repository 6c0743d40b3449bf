//! GameSync Server - Headless Daemon
//!
//! Runs the synchronization engine behind a WebSocket stream on /v1/sync
//! and exposes a read-only REST API on /api/*.
//!
//! Access via: ws://localhost:50051/v1/sync

// Test-only lints: allow unwrap/expect in test code
#![cfg_attr(test, allow(clippy::unwrap_used, clippy::expect_used))]

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

mod api;
mod cli;
mod commands;
mod config;
mod scheduler;
mod state;

#[cfg(test)]
mod test_helpers;

use cli::{Cli, Commands};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = EnvFilter::try_new(&cli.log_level).unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let config_file = cli.config_file.as_deref();
    match cli.command {
        None => commands::handle_serve(config_file, &cli.serve).await,
        Some(Commands::Serve(args)) => commands::handle_serve(config_file, &args).await,
        Some(Commands::Peer { url, interval_ms, count }) => {
            commands::handle_peer(&url, interval_ms, count).await
        }
        Some(Commands::Config(cmd)) => commands::handle_config_command(cmd, config_file, &cli.serve),
    }
}
