use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "gamesync",
    about = "GameSync Server - shared state synchronization for multiplayer peers",
    version = env!("GIT_VERSION"),
    author,
    propagate_version = true
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    #[arg(short, long = "config", env = "GAMESYNC_CONFIG", global = true, help = "Path to a JSON config file")]
    pub config_file: Option<PathBuf>,

    #[arg(short, long, env = "RUST_LOG", default_value = "info", global = true)]
    pub log_level: String,

    #[command(flatten)]
    pub serve: ServeArgs,
}

/// Overrides applied on top of the config file.
#[derive(Args, Clone, Debug, Default)]
pub struct ServeArgs {
    #[arg(short, long, env = "GAMESYNC_PORT")]
    pub port: Option<u16>,

    #[arg(long, env = "GAMESYNC_MAX_PEERS", help = "Number of identities handed out")]
    pub max_peers: Option<u16>,

    #[arg(long, env = "GAMESYNC_SEND_TIMEOUT_MS", help = "Per-peer send timeout")]
    pub send_timeout_ms: Option<u64>,

    #[arg(long, help = "Bind 0.0.0.0 instead of 127.0.0.1")]
    pub allow_lan: bool,

    #[arg(long, help = "Log the shared state every N seconds (0 = off)")]
    pub state_log_interval: Option<u64>,
}

#[derive(Subcommand)]
pub enum Commands {
    #[command(about = "Start the sync server (default if no command specified)")]
    Serve(ServeArgs),

    #[command(about = "Run a demo peer that publishes random state")]
    Peer {
        #[arg(long, default_value = "ws://127.0.0.1:50051/v1/sync")]
        url: String,

        #[arg(long, default_value = "1500", help = "Delay between updates")]
        interval_ms: u64,

        #[arg(long, help = "Stop after this many updates")]
        count: Option<u64>,
    },

    #[command(subcommand, about = "Inspect configuration")]
    Config(ConfigCommands),
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    #[command(about = "Show the effective configuration")]
    Show {
        #[arg(short, long, help = "Output as JSON")]
        json: bool,
    },
}
