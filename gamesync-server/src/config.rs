//! Effective configuration: defaults, then the JSON file, then CLI/env.

use anyhow::{Context, Result};
use std::path::Path;
use validator::Validate;

use gamesync_types::SyncConfig;

use crate::cli::ServeArgs;

/// Load `path`, falling back to defaults when it is absent or missing.
pub fn load_config(path: Option<&Path>) -> Result<SyncConfig> {
    let Some(path) = path else {
        return Ok(SyncConfig::default());
    };
    if !path.exists() {
        tracing::debug!("Config file {} not found, using defaults", path.display());
        return Ok(SyncConfig::default());
    }

    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file {}", path.display()))?;
    serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse config file {}", path.display()))
}

pub fn apply_overrides(config: &mut SyncConfig, args: &ServeArgs) {
    if let Some(port) = args.port {
        config.port = port;
    }
    if let Some(max_peers) = args.max_peers {
        config.max_peers = max_peers;
    }
    if let Some(send_timeout_ms) = args.send_timeout_ms {
        config.send_timeout_ms = send_timeout_ms;
    }
    if let Some(secs) = args.state_log_interval {
        config.state_log_interval_secs = secs;
    }
    if args.allow_lan {
        config.allow_lan_access = true;
    }
}

/// Resolve and validate the config a server would start with.
pub fn resolve(path: Option<&Path>, args: &ServeArgs) -> Result<SyncConfig> {
    let mut config = load_config(path)?;
    apply_overrides(&mut config, args);
    config.validate().context("Invalid configuration")?;
    Ok(config)
}
