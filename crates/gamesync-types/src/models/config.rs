//! Server configuration.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use validator::Validate;

/// Full synchronization server configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Validate)]
pub struct SyncConfig {
    /// Port to listen on (0 = ephemeral)
    #[serde(default = "default_port")]
    pub port: u16,
    /// Allow LAN access (bind to 0.0.0.0)
    #[serde(default)]
    pub allow_lan_access: bool,
    /// Number of identities (`MAX_PEERS`)
    #[validate(range(min = 1_u16, max = 1024_u16))]
    #[serde(default = "default_max_peers")]
    pub max_peers: u16,
    /// Per-sink socket send timeout in milliseconds
    #[validate(range(min = 1_u64, max = 60_000_u64))]
    #[serde(default = "default_send_timeout_ms")]
    pub send_timeout_ms: u64,
    /// Bounded outbound queue length per sink
    #[validate(range(min = 1_usize, max = 4096_usize))]
    #[serde(default = "default_outbound_queue")]
    pub outbound_queue: usize,
    /// Periodic snapshot logging interval in seconds, 0 = off
    #[serde(default)]
    pub state_log_interval_secs: u64,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            allow_lan_access: false,
            max_peers: default_max_peers(),
            send_timeout_ms: default_send_timeout_ms(),
            outbound_queue: default_outbound_queue(),
            state_log_interval_secs: 0,
        }
    }
}

impl SyncConfig {
    /// Get the bind address based on LAN access setting.
    pub fn get_bind_address(&self) -> String {
        if self.allow_lan_access {
            "0.0.0.0".to_string()
        } else {
            "127.0.0.1".to_string()
        }
    }

    /// Get the full bind socket address.
    pub fn get_socket_addr(&self) -> String {
        format!("{}:{}", self.get_bind_address(), self.port)
    }

    pub fn send_timeout(&self) -> Duration {
        Duration::from_millis(self.send_timeout_ms)
    }

    pub fn state_log_interval(&self) -> Option<Duration> {
        (self.state_log_interval_secs > 0).then(|| Duration::from_secs(self.state_log_interval_secs))
    }
}

pub const fn default_port() -> u16 {
    50051
}

pub const fn default_max_peers() -> u16 {
    10
}

pub const fn default_send_timeout_ms() -> u64 {
    1000
}

pub const fn default_outbound_queue() -> usize {
    32
}
