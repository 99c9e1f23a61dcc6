//! Heartbeat configuration.

use serde::{Deserialize, Serialize};

/// Configuration for the periodic liveness probe.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HeartbeatConfig {
    /// Enable/disable the ticker. Transfers run their own pre-check either way.
    #[serde(default)]
    pub enabled: bool,

    /// Time between probes (milliseconds).
    #[serde(default = "default_interval")]
    pub interval_ms: u64,
}

fn default_interval() -> u64 {
    60_000 // 1 minute
}

impl Default for HeartbeatConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            interval_ms: default_interval(),
        }
    }
}
