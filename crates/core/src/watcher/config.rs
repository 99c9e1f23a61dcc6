//! Configuration for the readiness check.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// How long to wait for a freshly created file to become readable.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReadinessConfig {
    /// Open attempts before the file is given up on.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Fixed delay between two attempts (milliseconds).
    #[serde(default = "default_retry_delay")]
    pub retry_delay_ms: u64,

    /// How long size and modification time must stay unchanged for an
    /// attempt to succeed (milliseconds). 0 accepts any openable file.
    #[serde(default = "default_settle")]
    pub settle_ms: u64,
}

fn default_max_attempts() -> u32 {
    5
}

fn default_retry_delay() -> u64 {
    3000 // 3 seconds
}

fn default_settle() -> u64 {
    1000 // 1 second
}

impl Default for ReadinessConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            retry_delay_ms: default_retry_delay(),
            settle_ms: default_settle(),
        }
    }
}

impl ReadinessConfig {
    /// Delay between two attempts.
    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }

    /// Quiet period required within one attempt.
    pub fn settle(&self) -> Duration {
        Duration::from_millis(self.settle_ms)
    }

    /// Sets the attempt budget.
    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts;
        self
    }

    /// Sets the delay between attempts.
    pub fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay_ms = delay.as_millis() as u64;
        self
    }

    /// Sets the quiet period within one attempt.
    pub fn with_settle(mut self, settle: Duration) -> Self {
        self.settle_ms = settle.as_millis() as u64;
        self
    }
}
