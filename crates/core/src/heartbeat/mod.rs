//! Periodic endpoint liveness logging.

mod config;
mod ticker;

pub use config::HeartbeatConfig;
pub use ticker::{probe_once, HeartbeatStatus, HeartbeatTicker};
