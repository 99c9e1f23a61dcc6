//! Inbox observation: readiness, the detection queue and its pause gate.
//!
//! Filesystem notifications are turned into a single-consumer queue of paths.
//! The consumer only dequeues while the [`DeliveryGate`] is open, checks that
//! each file is fully written ([`ReadinessGate`]) and resolves its routing
//! before handing it on.

mod config;
mod error;
mod fs_watcher;
mod gate;
mod queue;
mod readiness;

pub use config::ReadinessConfig;
pub use error::WatchError;
pub use fs_watcher::DirectoryWatcher;
pub use gate::{DeliveryGate, PauseGuard};
pub use queue::{file_queue, FileQueue, FileQueueHandle};
pub use readiness::{FileSnapshot, ReadinessCheck, ReadinessGate};
