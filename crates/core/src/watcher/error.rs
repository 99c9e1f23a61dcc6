//! Error types for the watcher module.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that prevent the inbox from being watched.
#[derive(Debug, Error)]
pub enum WatchError {
    /// The watched root does not exist or is not a directory.
    #[error("Watched root is not a directory: {path}")]
    RootNotFound { path: PathBuf },

    /// The platform watcher could not be created or attached.
    #[error("Filesystem watcher error: {0}")]
    Notify(#[from] notify::Error),

    /// I/O error while scanning the root.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
