//! Error types for the courier module.

use std::path::PathBuf;
use thiserror::Error;

use crate::archive::ArchiveError;

/// Errors that stop one file's delivery outside the upload protocol itself.
#[derive(Debug, Error)]
pub enum CourierError {
    /// The detected file could not be opened for upload.
    #[error("Failed to open {path}")]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The file changed on disk while it was being uploaded.
    #[error("{path} changed during upload ({before} -> {after} bytes)")]
    ChangedDuringUpload {
        path: PathBuf,
        before: u64,
        after: u64,
    },

    /// The upload succeeded but the file could not be archived.
    #[error("Delivered file could not be archived: {0}")]
    Archive(#[from] ArchiveError),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
