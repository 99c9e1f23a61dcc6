//! Configuration for the archive module.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Where delivered files are moved.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArchiveConfig {
    /// Directory delivered files are moved into. Must lie outside the watched root.
    pub done_dir: PathBuf,

    /// Compare SHA-256 digests when a move has to fall back to copy + delete.
    #[serde(default = "default_true")]
    pub verify_copies: bool,

    /// Buffer size for fallback copies in bytes.
    #[serde(default = "default_buffer_size")]
    pub buffer_size: usize,
}

fn default_true() -> bool {
    true
}

fn default_buffer_size() -> usize {
    1024 * 1024 // 1 MB
}

impl ArchiveConfig {
    pub fn new(done_dir: impl Into<PathBuf>) -> Self {
        Self {
            done_dir: done_dir.into(),
            verify_copies: true,
            buffer_size: default_buffer_size(),
        }
    }
}
