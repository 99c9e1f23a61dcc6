//! Transfer configuration.

use serde::{Deserialize, Serialize};

/// What to do with the remaining chunks once one chunk has failed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChunkPolicy {
    /// Keep posting every chunk, then still send the finalize call and let the
    /// server reconcile. The run is reported as failed either way.
    #[default]
    AttemptAll,
    /// Stop at the first failed chunk and skip the finalize call.
    FailFast,
}

/// Configuration for chunked uploads.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransferConfig {
    /// Maximum bytes per chunk request.
    #[serde(default = "default_max_chunk_size")]
    pub max_chunk_size: u64,

    /// Behavior after a failed chunk.
    #[serde(default)]
    pub chunk_policy: ChunkPolicy,

    /// Multipart form field carrying the chunk bytes.
    #[serde(default = "default_file_field_name")]
    pub file_field_name: String,
}

fn default_max_chunk_size() -> u64 {
    400 * 1024
}

fn default_file_field_name() -> String {
    "File".to_string()
}

impl Default for TransferConfig {
    fn default() -> Self {
        Self {
            max_chunk_size: default_max_chunk_size(),
            chunk_policy: ChunkPolicy::default(),
            file_field_name: default_file_field_name(),
        }
    }
}

impl TransferConfig {
    /// Sets the maximum chunk size.
    pub fn with_max_chunk_size(mut self, size: u64) -> Self {
        self.max_chunk_size = size;
        self
    }

    /// Sets the chunk failure policy.
    pub fn with_chunk_policy(mut self, policy: ChunkPolicy) -> Self {
        self.chunk_policy = policy;
        self
    }
}
