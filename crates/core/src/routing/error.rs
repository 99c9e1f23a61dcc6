//! Error types for routing resolution.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while deriving a routing descriptor.
#[derive(Debug, Error)]
pub enum ResolveError {
    /// The file is not located below the watched root.
    #[error("{path} is not under the watched root {root}")]
    OutsideRoot { path: PathBuf, root: PathBuf },

    /// A path segment needed for routing is empty, relative or not valid UTF-8.
    #[error("Segment {index} of {path} cannot be used as a routing field")]
    UnreadableSegment { path: PathBuf, index: usize },

    /// The path has no file name component.
    #[error("No file name in {path}")]
    MissingFileName { path: PathBuf },

    /// The path layout is not recognized and the fallback field is not configured.
    #[error("routing.{field} is not configured and {path} does not encode it")]
    MissingDefault { field: &'static str, path: PathBuf },
}
