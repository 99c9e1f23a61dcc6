//! Trait definitions for the archive module.

use std::path::{Path, PathBuf};

use async_trait::async_trait;

use super::error::ArchiveError;

/// Moves delivered files out of the inbox.
#[async_trait]
pub trait Archiver: Send + Sync {
    /// Returns the name of this archiver implementation.
    fn name(&self) -> &str;

    /// Moves `source` into the archive and returns its new path.
    ///
    /// On error the source is left where it was.
    async fn archive(&self, source: &Path) -> Result<PathBuf, ArchiveError>;
}
