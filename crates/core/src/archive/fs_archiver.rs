//! File system archiver implementation.

use async_trait::async_trait;
use chrono::{Local, NaiveDateTime};
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use tokio::fs::{self, File};
use tokio::io::{AsyncReadExt, AsyncWriteExt, BufReader, BufWriter};
use tracing::{debug, info, warn};

use super::config::ArchiveConfig;
use super::error::ArchiveError;
use super::traits::Archiver;

const TIMESTAMP_FORMAT: &str = "%Y_%m_%d_%H_%M_%S";

/// Moves delivered files into a flat done directory, stamping each name with
/// the local archive time.
pub struct FsArchiver {
    config: ArchiveConfig,
}

impl FsArchiver {
    pub fn new(config: ArchiveConfig) -> Self {
        Self { config }
    }

    pub fn done_dir(&self) -> &Path {
        &self.config.done_dir
    }

    /// Attempts to move a file atomically (rename).
    async fn try_atomic_move(source: &Path, destination: &Path) -> Result<bool, std::io::Error> {
        match fs::rename(source, destination).await {
            Ok(()) => Ok(true),
            Err(e) => {
                // EXDEV is 18 on Linux
                if e.kind() == std::io::ErrorKind::CrossesDevices || e.raw_os_error() == Some(18) {
                    Ok(false)
                } else {
                    Err(e)
                }
            }
        }
    }

    /// Copies a file, returning the SHA-256 of what was read when `hash` is set.
    async fn copy_file(
        &self,
        source: &Path,
        destination: &Path,
        hash: bool,
    ) -> Result<Option<String>, ArchiveError> {
        let copy_failed =
            |e| ArchiveError::copy_failed(source.to_path_buf(), destination.to_path_buf(), e);

        let source_file = File::open(source).await.map_err(copy_failed)?;
        let dest_file = File::create(destination).await.map_err(copy_failed)?;

        let mut reader = BufReader::with_capacity(self.config.buffer_size, source_file);
        let mut writer = BufWriter::with_capacity(self.config.buffer_size, dest_file);
        let mut hasher = hash.then(Sha256::new);
        let mut buffer = vec![0u8; self.config.buffer_size.max(1)];

        loop {
            let bytes_read = reader.read(&mut buffer).await.map_err(copy_failed)?;
            if bytes_read == 0 {
                break;
            }
            if let Some(ref mut h) = hasher {
                h.update(&buffer[..bytes_read]);
            }
            writer
                .write_all(&buffer[..bytes_read])
                .await
                .map_err(copy_failed)?;
        }

        writer.flush().await.map_err(copy_failed)?;
        writer.get_ref().sync_all().await.map_err(copy_failed)?;

        Ok(hasher.map(|h| format!("{:x}", h.finalize())))
    }

    async fn checksum(&self, path: &Path) -> Result<String, ArchiveError> {
        let file = File::open(path).await?;
        let mut reader = BufReader::with_capacity(self.config.buffer_size, file);
        let mut buffer = vec![0u8; self.config.buffer_size.max(1)];
        let mut hasher = Sha256::new();
        loop {
            let bytes_read = reader.read(&mut buffer).await?;
            if bytes_read == 0 {
                break;
            }
            hasher.update(&buffer[..bytes_read]);
        }
        Ok(format!("{:x}", hasher.finalize()))
    }

    /// Copy, verify, then delete the source. The copy is removed again if
    /// anything before the delete fails.
    async fn copy_then_remove(&self, source: &Path, destination: &Path) -> Result<(), ArchiveError> {
        let copied = async {
            let expected = self
                .copy_file(source, destination, self.config.verify_copies)
                .await?;
            if let Some(expected) = expected {
                let actual = self.checksum(destination).await?;
                if actual != expected {
                    return Err(ArchiveError::ChecksumMismatch {
                        path: destination.to_path_buf(),
                        expected,
                        actual,
                    });
                }
            }
            Ok::<(), ArchiveError>(())
        }
        .await;

        if let Err(e) = copied {
            if let Err(cleanup) = fs::remove_file(destination).await {
                if cleanup.kind() != std::io::ErrorKind::NotFound {
                    warn!(path = %destination.display(), error = %cleanup, "Failed to remove partial copy");
                }
            }
            return Err(e);
        }

        fs::remove_file(source)
            .await
            .map_err(|e| ArchiveError::CleanupFailed {
                path: source.to_path_buf(),
                source: e,
            })
    }

    /// First free `<stem>_<timestamp>[_<n>].<ext>` in the done directory.
    fn free_destination(&self, file_name: &Path, stamp: NaiveDateTime) -> PathBuf {
        let mut attempt = 0u32;
        loop {
            let candidate = self
                .config
                .done_dir
                .join(archive_file_name(file_name, stamp, attempt));
            if !candidate.exists() {
                return candidate;
            }
            attempt += 1;
        }
    }
}

/// Archive name for `file_name` stamped at `stamp`. `attempt` > 0 adds a
/// collision counter.
pub fn archive_file_name(file_name: &Path, stamp: NaiveDateTime, attempt: u32) -> String {
    let stem = file_name
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let mut name = format!("{}_{}", stem, stamp.format(TIMESTAMP_FORMAT));
    if attempt > 0 {
        name.push_str(&format!("_{}", attempt));
    }
    if let Some(ext) = file_name.extension() {
        name.push('.');
        name.push_str(&ext.to_string_lossy());
    }
    name
}

#[async_trait]
impl Archiver for FsArchiver {
    fn name(&self) -> &str {
        "filesystem"
    }

    async fn archive(&self, source: &Path) -> Result<PathBuf, ArchiveError> {
        if !source.is_file() {
            return Err(ArchiveError::SourceNotFound {
                path: source.to_path_buf(),
            });
        }
        let file_name = source
            .file_name()
            .map(Path::new)
            .ok_or_else(|| ArchiveError::InvalidSource {
                path: source.to_path_buf(),
            })?;

        fs::create_dir_all(&self.config.done_dir)
            .await
            .map_err(|e| ArchiveError::DirectoryCreationFailed {
                path: self.config.done_dir.clone(),
                source: e,
            })?;

        let destination = self.free_destination(file_name, Local::now().naive_local());
        debug!(from = %source.display(), to = %destination.display(), "Archiving");

        let moved = Self::try_atomic_move(source, &destination)
            .await
            .map_err(|e| ArchiveError::move_failed(source.to_path_buf(), destination.clone(), e))?;
        if !moved {
            debug!("Rename crosses devices, copying instead");
            self.copy_then_remove(source, &destination).await?;
        }

        info!(path = %destination.display(), "Archived");
        Ok(destination)
    }
}
