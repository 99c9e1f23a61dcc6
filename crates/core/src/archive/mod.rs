//! Moves delivered files out of the inbox.
//!
//! Files are renamed into the done directory. When the rename crosses
//! filesystems the archiver copies, optionally verifies the copy's SHA-256,
//! and only then removes the source.

mod config;
mod error;
mod fs_archiver;
mod traits;

pub use config::ArchiveConfig;
pub use error::ArchiveError;
pub use fs_archiver::{archive_file_name, FsArchiver};
pub use traits::Archiver;
