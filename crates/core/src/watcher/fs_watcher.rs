//! Filesystem notifications for the watched root.

use std::path::{Path, PathBuf};

use notify::event::{CreateKind, ModifyKind, RenameMode};
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tracing::{debug, info, warn};

use super::error::WatchError;
use super::queue::FileQueueHandle;

/// Watches the inbox root recursively and feeds created files into a queue.
///
/// Dropping the watcher stops observation.
pub struct DirectoryWatcher {
    root: PathBuf,
    handle: FileQueueHandle,
    _watcher: RecommendedWatcher,
}

impl DirectoryWatcher {
    /// Starts watching `root`. Failing to attach is fatal to the caller.
    pub fn watch(root: &Path, handle: FileQueueHandle) -> Result<Self, WatchError> {
        if !root.is_dir() {
            return Err(WatchError::RootNotFound {
                path: root.to_path_buf(),
            });
        }

        let tx = handle.clone();
        let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| match res {
            Ok(event) => {
                for path in created_files(&event) {
                    debug!("Detected {}", path.display());
                    if !tx.enqueue(path) {
                        warn!("Detection queue closed, dropping event");
                    }
                }
            }
            Err(e) => warn!("Filesystem watch error: {}", e),
        })?;
        watcher.watch(root, RecursiveMode::Recursive)?;

        info!("Listening to file changes under: {}", root.display());

        Ok(Self {
            root: root.to_path_buf(),
            handle,
            _watcher: watcher,
        })
    }

    /// The watched root.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Enqueues every file already present under the root.
    ///
    /// Used at startup to pick up files left behind by an earlier failed
    /// transfer. Returns the number of files enqueued.
    pub fn scan_existing(&self) -> Result<usize, WatchError> {
        let mut files = Vec::new();
        collect_files(&self.root, &mut files)?;
        files.sort();

        let count = files.len();
        for path in files {
            self.handle.enqueue(path);
        }
        info!(
            "Enqueued {} existing files under {}",
            count,
            self.root.display()
        );
        Ok(count)
    }
}

/// Paths of regular files that appeared in the watched tree.
///
/// Creations and renames into the tree count; directory creations,
/// modifications and removals do not.
fn created_files(event: &Event) -> Vec<PathBuf> {
    let candidates: Vec<&PathBuf> = match event.kind {
        EventKind::Create(CreateKind::Folder) => Vec::new(),
        EventKind::Create(_) => event.paths.iter().collect(),
        EventKind::Modify(ModifyKind::Name(RenameMode::To)) => event.paths.iter().collect(),
        EventKind::Modify(ModifyKind::Name(RenameMode::Both)) => {
            event.paths.last().into_iter().collect()
        }
        _ => Vec::new(),
    };

    candidates
        .into_iter()
        .filter(|path| !path.is_dir())
        .cloned()
        .collect()
}

fn collect_files(dir: &Path, files: &mut Vec<PathBuf>) -> std::io::Result<()> {
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let file_type = entry.file_type()?;
        if file_type.is_dir() {
            collect_files(&entry.path(), files)?;
        } else if file_type.is_file() {
            files.push(entry.path());
        }
    }
    Ok(())
}
