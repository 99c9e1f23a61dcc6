//! Single-consumer queue of detected files.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::routing::{MetadataResolver, RoutingDescriptor};

use super::gate::DeliveryGate;
use super::readiness::ReadinessGate;

/// Paths sent but not yet taken off the channel.
#[derive(Debug, Clone, Default)]
struct Queued(Arc<Mutex<HashSet<PathBuf>>>);

impl Queued {
    fn lock(&self) -> MutexGuard<'_, HashSet<PathBuf>> {
        self.0.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn insert(&self, path: &Path) -> bool {
        self.lock().insert(path.to_path_buf())
    }

    fn remove(&self, path: &Path) {
        self.lock().remove(path);
    }
}

/// Producer side of the detection queue.
///
/// Cloned into the filesystem watcher callback; can also be used to enqueue a
/// file by hand. A path already waiting in the queue is not queued twice, so
/// a startup scan racing the live watcher yields one delivery.
#[derive(Debug, Clone)]
pub struct FileQueueHandle {
    tx: mpsc::UnboundedSender<PathBuf>,
    queued: Queued,
}

impl FileQueueHandle {
    /// Enqueues a detected path. Returns `false` if the consumer is gone.
    pub fn enqueue(&self, path: PathBuf) -> bool {
        if self.tx.is_closed() {
            return false;
        }
        if !self.queued.insert(&path) {
            debug!("Already queued: {}", path.display());
            return true;
        }
        match self.tx.send(path.clone()) {
            Ok(()) => true,
            Err(_) => {
                self.queued.remove(&path);
                false
            }
        }
    }
}

/// Consumer side of the detection queue.
///
/// Dequeues paths only while its [`DeliveryGate`] is open, runs the readiness
/// check and resolves routing. Files that fail either step are logged and
/// dropped. A path that no longer exists when dequeued was already handled
/// or moved away and is skipped without spending the readiness budget.
#[derive(Debug)]
pub struct FileQueue {
    rx: mpsc::UnboundedReceiver<PathBuf>,
    /// Dequeued while the gate was closed; dispatched first once it reopens.
    pending: Option<PathBuf>,
    queued: Queued,
    gate: DeliveryGate,
    readiness: ReadinessGate,
    resolver: MetadataResolver,
}

/// Creates a detection queue.
pub fn file_queue(
    readiness: ReadinessGate,
    resolver: MetadataResolver,
) -> (FileQueueHandle, FileQueue) {
    let (tx, rx) = mpsc::unbounded_channel();
    let queued = Queued::default();
    (
        FileQueueHandle {
            tx,
            queued: queued.clone(),
        },
        FileQueue {
            rx,
            pending: None,
            queued,
            gate: DeliveryGate::new(),
            readiness,
            resolver,
        },
    )
}

impl FileQueue {
    /// The gate controlling dispatch from this queue.
    pub fn gate(&self) -> DeliveryGate {
        self.gate.clone()
    }

    /// Waits for the next file that is ready and routable.
    ///
    /// Returns `None` once every [`FileQueueHandle`] has been dropped and the
    /// queue is drained. Cancel-safe while waiting for a path or for the gate.
    pub async fn next(&mut self) -> Option<RoutingDescriptor> {
        loop {
            let path = match self.pending.take() {
                Some(path) => path,
                None => {
                    let path = self.rx.recv().await?;
                    self.queued.remove(&path);
                    path
                }
            };
            if !self.gate.is_open() {
                self.pending = Some(path);
                self.gate.wait_open().await;
                continue;
            }

            if !tokio::fs::try_exists(&path).await.unwrap_or(true) {
                debug!("No longer present, skipping: {}", path.display());
                continue;
            }

            let check = self.readiness.check(&path).await;
            if !check.ready {
                error!(
                    "File was not available after {} attempts: {}",
                    check.attempts,
                    path.display()
                );
                continue;
            }

            info!("File change registered: {}", path.display());
            match self.resolver.resolve(&path) {
                Ok(descriptor) => return Some(descriptor),
                Err(e) => {
                    warn!("Skipping {}: {}", path.display(), e);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RoutingDefaults;
    use crate::routing::RoutingSource;
    use crate::watcher::ReadinessConfig;
    use std::time::Duration;
    use tempfile::TempDir;
    use tokio::time::Instant;

    fn queue_for(root: &std::path::Path) -> (FileQueueHandle, FileQueue) {
        let readiness = ReadinessGate::new(
            ReadinessConfig::default()
                .with_max_attempts(2)
                .with_retry_delay(Duration::from_millis(10))
                .with_settle(Duration::ZERO),
        );
        file_queue(
            readiness,
            MetadataResolver::new(root, RoutingDefaults::default()),
        )
    }

    fn drop_file(root: &std::path::Path, relative: &str) -> PathBuf {
        let path = root.join(relative);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, b"payload").unwrap();
        path
    }

    #[tokio::test]
    async fn test_ready_file_is_resolved() {
        let root = TempDir::new().unwrap();
        let (handle, mut queue) = queue_for(root.path());
        let path = drop_file(root.path(), "1234567890/PROGRAMX/V40/report.xml");

        assert!(handle.enqueue(path.clone()));
        let descriptor = queue.next().await.unwrap();

        assert_eq!(descriptor.source_path(), path.as_path());
        assert_eq!(descriptor.organisation_number(), "1234567890");
        assert!(matches!(descriptor.source(), RoutingSource::Path(_)));
    }

    #[tokio::test]
    async fn test_unready_and_unroutable_files_are_dropped() {
        let root = TempDir::new().unwrap();
        let (handle, mut queue) = queue_for(root.path());

        // Never appears.
        handle.enqueue(root.path().join("org/prog/fmt/ghost.xml"));
        // Ready, but routing defaults are empty so the fallback fails.
        handle.enqueue(drop_file(root.path(), "loose.xml"));
        let good = drop_file(root.path(), "org/prog/fmt/good.xml");
        handle.enqueue(good.clone());

        let descriptor = queue.next().await.unwrap();
        assert_eq!(descriptor.source_path(), good.as_path());
    }

    #[tokio::test]
    async fn test_next_returns_none_when_handles_dropped() {
        let root = TempDir::new().unwrap();
        let (handle, mut queue) = queue_for(root.path());
        drop(handle);
        assert!(queue.next().await.is_none());
    }

    #[tokio::test]
    async fn test_paused_gate_holds_dispatch() {
        let root = TempDir::new().unwrap();
        let (handle, mut queue) = queue_for(root.path());
        let gate = queue.gate();
        let path = drop_file(root.path(), "org/prog/fmt/held.xml");

        let guard = gate.pause();
        handle.enqueue(path.clone());

        let held = tokio::time::timeout(Duration::from_millis(50), queue.next()).await;
        assert!(held.is_err(), "dispatch must wait while paused");

        drop(guard);
        let descriptor = tokio::time::timeout(Duration::from_secs(1), queue.next())
            .await
            .expect("dispatch resumes after the guard drops")
            .unwrap();
        assert_eq!(descriptor.source_path(), path.as_path());
    }

    #[tokio::test]
    async fn test_duplicate_enqueue_dispatches_once() {
        let root = TempDir::new().unwrap();
        let (handle, mut queue) = queue_for(root.path());
        let path = drop_file(root.path(), "org/prog/fmt/twice.xml");

        // Startup scan and live event for the same file.
        assert!(handle.enqueue(path.clone()));
        assert!(handle.enqueue(path.clone()));
        drop(handle);

        let descriptor = queue.next().await.unwrap();
        assert_eq!(descriptor.source_path(), path.as_path());
        assert!(queue.next().await.is_none());
    }

    #[tokio::test]
    async fn test_path_can_be_requeued_after_dispatch() {
        let root = TempDir::new().unwrap();
        let (handle, mut queue) = queue_for(root.path());
        let path = drop_file(root.path(), "org/prog/fmt/again.xml");

        handle.enqueue(path.clone());
        queue.next().await.unwrap();
        handle.enqueue(path.clone());
        let descriptor = queue.next().await.unwrap();

        assert_eq!(descriptor.source_path(), path.as_path());
    }

    #[tokio::test(start_paused = true)]
    async fn test_vanished_file_is_skipped_without_retries() {
        let root = TempDir::new().unwrap();
        let readiness = ReadinessGate::new(
            ReadinessConfig::default()
                .with_max_attempts(5)
                .with_retry_delay(Duration::from_secs(3)),
        );
        let (handle, mut queue) = file_queue(
            readiness,
            MetadataResolver::new(root.path(), RoutingDefaults::default()),
        );

        // Moved away before dispatch, as an earlier delivery would.
        let gone = drop_file(root.path(), "org/prog/fmt/gone.xml");
        handle.enqueue(gone.clone());
        std::fs::remove_file(&gone).unwrap();
        drop(handle);

        let start = Instant::now();
        assert!(queue.next().await.is_none());
        assert_eq!(start.elapsed(), Duration::ZERO);
    }

    #[test]
    fn test_enqueue_after_consumer_dropped_fails() {
        let root = TempDir::new().unwrap();
        let (handle, queue) = queue_for(root.path());
        drop(queue);
        assert!(!handle.enqueue(root.path().join("late.xml")));
    }
}
