//! Courier runner.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use tokio::fs::File;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::archive::Archiver;
use crate::routing::RoutingDescriptor;
use crate::transfer::{TransferOrchestrator, TransferState};
use crate::watcher::{DeliveryGate, FileQueue, FileSnapshot};

use super::error::CourierError;
use super::types::{CourierStats, FileDisposition};

/// Consumes the detection queue and delivers files strictly one at a time.
///
/// The queue's gate is paused for the whole of each delivery and reopened
/// when the delivery ends, whether it succeeded, failed, returned an error or
/// panicked.
pub struct Courier {
    queue: FileQueue,
    orchestrator: TransferOrchestrator,
    archiver: Arc<dyn Archiver>,
}

impl Courier {
    pub fn new(
        queue: FileQueue,
        orchestrator: TransferOrchestrator,
        archiver: Arc<dyn Archiver>,
    ) -> Self {
        Self {
            queue,
            orchestrator,
            archiver,
        }
    }

    /// The gate paused while a file is in flight.
    pub fn gate(&self) -> DeliveryGate {
        self.queue.gate()
    }

    /// Runs until `cancel` fires or every queue handle is dropped.
    ///
    /// Cancelling while a file is in flight cuts its upload short; the file
    /// stays in the inbox.
    pub async fn run(mut self, cancel: CancellationToken) -> CourierStats {
        let mut stats = CourierStats::default();
        info!("Courier started");

        loop {
            let descriptor = tokio::select! {
                _ = cancel.cancelled() => break,
                next = self.queue.next() => match next {
                    Some(descriptor) => descriptor,
                    None => {
                        info!("Detection queue closed");
                        break;
                    }
                },
            };

            let _pause = self.queue.gate().pause();
            let span = info_span!(
                "transfer",
                run_id = %Uuid::new_v4(),
                file = %descriptor.source_path().display()
            );

            let result = AssertUnwindSafe(self.deliver(&descriptor, &cancel))
                .catch_unwind()
                .instrument(span.clone())
                .await;

            span.in_scope(|| match result {
                Ok(Ok(disposition)) => stats.record(&disposition),
                Ok(Err(e)) => {
                    error!(error = %e, "Delivery failed");
                    stats.errors += 1;
                }
                Err(_) => {
                    error!("Delivery panicked, file left in place");
                    stats.errors += 1;
                }
            });
        }

        info!(
            archived = stats.archived,
            aborted = stats.aborted,
            failed = stats.failed,
            errors = stats.errors,
            "Courier stopped"
        );
        stats
    }

    /// Uploads one resolved file and archives it if the upload succeeded.
    ///
    /// A file whose size or modification time moved while it was uploading
    /// is left in place, since what the endpoint received is not what is on
    /// disk.
    pub async fn deliver(
        &self,
        descriptor: &RoutingDescriptor,
        cancel: &CancellationToken,
    ) -> Result<FileDisposition, CourierError> {
        let path = descriptor.source_path();
        let mut file = File::open(path).await.map_err(|e| CourierError::Open {
            path: path.to_path_buf(),
            source: e,
        })?;
        let before = FileSnapshot::of(&file.metadata().await?);
        let total_len = before.len;

        let outcome = self
            .orchestrator
            .run(descriptor, &mut file, total_len, cancel)
            .await;
        // Release the handle before moving the file.
        drop(file);

        match outcome.state {
            TransferState::Success => {}
            TransferState::Aborted => {
                warn!("Endpoint not available, file left in place");
                return Ok(FileDisposition::LeftInPlace(outcome));
            }
            _ => {
                error!(
                    failed_segments = ?outcome.failed_segments,
                    finalized = outcome.finalized,
                    "Transfer failed, file left in place"
                );
                return Ok(FileDisposition::LeftInPlace(outcome));
            }
        }

        let after = FileSnapshot::of(&tokio::fs::metadata(path).await?);
        if after != before {
            return Err(CourierError::ChangedDuringUpload {
                path: path.to_path_buf(),
                before: before.len,
                after: after.len,
            });
        }

        let archived = self.archiver.archive(path).await?;
        Ok(FileDisposition::Archived {
            path: archived,
            outcome,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archive::{ArchiveConfig, ArchiveError, FsArchiver};
    use crate::config::RoutingDefaults;
    use crate::routing::MetadataResolver;
    use crate::testing::fixtures::inbox_file;
    use crate::testing::MockConnector;
    use crate::transfer::{
        Connector, FilePart, HttpTransport, ResourceTemplate, TransferConfig, TransportError,
        TransportResponse,
    };
    use crate::watcher::{file_queue, FileQueueHandle, ReadinessConfig, ReadinessGate};
    use async_trait::async_trait;
    use std::path::{Path, PathBuf};
    use std::time::Duration;
    use tempfile::TempDir;

    const TEMPLATE: &str =
        "file/{segment}/{organisationNumber}/{statisticalProgram}/{fileFormat}/{fileName}";

    struct Fixture {
        _temp: TempDir,
        inbox: PathBuf,
        done: PathBuf,
        connector: MockConnector,
    }

    impl Fixture {
        fn new() -> Self {
            let temp = TempDir::new().unwrap();
            let inbox = temp.path().join("in");
            let done = temp.path().join("done");
            std::fs::create_dir_all(&inbox).unwrap();
            Self {
                _temp: temp,
                inbox,
                done,
                connector: MockConnector::new(),
            }
        }

        fn courier(&self, archiver: Arc<dyn Archiver>) -> (FileQueueHandle, Courier) {
            self.courier_with(Arc::new(self.connector.clone()), archiver)
        }

        fn courier_with(
            &self,
            connector: Arc<dyn Connector>,
            archiver: Arc<dyn Archiver>,
        ) -> (FileQueueHandle, Courier) {
            let readiness = ReadinessGate::new(
                ReadinessConfig::default()
                    .with_max_attempts(2)
                    .with_retry_delay(Duration::from_millis(10))
                    .with_settle(Duration::from_millis(20)),
            );
            let (handle, queue) = file_queue(
                readiness,
                MetadataResolver::new(&self.inbox, RoutingDefaults::default()),
            );
            let orchestrator = TransferOrchestrator::new(
                connector,
                "heartbeat",
                ResourceTemplate::parse(TEMPLATE).unwrap(),
                TransferConfig::default().with_max_chunk_size(1000),
            );
            (handle, Courier::new(queue, orchestrator, archiver))
        }

        fn fs_archiver(&self) -> Arc<dyn Archiver> {
            Arc::new(FsArchiver::new(ArchiveConfig::new(&self.done)))
        }

        fn archived(&self) -> Vec<PathBuf> {
            match std::fs::read_dir(&self.done) {
                Ok(entries) => entries.map(|e| e.unwrap().path()).collect(),
                Err(_) => Vec::new(),
            }
        }
    }

    struct PanickingArchiver;

    #[async_trait]
    impl Archiver for PanickingArchiver {
        fn name(&self) -> &str {
            "panicking"
        }

        async fn archive(&self, _source: &Path) -> Result<PathBuf, ArchiveError> {
            panic!("archive exploded");
        }
    }

    /// Endpoint that appends to the source file when the first chunk arrives,
    /// as a writer that was still busy would.
    struct AppendingTransport {
        target: PathBuf,
        appended: std::sync::atomic::AtomicBool,
    }

    #[async_trait]
    impl HttpTransport for AppendingTransport {
        async fn get(&self, _resource: &str) -> Result<TransportResponse, TransportError> {
            Ok(TransportResponse::new(200, ""))
        }

        async fn post_file(
            &self,
            _resource: &str,
            _part: FilePart,
        ) -> Result<TransportResponse, TransportError> {
            use std::io::Write;
            use std::sync::atomic::Ordering;
            if !self.appended.swap(true, Ordering::SeqCst) {
                let mut file = std::fs::OpenOptions::new()
                    .append(true)
                    .open(&self.target)
                    .unwrap();
                file.write_all(&[b'z'; 500]).unwrap();
            }
            Ok(TransportResponse::new(200, ""))
        }
    }

    struct AppendingConnector(Arc<AppendingTransport>);

    impl Connector for AppendingConnector {
        fn name(&self) -> &str {
            "appending"
        }

        fn connect(&self) -> Result<Arc<dyn HttpTransport>, TransportError> {
            let transport: Arc<dyn HttpTransport> = self.0.clone();
            Ok(transport)
        }
    }

    #[tokio::test]
    async fn test_delivers_and_archives() {
        let fixture = Fixture::new();
        let (handle, courier) = fixture.courier(fixture.fs_archiver());
        let source = inbox_file(&fixture.inbox, &["1234567890", "PROGRAMX", "V40", "report.xml"], 2500).unwrap();

        handle.enqueue(source.clone());
        drop(handle);
        let stats = courier.run(CancellationToken::new()).await;

        assert_eq!(stats.archived, 1);
        assert!(!source.exists());
        assert_eq!(fixture.archived().len(), 1);
        // heartbeat + 3 chunks + finalize
        assert_eq!(fixture.connector.transport().recorded_requests().await.len(), 5);
    }

    #[tokio::test]
    async fn test_failed_chunk_leaves_file() {
        let fixture = Fixture::new();
        fixture.connector.transport().set_post_status_for("file/0/", 500).await;
        let (handle, courier) = fixture.courier(fixture.fs_archiver());
        let source = inbox_file(&fixture.inbox, &["1234567890", "PROGRAMX", "V40", "report.xml"], 10).unwrap();

        handle.enqueue(source.clone());
        drop(handle);
        let stats = courier.run(CancellationToken::new()).await;

        assert_eq!(stats.failed, 1);
        assert!(source.exists());
        assert!(fixture.archived().is_empty());
    }

    #[tokio::test]
    async fn test_dead_endpoint_leaves_file() {
        let fixture = Fixture::new();
        fixture.connector.transport().set_ping_status(503).await;
        let (handle, courier) = fixture.courier(fixture.fs_archiver());
        let source = inbox_file(&fixture.inbox, &["1234567890", "PROGRAMX", "V40", "report.xml"], 10).unwrap();

        handle.enqueue(source.clone());
        drop(handle);
        let stats = courier.run(CancellationToken::new()).await;

        assert_eq!(stats.aborted, 1);
        assert!(source.exists());
        assert_eq!(fixture.connector.transport().post_count().await, 0);
    }

    #[tokio::test]
    async fn test_panic_reopens_gate_and_continues() {
        let fixture = Fixture::new();
        let (handle, courier) = fixture.courier(Arc::new(PanickingArchiver));
        let gate = courier.gate();
        let first = inbox_file(&fixture.inbox, &["1234567890", "PROGRAMX", "V40", "a.xml"], 10).unwrap();
        let second = inbox_file(&fixture.inbox, &["1234567890", "PROGRAMX", "V40", "b.xml"], 10).unwrap();

        handle.enqueue(first.clone());
        handle.enqueue(second.clone());
        drop(handle);
        let stats = courier.run(CancellationToken::new()).await;

        assert_eq!(stats.errors, 2);
        assert!(gate.is_open());
        assert!(first.exists());
        assert!(second.exists());
    }

    #[tokio::test]
    async fn test_gate_paused_while_in_flight() {
        let fixture = Fixture::new();
        fixture.connector.transport().hang_posts_matching("file/0/").await;
        let (handle, courier) = fixture.courier(fixture.fs_archiver());
        let gate = courier.gate();
        let source = inbox_file(&fixture.inbox, &["1234567890", "PROGRAMX", "V40", "report.xml"], 10).unwrap();
        handle.enqueue(source.clone());

        let cancel = CancellationToken::new();
        let task = tokio::spawn(courier.run(cancel.clone()));

        let mut paused = false;
        for _ in 0..200 {
            if !gate.is_open() {
                paused = true;
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert!(paused, "gate never paused");

        cancel.cancel();
        let stats = task.await.unwrap();

        assert_eq!(stats.failed, 1);
        assert!(gate.is_open());
        assert!(source.exists());
    }

    #[tokio::test]
    async fn test_unresolvable_file_is_skipped() {
        let fixture = Fixture::new();
        let (handle, courier) = fixture.courier(fixture.fs_archiver());
        let stray = inbox_file(&fixture.inbox, &["stray.xml"], 10).unwrap();

        handle.enqueue(stray.clone());
        drop(handle);
        let stats = courier.run(CancellationToken::new()).await;

        assert_eq!(stats.total(), 0);
        assert!(stray.exists());
        assert!(fixture.connector.transport().recorded_requests().await.is_empty());
    }

    #[tokio::test]
    async fn test_file_growing_during_upload_is_not_archived() {
        let fixture = Fixture::new();
        let source = inbox_file(&fixture.inbox, &["1234567890", "PROGRAMX", "V40", "report.xml"], 2500).unwrap();
        let connector = AppendingConnector(Arc::new(AppendingTransport {
            target: source.clone(),
            appended: std::sync::atomic::AtomicBool::new(false),
        }));
        let (handle, courier) = fixture.courier_with(Arc::new(connector), fixture.fs_archiver());

        handle.enqueue(source.clone());
        drop(handle);
        let stats = courier.run(CancellationToken::new()).await;

        assert_eq!(stats.archived, 0);
        assert_eq!(stats.errors, 1);
        assert!(source.exists());
        assert_eq!(std::fs::metadata(&source).unwrap().len(), 3000);
        assert!(fixture.archived().is_empty());
    }
}
