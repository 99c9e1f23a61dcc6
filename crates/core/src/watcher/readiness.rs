//! Guards against reading a file that is still being written.

use std::io;
use std::path::Path;
use std::time::{Duration, SystemTime};

use tracing::debug;

use super::config::ReadinessConfig;

/// Result of one readiness check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadinessCheck {
    /// Whether the file could be opened within the budget.
    pub ready: bool,
    /// Open attempts made, including the successful one.
    pub attempts: u32,
}

/// Attempt counter scoped to a single check.
struct ReadinessState {
    attempts: u32,
    max_attempts: u32,
    delay: Duration,
}

impl ReadinessState {
    fn new(config: &ReadinessConfig) -> Self {
        Self {
            attempts: 0,
            max_attempts: config.max_attempts,
            delay: config.retry_delay(),
        }
    }

    fn exhausted(&self) -> bool {
        self.attempts >= self.max_attempts
    }
}

/// Size and modification time observed at one instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileSnapshot {
    pub len: u64,
    pub modified: Option<SystemTime>,
}

impl FileSnapshot {
    pub fn of(metadata: &std::fs::Metadata) -> Self {
        Self {
            len: metadata.len(),
            modified: metadata.modified().ok(),
        }
    }
}

/// Decides whether a newly created file is safe to open for reading.
///
/// An attempt succeeds when the file opens for reading while denying other
/// writers and its size and modification time stay unchanged for the
/// configured settle period. Unix has no share modes, so the settle period
/// is what catches a writer that still holds the file. "Not found", "in
/// use", "access denied" and "still growing" all consume one attempt;
/// attempts are separated by a fixed delay.
#[derive(Debug, Clone, Default)]
pub struct ReadinessGate {
    config: ReadinessConfig,
}

impl ReadinessGate {
    pub fn new(config: ReadinessConfig) -> Self {
        Self { config }
    }

    /// Returns `true` as soon as one attempt succeeds.
    pub async fn is_ready(&self, path: &Path) -> bool {
        self.check(path).await.ready
    }

    /// Runs the check and reports how many attempts it took.
    pub async fn check(&self, path: &Path) -> ReadinessCheck {
        let mut state = ReadinessState::new(&self.config);

        while !state.exhausted() {
            state.attempts += 1;
            match self.attempt(path).await {
                Ok(()) => {
                    return ReadinessCheck {
                        ready: true,
                        attempts: state.attempts,
                    };
                }
                Err(e) => {
                    debug!(
                        "{} not yet ready (attempt {}/{}): {}",
                        path.display(),
                        state.attempts,
                        state.max_attempts,
                        e
                    );
                }
            }

            if !state.exhausted() {
                tokio::time::sleep(state.delay).await;
            }
        }

        ReadinessCheck {
            ready: false,
            attempts: state.attempts,
        }
    }

    async fn attempt(&self, path: &Path) -> io::Result<()> {
        let file = open_exclusive(path).await?;
        let settle = self.config.settle();
        if settle.is_zero() {
            return Ok(());
        }

        let before = FileSnapshot::of(&file.metadata().await?);
        tokio::time::sleep(settle).await;
        let after = FileSnapshot::of(&tokio::fs::metadata(path).await?);

        if before != after {
            return Err(io::Error::other(format!(
                "still being written ({} -> {} bytes)",
                before.len, after.len
            )));
        }
        Ok(())
    }
}

/// Opens `path` for reading, refusing to share it with writers where the
/// platform supports share modes.
async fn open_exclusive(path: &Path) -> io::Result<tokio::fs::File> {
    let mut options = std::fs::OpenOptions::new();
    options.read(true);

    #[cfg(windows)]
    {
        use std::os::windows::fs::OpenOptionsExt;
        const FILE_SHARE_READ: u32 = 0x0000_0001;
        options.share_mode(FILE_SHARE_READ);
    }

    tokio::fs::OpenOptions::from(options).open(path).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;
    use tokio::time::Instant;

    fn gate(attempts: u32, delay_secs: u64) -> ReadinessGate {
        ReadinessGate::new(
            ReadinessConfig::default()
                .with_max_attempts(attempts)
                .with_retry_delay(Duration::from_secs(delay_secs))
                .with_settle(Duration::ZERO),
        )
    }

    #[tokio::test(start_paused = true)]
    async fn test_existing_file_is_ready_on_first_attempt() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("report.xml");
        std::fs::write(&path, b"<report/>").unwrap();

        let start = Instant::now();
        let check = gate(5, 3).check(&path).await;

        assert_eq!(
            check,
            ReadinessCheck {
                ready: true,
                attempts: 1
            }
        );
        assert_eq!(start.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_missing_file_exhausts_budget() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("never.xml");

        let start = Instant::now();
        let check = gate(5, 3).check(&path).await;

        assert!(!check.ready);
        assert_eq!(check.attempts, 5);
        // Four delays separate five attempts.
        assert_eq!(start.elapsed(), Duration::from_secs(12));
    }

    #[tokio::test(start_paused = true)]
    async fn test_file_appearing_mid_check_is_ready() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("late.xml");

        let writer_path = path.clone();
        let writer = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(4)).await;
            std::fs::write(&writer_path, b"done").unwrap();
        });

        let start = Instant::now();
        let check = gate(5, 3).check(&path).await;
        writer.await.unwrap();

        assert!(check.ready);
        assert_eq!(check.attempts, 3);
        assert_eq!(start.elapsed(), Duration::from_secs(6));
    }

    #[tokio::test(start_paused = true)]
    async fn test_is_ready_matches_check() {
        let dir = TempDir::new().unwrap();
        assert!(!gate(2, 1).is_ready(&dir.path().join("missing")).await);

        let path = dir.path().join("present");
        std::fs::write(&path, b"x").unwrap();
        assert!(gate(2, 1).is_ready(&path).await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_settled_file_costs_one_settle_period() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("quiet.xml");
        std::fs::write(&path, b"<report/>").unwrap();

        let gate = ReadinessGate::new(
            ReadinessConfig::default()
                .with_max_attempts(3)
                .with_retry_delay(Duration::from_secs(1))
                .with_settle(Duration::from_secs(1)),
        );

        let start = Instant::now();
        let check = gate.check(&path).await;

        assert!(check.ready);
        assert_eq!(check.attempts, 1);
        assert_eq!(start.elapsed(), Duration::from_secs(1));
    }

    #[tokio::test(start_paused = true)]
    async fn test_growing_file_is_not_ready_until_quiet() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("growing.xml");
        std::fs::write(&path, vec![b'a'; 1000]).unwrap();

        // Second half lands inside the first settle period.
        let writer_path = path.clone();
        let writer = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(500)).await;
            use std::io::Write;
            let mut file = std::fs::OpenOptions::new()
                .append(true)
                .open(&writer_path)
                .unwrap();
            file.write_all(&[b'b'; 1000]).unwrap();
        });

        let gate = ReadinessGate::new(
            ReadinessConfig::default()
                .with_max_attempts(5)
                .with_retry_delay(Duration::from_secs(1))
                .with_settle(Duration::from_secs(1)),
        );

        let start = Instant::now();
        let check = gate.check(&path).await;
        writer.await.unwrap();

        assert!(check.ready);
        assert_eq!(check.attempts, 2);
        // settle, delay, settle
        assert_eq!(start.elapsed(), Duration::from_secs(3));
        assert_eq!(std::fs::metadata(&path).unwrap().len(), 2000);
    }

    #[tokio::test(start_paused = true)]
    async fn test_file_that_keeps_growing_exhausts_budget() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("stream.log");
        std::fs::write(&path, b"x").unwrap();

        let writer_path = path.clone();
        let writer = tokio::spawn(async move {
            use std::io::Write;
            for _ in 0..20 {
                tokio::time::sleep(Duration::from_millis(300)).await;
                let mut file = std::fs::OpenOptions::new()
                    .append(true)
                    .open(&writer_path)
                    .unwrap();
                file.write_all(b"x").unwrap();
            }
        });

        let gate = ReadinessGate::new(
            ReadinessConfig::default()
                .with_max_attempts(3)
                .with_retry_delay(Duration::from_millis(500))
                .with_settle(Duration::from_secs(1)),
        );

        let check = gate.check(&path).await;
        writer.abort();

        assert!(!check.ready);
        assert_eq!(check.attempts, 3);
    }
}
