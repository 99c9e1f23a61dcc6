//! Periodic liveness probe, independent of file transfers.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::transfer::Connector;

use super::HeartbeatConfig;

/// Counters reported by [`HeartbeatTicker::status`].
#[derive(Debug, Clone, Default, Serialize)]
pub struct HeartbeatStatus {
    pub running: bool,
    pub probes: u64,
    pub failures: u64,
}

#[derive(Default)]
struct Counters {
    probes: AtomicU64,
    failures: AtomicU64,
}

/// A running tick loop and the token that stops it.
struct TickTask {
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

/// Probes the endpoint's liveness resource on a fixed interval.
///
/// Each probe opens its own channel, so a probe may overlap an in-flight
/// upload. The ticker only logs; it never touches files. It can be started
/// again after [`stop`](Self::stop); counters keep accumulating.
pub struct HeartbeatTicker {
    config: HeartbeatConfig,
    connector: Arc<dyn Connector>,
    ping_resource: String,
    running: Arc<AtomicBool>,
    counters: Arc<Counters>,
    task: Mutex<Option<TickTask>>,
}

impl HeartbeatTicker {
    pub fn new(
        config: HeartbeatConfig,
        connector: Arc<dyn Connector>,
        ping_resource: impl Into<String>,
    ) -> Self {
        Self {
            config,
            connector,
            ping_resource: ping_resource.into(),
            running: Arc::new(AtomicBool::new(false)),
            counters: Arc::new(Counters::default()),
            task: Mutex::new(None),
        }
    }

    /// Start the ticker (spawns a background task).
    pub async fn start(&self) {
        if self.running.swap(true, Ordering::SeqCst) {
            warn!("Heartbeat already running");
            return;
        }

        let connector = Arc::clone(&self.connector);
        let resource = self.ping_resource.clone();
        let counters = Arc::clone(&self.counters);
        let cancel = CancellationToken::new();
        let task_cancel = cancel.clone();
        let interval = Duration::from_millis(self.config.interval_ms.max(1));

        info!(interval_ms = self.config.interval_ms, "Starting heartbeat");
        let handle = tokio::spawn(async move {
            let cancel = task_cancel;
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => {
                        debug!("Heartbeat received shutdown signal");
                        break;
                    }
                    _ = tokio::time::sleep(interval) => {
                        let alive = tokio::select! {
                            _ = cancel.cancelled() => break,
                            alive = probe_once(connector.as_ref(), &resource) => alive,
                        };
                        counters.probes.fetch_add(1, Ordering::Relaxed);
                        if !alive {
                            counters.failures.fetch_add(1, Ordering::Relaxed);
                        }
                    }
                }
            }
            info!("Heartbeat stopped");
        });

        *self.task.lock().await = Some(TickTask { cancel, handle });
    }

    /// Stop the ticker and wait for its task to finish.
    pub async fn stop(&self) {
        if !self.running.swap(false, Ordering::SeqCst) {
            return;
        }

        if let Some(task) = self.task.lock().await.take() {
            task.cancel.cancel();
            if let Err(e) = task.handle.await {
                warn!(error = %e, "Heartbeat task ended abnormally");
            }
        }
    }

    pub fn status(&self) -> HeartbeatStatus {
        HeartbeatStatus {
            running: self.running.load(Ordering::SeqCst),
            probes: self.counters.probes.load(Ordering::Relaxed),
            failures: self.counters.failures.load(Ordering::Relaxed),
        }
    }
}

/// Sends one liveness GET over a fresh channel. Returns whether it got a 2xx.
pub async fn probe_once(connector: &dyn Connector, resource: &str) -> bool {
    let transport = match connector.connect() {
        Ok(transport) => transport,
        Err(e) => {
            warn!(error = %e, "Heartbeat could not open channel");
            return false;
        }
    };

    match transport.get(resource).await {
        Ok(response) if response.is_success() => {
            debug!(status = response.status, "Heartbeat OK");
            true
        }
        Ok(response) => {
            warn!(status = response.status, "Heartbeat failed");
            false
        }
        Err(e) => {
            warn!(error = %e, "Heartbeat failed");
            false
        }
    }
}
