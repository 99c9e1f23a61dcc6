//! Upload protocol for a single file.

use std::future::Future;
use std::sync::Arc;

use tokio::io::{AsyncRead, AsyncReadExt};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::routing::RoutingDescriptor;

use super::{
    parse_delivery_id, ChunkPlan, ChunkPolicy, Connector, FilePart, HttpTransport,
    ResourceFields, ResourceTemplate, TransferConfig, TransferOutcome, TransferState,
    TransportError, TransportResponse, FINALIZE_SEGMENT,
};

/// Drives one file through heartbeat check, sequential chunk uploads and the
/// finalize call.
///
/// Every run opens its own channel through the [`Connector`]. The caller is
/// responsible for only running one file at a time.
pub struct TransferOrchestrator {
    connector: Arc<dyn Connector>,
    ping_resource: String,
    template: ResourceTemplate,
    config: TransferConfig,
}

impl TransferOrchestrator {
    pub fn new(
        connector: Arc<dyn Connector>,
        ping_resource: impl Into<String>,
        template: ResourceTemplate,
        config: TransferConfig,
    ) -> Self {
        Self {
            connector,
            ping_resource: ping_resource.into(),
            template,
            config,
        }
    }

    pub fn config(&self) -> &TransferConfig {
        &self.config
    }

    /// Uploads `total_len` bytes read from `source` under `descriptor`'s key.
    ///
    /// Never returns an error: every failure mode is folded into the returned
    /// outcome's terminal state.
    pub async fn run<R>(
        &self,
        descriptor: &RoutingDescriptor,
        source: &mut R,
        total_len: u64,
        cancel: &CancellationToken,
    ) -> TransferOutcome
    where
        R: AsyncRead + Unpin + Send,
    {
        let mut outcome = TransferOutcome::new();

        transition(&mut outcome, TransferState::HeartbeatCheck);
        let transport = match self.connector.connect() {
            Ok(transport) => transport,
            Err(e) => {
                warn!(connector = self.connector.name(), error = %e, "Could not open channel, skipping upload");
                transition(&mut outcome, TransferState::Aborted);
                return outcome;
            }
        };

        match guarded(cancel, transport.get(&self.ping_resource)).await {
            Ok(response) if response.is_success() => {
                debug!(status = response.status, "Endpoint is alive");
            }
            Ok(response) => {
                warn!(status = response.status, "Heartbeat check failed, skipping upload");
                transition(&mut outcome, TransferState::Aborted);
                return outcome;
            }
            Err(e) => {
                warn!(error = %e, "Heartbeat check failed, skipping upload");
                transition(&mut outcome, TransferState::Aborted);
                return outcome;
            }
        }

        transition(&mut outcome, TransferState::ChunkLoop);
        let plan = ChunkPlan::new(total_len, self.config.max_chunk_size);
        outcome.chunks_planned = plan.chunk_count();
        info!(
            bytes = total_len,
            chunks = outcome.chunks_planned,
            "Uploading"
        );

        for chunk in plan.chunks() {
            if cancel.is_cancelled() {
                warn!(segment = chunk.index, "Upload cancelled");
                transition(&mut outcome, TransferState::Failed);
                return outcome;
            }

            let mut bytes = vec![0u8; chunk.len as usize];
            if let Err(e) = source.read_exact(&mut bytes).await {
                error!(segment = chunk.index, error = %e, "Failed to read chunk from source");
                transition(&mut outcome, TransferState::Failed);
                return outcome;
            }

            let resource = self
                .template
                .render(&ResourceFields::for_descriptor(descriptor, chunk.index as i64));
            let result = self
                .post(transport.as_ref(), &resource, descriptor, bytes, cancel)
                .await;
            outcome.chunks_attempted += 1;

            match result {
                Ok(response) if response.is_success() => {
                    debug!(segment = chunk.index, bytes = chunk.len, "Chunk accepted");
                    if let Some(id) = parse_delivery_id(&response.body) {
                        outcome.delivery_id = Some(id);
                    }
                }
                Ok(response) => {
                    error!(segment = chunk.index, status = response.status, "Chunk rejected");
                    outcome.failed_segments.push(chunk.index);
                }
                Err(TransportError::Cancelled) => {
                    warn!(segment = chunk.index, "Upload cancelled");
                    outcome.failed_segments.push(chunk.index);
                    transition(&mut outcome, TransferState::Failed);
                    return outcome;
                }
                Err(e) => {
                    error!(segment = chunk.index, error = %e, "Chunk upload failed");
                    outcome.failed_segments.push(chunk.index);
                }
            }

            if !outcome.failed_segments.is_empty()
                && self.config.chunk_policy == ChunkPolicy::FailFast
            {
                transition(&mut outcome, TransferState::Failed);
                return outcome;
            }
        }

        transition(&mut outcome, TransferState::Finalize);
        let resource = self
            .template
            .render(&ResourceFields::for_descriptor(descriptor, FINALIZE_SEGMENT));
        match self
            .post(transport.as_ref(), &resource, descriptor, Vec::new(), cancel)
            .await
        {
            Ok(response) if response.is_success() => {
                outcome.finalized = true;
                if let Some(id) = parse_delivery_id(&response.body) {
                    outcome.delivery_id = Some(id);
                }
                debug!(delivery_id = ?outcome.delivery_id, "Finalize accepted");
            }
            Ok(response) => {
                error!(status = response.status, "Finalize rejected");
            }
            Err(e) => {
                error!(error = %e, "Finalize call failed");
            }
        }

        if outcome.finalized && outcome.failed_segments.is_empty() {
            info!(delivery_id = ?outcome.delivery_id, "Upload complete");
            transition(&mut outcome, TransferState::Success);
        } else {
            transition(&mut outcome, TransferState::Failed);
        }
        outcome
    }

    async fn post(
        &self,
        transport: &dyn HttpTransport,
        resource: &str,
        descriptor: &RoutingDescriptor,
        bytes: Vec<u8>,
        cancel: &CancellationToken,
    ) -> Result<TransportResponse, TransportError> {
        let part = FilePart {
            field_name: self.config.file_field_name.clone(),
            file_name: descriptor.file_name().to_string(),
            bytes,
        };
        guarded(cancel, transport.post_file(resource, part)).await
    }
}

fn transition(outcome: &mut TransferOutcome, next: TransferState) {
    debug!(from = outcome.state.as_str(), to = next.as_str(), "Transfer state");
    outcome.state = next;
}

async fn guarded<F>(
    cancel: &CancellationToken,
    request: F,
) -> Result<TransportResponse, TransportError>
where
    F: Future<Output = Result<TransportResponse, TransportError>>,
{
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(TransportError::Cancelled),
        result = request => result,
    }
}
