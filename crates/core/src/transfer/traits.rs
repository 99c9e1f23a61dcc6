//! Capabilities the transfer pipeline consumes.

use std::sync::Arc;

use async_trait::async_trait;

use super::error::TransportError;
use super::types::{FilePart, TransportResponse};

/// An authenticated HTTP channel to the ingestion endpoint.
///
/// Resources are relative to the endpoint's base URL. Any HTTP status is
/// returned as a response; errors are reserved for requests that produced no
/// status at all.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    /// GET `resource`.
    async fn get(&self, resource: &str) -> Result<TransportResponse, TransportError>;

    /// POST `part` as a multipart form to `resource`.
    async fn post_file(
        &self,
        resource: &str,
        part: FilePart,
    ) -> Result<TransportResponse, TransportError>;
}

/// Opens independent [`HttpTransport`] channels.
///
/// Every file transfer and every heartbeat probe gets its own channel, so no
/// session state is shared between them.
pub trait Connector: Send + Sync {
    /// Returns the name of this connector implementation.
    fn name(&self) -> &str;

    /// Opens a fresh channel.
    fn connect(&self) -> Result<Arc<dyn HttpTransport>, TransportError>;
}
