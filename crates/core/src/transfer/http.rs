//! reqwest-backed transport with client-certificate authentication.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{multipart, Client, Identity};
use tracing::debug;

use crate::config::EndpointConfig;
use crate::credentials::ClientCredential;

use super::{Connector, FilePart, HttpTransport, TransportError, TransportResponse};

/// Opens a new mTLS client per channel.
///
/// Each client owns its own cookie jar and connection pool, so no session
/// survives from one file to the next.
pub struct ReqwestConnector {
    base_url: String,
    timeout: Duration,
    accept_invalid_certs: bool,
    identity_pem: Vec<u8>,
}

impl ReqwestConnector {
    /// Create a connector for `endpoint` presenting `credential`.
    ///
    /// Fails if the credential is not a usable PEM identity.
    pub fn new(
        endpoint: &EndpointConfig,
        credential: &ClientCredential,
    ) -> Result<Self, TransportError> {
        Identity::from_pem(&credential.pem)
            .map_err(|e| TransportError::InvalidIdentity(e.to_string()))?;

        Ok(Self {
            base_url: endpoint.base_url.trim_end_matches('/').to_string(),
            timeout: Duration::from_secs(endpoint.request_timeout_secs),
            accept_invalid_certs: endpoint.accept_invalid_certs,
            identity_pem: credential.pem.clone(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

impl Connector for ReqwestConnector {
    fn name(&self) -> &str {
        "reqwest"
    }

    fn connect(&self) -> Result<Arc<dyn HttpTransport>, TransportError> {
        let identity = Identity::from_pem(&self.identity_pem)
            .map_err(|e| TransportError::InvalidIdentity(e.to_string()))?;

        let client = Client::builder()
            .use_rustls_tls()
            .identity(identity)
            .timeout(self.timeout)
            .cookie_store(true)
            .danger_accept_invalid_certs(self.accept_invalid_certs)
            .build()
            .map_err(|e| TransportError::ClientBuild(e.to_string()))?;

        let transport: Arc<dyn HttpTransport> = Arc::new(ReqwestTransport {
            client,
            base_url: self.base_url.clone(),
        });
        Ok(transport)
    }
}

/// One channel opened by [`ReqwestConnector`].
pub struct ReqwestTransport {
    client: Client,
    base_url: String,
}

impl ReqwestTransport {
    fn url(&self, resource: &str) -> String {
        join_url(&self.base_url, resource)
    }

    async fn read_response(
        response: reqwest::Response,
    ) -> Result<TransportResponse, TransportError> {
        let status = response.status().as_u16();
        let body = response.text().await.map_err(map_send_error)?;
        Ok(TransportResponse { status, body })
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn get(&self, resource: &str) -> Result<TransportResponse, TransportError> {
        let url = self.url(resource);
        debug!(url = %url, "GET");

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(map_send_error)?;

        Self::read_response(response).await
    }

    async fn post_file(
        &self,
        resource: &str,
        part: FilePart,
    ) -> Result<TransportResponse, TransportError> {
        let url = self.url(resource);
        debug!(url = %url, bytes = part.bytes.len(), "POST");

        let file_part = multipart::Part::bytes(part.bytes)
            .file_name(part.file_name)
            .mime_str("application/octet-stream")
            .map_err(|e| TransportError::RequestFailed(e.to_string()))?;
        let form = multipart::Form::new().part(part.field_name, file_part);

        let response = self
            .client
            .post(&url)
            .multipart(form)
            .send()
            .await
            .map_err(map_send_error)?;

        Self::read_response(response).await
    }
}

fn map_send_error(e: reqwest::Error) -> TransportError {
    if e.is_timeout() {
        TransportError::Timeout
    } else if e.is_connect() {
        TransportError::ConnectionFailed(e.to_string())
    } else {
        TransportError::RequestFailed(e.to_string())
    }
}

/// Joins a base URL and a relative resource with exactly one slash.
fn join_url(base: &str, resource: &str) -> String {
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        resource.trim_start_matches('/')
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn endpoint() -> EndpointConfig {
        EndpointConfig {
            base_url: "https://ingest.example.org/api/".to_string(),
            ping_resource: "heartbeat".to_string(),
            upload_resource: "file/{segment}/{organisationNumber}/{statisticalProgram}/{fileFormat}/{fileName}"
                .to_string(),
            request_timeout_secs: 30,
            accept_invalid_certs: false,
        }
    }

    #[test]
    fn test_join_url() {
        assert_eq!(
            join_url("https://h/api/", "/heartbeat"),
            "https://h/api/heartbeat"
        );
        assert_eq!(join_url("https://h/api", "file/0/x"), "https://h/api/file/0/x");
    }

    #[test]
    fn test_connector_rejects_garbage_identity() {
        let credential = ClientCredential {
            serial_number: "01AB".to_string(),
            pem: b"not a certificate".to_vec(),
            source: PathBuf::from("/certs/01ab.pem"),
        };

        let result = ReqwestConnector::new(&endpoint(), &credential);
        assert!(matches!(result, Err(TransportError::InvalidIdentity(_))));
    }
}
