use std::path::PathBuf;

use async_trait::async_trait;
use thiserror::Error;

use super::types::ClientCredential;

#[derive(Debug, Error)]
pub enum CredentialError {
    #[error("Certificate store not found: {path}")]
    StoreNotFound { path: PathBuf },

    #[error("No certificate with serial number {serial} in {store}")]
    NotFound { serial: String, store: PathBuf },

    #[error("Certificate {path} is not a usable identity: {reason}")]
    Invalid { path: PathBuf, reason: String },

    #[error("Configuration error: {0}")]
    ConfigurationError(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Source of the client identity presented to the ingestion endpoint.
#[async_trait]
pub trait CertificateProvider: Send + Sync {
    /// Look up the configured certificate.
    async fn get_credential(&self) -> Result<ClientCredential, CredentialError>;

    /// Name of this provider
    fn provider_name(&self) -> &'static str;
}
