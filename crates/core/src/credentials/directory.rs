//! Certificate store backed by a directory of PEM bundles.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::{debug, info};

use super::{normalize_serial, CertificateProvider, ClientCredential, CredentialError};

/// Looks up `<serial>.pem` in a directory.
///
/// File stems are compared with the configured serial after normalization,
/// so `01-ab.pem` does not match but `01:AB.pem` and `01ab.pem` do. The
/// bundle must hold both a certificate and a private key.
pub struct DirectoryCertificateStore {
    store_dir: PathBuf,
    serial_number: String,
}

impl DirectoryCertificateStore {
    pub fn new(store_dir: impl Into<PathBuf>, serial_number: impl Into<String>) -> Self {
        Self {
            store_dir: store_dir.into(),
            serial_number: serial_number.into(),
        }
    }

    pub fn store_dir(&self) -> &Path {
        &self.store_dir
    }

    async fn find(&self, wanted: &str) -> Result<Option<PathBuf>, CredentialError> {
        let mut entries = tokio::fs::read_dir(&self.store_dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            let is_pem = path
                .extension()
                .and_then(|e| e.to_str())
                .is_some_and(|e| e.eq_ignore_ascii_case("pem"));
            if !is_pem || !entry.file_type().await?.is_file() {
                continue;
            }
            let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            if normalize_serial(stem) == wanted {
                return Ok(Some(path));
            }
        }
        Ok(None)
    }
}

#[async_trait]
impl CertificateProvider for DirectoryCertificateStore {
    async fn get_credential(&self) -> Result<ClientCredential, CredentialError> {
        if !self.store_dir.is_dir() {
            return Err(CredentialError::StoreNotFound {
                path: self.store_dir.clone(),
            });
        }

        let wanted = normalize_serial(&self.serial_number);
        debug!(store = %self.store_dir.display(), serial = %wanted, "Looking up client certificate");

        let path = self
            .find(&wanted)
            .await?
            .ok_or_else(|| CredentialError::NotFound {
                serial: wanted.clone(),
                store: self.store_dir.clone(),
            })?;

        let pem = tokio::fs::read(&path).await?;
        check_bundle(&path, &pem)?;

        info!(path = %path.display(), "Loaded client certificate");
        Ok(ClientCredential {
            serial_number: wanted,
            pem,
            source: path,
        })
    }

    fn provider_name(&self) -> &'static str {
        "directory"
    }
}

fn check_bundle(path: &Path, pem: &[u8]) -> Result<(), CredentialError> {
    let text = String::from_utf8_lossy(pem);
    let invalid = |reason: &str| CredentialError::Invalid {
        path: path.to_path_buf(),
        reason: reason.to_string(),
    };
    if !text.contains("-----BEGIN CERTIFICATE-----") {
        return Err(invalid("no certificate block"));
    }
    if !text.contains("PRIVATE KEY-----") {
        return Err(invalid("no private key block"));
    }
    Ok(())
}
