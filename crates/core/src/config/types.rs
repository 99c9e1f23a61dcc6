use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::archive::ArchiveConfig;
use crate::heartbeat::HeartbeatConfig;
use crate::transfer::TransferConfig;
use crate::watcher::ReadinessConfig;

/// Root configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    pub watcher: WatcherConfig,
    #[serde(default)]
    pub readiness: ReadinessConfig,
    pub endpoint: EndpointConfig,
    #[serde(default)]
    pub transfer: TransferConfig,
    pub certificate: CertificateConfig,
    #[serde(default)]
    pub routing: RoutingDefaults,
    pub archive: ArchiveConfig,
    #[serde(default)]
    pub heartbeat: HeartbeatConfig,
}

/// Watched inbox configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct WatcherConfig {
    /// Root directory producers drop files into.
    pub read_dir: PathBuf,
    /// Enqueue files already present under the root when the service starts.
    #[serde(default)]
    pub scan_existing_on_start: bool,
}

/// Remote ingestion endpoint configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EndpointConfig {
    /// Base URL all resources are relative to (e.g., "https://ingest.example.org/api/")
    pub base_url: String,
    /// Liveness resource, relative to the base URL.
    #[serde(default = "default_ping_resource")]
    pub ping_resource: String,
    /// Chunk upload resource template, relative to the base URL.
    #[serde(default = "default_upload_resource")]
    pub upload_resource: String,
    /// Per-request timeout in seconds (default: 30 minutes)
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
    /// Skip server certificate validation. Only for local proxy testing.
    #[serde(default)]
    pub accept_invalid_certs: bool,
}

fn default_ping_resource() -> String {
    "heartbeat".to_string()
}

fn default_upload_resource() -> String {
    "file/{segment}/{organisationNumber}/{statisticalProgram}/{referencePeriod}/{fileFormat}/{fileName}/{version}"
        .to_string()
}

fn default_request_timeout() -> u64 {
    30 * 60
}

/// Client certificate selection
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CertificateConfig {
    /// Serial number of the client certificate to present.
    pub serial_number: String,
    /// Directory holding `<serial>.pem` bundles (certificate chain + private key).
    pub store_dir: PathBuf,
}

/// Routing fields used when a file's location does not encode them.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RoutingDefaults {
    #[serde(default)]
    pub organisation_number: Option<String>,
    #[serde(default)]
    pub statistical_program: Option<String>,
    #[serde(default)]
    pub file_format: Option<String>,
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub reference_period: Option<String>,
}

/// Sanitized config for startup logging (certificate serial redacted)
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedConfig {
    pub watcher: WatcherConfig,
    pub readiness: ReadinessConfig,
    pub endpoint: EndpointConfig,
    pub transfer: TransferConfig,
    pub certificate: SanitizedCertificateConfig,
    pub routing: RoutingDefaults,
    pub archive: ArchiveConfig,
    pub heartbeat: HeartbeatConfig,
}

/// Sanitized certificate config (serial number hidden)
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedCertificateConfig {
    pub serial_number_configured: bool,
    pub store_dir: PathBuf,
}

impl From<&Config> for SanitizedConfig {
    fn from(config: &Config) -> Self {
        Self {
            watcher: config.watcher.clone(),
            readiness: config.readiness.clone(),
            endpoint: config.endpoint.clone(),
            transfer: config.transfer.clone(),
            certificate: SanitizedCertificateConfig {
                serial_number_configured: !config.certificate.serial_number.trim().is_empty(),
                store_dir: config.certificate.store_dir.clone(),
            },
            routing: config.routing.clone(),
            archive: config.archive.clone(),
            heartbeat: config.heartbeat.clone(),
        }
    }
}
