//! Testing utilities and mock implementations.
//!
//! Provides an in-memory ingestion endpoint so the transfer pipeline can be
//! exercised end to end without a server or certificates.
//!
//! # Example
//!
//! ```rust,ignore
//! use m2m_core::testing::MockConnector;
//!
//! let connector = MockConnector::new();
//! connector.transport().set_ping_status(503).await;
//!
//! // Hand Arc::new(connector.clone()) to a TransferOrchestrator...
//! ```

mod mock_transport;

pub use mock_transport::{MockConnector, MockTransport, RecordedMethod, RecordedRequest};

/// Test fixtures and helper functions.
pub mod fixtures {
    use std::path::{Path, PathBuf};

    /// Write `len` bytes of a repeating pattern to `root/<segments...>`,
    /// creating parent directories.
    pub fn inbox_file(root: &Path, segments: &[&str], len: usize) -> std::io::Result<PathBuf> {
        let path = segments.iter().fold(root.to_path_buf(), |p, s| p.join(s));
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&path, pattern(len))?;
        Ok(path)
    }

    /// Deterministic payload of `len` bytes.
    pub fn pattern(len: usize) -> Vec<u8> {
        (0..len).map(|i| (i % 251) as u8).collect()
    }
}
