//! Client certificate lookup.

mod directory;
mod traits;
mod types;

pub use directory::*;
pub use traits::*;
pub use types::*;

use crate::config::CertificateConfig;

/// Factory function to create a certificate provider from config
pub fn create_certificate_provider(
    config: &CertificateConfig,
) -> Result<Box<dyn CertificateProvider>, CredentialError> {
    let serial = normalize_serial(&config.serial_number);
    if serial.is_empty() {
        return Err(CredentialError::ConfigurationError(
            "certificate.serial_number must be set".to_string(),
        ));
    }
    Ok(Box::new(DirectoryCertificateStore::new(
        config.store_dir.clone(),
        config.serial_number.clone(),
    )))
}
