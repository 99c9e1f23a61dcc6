use std::path::{Component, Path, PathBuf};

use reqwest::Url;

use crate::transfer::ResourceTemplate;

use super::{types::Config, ConfigError};

/// Validate configuration
/// Currently validates:
/// - Readiness budget, chunk size and timeouts are non-zero
/// - Base URL is an absolute http(s) URL
/// - Upload resource template parses
/// - A certificate serial number is configured
/// - The done directory is not inside the watched root
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if config.readiness.max_attempts == 0 {
        return Err(ConfigError::ValidationError(
            "readiness.max_attempts cannot be 0".to_string(),
        ));
    }

    if config.transfer.max_chunk_size == 0 {
        return Err(ConfigError::ValidationError(
            "transfer.max_chunk_size cannot be 0".to_string(),
        ));
    }

    if config.transfer.file_field_name.trim().is_empty() {
        return Err(ConfigError::ValidationError(
            "transfer.file_field_name cannot be empty".to_string(),
        ));
    }

    if config.endpoint.request_timeout_secs == 0 {
        return Err(ConfigError::ValidationError(
            "endpoint.request_timeout_secs cannot be 0".to_string(),
        ));
    }

    if config.heartbeat.enabled && config.heartbeat.interval_ms == 0 {
        return Err(ConfigError::ValidationError(
            "heartbeat.interval_ms cannot be 0 when the heartbeat is enabled".to_string(),
        ));
    }

    let base_url = Url::parse(&config.endpoint.base_url).map_err(|e| {
        ConfigError::ValidationError(format!(
            "endpoint.base_url '{}' is not a valid URL: {}",
            config.endpoint.base_url, e
        ))
    })?;
    if !matches!(base_url.scheme(), "http" | "https") {
        return Err(ConfigError::ValidationError(format!(
            "endpoint.base_url must use http or https, got '{}'",
            base_url.scheme()
        )));
    }

    ResourceTemplate::parse(&config.endpoint.upload_resource).map_err(|e| {
        ConfigError::ValidationError(format!("endpoint.upload_resource: {}", e))
    })?;

    if config.certificate.serial_number.trim().is_empty() {
        return Err(ConfigError::ValidationError(
            "certificate.serial_number cannot be empty".to_string(),
        ));
    }

    let done_dir = normalize_path(&config.archive.done_dir);
    if done_dir.starts_with(normalize_path(&config.watcher.read_dir)) {
        return Err(ConfigError::ValidationError(format!(
            "archive.done_dir {} must not be inside watcher.read_dir {}",
            config.archive.done_dir.display(),
            config.watcher.read_dir.display()
        )));
    }

    Ok(())
}

/// Makes `path` absolute, folds `.` and `..` and resolves symlinks in the
/// longest prefix that exists. Paths that do not exist yet still compare
/// correctly against ones that do.
fn normalize_path(path: &Path) -> PathBuf {
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        match std::env::current_dir() {
            Ok(cwd) => cwd.join(path),
            Err(_) => path.to_path_buf(),
        }
    };

    let mut lexical = PathBuf::new();
    for component in absolute.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                lexical.pop();
            }
            other => lexical.push(other),
        }
    }

    let mut existing = lexical.clone();
    let mut missing = Vec::new();
    loop {
        if let Ok(canonical) = existing.canonicalize() {
            return missing
                .iter()
                .rev()
                .fold(canonical, |acc: PathBuf, name| acc.join(name));
        }
        match existing.file_name() {
            Some(name) => {
                missing.push(name.to_os_string());
                existing.pop();
            }
            None => return lexical,
        }
    }
}
