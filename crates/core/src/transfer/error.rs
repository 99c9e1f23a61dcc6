//! Error types for the transfer module.

use thiserror::Error;

/// Errors raised while talking to the ingestion endpoint.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Request failed: {0}")]
    RequestFailed(String),

    #[error("Request timeout")]
    Timeout,

    #[error("Request cancelled")]
    Cancelled,

    #[error("Invalid client identity: {0}")]
    InvalidIdentity(String),

    #[error("Failed to build HTTP client: {0}")]
    ClientBuild(String),
}

/// Errors in a resource template.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TemplateError {
    /// A `{name}` placeholder that no routing field provides.
    #[error("Unknown placeholder {{{0}}}")]
    UnknownPlaceholder(String),

    /// A placeholder every upload resource must contain.
    #[error("Missing required placeholder {{{0}}}")]
    MissingPlaceholder(&'static str),

    /// A `{` without a matching `}` or a stray `}`.
    #[error("Unbalanced brace at byte {0}")]
    UnbalancedBrace(usize),
}
