//! The immutable routing descriptor handed to a transfer.

use serde::Serialize;
use std::path::{Path, PathBuf};

/// Directory layout a descriptor was decoded from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PathLayout {
    /// `<organisation>/<program>/<format>/<file>`
    WithoutVersion,
    /// `<organisation>/<program>/<format>/<version>/<file>`
    WithVersion,
}

/// Where the routing fields of a descriptor came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "layout", rename_all = "snake_case")]
pub enum RoutingSource {
    /// Every routing field was decoded from the directory layout.
    Path(PathLayout),
    /// Every routing field came from the `[routing]` config section.
    Config,
}

/// Routing fields for exactly one detected file.
///
/// Built once by the resolver and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RoutingDescriptor {
    organisation_number: String,
    statistical_program: String,
    file_format: String,
    version: Option<String>,
    reference_period: Option<String>,
    file_name: String,
    source_path: PathBuf,
    source: RoutingSource,
}

impl RoutingDescriptor {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        organisation_number: String,
        statistical_program: String,
        file_format: String,
        version: Option<String>,
        reference_period: Option<String>,
        file_name: String,
        source_path: PathBuf,
        source: RoutingSource,
    ) -> Self {
        Self {
            organisation_number,
            statistical_program,
            file_format,
            version,
            reference_period,
            file_name,
            source_path,
            source,
        }
    }

    pub fn organisation_number(&self) -> &str {
        &self.organisation_number
    }

    pub fn statistical_program(&self) -> &str {
        &self.statistical_program
    }

    pub fn file_format(&self) -> &str {
        &self.file_format
    }

    pub fn version(&self) -> Option<&str> {
        self.version.as_deref()
    }

    pub fn reference_period(&self) -> Option<&str> {
        self.reference_period.as_deref()
    }

    /// File name as sent in the multipart body and the resource path.
    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    /// Absolute path of the file in the inbox.
    pub fn source_path(&self) -> &Path {
        &self.source_path
    }

    pub fn source(&self) -> RoutingSource {
        self.source
    }
}
