//! Depth-based routing resolution.

use std::ffi::OsStr;
use std::path::{Component, Path, PathBuf};

use tracing::debug;

use crate::config::RoutingDefaults;

use super::descriptor::{PathLayout, RoutingDescriptor, RoutingSource};
use super::error::ResolveError;

/// Segments below the root for `<organisation>/<program>/<format>/<file>`.
const DEPTH_WITHOUT_VERSION: usize = 4;
/// Segments below the root for `<organisation>/<program>/<format>/<version>/<file>`.
const DEPTH_WITH_VERSION: usize = 5;

/// Maps a file's location below the watched root to a [`RoutingDescriptor`].
#[derive(Debug, Clone)]
pub struct MetadataResolver {
    root: PathBuf,
    defaults: RoutingDefaults,
}

impl MetadataResolver {
    pub fn new(root: impl Into<PathBuf>, defaults: RoutingDefaults) -> Self {
        Self {
            root: root.into(),
            defaults,
        }
    }

    /// The watched root depths are measured from.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Derives the routing descriptor for `full_path`.
    ///
    /// Pure function of the path and the configured defaults; the file itself
    /// is never touched.
    pub fn resolve(&self, full_path: &Path) -> Result<RoutingDescriptor, ResolveError> {
        let relative = full_path
            .strip_prefix(&self.root)
            .map_err(|_| ResolveError::OutsideRoot {
                path: full_path.to_path_buf(),
                root: self.root.clone(),
            })?;

        let mut segments = Vec::new();
        for (index, component) in relative.components().enumerate() {
            match component {
                Component::Normal(name) => segments.push(name),
                _ => {
                    return Err(ResolveError::UnreadableSegment {
                        path: full_path.to_path_buf(),
                        index,
                    })
                }
            }
        }

        let Some(file_name) = segments.last() else {
            return Err(ResolveError::MissingFileName {
                path: full_path.to_path_buf(),
            });
        };
        let file_name = segment_str(full_path, segments.len() - 1, file_name)?;

        let descriptor = match segments.len() {
            DEPTH_WITHOUT_VERSION => RoutingDescriptor::new(
                segment_str(full_path, 0, segments[0])?,
                segment_str(full_path, 1, segments[1])?,
                segment_str(full_path, 2, segments[2])?,
                None,
                None,
                file_name,
                full_path.to_path_buf(),
                RoutingSource::Path(PathLayout::WithoutVersion),
            ),
            DEPTH_WITH_VERSION => RoutingDescriptor::new(
                segment_str(full_path, 0, segments[0])?,
                segment_str(full_path, 1, segments[1])?,
                segment_str(full_path, 2, segments[2])?,
                Some(segment_str(full_path, 3, segments[3])?),
                None,
                file_name,
                full_path.to_path_buf(),
                RoutingSource::Path(PathLayout::WithVersion),
            ),
            depth => {
                debug!(
                    "{} is {} segments below the root, using configured routing",
                    full_path.display(),
                    depth
                );
                self.from_defaults(full_path, file_name)?
            }
        };

        Ok(descriptor)
    }

    fn from_defaults(
        &self,
        full_path: &Path,
        file_name: String,
    ) -> Result<RoutingDescriptor, ResolveError> {
        let required = |field: &'static str, value: &Option<String>| {
            value
                .as_deref()
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(str::to_string)
                .ok_or_else(|| ResolveError::MissingDefault {
                    field,
                    path: full_path.to_path_buf(),
                })
        };
        let optional = |value: &Option<String>| {
            value
                .as_deref()
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(str::to_string)
        };

        Ok(RoutingDescriptor::new(
            required("organisation_number", &self.defaults.organisation_number)?,
            required("statistical_program", &self.defaults.statistical_program)?,
            required("file_format", &self.defaults.file_format)?,
            optional(&self.defaults.version),
            optional(&self.defaults.reference_period),
            file_name,
            full_path.to_path_buf(),
            RoutingSource::Config,
        ))
    }
}

fn segment_str(full_path: &Path, index: usize, segment: &OsStr) -> Result<String, ResolveError> {
    segment
        .to_str()
        .filter(|s| !s.trim().is_empty())
        .map(str::to_string)
        .ok_or_else(|| ResolveError::UnreadableSegment {
            path: full_path.to_path_buf(),
            index,
        })
}
