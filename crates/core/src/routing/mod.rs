//! Routing metadata derived from where a file was dropped.
//!
//! Producers encode the delivery target in the directory layout below the
//! watched root. Two layouts are recognized, selected purely by depth:
//!
//! ```text
//! <root>/<organisation>/<program>/<format>/<file>
//! <root>/<organisation>/<program>/<format>/<version>/<file>
//! ```
//!
//! Any other depth takes every routing field from the `[routing]` config
//! section instead. Path-derived and configured fields are never mixed for a
//! single file.

mod descriptor;
mod error;
mod resolver;

pub use descriptor::{PathLayout, RoutingDescriptor, RoutingSource};
pub use error::ResolveError;
pub use resolver::MetadataResolver;
