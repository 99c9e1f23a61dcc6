//! Chunked upload of one file to the ingestion endpoint.
//!
//! A transfer checks endpoint liveness, posts the file in ordered segments,
//! then sends an empty finalize call at [`FINALIZE_SEGMENT`]. The verdict is a
//! [`TransferOutcome`]; only a successful outcome allows the file to be archived.

mod config;
mod error;
mod http;
mod orchestrator;
mod plan;
mod template;
mod traits;
mod types;

pub use config::{ChunkPolicy, TransferConfig};
pub use error::{TemplateError, TransportError};
pub use http::{ReqwestConnector, ReqwestTransport};
pub use orchestrator::TransferOrchestrator;
pub use plan::{Chunk, ChunkPlan, FINALIZE_SEGMENT};
pub use template::{Placeholder, ResourceFields, ResourceTemplate};
pub use traits::{Connector, HttpTransport};
pub use types::{parse_delivery_id, FilePart, TransferOutcome, TransferState, TransportResponse};
