//! The delivery loop: one file at a time from the queue, through the
//! upload, into the archive.

mod error;
mod runner;
mod types;

pub use error::CourierError;
pub use runner::Courier;
pub use types::{CourierStats, FileDisposition};
