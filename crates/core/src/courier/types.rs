//! Types for the courier module.

use serde::Serialize;
use std::path::PathBuf;

use crate::transfer::{TransferOutcome, TransferState};

/// What happened to one file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileDisposition {
    /// Uploaded and moved into the done directory.
    Archived {
        path: PathBuf,
        outcome: TransferOutcome,
    },
    /// Not delivered; the file stays in the inbox.
    LeftInPlace(TransferOutcome),
}

impl FileDisposition {
    pub fn outcome(&self) -> &TransferOutcome {
        match self {
            FileDisposition::Archived { outcome, .. } => outcome,
            FileDisposition::LeftInPlace(outcome) => outcome,
        }
    }
}

/// Totals for a courier run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CourierStats {
    /// Files uploaded and archived.
    pub archived: u64,
    /// Files skipped because the endpoint failed its liveness check.
    pub aborted: u64,
    /// Files whose upload failed.
    pub failed: u64,
    /// Files that hit an error outside the upload, or panicked.
    pub errors: u64,
}

impl CourierStats {
    pub(crate) fn record(&mut self, disposition: &FileDisposition) {
        match disposition {
            FileDisposition::Archived { .. } => self.archived += 1,
            FileDisposition::LeftInPlace(outcome) => match outcome.state {
                TransferState::Aborted => self.aborted += 1,
                _ => self.failed += 1,
            },
        }
    }

    /// Files taken off the queue.
    pub fn total(&self) -> u64 {
        self.archived + self.aborted + self.failed + self.errors
    }
}
