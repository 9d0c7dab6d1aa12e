//! Outcome of a batch of independent deletions.

use serde::Serialize;

/// An entry that could not be deleted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailedEntry {
    pub name: String,
    pub reason: String,
}

/// Which entries of a batch were deleted and which failed, in attempt order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BatchReport {
    pub deleted: Vec<String>,
    pub failed: Vec<FailedEntry>,
}

/// Result of a retention purge.
pub type PurgeReport = BatchReport;

/// Result of removing displaced copies.
pub type CleanReport = BatchReport;

impl BatchReport {
    pub fn record_deleted(&mut self, name: impl Into<String>) {
        self.deleted.push(name.into());
    }

    pub fn record_failed(&mut self, name: impl Into<String>, reason: impl ToString) {
        self.failed.push(FailedEntry {
            name: name.into(),
            reason: reason.to_string(),
        });
    }

    /// True when nothing failed.
    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }

    /// Number of entries attempted.
    pub fn attempted(&self) -> usize {
        self.deleted.len() + self.failed.len()
    }
}
