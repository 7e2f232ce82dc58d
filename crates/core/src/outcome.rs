//! Bulk write results.
//!
//! [`WriteOutcome`] is what a backend reports for one submitted document.
//! [`BatchOutcome`] is the aggregate returned to the client for a whole
//! payload.

use serde::{Deserialize, Serialize};

/// Result of writing a single document, as reported by the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WriteOutcome {
    /// A new document was stored.
    Created,
    /// An existing document was merged or overwritten.
    Updated,
    /// The key already exists; nothing was written.
    Conflict {
        /// Backend description of the conflict.
        message: String,
    },
    /// The backend rejected this item for another reason.
    Failed {
        /// Backend description of the failure.
        message: String,
    },
}

/// Aggregate counters for one bulk payload.
///
/// `created + updated + ignored + errors + empty` always equals the number of
/// lines in the payload.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchOutcome {
    /// Documents stored as new.
    pub created: u64,
    /// Documents that replaced or were merged into an existing one.
    pub updated: u64,
    /// Duplicates skipped under the `ignore` policy.
    pub ignored: u64,
    /// Documents that could not be written.
    pub errors: u64,
    /// Blank lines in the payload.
    pub empty: u64,
    /// True when any document in the batch failed.
    pub error: bool,
    /// One entry per failed document, present only when requested.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<Vec<String>>,
}

impl BatchOutcome {
    /// Create an empty outcome; `details` is collected only when `show_details`.
    pub fn new(show_details: bool) -> Self {
        Self {
            details: show_details.then(Vec::new),
            ..Self::default()
        }
    }

    /// Record a failed document, with a detail line if details are collected.
    pub fn record_error(&mut self, line: usize, message: &str, offending: &str) {
        self.errors += 1;
        self.error = true;
        if let Some(details) = self.details.as_mut() {
            details.push(format!(
                "at line {}: {}, offending document: {}",
                line, message, offending
            ));
        }
    }

    /// Number of payload lines accounted for.
    pub fn total(&self) -> u64 {
        self.created + self.updated + self.ignored + self.errors + self.empty
    }
}
