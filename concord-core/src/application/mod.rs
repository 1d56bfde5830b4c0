// concord-core/src/application/mod.rs

pub mod clear;
pub mod compare;
pub mod merge;
pub mod preview;
pub mod report;
pub mod status;
pub mod validate;

#[cfg(test)]
pub(crate) mod testing;

use serde::Serialize;

use crate::domain::finding::{Outcome, SeverityCounts};
use crate::domain::session::CommandRecord;

// --- RE-EXPORTS (FACADE PATTERN) ---
// Lets the CLI write `use concord_core::application::{run_compare, build_report};`
// without knowing the internal file layout.

pub use clear::{ClearOutcome, clear_session};
pub use compare::{CompareRequest, run_compare};
pub use merge::{MergeRequest, run_merge};
pub use preview::{DatasetPreview, preview_dataset};
pub use report::{ReportOutput, build_report};
pub use status::{CommandStatus, SessionStatus, session_status};
pub use validate::{ValidateRequest, run_validate};

/// What a recording command hands back once its record is in the ledger.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CommandReceipt {
    pub sequence: u64,
    pub counts: SeverityCounts,
    pub outcome: Outcome,
}

impl CommandReceipt {
    fn of(record: &CommandRecord) -> Self {
        let counts = record.counts();
        Self {
            sequence: record.sequence,
            counts,
            outcome: counts.outcome(),
        }
    }

    pub fn has_errors(&self) -> bool {
        self.counts.errors > 0
    }
}
