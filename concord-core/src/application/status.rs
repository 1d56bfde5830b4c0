// concord-core/src/application/status.rs

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::domain::finding::{Outcome, SeverityCounts};
use crate::domain::session::{CommandName, SessionLedger};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CommandStatus {
    pub sequence: u64,
    pub command: CommandName,
    pub timestamp: DateTime<Utc>,
    pub inputs: Vec<String>,
    pub counts: SeverityCounts,
    pub outcome: Outcome,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionStatus {
    pub session_id: String,
    pub created_at: DateTime<Utc>,
    pub commands: Vec<CommandStatus>,
    pub totals: SeverityCounts,
    pub outcome: Outcome,
}

/// One line per recorded command, plus session totals.
pub fn session_status(ledger: &SessionLedger) -> SessionStatus {
    let mut totals = SeverityCounts::default();
    let commands = ledger
        .all()
        .iter()
        .map(|record| {
            let counts = record.counts();
            totals.absorb(counts);
            CommandStatus {
                sequence: record.sequence,
                command: record.command,
                timestamp: record.timestamp,
                inputs: record.inputs.clone(),
                counts,
                outcome: counts.outcome(),
            }
        })
        .collect();

    SessionStatus {
        session_id: ledger.id().to_string(),
        created_at: ledger.session().created_at,
        commands,
        totals,
        outcome: totals.outcome(),
    }
}
