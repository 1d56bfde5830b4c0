// concord-core/src/application/clear.rs

use std::path::PathBuf;
use tracing::{info, instrument, warn};

use crate::domain::error::DomainError;
use crate::domain::session::SessionLedger;
use crate::error::ConcordError;
use crate::ports::session_store::SessionStore;

#[derive(Debug, Clone, PartialEq)]
pub struct ClearOutcome {
    /// Id of the replaced session. Absent when the saved session could not be read.
    pub discarded_session: Option<String>,
    pub discarded_commands: usize,
    /// Absent when the session had no commands to keep.
    pub archived: Option<PathBuf>,
    pub new_session: String,
}

impl ClearOutcome {
    pub fn recovered_unreadable(&self) -> bool {
        self.discarded_session.is_none()
    }
}

/// Archives the saved session, then replaces it with an empty one on disk.
/// An unreadable session file is moved next to the archives instead.
#[instrument(skip_all)]
pub fn clear_session(store: &dyn SessionStore) -> Result<ClearOutcome, ConcordError> {
    let mut ledger = match store.load() {
        Ok(ledger) => ledger,
        Err(ConcordError::Domain(DomainError::LedgerCorruption(reason))) => {
            warn!(%reason, "Saved session is unreadable; starting over");
            let archived = store.quarantine()?;
            let fresh = SessionLedger::new();
            store.save(&fresh)?;
            info!("🧹 Session cleared");
            return Ok(ClearOutcome {
                discarded_session: None,
                discarded_commands: 0,
                archived: Some(archived),
                new_session: fresh.id().to_string(),
            });
        }
        Err(e) => return Err(e),
    };

    let discarded_commands = ledger.all().len();
    let archived = if ledger.is_empty() {
        None
    } else {
        Some(store.archive(ledger.session())?)
    };

    let old = ledger.clear();
    store.save(&ledger)?;

    info!(discarded_commands, "🧹 Session cleared");
    Ok(ClearOutcome {
        discarded_session: Some(old.id),
        discarded_commands,
        archived,
        new_session: ledger.id().to_string(),
    })
}
