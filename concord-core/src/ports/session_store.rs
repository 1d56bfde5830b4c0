// concord-core/src/ports/session_store.rs

use crate::domain::session::{Session, SessionLedger};
use crate::error::ConcordError;
use std::path::PathBuf;

pub trait SessionStore: Send + Sync {
    /// The persisted ledger, or an empty one when nothing was saved yet.
    fn load(&self) -> Result<SessionLedger, ConcordError>;

    fn save(&self, ledger: &SessionLedger) -> Result<(), ConcordError>;

    /// Keeps a discarded session for audit. Returns where it was written.
    fn archive(&self, session: &Session) -> Result<PathBuf, ConcordError>;

    /// Moves a session that can no longer be read out of the way, next to the archives.
    fn quarantine(&self) -> Result<PathBuf, ConcordError>;
}
