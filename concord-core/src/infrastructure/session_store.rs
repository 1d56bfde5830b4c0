// concord-core/src/infrastructure/session_store.rs

use chrono::Utc;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, instrument, warn};

use crate::domain::session::{FORMAT_VERSION, Session, SessionDocument, SessionLedger};
use crate::error::ConcordError;
use crate::infrastructure::error::InfrastructureError;
use crate::infrastructure::fs::atomic_write;
use crate::ports::session_store::SessionStore;

/// Session persisted as one JSON document, rewritten atomically after every command.
pub struct FileSessionStore {
    session_path: PathBuf,
    archive_dir: PathBuf,
}

impl FileSessionStore {
    pub fn new(session_path: impl Into<PathBuf>, archive_dir: impl Into<PathBuf>) -> Self {
        Self {
            session_path: session_path.into(),
            archive_dir: archive_dir.into(),
        }
    }

    pub fn session_path(&self) -> &Path {
        &self.session_path
    }
}

impl SessionStore for FileSessionStore {
    #[instrument(skip(self), fields(path = %self.session_path.display()))]
    fn load(&self) -> Result<SessionLedger, ConcordError> {
        if !self.session_path.exists() {
            debug!("No saved session; starting a new one");
            return Ok(SessionLedger::new());
        }
        let content = fs::read_to_string(&self.session_path)?;
        Ok(SessionLedger::import(&content)?)
    }

    fn save(&self, ledger: &SessionLedger) -> Result<(), ConcordError> {
        atomic_write(&self.session_path, ledger.export()?)?;
        debug!(commands = ledger.all().len(), "Session saved");
        Ok(())
    }

    fn archive(&self, session: &Session) -> Result<PathBuf, ConcordError> {
        let target = self.archive_dir.join(format!("session-{}.json", session.id));
        let document = SessionDocument {
            format_version: FORMAT_VERSION,
            session: session.clone(),
        };
        let json = serde_json::to_string_pretty(&document).map_err(InfrastructureError::JsonError)?;
        atomic_write(&target, json)?;
        info!(path = %target.display(), "🗄️  Session archived");
        Ok(target)
    }

    fn quarantine(&self) -> Result<PathBuf, ConcordError> {
        let target = self.archive_dir.join(format!(
            "session-unreadable-{}.json",
            Utc::now().format("%Y%m%dT%H%M%S%.3f")
        ));
        fs::create_dir_all(&self.archive_dir)?;
        // copy + remove: the archive may sit on another filesystem.
        fs::copy(&self.session_path, &target)?;
        fs::remove_file(&self.session_path)?;
        warn!(path = %target.display(), "Unreadable session moved aside");
        Ok(target)
    }
}
