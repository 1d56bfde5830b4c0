// concord-core/src/domain/session/mod.rs
//
// Append-only command history. Records are never edited; `clear` swaps the whole session.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use tracing::debug;
use uuid::Uuid;
use validator::{Validate, ValidationError};

use crate::domain::error::DomainError;
use crate::domain::finding::{Finding, SeverityCounts};

/// Current layout of the persisted session document.
pub const FORMAT_VERSION: u32 = 1;

/// Commands that record findings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommandName {
    Compare,
    Merge,
    Validate,
}

impl CommandName {
    pub fn as_str(&self) -> &'static str {
        match self {
            CommandName::Compare => "compare",
            CommandName::Merge => "merge",
            CommandName::Validate => "validate",
        }
    }
}

impl fmt::Display for CommandName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Output written by a command.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Artifact {
    MergedDataset {
        name: String,
        path: String,
        rows: usize,
        columns: usize,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct CommandRecord {
    /// 1-based position in the session. Assigned by [`SessionLedger::append`].
    pub sequence: u64,
    pub command: CommandName,
    pub timestamp: DateTime<Utc>,

    #[validate(length(min = 1, message = "a command record needs at least one input"))]
    pub inputs: Vec<String>,

    #[serde(default)]
    pub parameters: BTreeMap<String, String>,

    #[validate(custom(function = "validate_findings"))]
    #[serde(default)]
    pub findings: Vec<Finding>,

    #[serde(default)]
    pub artifacts: Vec<Artifact>,
}

impl CommandRecord {
    pub fn new(command: CommandName, inputs: Vec<String>) -> Self {
        Self {
            sequence: 0,
            command,
            timestamp: Utc::now(),
            inputs,
            parameters: BTreeMap::new(),
            findings: Vec::new(),
            artifacts: Vec::new(),
        }
    }

    pub fn with_parameter(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.parameters.insert(key.into(), value.to_string());
        self
    }

    pub fn with_findings(mut self, findings: Vec<Finding>) -> Self {
        self.findings = findings;
        self
    }

    pub fn with_artifact(mut self, artifact: Artifact) -> Self {
        self.artifacts.push(artifact);
        self
    }

    pub fn counts(&self) -> SeverityCounts {
        SeverityCounts::tally(&self.findings)
    }
}

fn validate_findings(findings: &[Finding]) -> Result<(), ValidationError> {
    let anonymous = findings
        .iter()
        .any(|f| f.source().is_empty() || f.lineage().iter().any(|l| l.source.is_empty()));
    if anonymous {
        let mut err = ValidationError::new("finding_source");
        err.message = Some("every finding and lineage entry must name its source".into());
        return Err(err);
    }
    Ok(())
}

fn validate_session_id(id: &str) -> Result<(), ValidationError> {
    Uuid::parse_str(id)
        .map(|_| ())
        .map_err(|_| ValidationError::new("session_id"))
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct Session {
    #[validate(custom(function = "validate_session_id"))]
    pub id: String,
    pub created_at: DateTime<Utc>,
    #[validate(nested)]
    #[serde(default)]
    pub commands: Vec<CommandRecord>,
}

impl Session {
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            created_at: Utc::now(),
            commands: Vec::new(),
        }
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

/// On-disk envelope.
#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct SessionDocument {
    #[validate(range(min = 1, max = 1, message = "unsupported session format version"))]
    pub format_version: u32,
    #[validate(nested)]
    pub session: Session,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct SessionLedger {
    session: Session,
}

impl SessionLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_session(session: Session) -> Self {
        Self { session }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn id(&self) -> &str {
        &self.session.id
    }

    /// Stamps the record with the next sequence number and appends it.
    pub fn append(&mut self, mut record: CommandRecord) -> u64 {
        let sequence = self.session.commands.len() as u64 + 1;
        record.sequence = sequence;
        if let Some(last) = self.session.commands.last()
            && record.timestamp < last.timestamp
        {
            record.timestamp = last.timestamp;
        }
        debug!(sequence, command = %record.command, findings = record.findings.len(), "Command recorded");
        self.session.commands.push(record);
        sequence
    }

    pub fn all(&self) -> &[CommandRecord] {
        &self.session.commands
    }

    pub fn last(&self) -> Option<&CommandRecord> {
        self.session.commands.last()
    }

    pub fn is_empty(&self) -> bool {
        self.session.commands.is_empty()
    }

    /// Starts a fresh session and hands back the discarded one.
    pub fn clear(&mut self) -> Session {
        std::mem::take(&mut self.session)
    }

    pub fn export(&self) -> Result<String, DomainError> {
        let document = SessionDocument {
            format_version: FORMAT_VERSION,
            session: self.session.clone(),
        };
        serde_json::to_string_pretty(&document)
            .map_err(|e| DomainError::LedgerCorruption(format!("cannot serialize session: {}", e)))
    }

    pub fn import(text: &str) -> Result<Self, DomainError> {
        let document: SessionDocument = serde_json::from_str(text)
            .map_err(|e| DomainError::LedgerCorruption(format!("unreadable session document: {}", e)))?;
        document
            .validate()
            .map_err(|e| DomainError::LedgerCorruption(e.to_string()))?;

        let commands = &document.session.commands;
        for (i, record) in commands.iter().enumerate() {
            let expected = i as u64 + 1;
            if record.sequence != expected {
                return Err(DomainError::LedgerCorruption(format!(
                    "command at position {} has sequence {}, expected {}",
                    i, record.sequence, expected
                )));
            }
            if i > 0 && record.timestamp < commands[i - 1].timestamp {
                return Err(DomainError::LedgerCorruption(format!(
                    "command {} is timestamped before command {}",
                    record.sequence,
                    commands[i - 1].sequence
                )));
            }
        }
        Ok(Self::from_session(document.session))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::domain::finding::{CheckKind, LineageEntry, RuleRef, Severity};
    use anyhow::Result;

    fn record(command: CommandName, severity: Severity) -> CommandRecord {
        CommandRecord::new(command, vec!["orders.csv".to_string()])
            .with_parameter("key", "id")
            .with_findings(vec![
                Finding::new(severity, RuleRef::new("uniqueness:id", CheckKind::Uniqueness), "orders.csv")
                    .at_row(0)
                    .with_lineage(LineageEntry::cell("orders.csv", 0, "id").with_value("1")),
            ])
    }

    #[test]
    fn test_append_assigns_contiguous_sequences() {
        let mut ledger = SessionLedger::new();
        assert_eq!(ledger.append(record(CommandName::Compare, Severity::Pass)), 1);
        assert_eq!(ledger.append(record(CommandName::Validate, Severity::Error)), 2);
        assert_eq!(ledger.all().len(), 2);
        assert_eq!(ledger.last().unwrap().command, CommandName::Validate);
        assert!(ledger.all()[0].timestamp <= ledger.all()[1].timestamp);
    }

    #[test]
    fn test_clear_returns_previous_session() {
        let mut ledger = SessionLedger::new();
        ledger.append(record(CommandName::Merge, Severity::Warning));
        let old_id = ledger.id().to_string();

        let discarded = ledger.clear();
        assert_eq!(discarded.id, old_id);
        assert_eq!(discarded.commands.len(), 1);
        assert!(ledger.is_empty());
        assert_ne!(ledger.id(), old_id);
    }

    #[test]
    fn test_export_import_roundtrip() -> Result<()> {
        let mut ledger = SessionLedger::new();
        ledger.append(record(CommandName::Compare, Severity::Pass));
        ledger.append(
            record(CommandName::Merge, Severity::Warning).with_artifact(Artifact::MergedDataset {
                name: "merged.csv".to_string(),
                path: "out/merged.csv".to_string(),
                rows: 10,
                columns: 3,
            }),
        );

        let restored = SessionLedger::import(&ledger.export()?)?;
        assert_eq!(restored, ledger);
        Ok(())
    }

    #[test]
    fn test_import_rejects_gaps_and_bad_documents() -> Result<()> {
        let mut ledger = SessionLedger::new();
        ledger.append(record(CommandName::Compare, Severity::Pass));
        ledger.append(record(CommandName::Compare, Severity::Pass));

        let mut document: serde_json::Value = serde_json::from_str(&ledger.export()?)?;
        document["session"]["commands"][1]["sequence"] = serde_json::json!(5);
        let err = SessionLedger::import(&document.to_string()).unwrap_err();
        assert!(matches!(err, DomainError::LedgerCorruption(_)));

        let mut document: serde_json::Value = serde_json::from_str(&ledger.export()?)?;
        document["format_version"] = serde_json::json!(2);
        assert!(SessionLedger::import(&document.to_string()).is_err());

        let mut document: serde_json::Value = serde_json::from_str(&ledger.export()?)?;
        document["session"]["commands"][0]["inputs"] = serde_json::json!([]);
        assert!(SessionLedger::import(&document.to_string()).is_err());

        assert!(SessionLedger::import("{not json").is_err());
        Ok(())
    }

    #[test]
    fn test_import_rejects_time_travel() -> Result<()> {
        let mut ledger = SessionLedger::new();
        ledger.append(record(CommandName::Compare, Severity::Pass));
        ledger.append(record(CommandName::Compare, Severity::Pass));

        let mut document: serde_json::Value = serde_json::from_str(&ledger.export()?)?;
        document["session"]["commands"][0]["timestamp"] = serde_json::json!("2999-01-01T00:00:00Z");
        assert!(SessionLedger::import(&document.to_string()).is_err());
        Ok(())
    }
}
