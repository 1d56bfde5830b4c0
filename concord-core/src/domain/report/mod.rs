// concord-core/src/domain/report/mod.rs
//
// Read-only view over the ledger. Nothing here is persisted; renderers consume `Report`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;

use crate::domain::finding::{Finding, Outcome, Severity, SeverityCounts};
use crate::domain::session::{Artifact, CommandName, SessionLedger};

/// Stable finding identifier: `C{sequence}-F{index}`, index 1-based within the command.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FindingId(String);

impl FindingId {
    pub fn new(sequence: u64, index: usize) -> Self {
        Self(format!("C{}-F{}", sequence, index))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for FindingId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportedFinding {
    pub id: FindingId,
    pub finding: Finding,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandReport {
    pub sequence: u64,
    pub command: CommandName,
    pub timestamp: DateTime<Utc>,
    pub inputs: Vec<String>,
    pub parameters: BTreeMap<String, String>,
    pub counts: SeverityCounts,
    pub outcome: Outcome,
    pub findings: Vec<ReportedFinding>,
    pub artifacts: Vec<Artifact>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeverityGroup {
    pub severity: Severity,
    pub findings: Vec<FindingId>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceRollup {
    pub source: String,
    pub counts: SeverityCounts,
    pub outcome: Outcome,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CellLocation {
    pub source: String,
    pub row: Option<usize>,
    pub column: Option<String>,
}

impl fmt::Display for CellLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.source)?;
        if let Some(row) = self.row {
            write!(f, " row {}", row)?;
        }
        if let Some(column) = &self.column {
            write!(f, " [{}]", column)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineageIndexEntry {
    pub location: CellLocation,
    pub findings: Vec<FindingId>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Report {
    pub session_id: String,
    pub session_created_at: DateTime<Utc>,
    pub summary: SeverityCounts,
    pub outcome: Outcome,
    pub commands: Vec<CommandReport>,
    /// Error, Warning, Pass, in that order.
    pub by_severity: Vec<SeverityGroup>,
    /// Rollup per finding source, in first-seen order.
    pub sources: Vec<SourceRollup>,
    /// Every lineage location, in insertion order, with the findings touching it.
    pub lineage_index: Vec<LineageIndexEntry>,
}

impl Report {
    pub fn finding_count(&self) -> usize {
        self.summary.total()
    }

    pub fn findings(&self) -> impl Iterator<Item = (&CommandReport, &ReportedFinding)> {
        self.commands
            .iter()
            .flat_map(|c| c.findings.iter().map(move |f| (c, f)))
    }
}

pub fn aggregate(ledger: &SessionLedger) -> Report {
    let session = ledger.session();
    let mut summary = SeverityCounts::default();
    let mut groups: BTreeMap<std::cmp::Reverse<Severity>, Vec<FindingId>> = BTreeMap::new();
    let mut sources: Vec<SourceRollup> = Vec::new();
    let mut source_positions: HashMap<String, usize> = HashMap::new();
    let mut lineage = LineageIndexBuilder::default();

    let mut commands = Vec::with_capacity(session.commands.len());
    for record in ledger.all() {
        let mut findings = Vec::with_capacity(record.findings.len());
        for (i, finding) in record.findings.iter().enumerate() {
            let id = FindingId::new(record.sequence, i + 1);
            summary.add(finding.severity());
            groups
                .entry(std::cmp::Reverse(finding.severity()))
                .or_default()
                .push(id.clone());

            let position = *source_positions
                .entry(finding.source().to_string())
                .or_insert_with(|| {
                    sources.push(SourceRollup {
                        source: finding.source().to_string(),
                        counts: SeverityCounts::default(),
                        outcome: Outcome::Passed,
                    });
                    sources.len() - 1
                });
            sources[position].counts.add(finding.severity());

            lineage.add(&id, finding);
            findings.push(ReportedFinding {
                id,
                finding: finding.clone(),
            });
        }

        let counts = record.counts();
        commands.push(CommandReport {
            sequence: record.sequence,
            command: record.command,
            timestamp: record.timestamp,
            inputs: record.inputs.clone(),
            parameters: record.parameters.clone(),
            counts,
            outcome: counts.outcome(),
            findings,
            artifacts: record.artifacts.clone(),
        });
    }

    for rollup in &mut sources {
        rollup.outcome = rollup.counts.outcome();
    }

    Report {
        session_id: session.id.clone(),
        session_created_at: session.created_at,
        summary,
        outcome: summary.outcome(),
        commands,
        by_severity: groups
            .into_iter()
            .map(|(severity, findings)| SeverityGroup {
                severity: severity.0,
                findings,
            })
            .collect(),
        sources,
        lineage_index: lineage.entries,
    }
}

#[derive(Default)]
struct LineageIndexBuilder {
    entries: Vec<LineageIndexEntry>,
    positions: HashMap<CellLocation, usize>,
}

impl LineageIndexBuilder {
    /// A finding is listed once per location even if its lineage repeats the cell.
    fn add(&mut self, id: &FindingId, finding: &Finding) {
        for entry in finding.lineage() {
            let location = CellLocation {
                source: entry.source.clone(),
                row: entry.row,
                column: entry.column.clone(),
            };
            let position = match self.positions.get(&location) {
                Some(&p) => p,
                None => {
                    self.positions.insert(location.clone(), self.entries.len());
                    self.entries.push(LineageIndexEntry {
                        location,
                        findings: Vec::new(),
                    });
                    self.entries.len() - 1
                }
            };
            let ids = &mut self.entries[position].findings;
            if ids.last() != Some(id) {
                ids.push(id.clone());
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::domain::finding::{CheckKind, LineageEntry, RuleRef};
    use crate::domain::session::CommandRecord;
    use anyhow::Result;

    fn finding(severity: Severity, source: &str, row: usize) -> Finding {
        Finding::new(severity, RuleRef::new("type:qty", CheckKind::Type), source)
            .at_row(row)
            .on_column("qty")
            .with_lineage(LineageEntry::cell(source, row, "qty"))
    }

    fn ledger() -> SessionLedger {
        let mut ledger = SessionLedger::new();
        ledger.append(
            CommandRecord::new(CommandName::Validate, vec!["a.csv".to_string()]).with_findings(vec![
                finding(Severity::Pass, "a.csv", 0),
                finding(Severity::Error, "a.csv", 1),
            ]),
        );
        ledger.append(
            CommandRecord::new(
                CommandName::Compare,
                vec!["a.csv".to_string(), "b.csv".to_string()],
            )
            .with_findings(vec![
                finding(Severity::Warning, "b.csv", 0),
                finding(Severity::Pass, "a.csv", 1)
                    .with_lineage(LineageEntry::cell("a.csv", 1, "qty")),
            ]),
        );
        ledger
    }

    #[test]
    fn test_ids_and_rollups() {
        let report = aggregate(&ledger());

        let ids: Vec<&str> = report.findings().map(|(_, f)| f.id.as_str()).collect();
        assert_eq!(ids, vec!["C1-F1", "C1-F2", "C2-F1", "C2-F2"]);

        assert_eq!(report.summary.errors, 1);
        assert_eq!(report.summary.warnings, 1);
        assert_eq!(report.summary.passes, 2);
        assert_eq!(report.outcome, Outcome::Failed);
        assert_eq!(report.commands[0].outcome, Outcome::Failed);
        assert_eq!(report.commands[1].outcome, Outcome::Warned);

        let severities: Vec<Severity> = report.by_severity.iter().map(|g| g.severity).collect();
        assert_eq!(severities, vec![Severity::Error, Severity::Warning, Severity::Pass]);

        let sources: Vec<(&str, Outcome)> = report
            .sources
            .iter()
            .map(|s| (s.source.as_str(), s.outcome))
            .collect();
        assert_eq!(sources, vec![("a.csv", Outcome::Failed), ("b.csv", Outcome::Warned)]);
    }

    #[test]
    fn test_lineage_index_lists_each_finding_once_per_location() {
        let report = aggregate(&ledger());
        let a1 = report
            .lineage_index
            .iter()
            .find(|e| e.location.source == "a.csv" && e.location.row == Some(1))
            .unwrap();
        let ids: Vec<&str> = a1.findings.iter().map(FindingId::as_str).collect();
        assert_eq!(ids, vec!["C1-F2", "C2-F2"]);

        let order: Vec<String> = report
            .lineage_index
            .iter()
            .map(|e| e.location.to_string())
            .collect();
        assert_eq!(
            order,
            vec!["a.csv row 0 [qty]", "a.csv row 1 [qty]", "b.csv row 0 [qty]"]
        );
    }

    #[test]
    fn test_report_survives_ledger_roundtrip() -> Result<()> {
        let ledger = ledger();
        let restored = SessionLedger::import(&ledger.export()?)?;
        assert_eq!(aggregate(&restored), aggregate(&ledger));

        let json = serde_json::to_string(&aggregate(&ledger))?;
        let parsed: Report = serde_json::from_str(&json)?;
        assert_eq!(parsed, aggregate(&ledger));
        Ok(())
    }

    #[test]
    fn test_empty_ledger_passes() {
        let report = aggregate(&SessionLedger::new());
        assert_eq!(report.outcome, Outcome::Passed);
        assert!(report.commands.is_empty());
        assert!(report.by_severity.is_empty());
    }
}
