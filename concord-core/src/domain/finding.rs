// concord-core/src/domain/finding.rs

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Outcome tier of a single check. Ordered from least to most severe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Pass,
    Warning,
    Error,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Pass => "pass",
            Severity::Warning => "warning",
            Severity::Error => "error",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Severity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pass" => Ok(Severity::Pass),
            "warning" | "warn" => Ok(Severity::Warning),
            "error" => Ok(Severity::Error),
            _ => Err(format!("Unknown severity: {}", s)),
        }
    }
}

/// What produced a finding: a rule kind or a reconciliation check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckKind {
    Type,
    Range,
    Pattern,
    CrossColumn,
    ReferentialIntegrity,
    Uniqueness,
    Completeness,
    RecordMatch,
    MissingRecord,
    DuplicateKey,
    FieldMismatch,
    MergeConflict,
    Unmatched,
}

impl CheckKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            CheckKind::Type => "type",
            CheckKind::Range => "range",
            CheckKind::Pattern => "pattern",
            CheckKind::CrossColumn => "cross_column",
            CheckKind::ReferentialIntegrity => "referential_integrity",
            CheckKind::Uniqueness => "uniqueness",
            CheckKind::Completeness => "completeness",
            CheckKind::RecordMatch => "record_match",
            CheckKind::MissingRecord => "missing_record",
            CheckKind::DuplicateKey => "duplicate_key",
            CheckKind::FieldMismatch => "field_mismatch",
            CheckKind::MergeConflict => "merge_conflict",
            CheckKind::Unmatched => "unmatched",
        }
    }
}

impl fmt::Display for CheckKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RuleRef {
    pub name: String,
    pub kind: CheckKind,
}

impl RuleRef {
    pub fn new(name: impl Into<String>, kind: CheckKind) -> Self {
        Self {
            name: name.into(),
            kind,
        }
    }
}

/// One location a finding touched. `value` keeps the raw text observed there.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineageEntry {
    pub source: String,
    pub row: Option<usize>,
    pub column: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
}

impl LineageEntry {
    pub fn cell(source: impl Into<String>, row: usize, column: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            row: Some(row),
            column: Some(column.into()),
            value: None,
        }
    }

    pub fn row(source: impl Into<String>, row: usize) -> Self {
        Self {
            source: source.into(),
            row: Some(row),
            column: None,
            value: None,
        }
    }

    pub fn with_value(mut self, value: impl Into<String>) -> Self {
        self.value = Some(value.into());
        self
    }
}

/// One evaluated outcome. Built once through the consuming builder methods, then read-only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Finding {
    severity: Severity,
    rule: RuleRef,
    source: String,
    row: Option<usize>,
    column: Option<String>,
    message: String,
    lineage: Vec<LineageEntry>,
}

impl Finding {
    pub fn new(severity: Severity, rule: RuleRef, source: impl Into<String>) -> Self {
        Self {
            severity,
            rule,
            source: source.into(),
            row: None,
            column: None,
            message: String::new(),
            lineage: Vec::new(),
        }
    }

    pub fn at_row(mut self, row: usize) -> Self {
        self.row = Some(row);
        self
    }

    pub fn on_column(mut self, column: impl Into<String>) -> Self {
        self.column = Some(column.into());
        self
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    pub fn with_lineage(mut self, entry: LineageEntry) -> Self {
        self.lineage.push(entry);
        self
    }

    pub fn with_lineage_entries(mut self, entries: impl IntoIterator<Item = LineageEntry>) -> Self {
        self.lineage.extend(entries);
        self
    }

    pub fn severity(&self) -> Severity {
        self.severity
    }

    pub fn rule(&self) -> &RuleRef {
        &self.rule
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn row(&self) -> Option<usize> {
        self.row
    }

    pub fn column(&self) -> Option<&str> {
        self.column.as_deref()
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn lineage(&self) -> &[LineageEntry] {
        &self.lineage
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

/// Severity rollup of a command or a source file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Passed,
    Warned,
    Failed,
}

impl Outcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Outcome::Passed => "passed",
            Outcome::Warned => "warned",
            Outcome::Failed => "failed",
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SeverityCounts {
    pub errors: usize,
    pub warnings: usize,
    pub passes: usize,
}

impl SeverityCounts {
    pub fn tally<'a>(findings: impl IntoIterator<Item = &'a Finding>) -> Self {
        let mut counts = Self::default();
        for finding in findings {
            counts.add(finding.severity());
        }
        counts
    }

    pub fn add(&mut self, severity: Severity) {
        match severity {
            Severity::Error => self.errors += 1,
            Severity::Warning => self.warnings += 1,
            Severity::Pass => self.passes += 1,
        }
    }

    pub fn absorb(&mut self, other: SeverityCounts) {
        self.errors += other.errors;
        self.warnings += other.warnings;
        self.passes += other.passes;
    }

    pub fn total(&self) -> usize {
        self.errors + self.warnings + self.passes
    }

    /// Failed on any Error, Warned on any Warning, Passed otherwise.
    pub fn outcome(&self) -> Outcome {
        if self.errors > 0 {
            Outcome::Failed
        } else if self.warnings > 0 {
            Outcome::Warned
        } else {
            Outcome::Passed
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_severity_ordering() {
        assert!(Severity::Error > Severity::Warning);
        assert!(Severity::Warning > Severity::Pass);
        assert_eq!("WARN".parse::<Severity>(), Ok(Severity::Warning));
        assert!("fatal".parse::<Severity>().is_err());
    }

    #[test]
    fn test_builder_records_location_and_lineage() {
        let f = Finding::new(
            Severity::Error,
            RuleRef::new("completeness:email", CheckKind::Completeness),
            "users.csv",
        )
        .at_row(3)
        .on_column("email")
        .with_message("value is missing")
        .with_lineage(LineageEntry::cell("users.csv", 3, "email"));

        assert_eq!(f.row(), Some(3));
        assert_eq!(f.column(), Some("email"));
        assert_eq!(f.lineage().len(), 1);
        assert!(f.is_error());
    }

    #[test]
    fn test_counts_roll_up_to_worst_outcome() {
        let rule = RuleRef::new("type:qty", CheckKind::Type);
        let warn = Finding::new(Severity::Warning, rule.clone(), "a.csv");
        let pass = Finding::new(Severity::Pass, rule.clone(), "a.csv");
        let counts = SeverityCounts::tally([&warn, &pass]);
        assert_eq!(counts.total(), 2);
        assert_eq!(counts.outcome(), Outcome::Warned);
        assert_eq!(SeverityCounts::default().outcome(), Outcome::Passed);
        let error = Finding::new(Severity::Error, rule, "a.csv");
        assert_eq!(SeverityCounts::tally([&error, &warn]).outcome(), Outcome::Failed);
    }
}
