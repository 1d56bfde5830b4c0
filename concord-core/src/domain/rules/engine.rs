// concord-core/src/domain/rules/engine.rs
//
// Two-pass evaluation: `prepare` compiles the rules and builds every whole-dataset index
// (uniqueness groups, reference key sets), then `check_rows` runs row-level checks over
// bounded chunks. Chunks are independent, so callers may evaluate them on worker threads.

use std::collections::HashMap;
use std::ops::Range;
use std::sync::Arc;
use tracing::{debug, instrument};

use crate::domain::configuration::EngineSettings;
use crate::domain::dataset::{Dataset, Record, Value};
use crate::domain::error::DomainError;
use crate::domain::finding::{Finding, LineageEntry, RuleRef, Severity};
use crate::domain::key_index::{KeyGroup, KeyIndex};
use crate::domain::normalize::Sensitivity;
use crate::domain::rules::checks::{
    PatternMatcher, ReferenceIndex, Verdict, check_completeness, check_range, check_type,
};
use crate::domain::rules::expression::{ColumnLookup, CompareContext, Condition, Evaluation};
use crate::domain::rules::{RangeRule, Rule, TypeRule, validate_rule_set};

/// Reference datasets keyed by the `reference` string used in rule definitions.
pub type References = HashMap<String, Arc<Dataset>>;

pub struct RuleEngine {
    settings: EngineSettings,
}

impl RuleEngine {
    pub fn new(settings: EngineSettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    /// Index pass. Fails before any row is checked if a rule cannot run against this dataset.
    #[instrument(skip_all, fields(source = %dataset.source(), rules = rules.len()))]
    pub fn prepare(
        &self,
        dataset: Arc<Dataset>,
        rules: &[Rule],
        references: &References,
    ) -> Result<EvaluationPlan, DomainError> {
        validate_rule_set(rules)?;

        let mut compiled = Vec::with_capacity(rules.len());
        for (position, rule) in rules.iter().enumerate() {
            compiled.push(self.compile(&dataset, rule, position, references)?);
        }
        debug!(compiled = compiled.len(), "Rules compiled");

        Ok(EvaluationPlan {
            dataset,
            rules: compiled,
            chunk_size: self.settings.chunk_size.max(1),
        })
    }

    /// Sequential evaluation, chunk by chunk.
    pub fn evaluate(
        &self,
        dataset: Arc<Dataset>,
        rules: &[Rule],
        references: &References,
    ) -> Result<Vec<Finding>, DomainError> {
        let plan = self.prepare(dataset, rules, references)?;
        let chunks = plan
            .chunks()
            .into_iter()
            .map(|range| plan.check_rows(range))
            .collect();
        Ok(plan.finish(chunks))
    }

    fn compile(
        &self,
        dataset: &Dataset,
        rule: &Rule,
        position: usize,
        references: &References,
    ) -> Result<CompiledRule, DomainError> {
        let rule_ref = RuleRef::new(rule.name(), rule.kind());
        let column = rule.target_column().map(str::to_string);
        let formats = self.settings.date_formats.clone();

        let check = match rule {
            Rule::Type(r) => CompiledCheck::Type {
                column: dataset.require_column(&r.column)?,
                rule: r.clone(),
                formats,
            },
            Rule::Range(r) => CompiledCheck::Range {
                column: dataset.require_column(&r.column)?,
                tolerance: r.tolerance.unwrap_or(self.settings.range_tolerance),
                rule: r.clone(),
                formats,
            },
            Rule::Pattern(r) => CompiledCheck::Pattern {
                column: dataset.require_column(&r.column)?,
                matcher: PatternMatcher::compile(r, format!("rules[{}].pattern", position))?,
            },
            Rule::CrossColumn(r) => {
                let condition = Condition::parse(&r.expression).map_err(|reason| {
                    DomainError::invalid_rule(format!("rules[{}].expression", position), reason)
                })?;
                let mut columns = Vec::new();
                for name in condition.columns() {
                    let index = dataset.require_column(&name)?;
                    columns.push((name, index));
                }
                CompiledCheck::CrossColumn {
                    condition,
                    columns,
                    sensitivity: rule.sensitivity(),
                    formats: if r.date_formats.is_empty() {
                        formats
                    } else {
                        r.date_formats.clone()
                    },
                }
            }
            Rule::ReferentialIntegrity(r) => {
                let column = dataset.require_column(&r.column)?;
                let reference = references.get(&r.reference).ok_or_else(|| {
                    DomainError::EvaluationError(format!(
                        "reference dataset '{}' was not loaded",
                        r.reference
                    ))
                })?;
                let key = reference.require_column(&r.reference_key)?;
                let index = ReferenceIndex::new(
                    reference.records().iter().map(|rec| rec.value(key)),
                    rule.sensitivity(),
                );
                debug!(reference = %r.reference, keys = index.len(), "Reference index built");
                CompiledCheck::Reference {
                    column,
                    index,
                    allow_null: r.allow_null,
                    reference: r.reference.clone(),
                }
            }
            Rule::Uniqueness(r) => {
                let mut columns = Vec::with_capacity(r.columns.len());
                for name in &r.columns {
                    columns.push((name.clone(), dataset.require_column(name)?));
                }
                let indexes: Vec<usize> = columns.iter().map(|(_, i)| *i).collect();
                let keys = KeyIndex::build(dataset, &indexes, rule.sensitivity());
                CompiledCheck::Uniqueness(UniquenessIndex::new(keys, columns, dataset.len()))
            }
            Rule::Completeness(r) => CompiledCheck::Completeness {
                column: dataset.require_column(&r.column)?,
            },
        };

        Ok(CompiledRule {
            rule: rule_ref,
            column,
            check,
        })
    }
}

/// Compiled rules bound to one dataset. Shareable across threads.
pub struct EvaluationPlan {
    dataset: Arc<Dataset>,
    rules: Vec<CompiledRule>,
    chunk_size: usize,
}

impl EvaluationPlan {
    pub fn dataset(&self) -> &Dataset {
        &self.dataset
    }

    /// Bounded row ranges covering the whole dataset.
    pub fn chunks(&self) -> Vec<Range<usize>> {
        let len = self.dataset.len();
        (0..len)
            .step_by(self.chunk_size)
            .map(|start| start..(start + self.chunk_size).min(len))
            .collect()
    }

    /// Check pass over one chunk. Findings come out in row order, then rule order.
    pub fn check_rows(&self, rows: Range<usize>) -> Vec<Finding> {
        let records = self.dataset.records();
        let end = rows.end.min(records.len());
        let start = rows.start.min(end);
        let mut findings = Vec::with_capacity((end - start) * self.rules.len());
        for record in &records[start..end] {
            for rule in &self.rules {
                if let Some(finding) = rule.check(&self.dataset, record) {
                    findings.push(finding);
                }
            }
        }
        findings
    }

    /// Concatenates chunk results and restores row order.
    pub fn finish(&self, chunks: Vec<Vec<Finding>>) -> Vec<Finding> {
        let mut findings: Vec<Finding> = chunks.into_iter().flatten().collect();
        // Stable: rule order inside a row is preserved.
        findings.sort_by_key(|f| f.row());
        findings
    }
}

struct CompiledRule {
    rule: RuleRef,
    column: Option<String>,
    check: CompiledCheck,
}

enum CompiledCheck {
    Type {
        column: usize,
        rule: TypeRule,
        formats: Vec<String>,
    },
    Range {
        column: usize,
        rule: RangeRule,
        tolerance: f64,
        formats: Vec<String>,
    },
    Pattern {
        column: usize,
        matcher: PatternMatcher,
    },
    CrossColumn {
        condition: Condition,
        columns: Vec<(String, usize)>,
        sensitivity: Sensitivity,
        formats: Vec<String>,
    },
    Reference {
        column: usize,
        index: ReferenceIndex,
        allow_null: bool,
        reference: String,
    },
    Uniqueness(UniquenessIndex),
    Completeness {
        column: usize,
    },
}

struct RowCells<'a> {
    record: &'a Record,
    columns: &'a [(String, usize)],
}

impl ColumnLookup for RowCells<'_> {
    fn lookup(&self, column: &str) -> Option<&Value> {
        self.columns
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, index)| self.record.value(*index))
    }
}

impl CompiledRule {
    fn finding(&self, verdict: Verdict, dataset: &Dataset, row: usize) -> Finding {
        let finding = Finding::new(verdict.severity, self.rule.clone(), dataset.source())
            .at_row(row)
            .with_message(verdict.message);
        match &self.column {
            Some(column) => finding.on_column(column.clone()),
            None => finding,
        }
    }

    fn cell_finding(&self, verdict: Verdict, dataset: &Dataset, record: &Record, column: usize) -> Finding {
        let name = &dataset.columns()[column].name;
        let mut entry = LineageEntry::cell(dataset.source(), record.row(), name.clone());
        if let Some(text) = record.value(column).as_text() {
            entry = entry.with_value(text.into_owned());
        }
        self.finding(verdict, dataset, record.row()).with_lineage(entry)
    }

    fn check(&self, dataset: &Dataset, record: &Record) -> Option<Finding> {
        let finding = match &self.check {
            CompiledCheck::Type {
                column,
                rule,
                formats,
            } => {
                let verdict = check_type(rule, record.value(*column), formats);
                self.cell_finding(verdict, dataset, record, *column)
            }
            CompiledCheck::Range {
                column,
                rule,
                tolerance,
                formats,
            } => {
                let verdict = check_range(rule, record.value(*column), *tolerance, formats);
                self.cell_finding(verdict, dataset, record, *column)
            }
            CompiledCheck::Pattern { column, matcher } => {
                let verdict = matcher.check(record.value(*column));
                self.cell_finding(verdict, dataset, record, *column)
            }
            CompiledCheck::Reference {
                column,
                index,
                allow_null,
                reference,
            } => {
                let verdict = index.check(record.value(*column), *allow_null, reference);
                self.cell_finding(verdict, dataset, record, *column)
            }
            CompiledCheck::Completeness { column } => {
                let verdict = check_completeness(record.value(*column));
                self.cell_finding(verdict, dataset, record, *column)
            }
            CompiledCheck::CrossColumn {
                condition,
                columns,
                sensitivity,
                formats,
            } => self.cross_column(condition, columns, *sensitivity, formats, dataset, record),
            CompiledCheck::Uniqueness(index) => {
                return index.check(self, dataset, record);
            }
        };
        Some(finding)
    }

    fn cross_column(
        &self,
        condition: &Condition,
        columns: &[(String, usize)],
        sensitivity: Sensitivity,
        formats: &[String],
        dataset: &Dataset,
        record: &Record,
    ) -> Finding {
        let lineage = columns.iter().map(|(name, index)| {
            let entry = LineageEntry::cell(dataset.source(), record.row(), name.clone());
            match record.value(*index).as_text() {
                Some(text) => entry.with_value(text.into_owned()),
                None => entry,
            }
        });

        let missing: Vec<&str> = columns
            .iter()
            .filter(|(_, index)| record.value(*index).is_blank())
            .map(|(name, _)| name.as_str())
            .collect();

        let verdict = if !missing.is_empty() {
            Verdict::warning(format!("missing operand: {}", missing.join(", ")))
        } else {
            let cells = RowCells { record, columns };
            let ctx = CompareContext {
                sensitivity,
                date_formats: formats,
            };
            match condition.evaluate(&cells, ctx) {
                Evaluation::Holds { normalized: false } => Verdict::pass("condition holds"),
                Evaluation::Holds { normalized: true } => {
                    Verdict::warning("condition holds only after normalizing whitespace or case")
                }
                Evaluation::Violated => Verdict::error("condition violated"),
                Evaluation::Incomparable(reason) => Verdict::error(reason),
            }
        };

        self.finding(verdict, dataset, record.row())
            .with_lineage_entries(lineage)
    }
}

// ── Uniqueness ───────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy)]
enum Slot {
    First(usize),
    Duplicate(usize),
    Covered,
    NullKey,
}

/// Per-row role of every record under one uniqueness rule, computed in the index pass.
struct UniquenessIndex {
    keys: KeyIndex,
    columns: Vec<(String, usize)>,
    slots: Vec<Slot>,
}

impl UniquenessIndex {
    fn new(keys: KeyIndex, columns: Vec<(String, usize)>, rows: usize) -> Self {
        let mut slots = vec![Slot::Covered; rows];
        for (position, group) in keys.groups().iter().enumerate() {
            for (i, &row) in group.rows.iter().enumerate() {
                slots[row] = match i {
                    0 => Slot::First(position),
                    1 => Slot::Duplicate(position),
                    _ => Slot::Covered,
                };
            }
        }
        for &row in keys.null_rows() {
            slots[row] = Slot::NullKey;
        }
        Self {
            keys,
            columns,
            slots,
        }
    }

    fn key_cells(&self, dataset: &Dataset, row: usize) -> Vec<LineageEntry> {
        self.columns
            .iter()
            .map(|(name, index)| {
                let entry = LineageEntry::cell(dataset.source(), row, name.clone());
                match dataset.cell(row, *index).as_text() {
                    Some(text) => entry.with_value(text.into_owned()),
                    None => entry,
                }
            })
            .collect()
    }

    fn check(&self, rule: &CompiledRule, dataset: &Dataset, record: &Record) -> Option<Finding> {
        let row = record.row();
        match self.slots.get(row).copied().unwrap_or(Slot::Covered) {
            Slot::First(position) => {
                let group = &self.keys.groups()[position];
                let message = if group.is_duplicate() {
                    format!(
                        "first occurrence of key '{}' ({} rows share it)",
                        group.display(),
                        group.rows.len()
                    )
                } else {
                    format!("key '{}' is unique", group.display())
                };
                Some(
                    rule.finding(Verdict::pass(message), dataset, row)
                        .with_lineage_entries(self.key_cells(dataset, row)),
                )
            }
            Slot::Duplicate(position) => {
                let group = &self.keys.groups()[position];
                Some(
                    rule.finding(duplicate_verdict(group), dataset, row)
                        .with_lineage_entries(
                            group.rows.iter().flat_map(|&r| self.key_cells(dataset, r)),
                        ),
                )
            }
            Slot::NullKey => Some(
                rule.finding(
                    Verdict::warning("key is null or blank; uniqueness cannot be checked"),
                    dataset,
                    row,
                )
                .with_lineage_entries(self.key_cells(dataset, row)),
            ),
            Slot::Covered => None,
        }
    }
}

fn duplicate_verdict(group: &KeyGroup) -> Verdict {
    let rows = group
        .rows
        .iter()
        .map(|r| r.to_string())
        .collect::<Vec<_>>()
        .join(", ");
    if group.has_exact_duplicate() {
        Verdict::error(format!(
            "key '{}' appears {} times (rows {})",
            group.display(),
            group.rows.len(),
            rows
        ))
    } else {
        Verdict::warning(format!(
            "key '{}' collides with {} other row(s) after normalizing whitespace or case (rows {})",
            group.display(),
            group.rows.len() - 1,
            rows
        ))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::domain::dataset::Column;
    use crate::domain::finding::CheckKind;
    use crate::domain::rules::RuleSetDocument;
    use anyhow::Result;

    fn dataset(columns: &[&str], rows: &[&[Option<&str>]]) -> Arc<Dataset> {
        Arc::new(
            Dataset::new(
                "orders.csv",
                columns.iter().map(|c| Column::untyped(*c)).collect(),
                rows.iter()
                    .map(|r| r.iter().map(|v| v.map(Value::text).unwrap_or(Value::Null)).collect())
                    .collect(),
            )
            .unwrap(),
        )
    }

    fn rules(json: &str) -> Vec<Rule> {
        serde_json::from_str::<RuleSetDocument>(json).unwrap().rules
    }

    fn engine(chunk_size: usize) -> RuleEngine {
        RuleEngine::new(EngineSettings {
            chunk_size,
            ..EngineSettings::default()
        })
    }

    fn orders() -> Arc<Dataset> {
        dataset(
            &["id", "qty", "start", "end", "customer"],
            &[
                &[Some("1"), Some("5"), Some("2024-01-01"), Some("2024-01-05"), Some("C1")],
                &[Some("2"), Some("abc"), Some("2024-02-01"), Some("2024-01-05"), Some("c1 ")],
                &[Some("2"), None, Some("2024-03-01"), None, Some("C9")],
                &[Some("3"), Some(" 7"), Some("2024-04-01"), Some("2024-04-02"), None],
            ],
        )
    }

    fn customers() -> References {
        let mut refs = References::new();
        refs.insert(
            "customers.csv".to_string(),
            dataset(&["id"], &[&[Some("C1")], &[Some("C2")]]),
        );
        refs
    }

    const ALL_RULES: &str = r#"{"rules": [
        {"kind": "type", "column": "qty", "expected": "integer"},
        {"kind": "range", "column": "qty", "min": 0, "max": 10},
        {"kind": "pattern", "column": "id", "pattern": "\\d+"},
        {"kind": "cross_column", "expression": "end >= start"},
        {"kind": "referential_integrity", "column": "customer", "reference": "customers.csv", "reference_key": "id"},
        {"kind": "completeness", "column": "qty"},
        {"kind": "uniqueness", "columns": ["id"]}
    ]}"#;

    #[test]
    fn test_one_finding_per_row_and_row_level_rule() -> Result<()> {
        let ds = orders();
        let findings = engine(2).evaluate(ds.clone(), &rules(ALL_RULES), &customers())?;

        for kind in [
            CheckKind::Type,
            CheckKind::Range,
            CheckKind::Pattern,
            CheckKind::CrossColumn,
            CheckKind::ReferentialIntegrity,
            CheckKind::Completeness,
        ] {
            let rows: Vec<usize> = findings
                .iter()
                .filter(|f| f.rule().kind == kind)
                .filter_map(|f| f.row())
                .collect();
            assert_eq!(rows, vec![0, 1, 2, 3], "rule kind {kind}");
        }

        // Every row is accounted for by a uniqueness finding or its lineage.
        let uniqueness: Vec<&Finding> = findings
            .iter()
            .filter(|f| f.rule().kind == CheckKind::Uniqueness)
            .collect();
        assert_eq!(uniqueness.len(), 4); // first of 1, 2, 3 + one duplicate group
        let dup = uniqueness.iter().find(|f| f.is_error()).unwrap();
        assert_eq!(dup.row(), Some(2));
        let dup_rows: Vec<Option<usize>> = dup.lineage().iter().map(|l| l.row).collect();
        assert_eq!(dup_rows, vec![Some(1), Some(2)]);
        Ok(())
    }

    #[test]
    fn test_findings_are_in_row_then_rule_order() -> Result<()> {
        let findings = engine(3).evaluate(orders(), &rules(ALL_RULES), &customers())?;
        let rows: Vec<Option<usize>> = findings.iter().map(|f| f.row()).collect();
        let mut sorted = rows.clone();
        sorted.sort();
        assert_eq!(rows, sorted);
        assert_eq!(findings[0].rule().kind, CheckKind::Type);
        assert_eq!(findings[1].rule().kind, CheckKind::Range);
        Ok(())
    }

    #[test]
    fn test_evaluation_is_idempotent_and_chunk_independent() -> Result<()> {
        let all = rules(ALL_RULES);
        let a = engine(1).evaluate(orders(), &all, &customers())?;
        let b = engine(1).evaluate(orders(), &all, &customers())?;
        let c = engine(1000).evaluate(orders(), &all, &customers())?;
        assert_eq!(a, b);
        assert_eq!(a, c);
        Ok(())
    }

    #[test]
    fn test_severities_per_rule() -> Result<()> {
        let findings = engine(10).evaluate(orders(), &rules(ALL_RULES), &customers())?;
        let severity = |kind: CheckKind, row: usize| {
            findings
                .iter()
                .find(|f| f.rule().kind == kind && f.row() == Some(row))
                .map(|f| f.severity())
                .unwrap()
        };

        assert_eq!(severity(CheckKind::Type, 1), Severity::Error);
        assert_eq!(severity(CheckKind::Type, 3), Severity::Warning);
        assert_eq!(severity(CheckKind::CrossColumn, 0), Severity::Pass);
        assert_eq!(severity(CheckKind::CrossColumn, 1), Severity::Error);
        assert_eq!(severity(CheckKind::CrossColumn, 2), Severity::Warning);
        assert_eq!(severity(CheckKind::ReferentialIntegrity, 1), Severity::Warning);
        assert_eq!(severity(CheckKind::ReferentialIntegrity, 2), Severity::Error);
        assert_eq!(severity(CheckKind::Completeness, 2), Severity::Error);
        Ok(())
    }

    #[test]
    fn test_missing_column_aborts_before_evaluation() {
        let err = engine(10)
            .evaluate(
                orders(),
                &rules(r#"{"rules": [{"kind": "completeness", "column": "email"}]}"#),
                &References::new(),
            )
            .unwrap_err();
        assert!(matches!(err, DomainError::SchemaMismatch { .. }));
    }

    #[test]
    fn test_unloaded_reference_is_an_evaluation_error() {
        let err = engine(10)
            .evaluate(
                orders(),
                &rules(
                    r#"{"rules": [{"kind": "referential_integrity", "column": "customer", "reference": "nope.csv", "reference_key": "id"}]}"#,
                ),
                &References::new(),
            )
            .unwrap_err();
        assert!(matches!(err, DomainError::EvaluationError(_)));
    }

    #[test]
    fn test_uniqueness_normalized_collision_warns() -> Result<()> {
        let ds = dataset(&["sku"], &[&[Some("AB-1")], &[Some("ab-1 ")], &[None]]);
        let findings = engine(10).evaluate(
            ds,
            &rules(r#"{"rules": [{"kind": "uniqueness", "columns": ["sku"]}]}"#),
            &References::new(),
        )?;
        let severities: Vec<Severity> = findings.iter().map(|f| f.severity()).collect();
        assert_eq!(
            severities,
            vec![Severity::Pass, Severity::Warning, Severity::Warning]
        );
        Ok(())
    }

    #[test]
    fn test_chunks_cover_the_dataset() -> Result<()> {
        let plan = engine(3).prepare(orders(), &[], &References::new())?;
        assert_eq!(plan.chunks(), vec![0..3, 3..4]);
        Ok(())
    }
}
