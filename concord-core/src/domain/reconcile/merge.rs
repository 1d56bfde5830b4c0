// concord-core/src/domain/reconcile/merge.rs

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use tracing::{debug, instrument};

use super::{cell_lineage, ordered_keys, require_datasets, require_key};
use crate::domain::dataset::{Column, ColumnType, Dataset, Record, RowOrigin, Value};
use crate::domain::error::DomainError;
use crate::domain::finding::{CheckKind, Finding, LineageEntry, RuleRef, Severity};
use crate::domain::key_index::{KeyIndex, display_key};
use crate::domain::normalize::Sensitivity;

/// How a column value is chosen when several sources supply one. Ties go to input order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MergeStrategy {
    #[default]
    FirstWins,
    LastWins,
    MostComplete,
}

impl MergeStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            MergeStrategy::FirstWins => "first-wins",
            MergeStrategy::LastWins => "last-wins",
            MergeStrategy::MostComplete => "most-complete",
        }
    }
}

impl fmt::Display for MergeStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MergeStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace('_', "-").as_str() {
            "first-wins" | "first" => Ok(MergeStrategy::FirstWins),
            "last-wins" | "last" => Ok(MergeStrategy::LastWins),
            "most-complete" => Ok(MergeStrategy::MostComplete),
            _ => Err(format!(
                "Unknown merge strategy: {} (expected first-wins, last-wins or most-complete)",
                s
            )),
        }
    }
}

const MERGED_SOURCE_PREFIX: &str = "merged:";

/// Source column renames applied before matching.
/// Per-source entries win over global ones and are looked up by full path or file name.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ColumnMap {
    #[serde(rename = "columns", default)]
    pub global: BTreeMap<String, String>,
    #[serde(rename = "sources", default)]
    pub per_source: BTreeMap<String, BTreeMap<String, String>>,
}

impl ColumnMap {
    pub fn rename(&mut self, from: impl Into<String>, to: impl Into<String>) {
        self.global.insert(from.into(), to.into());
    }

    pub fn is_empty(&self) -> bool {
        self.global.is_empty() && self.per_source.values().all(BTreeMap::is_empty)
    }

    /// Canonical name of `column` as read from `source`.
    pub fn canonical<'a>(&'a self, source: &str, column: &'a str) -> &'a str {
        let file_name = Path::new(source)
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or(source);
        self.per_source
            .get(source)
            .or_else(|| self.per_source.get(file_name))
            .and_then(|renames| renames.get(column))
            .or_else(|| self.global.get(column))
            .map(String::as_str)
            .unwrap_or(column)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MergeJoin {
    /// Every key appears in the output.
    #[default]
    Outer,
    /// Only keys present in every dataset.
    Inner,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MergeOptions {
    pub primary_key: Vec<String>,
    #[serde(default)]
    pub strategy: MergeStrategy,
    #[serde(default)]
    pub column_map: ColumnMap,
    #[serde(default)]
    pub sensitivity: Sensitivity,
    #[serde(default)]
    pub join: MergeJoin,
    pub output_name: String,
}

impl MergeOptions {
    pub fn new(primary_key: Vec<String>, output_name: impl Into<String>) -> Self {
        Self {
            primary_key,
            strategy: MergeStrategy::default(),
            column_map: ColumnMap::default(),
            sensitivity: Sensitivity::default(),
            join: MergeJoin::default(),
            output_name: output_name.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MergeOutcome {
    pub dataset: Dataset,
    pub findings: Vec<Finding>,
}

/// One dataset aligned to the canonical schema.
struct Aligned<'a> {
    dataset: &'a Dataset,
    /// Canonical column position -> source column position.
    slots: Vec<Option<usize>>,
    keys: KeyIndex,
}

struct Candidate<'a> {
    side: &'a Aligned<'a>,
    row: usize,
    column: usize,
    value: &'a Value,
}

impl Candidate<'_> {
    fn lineage(&self) -> LineageEntry {
        cell_lineage(self.side.dataset, self.row, self.column)
    }

    fn raw(&self) -> Option<String> {
        self.value.as_text().map(|t| t.into_owned())
    }
}

/// Combines datasets into one by primary key.
#[instrument(skip_all, fields(datasets = datasets.len(), strategy = %options.strategy, output = %options.output_name))]
pub fn merge(datasets: &[Dataset], options: &MergeOptions) -> Result<MergeOutcome, DomainError> {
    require_datasets(datasets, "merge")?;
    require_key(&options.primary_key)?;

    let columns = canonical_schema(datasets, &options.column_map)?;
    let names: Vec<&str> = columns.iter().map(|c| c.name.as_str()).collect();

    let mut aligned = Vec::with_capacity(datasets.len());
    for dataset in datasets {
        aligned.push(align(dataset, &names, options)?);
    }

    let rule_name = format!("merge:{}", options.primary_key.join(","));
    let merged_label = merged_source(&options.output_name);
    let rule = |kind| RuleRef::new(rule_name.clone(), kind);
    let mut findings = Vec::new();
    let mut records = Vec::new();

    for key in ordered_keys(aligned.iter().map(|a| &a.keys)) {
        let mut contributors: Vec<(&Aligned<'_>, usize)> = Vec::new();
        for side in &aligned {
            let Some(group) = side.keys.get(&key) else {
                continue;
            };
            let kept = group.first_row();
            contributors.push((side, kept));
            for &extra in &group.rows[1..] {
                findings.push(
                    Finding::new(Severity::Error, rule(CheckKind::DuplicateKey), side.dataset.source())
                        .at_row(extra)
                        .with_message(format!(
                            "key '{}' already seen at row {}; this record was not merged",
                            group.display(),
                            kept
                        ))
                        .with_lineage(LineageEntry::row(side.dataset.source(), extra))
                        .with_lineage(LineageEntry::row(side.dataset.source(), kept)),
                );
            }
        }

        if options.join == MergeJoin::Inner && contributors.len() < aligned.len() {
            let absent: Vec<&str> = aligned
                .iter()
                .filter(|a| !contributors.iter().any(|(c, _)| std::ptr::eq(*c, *a)))
                .map(|a| a.dataset.source())
                .collect();
            for (side, row) in &contributors {
                findings.push(
                    Finding::new(Severity::Warning, rule(CheckKind::Unmatched), side.dataset.source())
                        .at_row(*row)
                        .with_message(format!(
                            "key '{}' is absent from {}; dropped by inner join",
                            display_key(&key),
                            absent.join(", ")
                        ))
                        .with_lineage(LineageEntry::row(side.dataset.source(), *row)),
                );
            }
            continue;
        }

        let merged_row = records.len();
        let mut values = Vec::with_capacity(columns.len());
        for (position, column) in columns.iter().enumerate() {
            let candidates: Vec<Candidate<'_>> = contributors
                .iter()
                .filter_map(|(side, row)| {
                    side.slots[position].map(|c| Candidate {
                        side,
                        row: *row,
                        column: c,
                        value: side.dataset.cell(*row, c),
                    })
                })
                .collect();

            let winner = pick(&candidates, options.strategy);
            values.push(
                winner
                    .map(|w| candidates[w].value.clone())
                    .unwrap_or(Value::Null),
            );

            if let Some(w) = winner
                && let Some(conflict) = conflict(&candidates, w)
            {
                findings.push(
                    Finding::new(Severity::Warning, rule(CheckKind::MergeConflict), &merged_label)
                        .at_row(merged_row)
                        .on_column(column.name.clone())
                        .with_message(format!(
                            "kept '{}' from {} ({}); discarded {}",
                            candidates[w].raw().unwrap_or_default(),
                            candidates[w].side.dataset.source(),
                            options.strategy,
                            conflict
                                .iter()
                                .map(|c| format!("'{}'", c.raw().unwrap_or_default()))
                                .collect::<Vec<_>>()
                                .join(", ")
                        ))
                        .with_lineage(candidates[w].lineage())
                        .with_lineage_entries(conflict.iter().map(|c| c.lineage())),
                );
            }
        }

        let origins = contributors
            .iter()
            .map(|(side, row)| RowOrigin {
                source: side.dataset.source().to_string(),
                row: *row,
            })
            .collect();
        records.push(Record::merged(values, origins));
    }

    for side in &aligned {
        for &row in side.keys.null_rows() {
            findings.push(
                Finding::new(Severity::Error, rule(CheckKind::Unmatched), side.dataset.source())
                    .at_row(row)
                    .with_message("primary key is null or blank; the record was not merged")
                    .with_lineage(LineageEntry::row(side.dataset.source(), row)),
            );
        }
    }

    let dataset = Dataset::from_records(merged_label, columns, records)?;
    debug!(rows = dataset.len(), findings = findings.len(), "Merge complete");
    Ok(MergeOutcome { dataset, findings })
}

/// Source label of the merged dataset. The prefix marks it as produced in memory, not read
/// from disk, so report lineage never mistakes it for an input file.
fn merged_source(output_name: &str) -> String {
    format!("{}{}", MERGED_SOURCE_PREFIX, output_name)
}

/// Ordered union of canonical column names. Types are kept only when every source agrees.
fn canonical_schema(datasets: &[Dataset], map: &ColumnMap) -> Result<Vec<Column>, DomainError> {
    let mut columns: Vec<Column> = Vec::new();
    let mut positions: HashMap<String, usize> = HashMap::new();

    for dataset in datasets {
        let mut claimed: HashMap<&str, &str> = HashMap::new();
        for column in dataset.columns() {
            let canonical = map.canonical(dataset.source(), &column.name);
            if let Some(previous) = claimed.insert(canonical, &column.name) {
                return Err(DomainError::InvalidArgument(format!(
                    "columns '{}' and '{}' of {} both map to '{}'",
                    previous,
                    column.name,
                    dataset.source(),
                    canonical
                )));
            }
            match positions.get(canonical) {
                Some(&i) => {
                    if columns[i].column_type != column.column_type {
                        columns[i].column_type = ColumnType::Unknown;
                    }
                }
                None => {
                    positions.insert(canonical.to_string(), columns.len());
                    columns.push(Column::new(canonical, column.column_type));
                }
            }
        }
    }
    Ok(columns)
}

fn align<'a>(
    dataset: &'a Dataset,
    names: &[&str],
    options: &MergeOptions,
) -> Result<Aligned<'a>, DomainError> {
    let renamed: Vec<&str> = dataset
        .columns()
        .iter()
        .map(|c| options.column_map.canonical(dataset.source(), &c.name))
        .collect();
    let slots: Vec<Option<usize>> = names
        .iter()
        .map(|name| renamed.iter().position(|r| r == name))
        .collect();

    let mut key_columns = Vec::with_capacity(options.primary_key.len());
    for key in &options.primary_key {
        let position = renamed
            .iter()
            .position(|r| r == key)
            .ok_or_else(|| DomainError::SchemaMismatch {
                column: key.clone(),
                source_id: dataset.source().to_string(),
                available: renamed.join(", "),
            })?;
        key_columns.push(position);
    }

    let keys = KeyIndex::build(dataset, &key_columns, options.sensitivity);
    Ok(Aligned {
        dataset,
        slots,
        keys,
    })
}

/// Index of the winning candidate. Null never wins; `None` when every candidate is null.
fn pick(candidates: &[Candidate<'_>], strategy: MergeStrategy) -> Option<usize> {
    let filled = || {
        candidates
            .iter()
            .enumerate()
            .filter(|(_, c)| !c.value.is_blank())
            .map(|(i, _)| i)
    };
    // Blank text only wins when no candidate carries a value.
    let present = || {
        candidates
            .iter()
            .enumerate()
            .filter(|(_, c)| !c.value.is_null())
            .map(|(i, _)| i)
    };
    match strategy {
        MergeStrategy::FirstWins | MergeStrategy::MostComplete => {
            filled().next().or_else(|| present().next())
        }
        MergeStrategy::LastWins => filled().last().or_else(|| present().last()),
    }
}

/// Candidates whose raw value was discarded. Empty when all non-null values agree.
fn conflict<'c, 'a>(candidates: &'c [Candidate<'a>], winner: usize) -> Option<Vec<&'c Candidate<'a>>> {
    let kept = candidates[winner].raw();
    let discarded: Vec<&Candidate<'_>> = candidates
        .iter()
        .enumerate()
        .filter(|(i, c)| *i != winner && !c.value.is_null() && c.raw() != kept)
        .map(|(_, c)| c)
        .collect();
    if discarded.is_empty() {
        None
    } else {
        Some(discarded)
    }
}
