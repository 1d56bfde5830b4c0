// concord-core/src/domain/reconcile/compare.rs

use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use super::{cell_lineage, key_lineage, ordered_keys, require_datasets, require_key};
use crate::domain::dataset::{Dataset, Value};
use crate::domain::error::DomainError;
use crate::domain::finding::{CheckKind, Finding, LineageEntry, RuleRef, Severity};
use crate::domain::key_index::{KeyGroup, KeyIndex, display_key};
use crate::domain::normalize::{Match, Sensitivity};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompareOptions {
    pub primary_key: Vec<String>,
    #[serde(default)]
    pub sensitivity: Sensitivity,
    /// When false only key presence is reconciled (`--keys-only`).
    #[serde(default = "default_compare_values")]
    pub compare_values: bool,
}

fn default_compare_values() -> bool {
    true
}

impl CompareOptions {
    pub fn new(primary_key: Vec<String>) -> Self {
        Self {
            primary_key,
            sensitivity: Sensitivity::default(),
            compare_values: true,
        }
    }
}

/// One dataset prepared for matching.
struct Indexed<'a> {
    dataset: &'a Dataset,
    key_columns: Vec<usize>,
    keys: KeyIndex,
}

/// Matches records across datasets by primary key.
#[instrument(skip_all, fields(datasets = datasets.len(), key = %options.primary_key.join(",")))]
pub fn compare(datasets: &[Dataset], options: &CompareOptions) -> Result<Vec<Finding>, DomainError> {
    require_datasets(datasets, "compare")?;
    require_key(&options.primary_key)?;

    let mut indexed = Vec::with_capacity(datasets.len());
    for dataset in datasets {
        let key_columns = options
            .primary_key
            .iter()
            .map(|k| dataset.require_column(k))
            .collect::<Result<Vec<_>, _>>()?;
        let keys = KeyIndex::build(dataset, &key_columns, options.sensitivity);
        indexed.push(Indexed {
            dataset,
            key_columns,
            keys,
        });
    }

    let rule_name = format!("compare:{}", options.primary_key.join(","));
    let shared = shared_columns(&indexed, &options.primary_key);
    let all_keys = ordered_keys(indexed.iter().map(|i| &i.keys));
    debug!(keys = all_keys.len(), shared = shared.len(), "Key indexes built");

    let mut findings = Vec::new();
    for key in &all_keys {
        let groups: Vec<Option<&KeyGroup>> = indexed.iter().map(|i| i.keys.get(key)).collect();

        for (side, group) in indexed.iter().zip(&groups) {
            if let Some(group) = group
                && group.is_duplicate()
            {
                findings.push(duplicate_finding(&rule_name, side, group));
            }
        }

        let found: Vec<LineageEntry> = indexed
            .iter()
            .zip(&groups)
            .filter_map(|(side, group)| group.map(|g| (side, g)))
            .flat_map(|(side, group)| {
                group
                    .rows
                    .iter()
                    .flat_map(|&row| key_lineage(side.dataset, row, &side.key_columns))
            })
            .collect();

        let display = groups
            .iter()
            .flatten()
            .next()
            .map(|g| g.display())
            .unwrap_or_else(|| display_key(key));

        for (side, group) in indexed.iter().zip(&groups) {
            if group.is_none() {
                findings.push(
                    Finding::new(
                        Severity::Error,
                        RuleRef::new(rule_name.clone(), CheckKind::MissingRecord),
                        side.dataset.source(),
                    )
                    .with_message(format!(
                        "key '{}' has no record in {}",
                        display,
                        side.dataset.source()
                    ))
                    .with_lineage_entries(found.clone()),
                );
            }
        }

        let singles: Option<Vec<&KeyGroup>> = groups
            .iter()
            .map(|g| g.filter(|g| !g.is_duplicate()))
            .collect();
        if let Some(singles) = singles {
            findings.push(match_finding(
                &rule_name,
                &indexed,
                &singles,
                &shared,
                options,
            ));
        }
    }

    for side in &indexed {
        for &row in side.keys.null_rows() {
            findings.push(
                Finding::new(
                    Severity::Error,
                    RuleRef::new(rule_name.clone(), CheckKind::Unmatched),
                    side.dataset.source(),
                )
                .at_row(row)
                .with_message("primary key is null or blank; the record cannot be matched")
                .with_lineage_entries(key_lineage(side.dataset, row, &side.key_columns)),
            );
        }
    }

    Ok(findings)
}

/// Non-key columns of the first dataset that every other dataset also has.
fn shared_columns(indexed: &[Indexed<'_>], primary_key: &[String]) -> Vec<String> {
    indexed[0]
        .dataset
        .columns()
        .iter()
        .map(|c| c.name.clone())
        .filter(|name| !primary_key.contains(name))
        .filter(|name| {
            indexed[1..]
                .iter()
                .all(|i| i.dataset.column_index(name).is_some())
        })
        .collect()
}

fn duplicate_finding(rule_name: &str, side: &Indexed<'_>, group: &KeyGroup) -> Finding {
    let rows = group
        .rows
        .iter()
        .map(|r| r.to_string())
        .collect::<Vec<_>>()
        .join(", ");
    Finding::new(
        Severity::Error,
        RuleRef::new(rule_name, CheckKind::DuplicateKey),
        side.dataset.source(),
    )
    .at_row(group.rows[1])
    .with_message(format!(
        "key '{}' appears {} times (rows {}); excluded from matching",
        group.display(),
        group.rows.len(),
        rows
    ))
    .with_lineage_entries(
        group
            .rows
            .iter()
            .flat_map(|&row| key_lineage(side.dataset, row, &side.key_columns)),
    )
}

fn match_finding(
    rule_name: &str,
    indexed: &[Indexed<'_>],
    groups: &[&KeyGroup],
    shared: &[String],
    options: &CompareOptions,
) -> Finding {
    let first = &indexed[0];
    let first_row = groups[0].first_row();
    let display = groups[0].display();
    let raw_keys: Vec<&str> = groups.iter().map(|g| g.raw[0].as_str()).collect();
    let mut normalized = raw_keys.iter().any(|k| *k != raw_keys[0]);

    let mut mismatches = Vec::new();
    let mut lineage = Vec::new();
    if options.compare_values {
        for column in shared {
            let cells: Vec<(&Indexed<'_>, usize, usize)> = indexed
                .iter()
                .zip(groups)
                .filter_map(|(side, group)| {
                    side.dataset
                        .column_index(column)
                        .map(|c| (side, group.first_row(), c))
                })
                .collect();
            let base = first.dataset.cell(first_row, cells[0].2);
            let outcome = cells[1..].iter().fold(Match::Exact, |acc, (side, row, c)| {
                worst(acc, compare_cells(base, side.dataset.cell(*row, *c), options.sensitivity))
            });
            match outcome {
                Match::Exact => {}
                Match::Normalized => normalized = true,
                Match::Different => {
                    mismatches.push(column.as_str());
                    lineage.extend(
                        cells
                            .iter()
                            .map(|(side, row, c)| cell_lineage(side.dataset, *row, *c)),
                    );
                }
            }
        }
    }

    let finding = |severity, kind, message: String| {
        Finding::new(severity, RuleRef::new(rule_name, kind), first.dataset.source())
            .at_row(first_row)
            .with_message(message)
    };

    if !mismatches.is_empty() {
        return finding(
            Severity::Error,
            CheckKind::FieldMismatch,
            format!(
                "key '{}' matched but values differ in: {}",
                display,
                mismatches.join(", ")
            ),
        )
        .with_lineage_entries(lineage);
    }

    let rows = indexed.iter().zip(groups).map(|(side, group)| {
        LineageEntry::row(side.dataset.source(), group.first_row())
    });
    if normalized {
        finding(
            Severity::Warning,
            CheckKind::RecordMatch,
            format!(
                "key '{}' matched only after normalizing whitespace or case",
                display
            ),
        )
        .with_lineage_entries(rows)
    } else {
        finding(
            Severity::Pass,
            CheckKind::RecordMatch,
            format!("key '{}' matched in every dataset", display),
        )
        .with_lineage_entries(rows)
    }
}

fn compare_cells(left: &Value, right: &Value, sensitivity: Sensitivity) -> Match {
    match (left.as_text(), right.as_text()) {
        (None, None) => Match::Exact,
        (Some(a), Some(b)) => sensitivity.compare(&a, &b),
        _ => Match::Different,
    }
}

fn worst(a: Match, b: Match) -> Match {
    if a.severity() >= b.severity() { a } else { b }
}
