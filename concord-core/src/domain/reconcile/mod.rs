// concord-core/src/domain/reconcile/mod.rs
//
// Cross-file record matching. Both operations index every dataset by its normalized primary
// key first, then walk the keys in first-seen order (datasets in input order).

pub mod compare;
pub mod merge;

pub use compare::{CompareOptions, compare};
pub use merge::{ColumnMap, MergeJoin, MergeOptions, MergeOutcome, MergeStrategy, merge};

use std::collections::HashSet;

use crate::domain::dataset::Dataset;
use crate::domain::error::DomainError;
use crate::domain::finding::LineageEntry;
use crate::domain::key_index::KeyIndex;

fn require_datasets(datasets: &[Dataset], operation: &str) -> Result<(), DomainError> {
    if datasets.len() < 2 {
        return Err(DomainError::InvalidArgument(format!(
            "{} needs at least two datasets, got {}",
            operation,
            datasets.len()
        )));
    }
    Ok(())
}

fn require_key(primary_key: &[String]) -> Result<(), DomainError> {
    if primary_key.is_empty() || primary_key.iter().any(|k| k.trim().is_empty()) {
        return Err(DomainError::InvalidArgument(
            "primary key must name at least one column".to_string(),
        ));
    }
    Ok(())
}

/// Every normalized key, in first-seen order across `indexes`.
fn ordered_keys<'a>(indexes: impl IntoIterator<Item = &'a KeyIndex>) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut keys = Vec::new();
    for index in indexes {
        for group in index.groups() {
            if seen.insert(group.key.as_str()) {
                keys.push(group.key.clone());
            }
        }
    }
    keys
}

/// Lineage to the key cells of one row.
fn key_lineage(dataset: &Dataset, row: usize, columns: &[usize]) -> Vec<LineageEntry> {
    columns
        .iter()
        .map(|&column| cell_lineage(dataset, row, column))
        .collect()
}

fn cell_lineage(dataset: &Dataset, row: usize, column: usize) -> LineageEntry {
    let entry = LineageEntry::cell(
        dataset.source(),
        row,
        dataset.columns()[column].name.clone(),
    );
    match dataset.cell(row, column).as_text() {
        Some(text) => entry.with_value(text.into_owned()),
        None => entry,
    }
}
