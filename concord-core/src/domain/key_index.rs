// concord-core/src/domain/key_index.rs
//
// Full-dataset key index: the "index pass" shared by uniqueness checks, compare and merge.

use std::collections::HashMap;

use crate::domain::dataset::Dataset;
use crate::domain::normalize::Sensitivity;

const KEY_SEPARATOR: char = '\u{1f}';

/// Rows sharing one normalized key, in row order.
#[derive(Debug, Clone, PartialEq)]
pub struct KeyGroup {
    pub key: String,
    pub rows: Vec<usize>,
    /// Raw (un-normalized) key text per row, aligned with `rows`.
    pub raw: Vec<String>,
}

impl KeyGroup {
    pub fn first_row(&self) -> usize {
        self.rows[0]
    }

    pub fn is_duplicate(&self) -> bool {
        self.rows.len() > 1
    }

    /// At least two rows carry the exact same raw key.
    pub fn has_exact_duplicate(&self) -> bool {
        self.raw
            .iter()
            .enumerate()
            .any(|(i, a)| self.raw[i + 1..].iter().any(|b| a == b))
    }

    /// Human-readable form of the first raw key.
    pub fn display(&self) -> String {
        display_key(&self.raw[0])
    }
}

#[derive(Debug, Clone, Default)]
pub struct KeyIndex {
    groups: Vec<KeyGroup>,
    lookup: HashMap<String, usize>,
    null_rows: Vec<usize>,
}

impl KeyIndex {
    /// Indexes `columns` of every record. Rows with any null or blank key part are set aside.
    pub fn build(dataset: &Dataset, columns: &[usize], sensitivity: Sensitivity) -> Self {
        let mut index = KeyIndex::default();

        'rows: for record in dataset.records() {
            let mut normalized = Vec::with_capacity(columns.len());
            let mut raw = Vec::with_capacity(columns.len());
            for &column in columns {
                let value = record.value(column);
                match (sensitivity.key_of(value), value.as_text()) {
                    (Some(key), Some(text)) => {
                        normalized.push(key);
                        raw.push(text.into_owned());
                    }
                    _ => {
                        index.null_rows.push(record.row());
                        continue 'rows;
                    }
                }
            }

            let key = join_parts(&normalized);
            let raw = join_parts(&raw);
            match index.lookup.get(&key) {
                Some(&position) => {
                    let group = &mut index.groups[position];
                    group.rows.push(record.row());
                    group.raw.push(raw);
                }
                None => {
                    index.lookup.insert(key.clone(), index.groups.len());
                    index.groups.push(KeyGroup {
                        key,
                        rows: vec![record.row()],
                        raw: vec![raw],
                    });
                }
            }
        }

        index
    }

    /// Groups in first-seen order.
    pub fn groups(&self) -> &[KeyGroup] {
        &self.groups
    }

    pub fn get(&self, key: &str) -> Option<&KeyGroup> {
        self.lookup.get(key).map(|&i| &self.groups[i])
    }

    pub fn contains(&self, key: &str) -> bool {
        self.lookup.contains_key(key)
    }

    pub fn null_rows(&self) -> &[usize] {
        &self.null_rows
    }
}

fn join_parts(parts: &[String]) -> String {
    let mut out = String::new();
    for (i, part) in parts.iter().enumerate() {
        if i > 0 {
            out.push(KEY_SEPARATOR);
        }
        out.push_str(part);
    }
    out
}

pub fn display_key(key: &str) -> String {
    key.replace(KEY_SEPARATOR, ", ")
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::domain::dataset::{Column, Value};

    fn dataset(keys: &[Option<&str>]) -> Dataset {
        Dataset::new(
            "keys.csv",
            vec![Column::untyped("id")],
            keys.iter()
                .map(|k| vec![k.map(Value::text).unwrap_or(Value::Null)])
                .collect(),
        )
        .unwrap()
    }

    #[test]
    fn test_groups_follow_first_seen_order() {
        let ds = dataset(&[Some("b"), Some("a"), Some("b"), None]);
        let index = KeyIndex::build(&ds, &[0], Sensitivity::NORMALIZED);

        let keys: Vec<&str> = index.groups().iter().map(|g| g.key.as_str()).collect();
        assert_eq!(keys, vec!["b", "a"]);
        assert_eq!(index.get("b").unwrap().rows, vec![0, 2]);
        assert_eq!(index.null_rows(), &[3]);
    }

    #[test]
    fn test_normalized_collisions_are_flagged() {
        let ds = dataset(&[Some("A1"), Some(" a1")]);
        let index = KeyIndex::build(&ds, &[0], Sensitivity::NORMALIZED);
        let group = index.get("a1").unwrap();
        assert!(group.is_duplicate());
        assert!(!group.has_exact_duplicate());
        assert_eq!(group.display(), "A1");

        let strict = KeyIndex::build(&ds, &[0], Sensitivity::STRICT);
        assert_eq!(strict.groups().len(), 2);
    }
}
