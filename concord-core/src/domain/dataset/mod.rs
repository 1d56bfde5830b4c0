// concord-core/src/domain/dataset/mod.rs
//
// In-memory tabular model shared by the rule engine and the reconciliation engine.
// Loaders build it once; nothing in the domain mutates it afterwards.

pub mod value;

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

use crate::domain::error::DomainError;
pub use value::Value;

static NULL_VALUE: Value = Value::Null;

/// Type reported by the loader. Informational only: rules declare their own expectations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnType {
    Integer,
    Number,
    Boolean,
    Date,
    Text,
    #[default]
    Unknown,
}

impl ColumnType {
    /// Maps a SQL engine type name (`BIGINT`, `DOUBLE`, `VARCHAR`...) onto a column type.
    pub fn from_sql_type(sql: &str) -> Self {
        let upper = sql.to_ascii_uppercase();
        match upper.as_str() {
            "TINYINT" | "SMALLINT" | "INTEGER" | "BIGINT" | "HUGEINT" | "UTINYINT"
            | "USMALLINT" | "UINTEGER" | "UBIGINT" => ColumnType::Integer,
            "FLOAT" | "DOUBLE" | "REAL" => ColumnType::Number,
            "BOOLEAN" => ColumnType::Boolean,
            "DATE" => ColumnType::Date,
            "VARCHAR" | "TEXT" => ColumnType::Text,
            _ if upper.starts_with("DECIMAL") => ColumnType::Number,
            _ if upper.starts_with("TIMESTAMP") => ColumnType::Date,
            _ => ColumnType::Unknown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ColumnType::Integer => "integer",
            ColumnType::Number => "number",
            ColumnType::Boolean => "boolean",
            ColumnType::Date => "date",
            ColumnType::Text => "text",
            ColumnType::Unknown => "unknown",
        }
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Column {
    pub name: String,
    pub column_type: ColumnType,
}

impl Column {
    pub fn new(name: impl Into<String>, column_type: ColumnType) -> Self {
        Self {
            name: name.into(),
            column_type,
        }
    }

    pub fn untyped(name: impl Into<String>) -> Self {
        Self::new(name, ColumnType::Unknown)
    }
}

/// One (file, row) pair a record was built from.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RowOrigin {
    pub source: String,
    pub row: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    row: usize,
    values: Vec<Value>,
    origins: Vec<RowOrigin>,
}

impl Record {
    pub(crate) fn merged(values: Vec<Value>, origins: Vec<RowOrigin>) -> Self {
        Self {
            row: 0,
            values,
            origins,
        }
    }

    /// Zero-based position inside its dataset.
    pub fn row(&self) -> usize {
        self.row
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }

    pub fn value(&self, column: usize) -> &Value {
        self.values.get(column).unwrap_or(&NULL_VALUE)
    }

    /// A loaded record has a single origin; a merged record has one per contributing source.
    pub fn origins(&self) -> &[RowOrigin] {
        &self.origins
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    source: String,
    columns: Vec<Column>,
    records: Vec<Record>,
}

impl Dataset {
    /// Builds a dataset from raw rows. Every row must be as wide as the column list.
    pub fn new(
        source: impl Into<String>,
        columns: Vec<Column>,
        rows: Vec<Vec<Value>>,
    ) -> Result<Self, DomainError> {
        let source = source.into();
        check_columns(&source, &columns)?;

        let mut records = Vec::with_capacity(rows.len());
        for (row, values) in rows.into_iter().enumerate() {
            if values.len() != columns.len() {
                return Err(DomainError::MalformedDataset {
                    source_id: source,
                    reason: format!(
                        "row {} has {} values, expected {}",
                        row,
                        values.len(),
                        columns.len()
                    ),
                });
            }
            records.push(Record {
                row,
                values,
                origins: vec![RowOrigin {
                    source: source.clone(),
                    row,
                }],
            });
        }

        Ok(Self {
            source,
            columns,
            records,
        })
    }

    /// Assembles a derived dataset (e.g. a merge result). Row indexes are renumbered.
    pub(crate) fn from_records(
        source: impl Into<String>,
        columns: Vec<Column>,
        records: Vec<Record>,
    ) -> Result<Self, DomainError> {
        let source = source.into();
        check_columns(&source, &columns)?;
        let records = records
            .into_iter()
            .enumerate()
            .map(|(row, mut record)| {
                record.row = row;
                record.values.resize(columns.len(), Value::Null);
                record
            })
            .collect();
        Ok(Self {
            source,
            columns,
            records,
        })
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }

    /// Like [`Dataset::column_index`] but fails with `SchemaMismatch`.
    pub fn require_column(&self, name: &str) -> Result<usize, DomainError> {
        self.column_index(name)
            .ok_or_else(|| DomainError::SchemaMismatch {
                column: name.to_string(),
                source_id: self.source.clone(),
                available: self.column_names().join(", "),
            })
    }

    pub fn cell(&self, row: usize, column: usize) -> &Value {
        self.records
            .get(row)
            .map(|r| r.value(column))
            .unwrap_or(&NULL_VALUE)
    }

    pub fn head(&self, n: usize) -> &[Record] {
        &self.records[..n.min(self.records.len())]
    }
}

fn check_columns(source: &str, columns: &[Column]) -> Result<(), DomainError> {
    let mut seen = HashSet::new();
    for column in columns {
        if !seen.insert(column.name.as_str()) {
            return Err(DomainError::MalformedDataset {
                source_id: source.to_string(),
                reason: format!("duplicate column name '{}'", column.name),
            });
        }
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use anyhow::Result;

    #[test]
    fn test_rows_keep_their_origin() -> Result<()> {
        let ds = Dataset::new(
            "a.csv",
            vec![Column::untyped("id"), Column::untyped("name")],
            vec![
                vec![Value::text("1"), Value::text("Acme")],
                vec![Value::text("2"), Value::Null],
            ],
        )?;

        assert_eq!(ds.len(), 2);
        assert_eq!(ds.records()[1].row(), 1);
        assert_eq!(
            ds.records()[1].origins(),
            &[RowOrigin {
                source: "a.csv".into(),
                row: 1
            }]
        );
        assert_eq!(ds.cell(0, 1), &Value::text("Acme"));
        assert_eq!(ds.cell(9, 9), &Value::Null);
        Ok(())
    }

    #[test]
    fn test_ragged_rows_are_rejected() {
        let err = Dataset::new(
            "a.csv",
            vec![Column::untyped("id")],
            vec![vec![Value::text("1"), Value::text("extra")]],
        )
        .unwrap_err();
        assert!(matches!(err, DomainError::MalformedDataset { .. }));
    }

    #[test]
    fn test_require_column_lists_available_columns() {
        let ds = Dataset::new("a.csv", vec![Column::untyped("id")], vec![]).unwrap();
        match ds.require_column("email").unwrap_err() {
            DomainError::SchemaMismatch {
                column, available, ..
            } => {
                assert_eq!(column, "email");
                assert_eq!(available, "id");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_sql_types_map_to_column_types() {
        assert_eq!(ColumnType::from_sql_type("BIGINT"), ColumnType::Integer);
        assert_eq!(ColumnType::from_sql_type("DECIMAL(10,2)"), ColumnType::Number);
        assert_eq!(ColumnType::from_sql_type("timestamp with time zone"), ColumnType::Date);
        assert_eq!(ColumnType::from_sql_type("STRUCT(a INT)"), ColumnType::Unknown);
    }
}
