// concord-core/src/infrastructure/adapters/duckdb.rs
//
// Columnar and delimited scans through an in-memory DuckDB. Every cell is read back as
// VARCHAR and converted using the column type DuckDB inferred, so no value is reformatted
// by the driver.

use async_trait::async_trait;
use duckdb::{Config, Connection};
use std::path::Path;
use std::sync::{Arc, Mutex};
use tracing::{debug, instrument};

use crate::domain::dataset::value::{parse_bool, parse_date, parse_number};
use crate::domain::dataset::{Column, ColumnType, Dataset, Value};
use crate::error::ConcordError;
use crate::infrastructure::error::InfrastructureError;
use crate::ports::loader::DatasetLoader;

/// DuckDB table functions able to scan a file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanFunction {
    Csv,
    Parquet,
    Json,
}

impl ScanFunction {
    pub fn for_extension(extension: &str) -> Option<Self> {
        match extension {
            "csv" | "tsv" | "txt" => Some(ScanFunction::Csv),
            "parquet" => Some(ScanFunction::Parquet),
            "json" | "jsonl" | "ndjson" => Some(ScanFunction::Json),
            _ => None,
        }
    }

    fn call(&self, path: &str) -> String {
        let escaped = path.replace('\'', "''");
        match self {
            ScanFunction::Csv => format!("read_csv_auto('{}', header = true)", escaped),
            ScanFunction::Parquet => format!("read_parquet('{}')", escaped),
            ScanFunction::Json => format!("read_json_auto('{}')", escaped),
        }
    }
}

pub struct DuckDbLoader {
    conn: Arc<Mutex<Connection>>,
}

impl DuckDbLoader {
    pub fn new() -> Result<Self, InfrastructureError> {
        let conn = Connection::open_in_memory_with_flags(Config::default())?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Connection>, InfrastructureError> {
        self.conn
            .lock()
            .map_err(|_| InfrastructureError::Io(std::io::Error::other("DuckDB Mutex Poisoned")))
    }

    /// Column names and inferred types, without reading the data.
    pub fn describe(&self, path: &str, scan: ScanFunction) -> Result<Vec<Column>, InfrastructureError> {
        let conn = self.lock()?;
        let mut stmt = conn
            .prepare(&format!("DESCRIBE SELECT * FROM {}", scan.call(path)))
            .map_err(|e| unreadable(path, e))?;
        let rows = stmt
            .query_map([], |row| {
                let name: String = row.get(0)?;
                let sql_type: String = row.get(1)?;
                Ok(Column::new(name, ColumnType::from_sql_type(&sql_type)))
            })
            .map_err(|e| unreadable(path, e))?;

        let mut columns = Vec::new();
        for row in rows {
            columns.push(row?);
        }
        Ok(columns)
    }

    #[instrument(skip(self), fields(scan = ?scan))]
    pub fn scan(&self, path: &str, scan: ScanFunction) -> Result<Dataset, ConcordError> {
        let columns = self.describe(path, scan)?;
        let width = columns.len();

        let conn = self.lock()?;
        let mut stmt = conn
            .prepare(&format!(
                "SELECT COLUMNS(*)::VARCHAR FROM {}",
                scan.call(path)
            ))
            .map_err(|e| unreadable(path, e))?;
        let raw_rows = stmt
            .query_map([], |row| {
                (0..width)
                    .map(|i| row.get::<_, Option<String>>(i))
                    .collect::<Result<Vec<_>, _>>()
            })
            .map_err(|e| unreadable(path, e))?;

        let mut rows = Vec::new();
        for raw in raw_rows {
            let raw = raw.map_err(|e| unreadable(path, e))?;
            rows.push(
                raw.into_iter()
                    .zip(&columns)
                    .map(|(cell, column)| typed_value(cell, column.column_type))
                    .collect(),
            );
        }
        debug!(rows = rows.len(), columns = width, "DuckDB scan complete");

        Ok(Dataset::new(path, columns, rows)?)
    }
}

#[async_trait]
impl DatasetLoader for DuckDbLoader {
    async fn load(&self, path: &Path) -> Result<Dataset, ConcordError> {
        let extension = super::extension_of(path);
        let scan = ScanFunction::for_extension(&extension).ok_or_else(|| {
            InfrastructureError::SourceUnreadable {
                path: path.display().to_string(),
                reason: format!("DuckDB cannot scan '.{}' files", extension),
            }
        })?;
        self.scan(&path.display().to_string(), scan)
    }
}

fn unreadable(path: &str, err: duckdb::Error) -> InfrastructureError {
    InfrastructureError::SourceUnreadable {
        path: path.to_string(),
        reason: err.to_string(),
    }
}

/// Typed columns become typed values; text stays raw.
fn typed_value(cell: Option<String>, column_type: ColumnType) -> Value {
    let Some(raw) = cell else {
        return Value::Null;
    };
    let typed = match column_type {
        ColumnType::Integer | ColumnType::Number => parse_number(&raw).map(Value::Number),
        ColumnType::Boolean => parse_bool(&raw).map(Value::Boolean),
        ColumnType::Date => parse_date(&raw, &[]).map(Value::Date),
        ColumnType::Text | ColumnType::Unknown => None,
    };
    typed.unwrap_or(Value::String(raw))
}
