// concord-core/src/infrastructure/adapters/mod.rs

pub mod delimited;
pub mod duckdb;
pub mod spreadsheet;
pub mod writer;

use async_trait::async_trait;
use std::path::Path;
use tracing::{info, instrument, warn};

use crate::domain::dataset::Dataset;
use crate::error::ConcordError;
use crate::infrastructure::error::InfrastructureError;
use crate::ports::loader::DatasetLoader;
use self::duckdb::{DuckDbLoader, ScanFunction};

pub use writer::FileDatasetWriter;

pub(crate) fn extension_of(path: &Path) -> String {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default()
}

/// Dispatches on the file extension: workbooks go to calamine, delimited text to the csv
/// reader (typed by a DuckDB scan), parquet and JSON straight to DuckDB.
pub struct FileDatasetLoader {
    duckdb: DuckDbLoader,
}

impl FileDatasetLoader {
    pub fn new() -> Result<Self, InfrastructureError> {
        Ok(Self {
            duckdb: DuckDbLoader::new()?,
        })
    }

    fn load_delimited(&self, path: &Path) -> Result<Dataset, ConcordError> {
        let source = path.display().to_string();
        let content = std::fs::read_to_string(path).map_err(|e| {
            InfrastructureError::SourceUnreadable {
                path: source.clone(),
                reason: e.to_string(),
            }
        })?;
        let delimiter = delimited::delimiter_for(path, &content);

        // Types are informational; a file DuckDB cannot sniff still loads untyped.
        let types = if delimiter == b',' {
            match self.duckdb.describe(&source, ScanFunction::Csv) {
                Ok(columns) => Some(columns),
                Err(e) => {
                    warn!(path = %source, error = %e, "Type scan failed; columns left untyped");
                    None
                }
            }
        } else {
            None
        };

        delimited::parse_delimited(&source, &content, delimiter, types)
    }
}

#[async_trait]
impl DatasetLoader for FileDatasetLoader {
    #[instrument(skip(self), fields(path = %path.display()))]
    async fn load(&self, path: &Path) -> Result<Dataset, ConcordError> {
        if !path.is_file() {
            return Err(InfrastructureError::SourceNotFound {
                path: path.display().to_string(),
            }
            .into());
        }

        let extension = extension_of(path);
        let dataset = match extension.as_str() {
            e if spreadsheet::SPREADSHEET_EXTENSIONS.contains(&e) => {
                spreadsheet::read_workbook(path)?
            }
            "csv" | "tsv" | "txt" => self.load_delimited(path)?,
            "parquet" | "json" | "jsonl" | "ndjson" => self.duckdb.load(path).await?,
            other => {
                return Err(InfrastructureError::SourceUnreadable {
                    path: path.display().to_string(),
                    reason: format!("unsupported file type '.{}'", other),
                }
                .into());
            }
        };

        info!(
            rows = dataset.len(),
            columns = dataset.columns().len(),
            "📄 Dataset loaded"
        );
        Ok(dataset)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::domain::dataset::{ColumnType, Value};
    use crate::infrastructure::error::InfrastructureError;
    use anyhow::Result;
    use std::fs;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_csv_keeps_raw_text_and_gains_types() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("orders.csv");
        fs::write(&path, "id,qty\n1, 5\n2,abc\n")?;

        let ds = FileDatasetLoader::new()?.load(&path).await?;
        assert_eq!(ds.source(), path.display().to_string());
        assert_eq!(ds.cell(0, 1), &Value::text(" 5"));
        assert_eq!(ds.columns()[0].column_type, ColumnType::Integer);
        Ok(())
    }

    #[tokio::test]
    async fn test_missing_file() -> Result<()> {
        let err = FileDatasetLoader::new()?
            .load(Path::new("does-not-exist.csv"))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ConcordError::Infrastructure(InfrastructureError::SourceNotFound { .. })
        ));
        Ok(())
    }

    #[tokio::test]
    async fn test_unknown_extension() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("notes.docx");
        fs::write(&path, "x")?;
        let err = FileDatasetLoader::new()?.load(&path).await.unwrap_err();
        assert!(matches!(
            err,
            ConcordError::Infrastructure(InfrastructureError::SourceUnreadable { .. })
        ));
        Ok(())
    }
}
