// concord-core/src/application/preview.rs

use serde::Serialize;
use std::path::Path;
use tracing::instrument;

use crate::domain::dataset::Column;
use crate::error::ConcordError;
use crate::ports::loader::DatasetLoader;

/// First rows of a dataset as display text. Nulls render as empty strings.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DatasetPreview {
    pub source: String,
    pub columns: Vec<Column>,
    pub rows: Vec<Vec<String>>,
    pub total_rows: usize,
}

impl DatasetPreview {
    pub fn is_truncated(&self) -> bool {
        self.rows.len() < self.total_rows
    }
}

/// Loads a dataset and keeps its first `rows` records. Nothing is recorded in the session.
#[instrument(skip(loader), fields(path = %path.display()))]
pub async fn preview_dataset(
    loader: &dyn DatasetLoader,
    path: &Path,
    rows: usize,
) -> Result<DatasetPreview, ConcordError> {
    let dataset = loader.load(path).await?;
    let head = dataset
        .head(rows)
        .iter()
        .map(|record| record.values().iter().map(|v| v.to_string()).collect())
        .collect();

    Ok(DatasetPreview {
        source: dataset.source().to_string(),
        columns: dataset.columns().to_vec(),
        rows: head,
        total_rows: dataset.len(),
    })
}
