// concord-core/src/application/testing.rs

use async_trait::async_trait;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::domain::dataset::{Column, Dataset, Value};
use crate::error::ConcordError;
use crate::infrastructure::error::InfrastructureError;
use crate::ports::loader::DatasetLoader;

/// In-memory loader keyed by path.
#[derive(Default)]
pub struct MockLoader {
    datasets: HashMap<PathBuf, Dataset>,
}

impl MockLoader {
    pub fn with(mut self, path: &str, columns: &[&str], rows: &[&[&str]]) -> Self {
        let dataset = Dataset::new(
            path,
            columns.iter().map(|c| Column::untyped(*c)).collect(),
            rows.iter()
                .map(|r| r.iter().map(|v| Value::text(*v)).collect())
                .collect(),
        )
        .unwrap_or_else(|e| panic!("bad fixture {path}: {e}"));
        self.datasets.insert(PathBuf::from(path), dataset);
        self
    }
}

#[async_trait]
impl DatasetLoader for MockLoader {
    async fn load(&self, path: &Path) -> Result<Dataset, ConcordError> {
        self.datasets.get(path).cloned().ok_or_else(|| {
            InfrastructureError::SourceNotFound {
                path: path.display().to_string(),
            }
            .into()
        })
    }
}
