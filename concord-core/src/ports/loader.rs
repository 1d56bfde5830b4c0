// concord-core/src/ports/loader.rs

use crate::domain::dataset::Dataset;
use crate::error::ConcordError;
use async_trait::async_trait;
use std::path::Path;

/// Turns a source file into an in-memory dataset. The dataset's `source` is the path as given.
#[async_trait]
pub trait DatasetLoader: Send + Sync {
    async fn load(&self, path: &Path) -> Result<Dataset, ConcordError>;
}
