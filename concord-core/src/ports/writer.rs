// concord-core/src/ports/writer.rs

use crate::domain::dataset::Dataset;
use crate::error::ConcordError;
use std::path::Path;

pub trait DatasetWriter: Send + Sync {
    fn write(&self, dataset: &Dataset, path: &Path) -> Result<(), ConcordError>;
}
