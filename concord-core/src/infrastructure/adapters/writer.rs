// concord-core/src/infrastructure/adapters/writer.rs

use rust_xlsxwriter::{Format, Workbook};
use std::path::Path;
use tracing::{info, instrument};

use crate::domain::dataset::{Dataset, Value};
use crate::error::ConcordError;
use crate::infrastructure::error::InfrastructureError;
use crate::infrastructure::fs::atomic_write;
use crate::ports::writer::DatasetWriter;

/// Writes `.xlsx` through rust_xlsxwriter and anything else as CSV.
#[derive(Debug, Default, Clone, Copy)]
pub struct FileDatasetWriter;

impl FileDatasetWriter {
    pub fn to_csv(dataset: &Dataset) -> Result<Vec<u8>, InfrastructureError> {
        let mut writer = csv::Writer::from_writer(Vec::new());
        writer.write_record(dataset.column_names())?;
        for record in dataset.records() {
            writer.write_record(record.values().iter().map(|v| v.to_string()))?;
        }
        writer
            .into_inner()
            .map_err(|e| InfrastructureError::Io(e.into_error()))
    }

    pub fn to_workbook(dataset: &Dataset) -> Result<Vec<u8>, InfrastructureError> {
        let mut workbook = Workbook::new();
        let sheet = workbook.add_worksheet();
        let header = Format::new().set_bold();

        for (col, column) in dataset.columns().iter().enumerate() {
            sheet.write_string_with_format(0, col as u16, &column.name, &header)?;
        }
        for record in dataset.records() {
            let row = record.row() as u32 + 1;
            for (col, value) in record.values().iter().enumerate() {
                let col = col as u16;
                match value {
                    Value::Null => {}
                    Value::Number(n) => {
                        sheet.write_number(row, col, *n)?;
                    }
                    Value::Boolean(b) => {
                        sheet.write_boolean(row, col, *b)?;
                    }
                    other => {
                        sheet.write_string(row, col, other.to_string())?;
                    }
                }
            }
        }
        Ok(workbook.save_to_buffer()?)
    }
}

impl DatasetWriter for FileDatasetWriter {
    #[instrument(skip(self, dataset), fields(path = %path.display(), rows = dataset.len()))]
    fn write(&self, dataset: &Dataset, path: &Path) -> Result<(), ConcordError> {
        let bytes = match super::extension_of(path).as_str() {
            "xlsx" => Self::to_workbook(dataset)?,
            _ => Self::to_csv(dataset)?,
        };
        atomic_write(path, bytes)?;
        info!("💾 Dataset written");
        Ok(())
    }
}
