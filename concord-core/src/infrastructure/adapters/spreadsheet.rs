// concord-core/src/infrastructure/adapters/spreadsheet.rs
//
// Workbook reading through calamine. The first worksheet is the dataset, its first row the
// header. Cells keep their native type.

use calamine::{Data, Reader, Sheets, open_workbook_auto};
use chrono::{Duration, NaiveDate};
use std::path::Path;
use tracing::{debug, instrument};

use crate::domain::dataset::{Column, ColumnType, Dataset, Value};
use crate::error::ConcordError;
use crate::infrastructure::error::InfrastructureError;

pub const SPREADSHEET_EXTENSIONS: &[&str] = &["xlsx", "xlsm", "xls", "xlsb", "ods"];

#[instrument(skip_all, fields(path = %path.display()))]
pub fn read_workbook(path: &Path) -> Result<Dataset, ConcordError> {
    let source = path.display().to_string();
    let unreadable = |reason: String| InfrastructureError::SourceUnreadable {
        path: source.clone(),
        reason,
    };

    let mut workbook: Sheets<_> =
        open_workbook_auto(path).map_err(|e| unreadable(format!("cannot open workbook: {}", e)))?;
    let sheet_name = workbook
        .sheet_names()
        .first()
        .cloned()
        .ok_or_else(|| unreadable("workbook contains no sheets".to_string()))?;
    let range = workbook
        .worksheet_range(&sheet_name)
        .map_err(|e| unreadable(format!("cannot read sheet '{}': {}", sheet_name, e)))?;

    let mut rows = range.rows();
    let Some(header) = rows.next() else {
        return Ok(Dataset::new(source.clone(), Vec::new(), Vec::new())?);
    };
    let names: Vec<String> = header
        .iter()
        .enumerate()
        .map(|(i, cell)| match cell_value(cell).as_text() {
            Some(name) if !name.trim().is_empty() => name.trim().to_string(),
            _ => format!("column_{}", i + 1),
        })
        .collect();

    let records: Vec<Vec<Value>> = rows
        .map(|row| {
            let mut values: Vec<Value> = row.iter().map(cell_value).collect();
            values.resize(names.len(), Value::Null);
            values
        })
        .collect();

    let columns = names
        .into_iter()
        .enumerate()
        .map(|(i, name)| Column::new(name, infer_type(records.iter().map(|r| &r[i]))))
        .collect();
    debug!(sheet = %sheet_name, rows = records.len(), "Worksheet read");

    Ok(Dataset::new(source, columns, records)?)
}

fn cell_value(cell: &Data) -> Value {
    match cell {
        Data::Empty => Value::Null,
        Data::String(s) => Value::String(s.clone()),
        Data::Float(n) => Value::Number(*n),
        Data::Int(n) => Value::Number(*n as f64),
        Data::Bool(b) => Value::Boolean(*b),
        Data::Error(e) => Value::String(format!("#{:?}", e)),
        Data::DateTime(dt) => serial_date(dt.as_f64())
            .map(Value::Date)
            .unwrap_or(Value::Number(dt.as_f64())),
        Data::DateTimeIso(s) | Data::DurationIso(s) => Value::String(s.clone()),
    }
}

/// Excel 1900 date system. Time of day is dropped.
fn serial_date(serial: f64) -> Option<NaiveDate> {
    if !serial.is_finite() || serial < 1.0 {
        return None;
    }
    let epoch = NaiveDate::from_ymd_opt(1899, 12, 30)?;
    epoch.checked_add_signed(Duration::days(serial.floor() as i64))
}

/// A column is typed only if every present cell shares one native type.
fn infer_type<'a>(cells: impl Iterator<Item = &'a Value>) -> ColumnType {
    let mut inferred: Option<ColumnType> = None;
    for value in cells {
        let current = match value {
            Value::Null => continue,
            Value::Number(_) => ColumnType::Number,
            Value::Boolean(_) => ColumnType::Boolean,
            Value::Date(_) => ColumnType::Date,
            Value::String(_) => ColumnType::Text,
        };
        match inferred {
            None => inferred = Some(current),
            Some(t) if t == current => {}
            Some(_) => return ColumnType::Unknown,
        }
    }
    inferred.unwrap_or(ColumnType::Unknown)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use anyhow::Result;
    use rust_xlsxwriter::Workbook;
    use tempfile::tempdir;

    #[test]
    fn test_serial_dates() {
        assert_eq!(serial_date(45292.0), NaiveDate::from_ymd_opt(2024, 1, 1));
        assert_eq!(serial_date(45292.75), NaiveDate::from_ymd_opt(2024, 1, 1));
        assert_eq!(serial_date(0.5), None);
    }

    #[test]
    fn test_reads_first_sheet_with_native_types() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("stock.xlsx");

        let mut workbook = Workbook::new();
        let sheet = workbook.add_worksheet();
        sheet.write_string(0, 0, "sku")?;
        sheet.write_string(0, 1, "qty")?;
        sheet.write_string(1, 0, "A-1")?;
        sheet.write_number(1, 1, 5.0)?;
        sheet.write_string(2, 0, " a-1")?;
        workbook.save(&path)?;

        let ds = read_workbook(&path)?;
        assert_eq!(ds.column_names(), vec!["sku", "qty"]);
        assert_eq!(ds.columns()[1].column_type, ColumnType::Number);
        assert_eq!(ds.cell(0, 1), &Value::Number(5.0));
        assert_eq!(ds.cell(1, 0), &Value::text(" a-1"));
        assert_eq!(ds.cell(1, 1), &Value::Null);
        Ok(())
    }

    #[test]
    fn test_missing_workbook_is_unreadable() {
        let err = read_workbook(Path::new("/nonexistent/book.xlsx")).unwrap_err();
        assert!(err.to_string().contains("book.xlsx"));
    }
}
