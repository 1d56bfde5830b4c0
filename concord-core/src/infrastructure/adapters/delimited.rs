// concord-core/src/infrastructure/adapters/delimited.rs
//
// CSV/TSV reading. Fields are kept byte-for-byte (padding, case, empty strings) so
// representation anomalies reach the rules intact.

use std::path::Path;
use tracing::{debug, instrument};

use crate::domain::dataset::{Column, Dataset, Value};
use crate::error::ConcordError;
use crate::infrastructure::error::InfrastructureError;

const CANDIDATE_DELIMITERS: &[u8] = b",;\t|";

/// Picks the delimiter that splits the first lines most consistently. Comma on ties.
pub fn sniff_delimiter(content: &str) -> u8 {
    let sample: Vec<&str> = content.lines().take(10).collect();
    let mut best = b',';
    let mut best_score = 0usize;

    for &delimiter in CANDIDATE_DELIMITERS {
        let counts: Vec<usize> = sample
            .iter()
            .map(|line| {
                csv::ReaderBuilder::new()
                    .delimiter(delimiter)
                    .has_headers(false)
                    .flexible(true)
                    .from_reader(line.as_bytes())
                    .records()
                    .next()
                    .and_then(|r| r.ok())
                    .map(|r| r.len())
                    .unwrap_or(1)
            })
            .collect();

        let Some(&width) = counts.first() else {
            continue;
        };
        if width <= 1 {
            continue;
        }
        let score = counts.iter().filter(|&&c| c == width).count() * width;
        if score > best_score {
            best_score = score;
            best = delimiter;
        }
    }
    best
}

/// Reads a header row plus records. `types` (from a prior type scan) is applied when it
/// lines up with the header.
#[instrument(skip(content, types), fields(bytes = content.len()))]
pub fn parse_delimited(
    source: &str,
    content: &str,
    delimiter: u8,
    types: Option<Vec<Column>>,
) -> Result<Dataset, ConcordError> {
    let unreadable = |reason: String| InfrastructureError::SourceUnreadable {
        path: source.to_string(),
        reason,
    };

    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(true)
        .trim(csv::Trim::None)
        .from_reader(content.as_bytes());

    let header: Vec<String> = reader
        .headers()
        .map_err(|e| unreadable(e.to_string()))?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();

    let columns = match types {
        Some(typed)
            if typed.len() == header.len()
                && typed.iter().zip(&header).all(|(t, h)| &t.name == h) =>
        {
            typed
        }
        _ => header.iter().map(Column::untyped).collect(),
    };

    let mut rows = Vec::new();
    for (line, record) in reader.records().enumerate() {
        let record = record.map_err(|e| unreadable(format!("record {}: {}", line + 1, e)))?;
        rows.push(record.iter().map(Value::text).collect());
    }
    debug!(rows = rows.len(), columns = columns.len(), "Delimited file parsed");

    Ok(Dataset::new(source, columns, rows)?)
}

pub fn delimiter_for(path: &Path, content: &str) -> u8 {
    match super::extension_of(path).as_str() {
        "tsv" => b'\t',
        "csv" => b',',
        _ => sniff_delimiter(content),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::domain::dataset::ColumnType;
    use anyhow::Result;

    #[test]
    fn test_raw_fields_survive() -> Result<()> {
        let ds = parse_delimited("a.csv", "id,name\n1, Acme \n2,\n", b',', None)?;
        assert_eq!(ds.cell(0, 1), &Value::text(" Acme "));
        assert_eq!(ds.cell(1, 1), &Value::text(""));
        assert_eq!(ds.columns()[0].column_type, ColumnType::Unknown);
        Ok(())
    }

    #[test]
    fn test_ragged_record_is_unreadable() {
        let err = parse_delimited("a.csv", "id,name\n1,Acme,extra\n", b',', None).unwrap_err();
        assert!(err.to_string().contains("a.csv"));
    }

    #[test]
    fn test_types_apply_only_when_header_matches() -> Result<()> {
        let typed = vec![Column::new("id", ColumnType::Integer)];
        let ds = parse_delimited("a.csv", "id\n1\n", b',', Some(typed.clone()))?;
        assert_eq!(ds.columns()[0].column_type, ColumnType::Integer);

        let ds = parse_delimited("a.csv", "code\n1\n", b',', Some(typed))?;
        assert_eq!(ds.columns()[0].column_type, ColumnType::Unknown);
        Ok(())
    }

    #[test]
    fn test_sniff_semicolons() {
        assert_eq!(sniff_delimiter("a;b;c\n1;2;3\n"), b';');
        assert_eq!(sniff_delimiter("single\nvalue\n"), b',');
    }
}
