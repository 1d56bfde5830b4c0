// concord-core/src/infrastructure/config/mapping.rs

use std::path::Path;

use super::project::load_fragment;
use crate::domain::error::DomainError;
use crate::domain::reconcile::ColumnMap;
use crate::error::ConcordError;

/// `{ columns: {from: to}, sources: {file: {from: to}} }`
pub fn load_column_map(path: &Path) -> Result<ColumnMap, ConcordError> {
    Ok(load_fragment::<ColumnMap>(path)?)
}

/// Parses a `FROM=TO` rename.
pub fn parse_rename(raw: &str) -> Result<(String, String), DomainError> {
    match raw.split_once('=') {
        Some((from, to)) if !from.trim().is_empty() && !to.trim().is_empty() => {
            Ok((from.trim().to_string(), to.trim().to_string()))
        }
        _ => Err(DomainError::InvalidArgument(format!(
            "column mapping '{}' must look like FROM=TO",
            raw
        ))),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use anyhow::Result;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_column_map_fragment() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("map.yaml");
        fs::write(
            &path,
            "columns:\n  cust_name: name\nsources:\n  b.csv:\n    ID: id\n",
        )?;

        let map = load_column_map(&path)?;
        assert_eq!(map.canonical("a.csv", "cust_name"), "name");
        assert_eq!(map.canonical("data/b.csv", "ID"), "id");
        assert_eq!(map.canonical("a.csv", "ID"), "ID");
        Ok(())
    }

    #[test]
    fn test_parse_rename() {
        assert_eq!(
            parse_rename(" cust = name ").unwrap(),
            ("cust".to_string(), "name".to_string())
        );
        assert!(parse_rename("cust").is_err());
        assert!(parse_rename("=name").is_err());
    }
}
