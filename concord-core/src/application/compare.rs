// concord-core/src/application/compare.rs

use std::path::PathBuf;
use tracing::{info, instrument};

use super::CommandReceipt;
use crate::domain::dataset::Dataset;
use crate::domain::reconcile::{CompareOptions, compare};
use crate::domain::session::{CommandName, CommandRecord, SessionLedger};
use crate::error::ConcordError;
use crate::ports::loader::DatasetLoader;

#[derive(Debug, Clone)]
pub struct CompareRequest {
    pub files: Vec<PathBuf>,
    pub options: CompareOptions,
}

/// Loads every file in order. The first failure aborts the command.
pub(crate) async fn load_all(
    loader: &dyn DatasetLoader,
    files: &[PathBuf],
) -> Result<Vec<Dataset>, ConcordError> {
    let mut datasets = Vec::with_capacity(files.len());
    for file in files {
        datasets.push(loader.load(file).await?);
    }
    Ok(datasets)
}

pub(crate) fn inputs_of(files: &[PathBuf]) -> Vec<String> {
    files.iter().map(|f| f.display().to_string()).collect()
}

/// Reconciles the files and records the findings. The ledger is untouched on failure.
#[instrument(skip_all, fields(files = request.files.len()))]
pub async fn run_compare(
    request: &CompareRequest,
    loader: &dyn DatasetLoader,
    ledger: &mut SessionLedger,
) -> Result<CommandReceipt, ConcordError> {
    let datasets = load_all(loader, &request.files).await?;
    let findings = compare(&datasets, &request.options)?;

    let options = &request.options;
    let record = CommandRecord::new(CommandName::Compare, inputs_of(&request.files))
        .with_parameter("key", options.primary_key.join(","))
        .with_parameter("case_sensitive", options.sensitivity.case_sensitive)
        .with_parameter("whitespace_sensitive", options.sensitivity.whitespace_sensitive)
        .with_parameter("keys_only", !options.compare_values)
        .with_findings(findings);

    let sequence = ledger.append(record);
    let receipt = ledger
        .last()
        .map(CommandReceipt::of)
        .ok_or_else(|| ConcordError::InternalError("ledger lost the compare record".into()))?;
    info!(sequence, findings = receipt.counts.total(), "🔎 Compare recorded");
    Ok(receipt)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::application::testing::MockLoader;
    use crate::domain::finding::{CheckKind, Outcome, Severity};
    use anyhow::Result;

    fn loader() -> MockLoader {
        MockLoader::default()
            .with("a.csv", &["id", "name"], &[&["1", "Acme"], &["2", "Globex"], &["3", "Initech"]])
            .with("b.csv", &["id", "name"], &[&["1", "acme "], &["2", "Globex"], &["4", "Umbrella"]])
    }

    fn request(files: &[&str]) -> CompareRequest {
        CompareRequest {
            files: files.iter().map(PathBuf::from).collect(),
            options: CompareOptions::new(vec!["id".into()]),
        }
    }

    #[tokio::test]
    async fn test_compare_appends_one_record() -> Result<()> {
        let mut ledger = SessionLedger::new();
        let receipt = run_compare(&request(&["a.csv", "b.csv"]), &loader(), &mut ledger).await?;

        assert_eq!(receipt.sequence, 1);
        assert_eq!(receipt.outcome, Outcome::Failed);
        let record = ledger.last().unwrap();
        assert_eq!(record.command, CommandName::Compare);
        assert_eq!(record.inputs, vec!["a.csv", "b.csv"]);
        assert_eq!(record.parameters["key"], "id");
        assert_eq!(record.parameters["keys_only"], "false");

        let missing = record
            .findings
            .iter()
            .filter(|f| f.rule().kind == CheckKind::MissingRecord)
            .count();
        assert_eq!(missing, 2);
        assert!(
            record
                .findings
                .iter()
                .any(|f| f.severity() == Severity::Warning)
        );
        Ok(())
    }

    #[tokio::test]
    async fn test_failed_load_leaves_ledger_untouched() -> Result<()> {
        let mut ledger = SessionLedger::new();
        let result = run_compare(&request(&["a.csv", "ghost.csv"]), &loader(), &mut ledger).await;
        assert!(result.is_err());
        assert!(ledger.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_unknown_key_is_a_schema_mismatch() -> Result<()> {
        let mut ledger = SessionLedger::new();
        let mut req = request(&["a.csv", "b.csv"]);
        req.options.primary_key = vec!["sku".into()];
        let err = run_compare(&req, &loader(), &mut ledger).await.unwrap_err();
        assert!(err.to_string().contains("sku"));
        assert!(ledger.is_empty());
        Ok(())
    }
}
