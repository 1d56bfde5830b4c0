// concord-core/src/application/merge.rs

use std::path::PathBuf;
use tracing::{info, instrument};

use super::CommandReceipt;
use super::compare::{inputs_of, load_all};
use crate::domain::reconcile::{MergeJoin, MergeOptions, merge};
use crate::domain::session::{Artifact, CommandName, CommandRecord, SessionLedger};
use crate::error::ConcordError;
use crate::ports::loader::DatasetLoader;
use crate::ports::writer::DatasetWriter;

#[derive(Debug, Clone)]
pub struct MergeRequest {
    pub files: Vec<PathBuf>,
    pub options: MergeOptions,
    /// Where to write the merged dataset. Nothing is written when absent.
    pub output: Option<PathBuf>,
}

/// Merges the files, writes the result if asked, then records the command.
#[instrument(skip_all, fields(files = request.files.len(), strategy = %request.options.strategy))]
pub async fn run_merge(
    request: &MergeRequest,
    loader: &dyn DatasetLoader,
    writer: &dyn DatasetWriter,
    ledger: &mut SessionLedger,
) -> Result<CommandReceipt, ConcordError> {
    let datasets = load_all(loader, &request.files).await?;
    let outcome = merge(&datasets, &request.options)?;

    let options = &request.options;
    let mut record = CommandRecord::new(CommandName::Merge, inputs_of(&request.files))
        .with_parameter("key", options.primary_key.join(","))
        .with_parameter("strategy", options.strategy)
        .with_parameter(
            "join",
            match options.join {
                MergeJoin::Outer => "outer",
                MergeJoin::Inner => "inner",
            },
        );
    if !options.column_map.is_empty() {
        record = record.with_parameter("column_map", "yes");
    }

    if let Some(path) = &request.output {
        writer.write(&outcome.dataset, path)?;
        record = record.with_artifact(Artifact::MergedDataset {
            name: options.output_name.clone(),
            path: path.display().to_string(),
            rows: outcome.dataset.len(),
            columns: outcome.dataset.columns().len(),
        });
    }

    let rows = outcome.dataset.len();
    let sequence = ledger.append(record.with_findings(outcome.findings));
    let receipt = ledger
        .last()
        .map(CommandReceipt::of)
        .ok_or_else(|| ConcordError::InternalError("ledger lost the merge record".into()))?;
    info!(sequence, rows, findings = receipt.counts.total(), "🧬 Merge recorded");
    Ok(receipt)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::application::testing::MockLoader;
    use crate::domain::dataset::Dataset;
    use crate::domain::finding::{CheckKind, Outcome};
    use crate::domain::reconcile::MergeStrategy;
    use anyhow::Result;
    use std::path::Path;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingWriter {
        written: Mutex<Vec<(PathBuf, Dataset)>>,
    }

    impl DatasetWriter for RecordingWriter {
        fn write(&self, dataset: &Dataset, path: &Path) -> Result<(), ConcordError> {
            self.written
                .lock()
                .unwrap()
                .push((path.to_path_buf(), dataset.clone()));
            Ok(())
        }
    }

    fn loader() -> MockLoader {
        MockLoader::default()
            .with("crm.csv", &["id", "name"], &[&["1", ""], &["2", "Globex"]])
            .with("erp.csv", &["id", "name"], &[&["1", "Acme"], &["3", "Initech"]])
    }

    fn request(output: Option<&str>) -> MergeRequest {
        let mut options = MergeOptions::new(vec!["id".into()], "merged");
        options.strategy = MergeStrategy::MostComplete;
        MergeRequest {
            files: vec![PathBuf::from("crm.csv"), PathBuf::from("erp.csv")],
            options,
            output: output.map(PathBuf::from),
        }
    }

    #[tokio::test]
    async fn test_merge_writes_output_and_records_artifact() -> Result<()> {
        let writer = RecordingWriter::default();
        let mut ledger = SessionLedger::new();
        let receipt = run_merge(&request(Some("out/merged.csv")), &loader(), &writer, &mut ledger).await?;

        let written = writer.written.lock().unwrap();
        assert_eq!(written.len(), 1);
        assert_eq!(written[0].0, PathBuf::from("out/merged.csv"));
        assert_eq!(written[0].1.len(), 3);

        let record = ledger.last().unwrap();
        assert_eq!(record.parameters["strategy"], "most-complete");
        assert_eq!(
            record.artifacts,
            vec![Artifact::MergedDataset {
                name: "merged".into(),
                path: "out/merged.csv".into(),
                rows: 3,
                columns: 2,
            }]
        );
        assert_eq!(receipt.sequence, 1);
        assert_ne!(receipt.outcome, Outcome::Failed);
        Ok(())
    }

    #[tokio::test]
    async fn test_merge_without_output_writes_nothing() -> Result<()> {
        let writer = RecordingWriter::default();
        let mut ledger = SessionLedger::new();
        run_merge(&request(None), &loader(), &writer, &mut ledger).await?;

        assert!(writer.written.lock().unwrap().is_empty());
        assert!(ledger.last().unwrap().artifacts.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_inner_join_reports_unmatched_keys() -> Result<()> {
        let writer = RecordingWriter::default();
        let mut ledger = SessionLedger::new();
        let mut req = request(None);
        req.options.join = MergeJoin::Inner;
        run_merge(&req, &loader(), &writer, &mut ledger).await?;

        let record = ledger.last().unwrap();
        assert_eq!(record.parameters["join"], "inner");
        assert!(
            record
                .findings
                .iter()
                .any(|f| f.rule().kind == CheckKind::Unmatched)
        );
        Ok(())
    }
}
