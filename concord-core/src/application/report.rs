// concord-core/src/application/report.rs

use std::path::{Path, PathBuf};
use tracing::{info, instrument, warn};

use crate::domain::finding::Outcome;
use crate::domain::report::aggregate;
use crate::domain::session::SessionLedger;
use crate::error::ConcordError;
use crate::infrastructure::fs::atomic_write;
use crate::infrastructure::render::renderer_for;
use crate::ports::renderer::OutputFormat;

#[derive(Debug, Clone, PartialEq)]
pub struct ReportOutput {
    pub path: PathBuf,
    pub format: OutputFormat,
    pub commands: usize,
    pub findings: usize,
    pub outcome: Outcome,
}

/// `<report_dir>/concord-report.<ext>`
pub fn default_report_path(report_dir: &Path, format: OutputFormat) -> PathBuf {
    report_dir.join(format!("concord-report.{}", format.extension()))
}

/// Aggregates the whole session and writes it in the requested format.
#[instrument(skip(ledger), fields(session = %ledger.id()))]
pub fn build_report(
    ledger: &SessionLedger,
    format: OutputFormat,
    output: &Path,
) -> Result<ReportOutput, ConcordError> {
    if ledger.is_empty() {
        warn!("Session has no commands; the report will be empty");
    }
    let report = aggregate(ledger);
    let bytes = renderer_for(format).render(&report)?;
    atomic_write(output, &bytes)?;
    info!(path = %output.display(), bytes = bytes.len(), "📊 Report written");

    Ok(ReportOutput {
        path: output.to_path_buf(),
        format,
        commands: report.commands.len(),
        findings: report.finding_count(),
        outcome: report.outcome,
    })
}
