// concord/src/commands/report.rs
//
// USE CASE: Aggregate the session into a report file.

use miette::Result;
use std::path::PathBuf;

use concord_core::application::build_report;
use concord_core::application::report::default_report_path;
use concord_core::ports::OutputFormat;

use super::{Workspace, outcome_icon};

pub fn execute(project_dir: PathBuf, format: OutputFormat, output: Option<PathBuf>) -> Result<()> {
    let workspace = Workspace::open(&project_dir)?;
    let ledger = workspace.load_ledger()?;

    println!("📊 Building {} report for session {}...", format, ledger.id());

    let path = output.unwrap_or_else(|| default_report_path(&workspace.report_dir(), format));
    let written = build_report(&ledger, format, &path)?;

    println!(
        "{} {} command(s), {} finding(s), outcome: {}",
        outcome_icon(written.outcome),
        written.commands,
        written.findings,
        written.outcome
    );
    println!("✨ Report written to {}", written.path.display());
    Ok(())
}
