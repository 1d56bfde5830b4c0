// concord/src/commands/compare.rs
//
// USE CASE: Reconcile records across files by primary key.

use miette::Result;
use std::path::PathBuf;

use concord_core::application::{CompareRequest, run_compare};
use concord_core::domain::reconcile::CompareOptions;
use concord_core::infrastructure::FileDatasetLoader;

use super::{Workspace, enforce_check, print_receipt};
use crate::cli::KeyArgs;

pub async fn execute(
    project_dir: PathBuf,
    files: Vec<PathBuf>,
    keys: KeyArgs,
    case_sensitive: bool,
    whitespace_sensitive: bool,
    keys_only: bool,
) -> Result<()> {
    let workspace = Workspace::open(&project_dir)?;
    let mut ledger = workspace.load_ledger()?;

    let mut options = CompareOptions::new(keys.key);
    options.sensitivity = workspace.config.normalization;
    options.sensitivity.case_sensitive |= case_sensitive;
    options.sensitivity.whitespace_sensitive |= whitespace_sensitive;
    options.compare_values = !keys_only;

    println!(
        "🔎 Comparing {} files on [{}]...",
        files.len(),
        options.primary_key.join(", ")
    );

    let loader = FileDatasetLoader::new()?;
    let request = CompareRequest { files, options };
    let receipt = run_compare(&request, &loader, &mut ledger).await?;
    workspace.save_ledger(&ledger)?;

    print_receipt(&ledger, &receipt);
    enforce_check(keys.check, &receipt);
    Ok(())
}
