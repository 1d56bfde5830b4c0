// concord/src/commands/validate.rs
//
// USE CASE: Validate one file against a rule definition document.

use miette::Result;
use std::path::PathBuf;

use concord_core::application::{ValidateRequest, run_validate};
use concord_core::infrastructure::FileDatasetLoader;

use super::{Workspace, enforce_check, print_receipt};

pub async fn execute(project_dir: PathBuf, file: PathBuf, rules: PathBuf, check: bool) -> Result<()> {
    let workspace = Workspace::open(&project_dir)?;
    let mut ledger = workspace.load_ledger()?;

    println!("✅ Validating {} against {}...", file.display(), rules.display());

    let loader = FileDatasetLoader::new()?;
    let request = ValidateRequest { file, rules };
    let receipt = run_validate(&request, &loader, &workspace.config.engine, &mut ledger).await?;
    workspace.save_ledger(&ledger)?;

    print_receipt(&ledger, &receipt);
    enforce_check(check, &receipt);
    Ok(())
}
