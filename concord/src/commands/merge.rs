// concord/src/commands/merge.rs
//
// USE CASE: Merge files into one dataset by primary key.

use miette::Result;
use std::path::PathBuf;

use concord_core::application::{MergeRequest, run_merge};
use concord_core::domain::reconcile::{MergeJoin, MergeOptions, MergeStrategy};
use concord_core::domain::session::Artifact;
use concord_core::infrastructure::config::load_column_map;
use concord_core::infrastructure::{FileDatasetLoader, FileDatasetWriter};

use super::{Workspace, enforce_check, print_receipt};
use crate::cli::KeyArgs;

pub struct MergeArgs {
    pub files: Vec<PathBuf>,
    pub keys: KeyArgs,
    pub strategy: MergeStrategy,
    pub mappings: Vec<(String, String)>,
    pub map_file: Option<PathBuf>,
    pub inner: bool,
    pub output: Option<PathBuf>,
}

pub async fn execute(project_dir: PathBuf, args: MergeArgs) -> Result<()> {
    let workspace = Workspace::open(&project_dir)?;
    let mut ledger = workspace.load_ledger()?;

    let output_name = args
        .output
        .as_ref()
        .and_then(|p| p.file_name())
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "unsaved".to_string());

    let mut options = MergeOptions::new(args.keys.key, output_name);
    options.strategy = args.strategy;
    options.sensitivity = workspace.config.normalization;
    if args.inner {
        options.join = MergeJoin::Inner;
    }
    if let Some(map_file) = &args.map_file {
        options.column_map = load_column_map(map_file)?;
    }
    // Command-line renames win over the map file.
    for (from, to) in args.mappings {
        options.column_map.rename(from, to);
    }

    println!(
        "🧬 Merging {} files on [{}] ({})...",
        args.files.len(),
        options.primary_key.join(", "),
        options.strategy
    );

    let loader = FileDatasetLoader::new()?;
    let request = MergeRequest {
        files: args.files,
        options,
        output: args.output,
    };
    let receipt = run_merge(&request, &loader, &FileDatasetWriter, &mut ledger).await?;
    workspace.save_ledger(&ledger)?;

    if let Some(record) = ledger.last() {
        for artifact in &record.artifacts {
            let Artifact::MergedDataset {
                path, rows, columns, ..
            } = artifact;
            println!("💾 Merged dataset written to {} ({} rows, {} columns)", path, rows, columns);
        }
    }
    print_receipt(&ledger, &receipt);
    enforce_check(args.keys.check, &receipt);
    Ok(())
}
