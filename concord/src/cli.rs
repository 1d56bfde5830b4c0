// concord/src/cli.rs
//
// Single source of truth for all CLI definitions (Clap structs).

use clap::{ArgAction, Args, Parser, Subcommand};
use std::path::PathBuf;

use concord_core::domain::reconcile::MergeStrategy;
use concord_core::infrastructure::config::parse_rename;
use concord_core::ports::OutputFormat;

#[derive(Parser)]
#[command(name = "concord")]
#[command(about = "Rule-based validation and cross-file reconciliation for spreadsheets and CSV files", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Project directory (holds concord.yaml and the session file)
    #[arg(long, global = true, default_value = ".", env = "CONCORD_PROJECT_DIR")]
    pub project_dir: PathBuf,

    /// More log output on stderr (-v info, -vv debug)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Args, Debug, Clone)]
pub struct KeyArgs {
    /// Primary key column(s), comma separated for a composite key
    #[arg(long, short, required = true, value_delimiter = ',')]
    pub key: Vec<String>,

    /// Exit with status 1 when any Error finding is produced
    #[arg(long)]
    pub check: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// 🔎 Reconciles records across files by primary key
    Compare {
        /// Files to reconcile (two or more)
        #[arg(required = true, num_args = 2..)]
        files: Vec<PathBuf>,

        #[command(flatten)]
        keys: KeyArgs,

        /// Do not fold case when matching keys and values
        #[arg(long)]
        case_sensitive: bool,

        /// Do not trim or collapse whitespace when matching keys and values
        #[arg(long)]
        whitespace_sensitive: bool,

        /// Only reconcile key presence, not field values
        #[arg(long)]
        keys_only: bool,
    },

    /// 🧬 Merges files into one dataset by primary key
    Merge {
        /// Files to merge (two or more), in priority order
        #[arg(required = true, num_args = 2..)]
        files: Vec<PathBuf>,

        #[command(flatten)]
        keys: KeyArgs,

        /// Which value wins when several files supply one
        #[arg(long, default_value_t = MergeStrategy::FirstWins)]
        strategy: MergeStrategy,

        /// Column rename applied to every file (FROM=TO), repeatable
        #[arg(long = "map", value_parser = parse_rename)]
        mappings: Vec<(String, String)>,

        /// YAML column map: { columns: {from: to}, sources: {file: {from: to}} }
        #[arg(long)]
        map_file: Option<PathBuf>,

        /// Keep only keys present in every file
        #[arg(long)]
        inner: bool,

        /// Write the merged dataset (.xlsx or .csv)
        #[arg(long, short)]
        output: Option<PathBuf>,
    },

    /// ✅ Validates a file against a rule definition document
    Validate {
        file: PathBuf,

        /// Rule document (YAML or JSON)
        #[arg(long, short)]
        rules: PathBuf,

        /// Exit with status 1 when any Error finding is produced
        #[arg(long)]
        check: bool,
    },

    /// 📊 Writes a report of every command in the session
    Report {
        #[arg(long, short, default_value_t = OutputFormat::Workbook)]
        format: OutputFormat,

        /// Report file (default: <report-path>/concord-report.<ext>)
        #[arg(long, short)]
        output: Option<PathBuf>,
    },

    /// 👀 Shows the first rows of a file
    Preview {
        file: PathBuf,

        /// Number of rows (default: preview-rows from the project config)
        #[arg(long, short = 'n')]
        rows: Option<usize>,
    },

    /// 📋 Lists the commands recorded in the session
    Status,

    /// 🧹 Archives the session and starts a new one
    Clear,
}
