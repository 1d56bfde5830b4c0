// concord/src/commands/mod.rs
//
// One module per subcommand. Each exposes `execute`; shared plumbing lives here.

pub mod clear;
pub mod compare;
pub mod merge;
pub mod preview;
pub mod report;
pub mod status;
pub mod validate;

use comfy_table::presets::UTF8_FULL_CONDENSED;
use comfy_table::{Attribute, Cell, Color, ContentArrangement, Table};
use miette::Result;
use std::path::{Path, PathBuf};

use concord_core::application::CommandReceipt;
use concord_core::domain::configuration::ProjectConfig;
use concord_core::domain::finding::{Finding, Outcome, Severity};
use concord_core::domain::session::SessionLedger;
use concord_core::infrastructure::FileSessionStore;
use concord_core::infrastructure::config::load_project_config;
use concord_core::ports::SessionStore;

/// Findings listed on the terminal before the rest is left to `concord report`.
const MAX_LISTED_FINDINGS: usize = 20;

/// Project configuration plus the session store it points at.
pub struct Workspace {
    pub project_dir: PathBuf,
    pub config: ProjectConfig,
    pub store: FileSessionStore,
}

impl Workspace {
    pub fn open(project_dir: &Path) -> Result<Self> {
        let config = load_project_config(project_dir)?;
        let store = FileSessionStore::new(
            project_dir.join(&config.session_path),
            project_dir.join(&config.archive_path),
        );
        Ok(Self {
            project_dir: project_dir.to_path_buf(),
            config,
            store,
        })
    }

    pub fn load_ledger(&self) -> Result<SessionLedger> {
        Ok(self.store.load()?)
    }

    pub fn save_ledger(&self, ledger: &SessionLedger) -> Result<()> {
        Ok(self.store.save(ledger)?)
    }

    pub fn report_dir(&self) -> PathBuf {
        self.project_dir.join(&self.config.report_path)
    }
}

pub fn outcome_icon(outcome: Outcome) -> &'static str {
    match outcome {
        Outcome::Passed => "✅",
        Outcome::Warned => "⚠️ ",
        Outcome::Failed => "❌",
    }
}

fn severity_cell(severity: Severity) -> Cell {
    let color = match severity {
        Severity::Error => Color::Red,
        Severity::Warning => Color::Yellow,
        Severity::Pass => Color::Green,
    };
    Cell::new(severity.as_str().to_uppercase())
        .fg(color)
        .add_attribute(Attribute::Bold)
}

fn header_cell(label: &str) -> Cell {
    Cell::new(label).add_attribute(Attribute::Bold)
}

pub fn new_table(headers: &[&str]) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL_CONDENSED)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(headers.iter().map(|h| header_cell(h)));
    table
}

/// Prints the counts of a recorded command and lists its non-passing findings.
pub fn print_receipt(ledger: &SessionLedger, receipt: &CommandReceipt) {
    let counts = receipt.counts;
    println!(
        "{} Command #{} recorded: {} error(s), {} warning(s), {} pass(es)",
        outcome_icon(receipt.outcome),
        receipt.sequence,
        counts.errors,
        counts.warnings,
        counts.passes
    );

    let Some(record) = ledger.last() else {
        return;
    };
    let notable: Vec<&Finding> = record
        .findings
        .iter()
        .filter(|f| f.severity() != Severity::Pass)
        .collect();
    if notable.is_empty() {
        return;
    }

    let mut table = new_table(&["Severity", "Check", "Rule", "Source", "Row", "Column", "Message"]);
    for finding in notable.iter().take(MAX_LISTED_FINDINGS) {
        table.add_row(vec![
            severity_cell(finding.severity()),
            Cell::new(finding.rule().kind.as_str()),
            Cell::new(&finding.rule().name),
            Cell::new(finding.source()),
            Cell::new(finding.row().map(|r| r.to_string()).unwrap_or_default()),
            Cell::new(finding.column().unwrap_or_default()),
            Cell::new(finding.message()),
        ]);
    }
    println!("{table}");
    if notable.len() > MAX_LISTED_FINDINGS {
        println!(
            "   ... and {} more. Run 'concord report' for the full list.",
            notable.len() - MAX_LISTED_FINDINGS
        );
    }
}

/// `--check` gate: exit 1 once the ledger is saved if the command produced an Error.
pub fn enforce_check(check: bool, receipt: &CommandReceipt) {
    if check && receipt.has_errors() {
        eprintln!("\n💥 --check mode: failing on {} error finding(s).", receipt.counts.errors);
        std::process::exit(1);
    }
}
