// concord/src/commands/status.rs
//
// USE CASE: List the commands recorded in the current session.

use comfy_table::{Attribute, Cell};
use miette::Result;
use std::path::PathBuf;

use concord_core::application::session_status;

use super::{Workspace, new_table, outcome_icon};

pub fn execute(project_dir: PathBuf) -> Result<()> {
    let workspace = Workspace::open(&project_dir)?;
    let ledger = workspace.load_ledger()?;
    let status = session_status(&ledger);

    println!("📋 Session {}", status.session_id);
    println!("   Started: {}", status.created_at.format("%Y-%m-%d %H:%M:%S UTC"));

    if status.commands.is_empty() {
        println!("   No commands recorded yet.");
        return Ok(());
    }

    let mut table = new_table(&["#", "Command", "When", "Inputs", "Errors", "Warnings", "Passes", "Outcome"]);
    for command in &status.commands {
        table.add_row(vec![
            Cell::new(command.sequence),
            Cell::new(command.command),
            Cell::new(command.timestamp.format("%Y-%m-%d %H:%M:%S")),
            Cell::new(command.inputs.join("\n")),
            Cell::new(command.counts.errors),
            Cell::new(command.counts.warnings),
            Cell::new(command.counts.passes),
            Cell::new(format!("{} {}", outcome_icon(command.outcome), command.outcome)),
        ]);
    }
    table.add_row(vec![
        Cell::new("TOTAL").add_attribute(Attribute::Bold),
        Cell::new(""),
        Cell::new(""),
        Cell::new(""),
        Cell::new(status.totals.errors).add_attribute(Attribute::Bold),
        Cell::new(status.totals.warnings).add_attribute(Attribute::Bold),
        Cell::new(status.totals.passes).add_attribute(Attribute::Bold),
        Cell::new(format!("{} {}", outcome_icon(status.outcome), status.outcome)),
    ]);
    println!("{table}");
    Ok(())
}
