// concord/src/commands/clear.rs
//
// USE CASE: Archive the session and start a new one.

use miette::Result;
use std::path::PathBuf;

use concord_core::application::clear_session;

use super::Workspace;

pub fn execute(project_dir: PathBuf) -> Result<()> {
    let workspace = Workspace::open(&project_dir)?;

    // The store is handed over directly: a corrupted session must still be clearable.
    let outcome = clear_session(&workspace.store)?;

    match &outcome.archived {
        Some(path) if outcome.recovered_unreadable() => println!(
            "   ⚠️  Saved session was unreadable; moved it to {}",
            path.display()
        ),
        Some(path) => println!(
            "   🗄️  Archived {} command(s) to {}",
            outcome.discarded_commands,
            path.display()
        ),
        None => println!("   Session was empty, nothing to archive."),
    }
    println!("🧹 Session cleared. New session: {}", outcome.new_session);
    Ok(())
}
