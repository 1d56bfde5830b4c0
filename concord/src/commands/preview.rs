// concord/src/commands/preview.rs
//
// USE CASE: Peek at a file without recording anything.

use comfy_table::Cell;
use miette::Result;
use std::path::PathBuf;

use concord_core::application::preview_dataset;
use concord_core::infrastructure::FileDatasetLoader;

use super::{Workspace, new_table};

pub async fn execute(project_dir: PathBuf, file: PathBuf, rows: Option<usize>) -> Result<()> {
    let workspace = Workspace::open(&project_dir)?;
    let rows = rows.unwrap_or(workspace.config.preview_rows);

    let loader = FileDatasetLoader::new()?;
    let preview = preview_dataset(&loader, &file, rows).await?;

    println!("\n👀 Previewing '{}'", preview.source);
    let headers: Vec<String> = preview
        .columns
        .iter()
        .map(|c| format!("{}\n{}", c.name, c.column_type.as_str()))
        .collect();
    let headers: Vec<&str> = headers.iter().map(String::as_str).collect();

    let mut table = new_table(&headers);
    for row in &preview.rows {
        table.add_row(row.iter().map(Cell::new));
    }
    println!("{table}");
    println!(
        "   Showing {} of {} row(s), {} column(s)",
        preview.rows.len(),
        preview.total_rows,
        preview.columns.len()
    );
    Ok(())
}
