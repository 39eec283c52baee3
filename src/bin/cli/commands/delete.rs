use anyhow::{Context, Result};

use journal_lib::storage::PersistenceService;

use crate::app::App;
use crate::OutputFormat;

pub fn run(app: &App, id: &str, format: &OutputFormat) -> Result<()> {
    let entry = app.find_entry(id)?;
    app.storage
        .delete_entry(entry.id)
        .context("Failed to delete entry")?;
    // The Drive copy stays; only the local link to it goes
    app.remember_remote_file(entry.id, None)?;

    match format {
        OutputFormat::Json => {
            let output = serde_json::json!({ "deleted": entry.id.to_string() });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        OutputFormat::Plain => {
            println!("Deleted entry \"{}\"", entry.title);
        }
    }

    Ok(())
}
