use anyhow::{Context, Result};

use journal_lib::storage::PersistenceService;

use crate::app::App;
use crate::render::terminal;
use crate::OutputFormat;

pub fn run(
    app: &App,
    favorites: bool,
    tag: Option<&str>,
    format: &OutputFormat,
    use_color: bool,
) -> Result<()> {
    let mut entries = app.storage.list_entries().context("Failed to list entries")?;

    if favorites {
        entries.retain(|e| e.is_favorite);
    }
    if let Some(tag) = tag {
        let tag = tag.trim().trim_start_matches('#').to_lowercase();
        entries.retain(|e| e.tags.iter().any(|t| t.to_lowercase() == tag));
    }

    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&entries)?);
        }
        OutputFormat::Plain => {
            if entries.is_empty() {
                println!("No entries.");
                return Ok(());
            }
            for entry in &entries {
                println!("{}", terminal::entry_line(entry, use_color));
            }
            println!("\n{} entries", entries.len());
        }
    }

    Ok(())
}
