use anyhow::{Context, Result};

use journal_lib::storage::PersistenceService;

use crate::app::App;
use crate::render::terminal;
use crate::OutputFormat;

pub fn run(app: &App, query: &str, format: &OutputFormat, use_color: bool) -> Result<()> {
    let results = app
        .storage
        .search_entries(query)
        .context("Failed to search entries")?;

    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&results)?);
        }
        OutputFormat::Plain => {
            if results.is_empty() {
                println!("No results found for '{}'.", query);
                return Ok(());
            }
            for entry in &results {
                println!("{}", terminal::entry_line(entry, use_color));
            }
            println!("\n{} results", results.len());
        }
    }

    Ok(())
}
