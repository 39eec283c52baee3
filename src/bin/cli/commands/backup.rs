use anyhow::{bail, Context, Result};

use journal_lib::storage::PersistenceService;
use journal_lib::sync::{Notice, RemoteFileId, SaveOutcome};

use crate::app::{self, App};
use crate::render::terminal;
use crate::OutputFormat;

pub fn run(app: &App, id: &str, format: &OutputFormat, use_color: bool) -> Result<()> {
    let entry = app.find_entry(id)?;
    let coordinator = app.coordinator(Some(entry.id))?;
    coordinator.load(entry.title.as_str(), entry.content.as_str());

    let runtime = app::runtime()?;
    let file_id = match runtime.block_on(coordinator.flush()) {
        Ok(SaveOutcome::Saved(file_id)) => file_id,
        Ok(SaveOutcome::Unchanged) => match coordinator.remote_file_id() {
            Some(file_id) => file_id,
            None => bail!("Nothing to back up"),
        },
        Err(e) if e.requires_reauthentication() => {
            bail!("{} ({})", Notice::ReauthenticationRequired.message(), e)
        }
        Err(e) => bail!("Backup failed: {}", e),
    };
    app.remember_remote_file(entry.id, Some(&file_id))?;

    match format {
        OutputFormat::Json => {
            let output = serde_json::json!({
                "id": entry.id.to_string(),
                "remoteFileId": file_id,
                "lastSaved": coordinator.status().last_saved,
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        OutputFormat::Plain => {
            println!(
                "{} \"{}\" to Google Drive",
                terminal::paint("Backed up", terminal::Color::GREEN, use_color),
                entry.title
            );
            println!("  File: {}", file_id);
        }
    }

    Ok(())
}

pub fn run_list(app: &App, format: &OutputFormat, use_color: bool) -> Result<()> {
    let drive = app.drive_client()?;
    let runtime = app::runtime()?;
    let files = runtime
        .block_on(drive.list_files())
        .context("Failed to list Drive backups")?;

    let linked = app.remote_files()?;
    let entries = app.storage.list_entries().context("Failed to list entries")?;
    let entry_for = |file_id: &RemoteFileId| {
        linked
            .get(file_id)
            .and_then(|id| entries.iter().find(|e| e.id == *id))
    };

    match format {
        OutputFormat::Json => {
            let output: Vec<_> = files
                .iter()
                .map(|file| {
                    let mut value = serde_json::to_value(file).unwrap_or_default();
                    value["entryId"] = serde_json::json!(entry_for(&file.id).map(|e| e.id));
                    value
                })
                .collect();
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        OutputFormat::Plain => {
            if files.is_empty() {
                println!("No backups in '{}'.", app.config.drive.folder_name);
                return Ok(());
            }
            for file in &files {
                let created = file
                    .created_time
                    .as_ref()
                    .map(terminal::local_time)
                    .unwrap_or_else(|| " ".repeat(16));
                let entry = match entry_for(&file.id) {
                    Some(entry) => format!(
                        "  {}",
                        terminal::paint(
                            &format!("<- {} {}", terminal::short_id(&entry.id), entry.title),
                            terminal::Color::GRAY,
                            use_color
                        )
                    ),
                    None => String::new(),
                };
                println!("{}  {}{}", created, file.name, entry);
            }
            println!("\n{} backups", files.len());
        }
    }

    Ok(())
}
