use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{bail, Context, Result};
use tokio::io::{AsyncBufReadExt, BufReader};

use journal_lib::storage::{NewEntry, PersistenceService};
use journal_lib::sync::{
    AutosaveStatus, Notice, RemoteFileId, SaveCoordinator, SaveOutcome, StatusListener, SyncError,
};

use crate::app::{self, App};
use crate::render::terminal;
use crate::OutputFormat;

/// Prints autosave progress to stderr so stdout stays clean
struct StatusPrinter {
    json: bool,
    use_color: bool,
    last_line: Mutex<String>,
}

impl StatusListener for StatusPrinter {
    fn on_status(&self, status: &AutosaveStatus) {
        if self.json {
            if let Ok(line) = serde_json::to_string(&serde_json::json!({ "status": status })) {
                eprintln!("{}", line);
            }
            return;
        }

        let line = terminal::status_line(status, self.use_color);
        let mut last = self.last_line.lock().unwrap_or_else(|e| e.into_inner());
        if !line.is_empty() && *last != line {
            eprintln!("[{}]", line);
        }
        *last = line;
    }

    fn on_notice(&self, notice: &Notice) {
        if self.json {
            if let Ok(line) = serde_json::to_string(&serde_json::json!({ "notice": notice })) {
                eprintln!("{}", line);
            }
        } else if !matches!(notice, Notice::Saved { .. }) {
            eprintln!("{}", terminal::notice_line(notice, self.use_color));
        }
    }
}

pub fn run(
    app: &App,
    title: &str,
    quiet_ms: Option<u64>,
    backup: bool,
    format: &OutputFormat,
    use_color: bool,
) -> Result<()> {
    if title.trim().is_empty() {
        bail!("Title must not be empty");
    }

    let coordinator = if backup {
        let coordinator = app.coordinator(None)?;
        if let Some(ms) = quiet_ms {
            coordinator.set_quiet_period(Duration::from_millis(ms));
        }
        coordinator.subscribe(Arc::new(StatusPrinter {
            json: matches!(format, OutputFormat::Json),
            use_color,
            last_line: Mutex::new(String::new()),
        }));
        Some(coordinator)
    } else {
        None
    };

    let runtime = app::runtime()?;
    let (content, file_id) = runtime.block_on(async {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        let mut content = String::new();
        while let Some(line) = lines.next_line().await.context("Failed to read stdin")? {
            if !content.is_empty() {
                content.push('\n');
            }
            content.push_str(&line);
            if let Some(coordinator) = &coordinator {
                coordinator.on_edit(title, content.clone());
            }
        }

        let file_id = match &coordinator {
            Some(coordinator) if !content.trim().is_empty() => final_backup(coordinator).await,
            _ => None,
        };
        Ok::<_, anyhow::Error>((content, file_id))
    })?;

    if content.trim().is_empty() {
        bail!("Nothing written; entry not saved");
    }

    let entry = app
        .storage
        .create_entry(NewEntry::new(title, content)?)
        .context("Failed to save entry")?;
    if let Some(file_id) = &file_id {
        app.remember_remote_file(entry.id, Some(file_id))?;
    }

    match format {
        OutputFormat::Json => {
            let mut output = serde_json::to_value(&entry)?;
            output["remoteFileId"] = serde_json::json!(file_id);
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        OutputFormat::Plain => {
            println!("Saved entry \"{}\"", entry.title);
            println!("  ID: {}", entry.id);
            if let Some(file_id) = file_id {
                println!("  Drive file: {}", file_id);
            }
        }
    }

    Ok(())
}

/// Upload whatever the quiet period has not caught yet
async fn final_backup(coordinator: &SaveCoordinator) -> Option<RemoteFileId> {
    loop {
        match coordinator.flush().await {
            Ok(SaveOutcome::Saved(file_id)) => return Some(file_id),
            Ok(SaveOutcome::Unchanged) => return coordinator.remote_file_id(),
            Err(SyncError::Busy) => tokio::time::sleep(Duration::from_millis(100)).await,
            Err(e) => {
                log::warn!("Final backup failed: {}", e);
                eprintln!("Backup failed ({}). The entry is still saved locally.", e);
                return coordinator.remote_file_id();
            }
        }
    }
}
