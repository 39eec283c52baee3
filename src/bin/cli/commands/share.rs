use anyhow::{bail, Result};

use journal_lib::sync::Notice;

use crate::app::{self, App};
use crate::OutputFormat;

pub fn run(app: &App, id: &str, format: &OutputFormat, _use_color: bool) -> Result<()> {
    let entry = app.find_entry(id)?;
    let coordinator = app.coordinator(Some(entry.id))?;
    coordinator.load(entry.title.as_str(), entry.content.as_str());

    let runtime = app::runtime()?;
    let result = runtime.block_on(coordinator.share());

    // An upload made on the way is kept even when sharing failed
    if let Some(file_id) = coordinator.remote_file_id() {
        app.remember_remote_file(entry.id, Some(&file_id))?;
    }

    let link = match result {
        Ok(link) => link,
        Err(e) if e.requires_reauthentication() => {
            bail!("{} ({})", Notice::ReauthenticationRequired.message(), e)
        }
        Err(e) => bail!("Sharing failed: {}", e),
    };

    match format {
        OutputFormat::Json => {
            let output = serde_json::json!({
                "id": entry.id.to_string(),
                "remoteFileId": link.file_id,
                "url": link.url,
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        OutputFormat::Plain => {
            println!("{}", link.url);
        }
    }

    Ok(())
}
