use anyhow::Result;

use crate::app::App;
use crate::render::terminal;
use crate::OutputFormat;

pub fn run(app: &App, id: &str, format: &OutputFormat, use_color: bool) -> Result<()> {
    let entry = app.find_entry(id)?;
    let remote_file_id = app.remote_file_id(entry.id)?;

    match format {
        OutputFormat::Json => {
            let mut output = serde_json::to_value(&entry)?;
            output["remoteFileId"] = serde_json::json!(remote_file_id);
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        OutputFormat::Plain => {
            println!("{}", terminal::render_entry(&entry, use_color));
            if let Some(file_id) = remote_file_id {
                println!();
                println!(
                    "{}",
                    terminal::paint(
                        &format!("Drive file: {}", file_id),
                        terminal::Color::DIM,
                        use_color
                    )
                );
            }
        }
    }

    Ok(())
}
