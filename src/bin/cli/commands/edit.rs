use anyhow::{bail, Context, Result};

use journal_lib::storage::{EntryPatch, Mood, PersistenceService};

use super::parse_tags;
use crate::app::App;
use crate::render::terminal;
use crate::OutputFormat;

pub struct EditArgs {
    pub title: Option<String>,
    pub content: Option<String>,
    pub tags: Option<String>,
    pub mood: Option<String>,
    pub intensity: Option<u8>,
    pub mood_notes: Option<String>,
    pub is_favorite: Option<bool>,
}

impl EditArgs {
    fn into_patch(self) -> Result<EntryPatch> {
        let mood = match self.mood.as_deref() {
            None => None,
            Some(m) if m.trim().eq_ignore_ascii_case("none") => Some(None),
            Some(m) => Some(Some(m.parse::<Mood>()?)),
        };
        let mood_notes = self
            .mood_notes
            .map(|n| if n.trim().is_empty() { None } else { Some(n) });

        Ok(EntryPatch {
            title: self.title,
            content: self.content,
            tags: self.tags.as_deref().map(parse_tags),
            is_favorite: self.is_favorite,
            mood,
            mood_intensity: self.intensity,
            mood_notes,
        })
    }
}

pub fn run(app: &App, id: &str, args: EditArgs, format: &OutputFormat, use_color: bool) -> Result<()> {
    let entry = app.find_entry(id)?;
    let patch = args.into_patch()?;
    if patch.is_empty() {
        bail!("Nothing to change. Pass at least one field, see --help");
    }

    let entry = app
        .storage
        .update_entry(entry.id, patch)
        .context("Failed to update entry")?;

    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&entry)?);
        }
        OutputFormat::Plain => {
            println!("Updated {}", terminal::entry_line(&entry, use_color));
        }
    }

    Ok(())
}
