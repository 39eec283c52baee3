use anyhow::{bail, Context, Result};

use journal_lib::storage::{Mood, NewEntry, PersistenceService, DEFAULT_MOOD_INTENSITY};

use super::parse_tags;
use crate::app::App;
use crate::render::terminal;
use crate::OutputFormat;

pub struct NewArgs {
    pub title: String,
    pub content: Option<String>,
    pub template: Option<String>,
    pub tags: Option<String>,
    pub mood: Option<String>,
    pub intensity: Option<u8>,
    pub mood_notes: Option<String>,
    pub favorite: bool,
}

pub fn run(app: &App, args: NewArgs, format: &OutputFormat, use_color: bool) -> Result<()> {
    let content = args.content.filter(|c| !c.trim().is_empty());
    let mut new_entry = match (content, args.template.as_deref()) {
        (Some(content), _) => NewEntry::new(args.title, content)?,
        (None, Some(name)) => {
            let template = app.find_template(name)?;
            NewEntry::from_template(args.title, &template)?
        }
        (None, None) => {
            bail!("Entry content is required: pass --content, --template or pipe it on stdin")
        }
    };

    if let Some(tags) = args.tags.as_deref() {
        new_entry = new_entry.with_tags(parse_tags(tags));
    }
    if let Some(mood) = args.mood.as_deref() {
        let mood: Mood = mood.parse()?;
        new_entry = new_entry.with_mood(mood, args.intensity.unwrap_or(DEFAULT_MOOD_INTENSITY))?;
    }
    if let Some(notes) = args.mood_notes {
        new_entry = new_entry.with_mood_notes(notes);
    }
    new_entry = new_entry.favorite(args.favorite);

    let entry = app
        .storage
        .create_entry(new_entry)
        .context("Failed to create entry")?;

    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&entry)?);
        }
        OutputFormat::Plain => {
            println!("Created entry \"{}\"", entry.title);
            if !entry.tags.is_empty() {
                println!("  Tags: {}", terminal::tag_list(&entry.tags));
            }
            let badge = terminal::mood_badge(&entry, use_color);
            if !badge.is_empty() {
                println!("  Mood: {}", badge);
            }
            println!("  ID: {}", entry.id);
        }
    }

    Ok(())
}
