use anyhow::{Context, Result};

use journal_lib::storage::{PersistenceService, PreferencesPatch, Theme, UserPreferences};

use crate::app::App;
use crate::OutputFormat;

fn print(prefs: &UserPreferences, format: &OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(prefs)?);
        }
        OutputFormat::Plain => {
            println!("theme = {}", prefs.theme.as_str());
            for (key, value) in &prefs.settings {
                println!("{} = {}", key, value);
            }
        }
    }
    Ok(())
}

pub fn run_show(app: &App, format: &OutputFormat) -> Result<()> {
    let prefs = app
        .storage
        .get_preferences()
        .context("Failed to read preferences")?;
    print(&prefs, format)
}

pub fn run_theme(app: &App, theme: &str, format: &OutputFormat) -> Result<()> {
    let theme: Theme = theme.parse()?;
    let prefs = app
        .storage
        .update_preferences(PreferencesPatch {
            theme: Some(theme),
            ..Default::default()
        })
        .context("Failed to save preferences")?;
    print(&prefs, format)
}

pub fn run_set(app: &App, key: &str, value: &str, format: &OutputFormat) -> Result<()> {
    let value = serde_json::from_str(value)
        .unwrap_or_else(|_| serde_json::Value::String(value.to_string()));

    let mut patch = PreferencesPatch::default();
    patch.settings.insert(key.to_string(), value);
    let prefs = app
        .storage
        .update_preferences(patch)
        .context("Failed to save preferences")?;
    print(&prefs, format)
}
