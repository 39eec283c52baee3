use anyhow::{Context, Result};

use journal_lib::storage::{MoodInsights, PersistenceService};

use crate::app::App;
use crate::render::terminal::{self, Color};
use crate::OutputFormat;

pub fn run(app: &App, format: &OutputFormat, use_color: bool) -> Result<()> {
    let entries = app.storage.list_entries().context("Failed to list entries")?;
    let insights = MoodInsights::from_entries(&entries);

    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&insights)?);
        }
        OutputFormat::Plain => {
            if insights.entries_with_mood == 0 {
                println!("No moods recorded yet. Add one with --mood to see patterns.");
                return Ok(());
            }

            let dominant = insights.dominant_mood.map_or("none", |m| m.as_str());
            println!("{}", terminal::paint("Mood summary", Color::BOLD, use_color));
            println!("  Most frequent mood: {}", dominant);
            println!(
                "  Entries with mood:  {} of {}",
                insights.entries_with_mood, insights.total_entries
            );

            println!("\n{}", terminal::paint("Distribution", Color::BOLD, use_color));
            for count in &insights.distribution {
                let label = format!("{:<9}", count.mood.as_str());
                println!(
                    "  {} {} times",
                    terminal::paint(&label, terminal::mood_color(count.mood), use_color),
                    count.count
                );
            }

            println!("\n{}", terminal::paint("Recent", Color::BOLD, use_color));
            for point in &insights.trend {
                let label = format!("{:<9}", point.mood.as_str());
                println!(
                    "  {}  {} {}",
                    terminal::local_time(&point.created_at),
                    terminal::paint(&label, terminal::mood_color(point.mood), use_color),
                    "#".repeat(point.intensity as usize),
                );
            }
        }
    }

    Ok(())
}
