mod app;
mod commands;
mod render;

use std::io::IsTerminal;
use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};

use journal_lib::config::AppConfig;

#[derive(Parser)]
#[command(name = "journal-cli", about = "Journal entries with Google Drive backup", version)]
struct Cli {
    /// Config file (default: <config dir>/journal/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Output format
    #[arg(long, global = true, default_value = "plain")]
    format: OutputFormat,

    /// Disable ANSI colors
    #[arg(long, global = true)]
    no_color: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Clone, Debug, clap::ValueEnum)]
pub enum OutputFormat {
    Plain,
    Json,
}

#[derive(Subcommand)]
enum Command {
    /// List entries, newest first
    List {
        /// Only favorites
        #[arg(long)]
        favorites: bool,
        /// Only entries with this tag
        #[arg(long)]
        tag: Option<String>,
    },

    /// Show one entry
    Show {
        /// Entry id or unique prefix
        id: String,
    },

    /// Create an entry
    New {
        title: String,
        /// Entry text (use "-" to read from stdin)
        #[arg(long)]
        content: Option<String>,
        /// Seed the content from a template (name or id)
        #[arg(long)]
        template: Option<String>,
        /// Comma-separated tags
        #[arg(long)]
        tags: Option<String>,
        /// happy, excited, peaceful, neutral, sad, anxious or angry
        #[arg(long)]
        mood: Option<String>,
        /// Mood intensity from 1 to 5
        #[arg(long, requires = "mood")]
        intensity: Option<u8>,
        #[arg(long, requires = "mood")]
        mood_notes: Option<String>,
        #[arg(long)]
        favorite: bool,
    },

    /// Change fields of an entry
    Edit {
        /// Entry id or unique prefix
        id: String,
        #[arg(long)]
        title: Option<String>,
        /// New text (use "-" to read from stdin)
        #[arg(long)]
        content: Option<String>,
        /// Comma-separated tags, replacing the current ones
        #[arg(long)]
        tags: Option<String>,
        /// Mood, or "none" to clear it
        #[arg(long)]
        mood: Option<String>,
        #[arg(long)]
        intensity: Option<u8>,
        /// Mood notes, or "" to clear them
        #[arg(long)]
        mood_notes: Option<String>,
        #[arg(long, conflicts_with = "unfavorite")]
        favorite: bool,
        #[arg(long)]
        unfavorite: bool,
    },

    /// Delete an entry
    Delete {
        /// Entry id or unique prefix
        id: String,
    },

    /// Case-insensitive search over titles and content
    Search { query: String },

    /// Mood summary, distribution and recent trend
    Insights,

    /// Entry templates
    #[command(subcommand)]
    Template(TemplateCommand),

    /// Theme and other preferences
    #[command(subcommand)]
    Prefs(PrefsCommand),

    /// Upload an entry to Google Drive now, or list the Drive backups
    Backup {
        /// Entry id or unique prefix
        #[arg(required_unless_present = "list", conflicts_with = "list")]
        id: Option<String>,
        /// List the files in the Drive entries folder
        #[arg(long)]
        list: bool,
    },

    /// Make an entry's Drive copy public and print its link
    Share {
        /// Entry id or unique prefix
        id: String,
    },

    /// Write a new entry from stdin with live autosave
    Compose {
        title: String,
        /// Quiet period before an autosave, in milliseconds
        #[arg(long)]
        quiet_ms: Option<u64>,
        /// Store locally only
        #[arg(long)]
        no_backup: bool,
    },
}

#[derive(Subcommand)]
enum TemplateCommand {
    /// List templates
    List,
    /// Create a template
    New {
        name: String,
        /// Template text (use "-" to read from stdin)
        #[arg(long)]
        content: Option<String>,
    },
    /// Delete a template
    Delete {
        /// Template name or id
        name: String,
    },
}

#[derive(Subcommand)]
enum PrefsCommand {
    /// Show preferences
    Show,
    /// Set the theme (light, dark or system)
    Theme { theme: String },
    /// Set a preference; the value is parsed as JSON when possible, "null" removes it
    Set { key: String, value: String },
}

/// Read content from stdin if piped, or resolve "-" as stdin
fn resolve_content(content: Option<String>) -> Option<String> {
    match content.as_deref() {
        Some("-") => {
            let mut buf = String::new();
            std::io::Read::read_to_string(&mut std::io::stdin(), &mut buf).ok();
            Some(buf)
        }
        Some(_) => content,
        None => {
            // Auto-detect piped stdin
            if !std::io::stdin().is_terminal() {
                let mut buf = String::new();
                std::io::Read::read_to_string(&mut std::io::stdin(), &mut buf).ok();
                if buf.is_empty() { None } else { Some(buf) }
            } else {
                None
            }
        }
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = AppConfig::load(cli.config.as_deref()).context("Failed to load config")?;

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(config.log_level()))
        .init();

    let use_color = !cli.no_color && std::io::stdout().is_terminal();
    let app = app::App::new(config)?;

    match cli.command {
        Command::List { favorites, tag } => {
            commands::list::run(&app, favorites, tag.as_deref(), &cli.format, use_color)?;
        }
        Command::Show { id } => {
            commands::show::run(&app, &id, &cli.format, use_color)?;
        }
        Command::New { title, content, template, tags, mood, intensity, mood_notes, favorite } => {
            let content = resolve_content(content);
            commands::new::run(
                &app,
                commands::new::NewArgs {
                    title,
                    content,
                    template,
                    tags,
                    mood,
                    intensity,
                    mood_notes,
                    favorite,
                },
                &cli.format,
                use_color,
            )?;
        }
        Command::Edit { id, title, content, tags, mood, intensity, mood_notes, favorite, unfavorite } => {
            let content = match content.as_deref() {
                Some("-") => resolve_content(content),
                _ => content,
            };
            let is_favorite = match (favorite, unfavorite) {
                (true, _) => Some(true),
                (_, true) => Some(false),
                _ => None,
            };
            commands::edit::run(
                &app,
                &id,
                commands::edit::EditArgs {
                    title,
                    content,
                    tags,
                    mood,
                    intensity,
                    mood_notes,
                    is_favorite,
                },
                &cli.format,
                use_color,
            )?;
        }
        Command::Delete { id } => {
            commands::delete::run(&app, &id, &cli.format)?;
        }
        Command::Search { query } => {
            commands::search::run(&app, &query, &cli.format, use_color)?;
        }
        Command::Insights => {
            commands::insights::run(&app, &cli.format, use_color)?;
        }
        Command::Template(subcmd) => match subcmd {
            TemplateCommand::List => {
                commands::template::run_list(&app, &cli.format)?;
            }
            TemplateCommand::New { name, content } => {
                let content = resolve_content(content);
                commands::template::run_new(&app, &name, content, &cli.format)?;
            }
            TemplateCommand::Delete { name } => {
                commands::template::run_delete(&app, &name, &cli.format)?;
            }
        },
        Command::Prefs(subcmd) => match subcmd {
            PrefsCommand::Show => {
                commands::prefs::run_show(&app, &cli.format)?;
            }
            PrefsCommand::Theme { theme } => {
                commands::prefs::run_theme(&app, &theme, &cli.format)?;
            }
            PrefsCommand::Set { key, value } => {
                commands::prefs::run_set(&app, &key, &value, &cli.format)?;
            }
        },
        Command::Backup { id, list } => match id {
            Some(id) if !list => commands::backup::run(&app, &id, &cli.format, use_color)?,
            _ => commands::backup::run_list(&app, &cli.format, use_color)?,
        },
        Command::Share { id } => {
            commands::share::run(&app, &id, &cli.format, use_color)?;
        }
        Command::Compose { title, quiet_ms, no_backup } => {
            commands::compose::run(&app, &title, quiet_ms, !no_backup, &cli.format, use_color)?;
        }
    }

    Ok(())
}
