use chrono::{DateTime, Local, Utc};
use journal_lib::storage::{Entry, Mood};
use journal_lib::sync::{AutosaveStatus, Notice, SaveState};

/// ANSI color codes
#[allow(dead_code)]
pub struct Color;

#[allow(dead_code)]
impl Color {
    pub const RESET: &str = "\x1b[0m";
    pub const BOLD: &str = "\x1b[1m";
    pub const DIM: &str = "\x1b[2m";
    pub const RED: &str = "\x1b[31m";
    pub const GREEN: &str = "\x1b[32m";
    pub const YELLOW: &str = "\x1b[33m";
    pub const BLUE: &str = "\x1b[34m";
    pub const MAGENTA: &str = "\x1b[35m";
    pub const CYAN: &str = "\x1b[36m";
    pub const GRAY: &str = "\x1b[90m";
}

pub fn paint(text: &str, color: &str, use_color: bool) -> String {
    if use_color {
        format!("{}{}{}", color, text, Color::RESET)
    } else {
        text.to_string()
    }
}

/// First eight characters of an id, enough to address an entry
pub fn short_id(id: &uuid::Uuid) -> String {
    id.simple().to_string()[..8].to_string()
}

pub fn local_time(at: &DateTime<Utc>) -> String {
    at.with_timezone(&Local).format("%Y-%m-%d %H:%M").to_string()
}

pub fn mood_color(mood: Mood) -> &'static str {
    match mood {
        Mood::Happy | Mood::Excited => Color::YELLOW,
        Mood::Peaceful => Color::GREEN,
        Mood::Neutral => Color::GRAY,
        Mood::Sad => Color::BLUE,
        Mood::Anxious => Color::MAGENTA,
        Mood::Angry => Color::RED,
    }
}

/// `happy 4/5`, or nothing when no mood was recorded
pub fn mood_badge(entry: &Entry, use_color: bool) -> String {
    match entry.mood {
        Some(mood) => paint(
            &format!("{} {}/5", mood.as_str(), entry.mood_intensity),
            mood_color(mood),
            use_color,
        ),
        None => String::new(),
    }
}

pub fn tag_list(tags: &[String]) -> String {
    tags.iter()
        .map(|t| format!("#{}", t))
        .collect::<Vec<_>>()
        .join(" ")
}

/// One-line summary used by list and search
pub fn entry_line(entry: &Entry, use_color: bool) -> String {
    let star = if entry.is_favorite { "*" } else { " " };
    let mut line = format!(
        "{} {} {}  {}",
        paint(&short_id(&entry.id), Color::GRAY, use_color),
        star,
        local_time(&entry.created_at),
        paint(&entry.title, Color::BOLD, use_color),
    );
    let badge = mood_badge(entry, use_color);
    if !badge.is_empty() {
        line.push_str("  ");
        line.push_str(&badge);
    }
    if !entry.tags.is_empty() {
        line.push_str("  ");
        line.push_str(&paint(&tag_list(&entry.tags), Color::DIM, use_color));
    }
    line
}

/// Full entry for `show`
pub fn render_entry(entry: &Entry, use_color: bool) -> String {
    let mut lines = Vec::new();
    let title = if entry.is_favorite {
        format!("{} *", entry.title)
    } else {
        entry.title.clone()
    };
    lines.push(paint(&title, Color::BOLD, use_color));

    let mut meta = format!("Created {}", local_time(&entry.created_at));
    if entry.updated_at != entry.created_at {
        meta.push_str(&format!(", edited {}", local_time(&entry.updated_at)));
    }
    lines.push(paint(&meta, Color::DIM, use_color));

    if !entry.tags.is_empty() {
        lines.push(paint(&tag_list(&entry.tags), Color::DIM, use_color));
    }
    if entry.mood.is_some() {
        let mut mood = format!("Mood: {}", mood_badge(entry, use_color));
        if let Some(notes) = &entry.mood_notes {
            mood.push_str(&format!(" ({})", notes));
        }
        lines.push(mood);
    }

    lines.push(String::new());
    lines.extend(wrap_lines(&entry.content, "", 80));
    lines.join("\n")
}

pub fn status_line(status: &AutosaveStatus, use_color: bool) -> String {
    if status.show_saved_indicator {
        return paint("Saved", Color::GREEN, use_color);
    }
    match status.state {
        SaveState::Saving => paint("Saving...", Color::CYAN, use_color),
        SaveState::Pending => paint("Unsaved changes", Color::GRAY, use_color),
        SaveState::Idle => match (&status.error, &status.last_saved) {
            (Some(_), _) => paint("Backup failed", Color::RED, use_color),
            (None, Some(at)) => paint(
                &format!("Backed up {}", local_time(at)),
                Color::GRAY,
                use_color,
            ),
            (None, None) => String::new(),
        },
    }
}

pub fn notice_line(notice: &Notice, use_color: bool) -> String {
    match notice {
        Notice::Saved { .. } => paint(&notice.message(), Color::GREEN, use_color),
        Notice::AutosaveFailed { detail, .. } => format!(
            "{} {}",
            paint(&notice.message(), Color::YELLOW, use_color),
            paint(&format!("({})", detail), Color::DIM, use_color),
        ),
        Notice::ReauthenticationRequired => paint(&notice.message(), Color::RED, use_color),
    }
}

fn wrap_lines(text: &str, prefix: &str, max_width: usize) -> Vec<String> {
    let mut lines = Vec::new();
    let effective_width = max_width.saturating_sub(prefix.len());

    for line in text.lines() {
        if line.chars().count() <= effective_width {
            lines.push(format!("{}{}", prefix, line));
        } else {
            // Simple word wrap
            let mut current_line = String::new();
            for word in line.split_whitespace() {
                if current_line.is_empty() {
                    current_line = word.to_string();
                } else if current_line.chars().count() + 1 + word.chars().count() <= effective_width {
                    current_line.push(' ');
                    current_line.push_str(word);
                } else {
                    lines.push(format!("{}{}", prefix, current_line));
                    current_line = word.to_string();
                }
            }
            if !current_line.is_empty() {
                lines.push(format!("{}{}", prefix, current_line));
            }
        }
    }

    lines
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wrap_lines() {
        let text = "one two three four five";
        assert_eq!(wrap_lines(text, "", 9), vec!["one two", "three", "four five"]);
        assert_eq!(wrap_lines("short\n\nnext", "> ", 80), vec!["> short", "> ", "> next"]);
    }

    #[test]
    fn test_status_line() {
        let mut status = AutosaveStatus::default();
        assert_eq!(status_line(&status, false), "");
        status.state = SaveState::Saving;
        assert_eq!(status_line(&status, false), "Saving...");
        status.show_saved_indicator = true;
        assert_eq!(status_line(&status, false), "Saved");
    }
}
