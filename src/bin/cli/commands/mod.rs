pub mod backup;
pub mod compose;
pub mod delete;
pub mod edit;
pub mod insights;
pub mod list;
pub mod new;
pub mod prefs;
pub mod search;
pub mod share;
pub mod show;
pub mod template;

/// Split a comma-separated `--tags` value
pub fn parse_tags(tags: &str) -> Vec<String> {
    journal_lib::storage::normalize_tags(tags.split(','))
}
