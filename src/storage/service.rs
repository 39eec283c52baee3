use uuid::Uuid;

use super::models::{
    Entry, EntryPatch, NewEntry, PreferencesPatch, Template, TemplatePatch, UserPreferences,
};
use super::sqlite_storage::Result;

/// CRUD over entries, templates and the preferences singleton.
///
/// The autosave pipeline never touches this; it is the local store that the
/// editor saves to explicitly. Implementations must be shareable across
/// tasks, so `SqliteStorage` serialises access to its connection.
pub trait PersistenceService: Send + Sync {
    /// All entries, newest first
    fn list_entries(&self) -> Result<Vec<Entry>>;
    fn get_entry(&self, id: Uuid) -> Result<Entry>;
    fn create_entry(&self, entry: NewEntry) -> Result<Entry>;
    fn update_entry(&self, id: Uuid, patch: EntryPatch) -> Result<Entry>;
    fn delete_entry(&self, id: Uuid) -> Result<()>;
    /// Case-insensitive substring search over title and content
    fn search_entries(&self, query: &str) -> Result<Vec<Entry>>;

    fn list_templates(&self) -> Result<Vec<Template>>;
    fn get_template(&self, id: Uuid) -> Result<Template>;
    fn create_template(&self, template: Template) -> Result<Template>;
    fn update_template(&self, id: Uuid, patch: TemplatePatch) -> Result<Template>;
    fn delete_template(&self, id: Uuid) -> Result<()>;

    /// Preferences, created with defaults on first read
    fn get_preferences(&self) -> Result<UserPreferences>;
    fn update_preferences(&self, patch: PreferencesPatch) -> Result<UserPreferences>;
}
