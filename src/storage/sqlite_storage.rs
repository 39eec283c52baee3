//! SQLite-backed entry store.

use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use thiserror::Error;
use uuid::Uuid;

use super::models::{
    Entry, EntryPatch, Mood, NewEntry, PreferencesPatch, Template, TemplatePatch, Theme,
    UserPreferences, ValidationError,
};
use super::service::PersistenceService;

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Entry not found: {0}")]
    EntryNotFound(Uuid),

    #[error("Template not found: {0}")]
    TemplateNotFound(Uuid),

    #[error("Data directory not found")]
    DataDirNotFound,

    #[error("Corrupt row: {0}")]
    Corrupt(String),
}

pub type Result<T> = std::result::Result<T, StorageError>;

const SCHEMA: &str = r#"
    CREATE TABLE IF NOT EXISTS entries (
        id TEXT PRIMARY KEY,
        title TEXT NOT NULL,
        content TEXT NOT NULL,
        tags TEXT NOT NULL DEFAULT '[]',
        is_favorite INTEGER NOT NULL DEFAULT 0,
        mood TEXT,
        mood_intensity INTEGER NOT NULL DEFAULT 3,
        mood_notes TEXT,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL
    );

    CREATE TABLE IF NOT EXISTS templates (
        id TEXT PRIMARY KEY,
        name TEXT NOT NULL,
        content TEXT NOT NULL,
        created_at TEXT NOT NULL
    );

    -- Single row, id is always 1
    CREATE TABLE IF NOT EXISTS preferences (
        id INTEGER PRIMARY KEY CHECK (id = 1),
        theme TEXT NOT NULL,
        settings TEXT NOT NULL DEFAULT '{}'
    );

    CREATE INDEX IF NOT EXISTS idx_entries_created_at ON entries(created_at);
"#;

const ENTRY_COLUMNS: &str = "id, title, content, tags, is_favorite, mood, mood_intensity, \
                             mood_notes, created_at, updated_at";

/// Journal store on a single SQLite connection.
pub struct SqliteStorage {
    conn: Mutex<Connection>,
    db_path: Option<PathBuf>,
}

impl SqliteStorage {
    /// Open (or create) the database file at `db_path`
    pub fn open(db_path: PathBuf) -> Result<Self> {
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(&db_path)?;
        conn.execute_batch(SCHEMA)?;
        log::debug!("Opened journal database at {:?}", db_path);
        Ok(Self {
            conn: Mutex::new(conn),
            db_path: Some(db_path),
        })
    }

    /// Throwaway database, used by tests and dry runs
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Mutex::new(conn),
            db_path: None,
        })
    }

    /// Get the default data directory
    pub fn default_data_dir() -> Result<PathBuf> {
        dirs::data_local_dir()
            .map(|p| p.join("journal"))
            .ok_or(StorageError::DataDirNotFound)
    }

    /// Database file inside a data directory
    pub fn db_path_in(data_dir: &Path) -> PathBuf {
        data_dir.join("journal.db")
    }

    pub fn path(&self) -> Option<&Path> {
        self.db_path.as_deref()
    }

    fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write_entry(conn: &Connection, entry: &Entry) -> Result<()> {
        conn.execute(
            "INSERT OR REPLACE INTO entries (id, title, content, tags, is_favorite, mood, \
             mood_intensity, mood_notes, created_at, updated_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            params![
                entry.id.to_string(),
                entry.title,
                entry.content,
                serde_json::to_string(&entry.tags)?,
                entry.is_favorite,
                entry.mood.map(|m| m.as_str()),
                entry.mood_intensity,
                entry.mood_notes,
                format_timestamp(entry.created_at),
                format_timestamp(entry.updated_at),
            ],
        )?;
        Ok(())
    }

    fn read_entry(conn: &Connection, id: Uuid) -> Result<Entry> {
        let sql = format!("SELECT {} FROM entries WHERE id = ?1", ENTRY_COLUMNS);
        let raw = conn
            .query_row(&sql, params![id.to_string()], RawEntry::from_row)
            .optional()?
            .ok_or(StorageError::EntryNotFound(id))?;
        raw.into_entry()
    }

    fn read_template(conn: &Connection, id: Uuid) -> Result<Template> {
        let raw = conn
            .query_row(
                "SELECT id, name, content, created_at FROM templates WHERE id = ?1",
                params![id.to_string()],
                RawTemplate::from_row,
            )
            .optional()?
            .ok_or(StorageError::TemplateNotFound(id))?;
        raw.into_template()
    }

    fn write_template(conn: &Connection, template: &Template) -> Result<()> {
        conn.execute(
            "INSERT OR REPLACE INTO templates (id, name, content, created_at) VALUES (?1, ?2, ?3, ?4)",
            params![
                template.id.to_string(),
                template.name,
                template.content,
                format_timestamp(template.created_at),
            ],
        )?;
        Ok(())
    }

    fn read_preferences(conn: &Connection) -> Result<Option<UserPreferences>> {
        let row: Option<(String, String)> = conn
            .query_row(
                "SELECT theme, settings FROM preferences WHERE id = 1",
                [],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;

        let Some((theme, settings)) = row else {
            return Ok(None);
        };
        Ok(Some(UserPreferences {
            theme: theme.parse::<Theme>()?,
            settings: serde_json::from_str(&settings)?,
        }))
    }

    fn write_preferences(conn: &Connection, prefs: &UserPreferences) -> Result<()> {
        conn.execute(
            "INSERT OR REPLACE INTO preferences (id, theme, settings) VALUES (1, ?1, ?2)",
            params![prefs.theme.as_str(), serde_json::to_string(&prefs.settings)?],
        )?;
        Ok(())
    }
}

/// Row as stored, before parsing ids, timestamps and JSON columns
struct RawEntry {
    id: String,
    title: String,
    content: String,
    tags: String,
    is_favorite: bool,
    mood: Option<String>,
    mood_intensity: u8,
    mood_notes: Option<String>,
    created_at: String,
    updated_at: String,
}

impl RawEntry {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            title: row.get(1)?,
            content: row.get(2)?,
            tags: row.get(3)?,
            is_favorite: row.get(4)?,
            mood: row.get(5)?,
            mood_intensity: row.get(6)?,
            mood_notes: row.get(7)?,
            created_at: row.get(8)?,
            updated_at: row.get(9)?,
        })
    }

    fn into_entry(self) -> Result<Entry> {
        Ok(Entry {
            id: parse_uuid(&self.id)?,
            title: self.title,
            content: self.content,
            tags: serde_json::from_str(&self.tags)?,
            is_favorite: self.is_favorite,
            mood: self.mood.as_deref().map(str::parse::<Mood>).transpose()?,
            mood_intensity: self.mood_intensity,
            mood_notes: self.mood_notes,
            created_at: parse_timestamp(&self.created_at)?,
            updated_at: parse_timestamp(&self.updated_at)?,
        })
    }
}

struct RawTemplate {
    id: String,
    name: String,
    content: String,
    created_at: String,
}

impl RawTemplate {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            name: row.get(1)?,
            content: row.get(2)?,
            created_at: row.get(3)?,
        })
    }

    fn into_template(self) -> Result<Template> {
        Ok(Template {
            id: parse_uuid(&self.id)?,
            name: self.name,
            content: self.content,
            created_at: parse_timestamp(&self.created_at)?,
        })
    }
}

fn parse_uuid(s: &str) -> Result<Uuid> {
    Uuid::parse_str(s).map_err(|e| StorageError::Corrupt(format!("bad id {:?}: {}", s, e)))
}

/// Fixed-width so that text ordering matches time ordering
fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

fn parse_timestamp(s: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| StorageError::Corrupt(format!("bad timestamp {:?}: {}", s, e)))
}

impl PersistenceService for SqliteStorage {
    fn list_entries(&self) -> Result<Vec<Entry>> {
        let conn = self.conn();
        let sql = format!(
            "SELECT {} FROM entries ORDER BY created_at DESC, rowid DESC",
            ENTRY_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
            .query_map([], RawEntry::from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        rows.into_iter().map(RawEntry::into_entry).collect()
    }

    fn get_entry(&self, id: Uuid) -> Result<Entry> {
        Self::read_entry(&self.conn(), id)
    }

    fn create_entry(&self, entry: NewEntry) -> Result<Entry> {
        let entry = entry.into_entry();
        Self::write_entry(&self.conn(), &entry)?;
        log::info!("Created entry {} ({:?})", entry.id, entry.title);
        Ok(entry)
    }

    fn update_entry(&self, id: Uuid, patch: EntryPatch) -> Result<Entry> {
        let mut conn = self.conn();
        let tx = conn.transaction()?;
        let mut entry = Self::read_entry(&tx, id)?;
        entry.apply(patch);
        entry.validate()?;
        Self::write_entry(&tx, &entry)?;
        tx.commit()?;
        Ok(entry)
    }

    fn delete_entry(&self, id: Uuid) -> Result<()> {
        let deleted = self
            .conn()
            .execute("DELETE FROM entries WHERE id = ?1", params![id.to_string()])?;
        if deleted == 0 {
            return Err(StorageError::EntryNotFound(id));
        }
        log::info!("Deleted entry {}", id);
        Ok(())
    }

    fn search_entries(&self, query: &str) -> Result<Vec<Entry>> {
        // SQLite's lower() only folds ASCII, so match in Rust instead
        let entries = self.list_entries()?;
        Ok(entries.into_iter().filter(|e| e.matches(query)).collect())
    }

    fn list_templates(&self) -> Result<Vec<Template>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT id, name, content, created_at FROM templates ORDER BY name COLLATE NOCASE",
        )?;
        let rows = stmt
            .query_map([], RawTemplate::from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        rows.into_iter().map(RawTemplate::into_template).collect()
    }

    fn get_template(&self, id: Uuid) -> Result<Template> {
        Self::read_template(&self.conn(), id)
    }

    fn create_template(&self, template: Template) -> Result<Template> {
        template.validate()?;
        Self::write_template(&self.conn(), &template)?;
        Ok(template)
    }

    fn update_template(&self, id: Uuid, patch: TemplatePatch) -> Result<Template> {
        let conn = self.conn();
        let mut template = Self::read_template(&conn, id)?;
        if let Some(name) = patch.name {
            template.name = name;
        }
        if let Some(content) = patch.content {
            template.content = content;
        }
        template.validate()?;
        Self::write_template(&conn, &template)?;
        Ok(template)
    }

    fn delete_template(&self, id: Uuid) -> Result<()> {
        let deleted = self
            .conn()
            .execute("DELETE FROM templates WHERE id = ?1", params![id.to_string()])?;
        if deleted == 0 {
            return Err(StorageError::TemplateNotFound(id));
        }
        Ok(())
    }

    fn get_preferences(&self) -> Result<UserPreferences> {
        let conn = self.conn();
        if let Some(prefs) = Self::read_preferences(&conn)? {
            return Ok(prefs);
        }
        let prefs = UserPreferences::default();
        Self::write_preferences(&conn, &prefs)?;
        log::debug!("Created default preferences");
        Ok(prefs)
    }

    fn update_preferences(&self, patch: PreferencesPatch) -> Result<UserPreferences> {
        let conn = self.conn();
        let mut prefs = Self::read_preferences(&conn)?.unwrap_or_default();
        prefs.apply(patch);
        Self::write_preferences(&conn, &prefs)?;
        Ok(prefs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn create_test_storage() -> SqliteStorage {
        SqliteStorage::open_in_memory().unwrap()
    }

    #[test]
    fn test_create_and_get_entry() {
        let storage = create_test_storage();

        let new_entry = NewEntry::new("Hello", "World")
            .unwrap()
            .with_tags(["travel", "travel", "food"])
            .with_mood(Mood::Excited, 4)
            .unwrap();
        let created = storage.create_entry(new_entry).unwrap();

        let retrieved = storage.get_entry(created.id).unwrap();
        assert_eq!(retrieved.title, "Hello");
        assert_eq!(retrieved.tags, vec!["travel", "food"]);
        assert_eq!(retrieved.mood, Some(Mood::Excited));
        assert_eq!(retrieved.mood_intensity, 4);
        assert_eq!(retrieved.created_at, created.created_at);
    }

    #[test]
    fn test_list_newest_first() {
        let storage = create_test_storage();
        for i in 0..3 {
            storage
                .create_entry(NewEntry::new(format!("Entry {}", i), "body").unwrap())
                .unwrap();
        }

        let entries = storage.list_entries().unwrap();
        assert_eq!(entries.len(), 3);
        assert_eq!(entries[0].title, "Entry 2");
        assert_eq!(entries[2].title, "Entry 0");
    }

    #[test]
    fn test_partial_update() {
        let storage = create_test_storage();
        let created = storage
            .create_entry(NewEntry::new("Original", "body").unwrap())
            .unwrap();

        let updated = storage
            .update_entry(
                created.id,
                EntryPatch {
                    title: Some("Renamed".to_string()),
                    is_favorite: Some(true),
                    ..Default::default()
                },
            )
            .unwrap();
        assert_eq!(updated.title, "Renamed");
        assert_eq!(updated.content, "body");
        assert!(updated.is_favorite);
        assert_eq!(updated.created_at, created.created_at);
    }

    #[test]
    fn test_update_rejects_invalid_patch() {
        let storage = create_test_storage();
        let created = storage
            .create_entry(NewEntry::new("Title", "body").unwrap())
            .unwrap();

        let result = storage.update_entry(
            created.id,
            EntryPatch {
                title: Some(String::new()),
                ..Default::default()
            },
        );
        assert!(matches!(
            result,
            Err(StorageError::Validation(ValidationError::EmptyTitle))
        ));
        assert_eq!(storage.get_entry(created.id).unwrap().title, "Title");
    }

    #[test]
    fn test_update_missing_entry() {
        let storage = create_test_storage();
        let result = storage.update_entry(Uuid::new_v4(), EntryPatch::default());
        assert!(matches!(result, Err(StorageError::EntryNotFound(_))));
    }

    #[test]
    fn test_delete_entry() {
        let storage = create_test_storage();
        let created = storage
            .create_entry(NewEntry::new("To Delete", "body").unwrap())
            .unwrap();

        storage.delete_entry(created.id).unwrap();
        assert!(storage.get_entry(created.id).is_err());
        assert!(matches!(
            storage.delete_entry(created.id),
            Err(StorageError::EntryNotFound(_))
        ));
    }

    #[test]
    fn test_search_is_case_insensitive() {
        let storage = create_test_storage();
        storage
            .create_entry(NewEntry::new("Morning run", "Felt great").unwrap())
            .unwrap();
        storage
            .create_entry(NewEntry::new("Groceries", "Buy MORNING coffee").unwrap())
            .unwrap();
        storage
            .create_entry(NewEntry::new("Evening", "Quiet").unwrap())
            .unwrap();

        let matches = storage.search_entries("morning").unwrap();
        assert_eq!(matches.len(), 2);
        assert!(storage.search_entries("weekly").unwrap().is_empty());
    }

    #[test]
    fn test_templates_crud() {
        let storage = create_test_storage();
        let template = storage
            .create_template(Template::new("Gratitude", "Three things:").unwrap())
            .unwrap();

        let updated = storage
            .update_template(
                template.id,
                TemplatePatch {
                    content: Some("Five things:".to_string()),
                    ..Default::default()
                },
            )
            .unwrap();
        assert_eq!(updated.content, "Five things:");

        let entry = NewEntry::from_template("Today", &updated).unwrap().into_entry();
        assert_eq!(entry.content, "Five things:");

        storage.delete_template(template.id).unwrap();
        assert!(storage.list_templates().unwrap().is_empty());
    }

    #[test]
    fn test_preferences_created_lazily() {
        let storage = create_test_storage();
        let prefs = storage.get_preferences().unwrap();
        assert_eq!(prefs.theme, Theme::Dark);

        let updated = storage
            .update_preferences(PreferencesPatch {
                theme: Some(Theme::System),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(updated.theme, Theme::System);
        assert_eq!(storage.get_preferences().unwrap().theme, Theme::System);
    }

    #[test]
    fn test_reopen_from_disk() {
        let temp_dir = TempDir::new().unwrap();
        let path = SqliteStorage::db_path_in(temp_dir.path());

        let id = {
            let storage = SqliteStorage::open(path.clone()).unwrap();
            storage
                .create_entry(NewEntry::new("Persisted", "body").unwrap())
                .unwrap()
                .id
        };

        let storage = SqliteStorage::open(path).unwrap();
        assert_eq!(storage.get_entry(id).unwrap().title, "Persisted");
    }
}
