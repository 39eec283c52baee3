use std::collections::HashMap;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use uuid::Uuid;

use journal_lib::config::AppConfig;
use journal_lib::storage::{Entry, PersistenceService, PreferencesPatch, SqliteStorage, Template};
use journal_lib::sync::{
    CredentialStore, DriveCredentials, GoogleDriveClient, RemoteFileId, RemoteSyncClient,
    SaveCoordinator,
};

use crate::render::terminal::short_id;

/// Preferences key mapping entry ids to their Drive file ids
const REMOTE_FILES_KEY: &str = "remoteFiles";

/// Shared application state for CLI commands
pub struct App {
    pub config: AppConfig,
    pub storage: SqliteStorage,
}

impl App {
    pub fn new(config: AppConfig) -> Result<Self> {
        let data_dir = config.data_dir().context("Failed to get data directory")?;
        let db_path = SqliteStorage::db_path_in(&data_dir);
        let storage = SqliteStorage::open(db_path.clone())
            .with_context(|| format!("Failed to open journal at {}", db_path.display()))?;

        Ok(Self { config, storage })
    }

    /// Find an entry by full id or unique id prefix
    pub fn find_entry(&self, id: &str) -> Result<Entry> {
        if let Ok(uuid) = Uuid::parse_str(id) {
            return self
                .storage
                .get_entry(uuid)
                .with_context(|| format!("Entry {} not found", id));
        }

        let prefix = id.trim().to_lowercase().replace('-', "");
        if prefix.is_empty() {
            bail!("Entry id must not be empty");
        }
        let entries = self.storage.list_entries().context("Failed to list entries")?;
        let matches: Vec<&Entry> = entries
            .iter()
            .filter(|e| e.id.simple().to_string().starts_with(&prefix))
            .collect();

        match matches.len() {
            0 => bail!("No entry with id starting '{}'", id),
            1 => Ok(matches[0].clone()),
            _ => bail!(
                "Ambiguous entry id '{}'. Matches:\n{}",
                id,
                matches
                    .iter()
                    .map(|e| format!("  - {} {}", short_id(&e.id), e.title))
                    .collect::<Vec<_>>()
                    .join("\n")
            ),
        }
    }

    /// Find a template by id or name (case-insensitive, exact match first)
    pub fn find_template(&self, name: &str) -> Result<Template> {
        if let Ok(uuid) = Uuid::parse_str(name) {
            return self
                .storage
                .get_template(uuid)
                .with_context(|| format!("Template {} not found", name));
        }

        let templates = self.storage.list_templates().context("Failed to list templates")?;
        let name_lower = name.to_lowercase();

        if let Some(t) = templates.iter().find(|t| t.name.to_lowercase() == name_lower) {
            return Ok(t.clone());
        }

        let matches: Vec<&Template> = templates
            .iter()
            .filter(|t| t.name.to_lowercase().starts_with(&name_lower))
            .collect();

        match matches.len() {
            0 => bail!(
                "No template matching '{}'. Available templates:\n{}",
                name,
                templates
                    .iter()
                    .map(|t| format!("  - {}", t.name))
                    .collect::<Vec<_>>()
                    .join("\n")
            ),
            1 => Ok(matches[0].clone()),
            _ => bail!(
                "Ambiguous template name '{}'. Matches:\n{}",
                name,
                matches
                    .iter()
                    .map(|t| format!("  - {}", t.name))
                    .collect::<Vec<_>>()
                    .join("\n")
            ),
        }
    }

    pub fn drive_client(&self) -> Result<GoogleDriveClient> {
        let credentials = CredentialStore::new(
            self.config
                .drive
                .access_token
                .clone()
                .map(DriveCredentials::new),
        );
        GoogleDriveClient::new(self.config.drive.clone(), credentials)
            .context("Failed to set up Google Drive client")
    }

    pub fn sync_client(&self) -> Result<Arc<RemoteSyncClient>> {
        Ok(Arc::new(RemoteSyncClient::new(
            Arc::new(self.drive_client()?),
            self.config.retry.clone(),
        )))
    }

    /// Autosave session for an entry, resuming its Drive file if it has one
    pub fn coordinator(&self, entry_id: Option<Uuid>) -> Result<SaveCoordinator> {
        let coordinator = SaveCoordinator::new(self.sync_client()?, &self.config.autosave);
        match entry_id.map(|id| self.remote_file_id(id)).transpose()?.flatten() {
            Some(file_id) => Ok(coordinator.with_remote_file_id(file_id)),
            None => Ok(coordinator),
        }
    }

    pub fn remote_file_id(&self, entry_id: Uuid) -> Result<Option<RemoteFileId>> {
        let prefs = self
            .storage
            .get_preferences()
            .context("Failed to read preferences")?;
        Ok(prefs
            .settings
            .get(REMOTE_FILES_KEY)
            .and_then(|files| files.get(entry_id.to_string()))
            .and_then(|v| v.as_str())
            .map(RemoteFileId::new))
    }

    /// Drive file id to local entry id, for every remembered backup
    pub fn remote_files(&self) -> Result<HashMap<RemoteFileId, Uuid>> {
        let prefs = self
            .storage
            .get_preferences()
            .context("Failed to read preferences")?;
        let Some(files) = prefs.settings.get(REMOTE_FILES_KEY).and_then(|v| v.as_object()) else {
            return Ok(HashMap::new());
        };
        Ok(files
            .iter()
            .filter_map(|(entry_id, file_id)| {
                let entry_id = Uuid::parse_str(entry_id).ok()?;
                Some((RemoteFileId::new(file_id.as_str()?), entry_id))
            })
            .collect())
    }

    pub fn remember_remote_file(&self, entry_id: Uuid, file_id: Option<&RemoteFileId>) -> Result<()> {
        let prefs = self
            .storage
            .get_preferences()
            .context("Failed to read preferences")?;
        let mut files = prefs
            .settings
            .get(REMOTE_FILES_KEY)
            .and_then(|v| v.as_object())
            .cloned()
            .unwrap_or_default();

        let key = entry_id.to_string();
        match file_id {
            Some(id) => {
                files.insert(key, serde_json::Value::String(id.to_string()));
            }
            None => {
                if files.remove(&key).is_none() {
                    return Ok(());
                }
            }
        }

        let mut patch = PreferencesPatch::default();
        patch
            .settings
            .insert(REMOTE_FILES_KEY.to_string(), serde_json::Value::Object(files));
        self.storage
            .update_preferences(patch)
            .context("Failed to save preferences")?;
        Ok(())
    }
}

/// Runtime for commands that talk to Drive
pub fn runtime() -> Result<tokio::runtime::Runtime> {
    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("Failed to start async runtime")
}
