//! Debounced autosave for one editing session.
//!
//! Every edit re-arms a single quiet-period timer; when it fires, the current
//! title and content are uploaded through [`RemoteSyncClient`] unless they
//! match what was last uploaded. At most one upload runs at a time and a
//! timer that fires during an upload is dropped.
//!
//! Session state lives behind a `std::sync::Mutex` that is never held across
//! an `.await`. Locks are always taken in the order session, then timer.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock, Weak};
use std::time::Duration;

use chrono::{DateTime, Utc};

use super::config::{AutosaveConfig, AutosaveStatus, Notice, SaveState, SAVED_INDICATOR_DURATION};
use super::error::SyncError;
use super::provider::RemoteFileId;
use super::remote::{display_title, RemoteSyncClient, SharedLink};
use super::timer::CancellableTimer;

/// Receives autosave status changes and user notices
pub trait StatusListener: Send + Sync {
    fn on_status(&self, status: &AutosaveStatus);

    fn on_notice(&self, _notice: &Notice) {}
}

/// Result of an explicit [`SaveCoordinator::flush`]
#[derive(Debug, Clone, PartialEq)]
pub enum SaveOutcome {
    /// Uploaded; the remote file now holds the current content
    Saved(RemoteFileId),
    /// Already matches the last upload
    Unchanged,
}

#[derive(Debug, Clone)]
struct Snapshot {
    title: String,
    content: String,
    remote_file_id: Option<RemoteFileId>,
}

struct Session {
    title: String,
    content: String,
    enabled: bool,
    quiet_period: Duration,
    /// Bumped on every scheduled edit
    generation: u64,
    /// Generation the armed timer was scheduled for
    pending_generation: Option<u64>,
    remote_file_id: Option<RemoteFileId>,
    last_synced_title: Option<String>,
    last_synced_content: Option<String>,
    is_saving: bool,
    last_error: Option<SyncError>,
    last_saved: Option<DateTime<Utc>>,
    show_saved_indicator: bool,
    indicator_generation: u64,
    torn_down: bool,
}

impl Session {
    fn new(config: &AutosaveConfig) -> Self {
        Self {
            title: String::new(),
            content: String::new(),
            enabled: config.enabled,
            quiet_period: config.quiet_period(),
            generation: 0,
            pending_generation: None,
            remote_file_id: None,
            last_synced_title: None,
            last_synced_content: None,
            is_saving: false,
            last_error: None,
            last_saved: None,
            show_saved_indicator: false,
            indicator_generation: 0,
            torn_down: false,
        }
    }

    fn state(&self) -> SaveState {
        if self.is_saving {
            SaveState::Saving
        } else if self.pending_generation.is_some() {
            SaveState::Pending
        } else {
            SaveState::Idle
        }
    }

    fn status(&self) -> AutosaveStatus {
        AutosaveStatus {
            state: self.state(),
            is_saving: self.is_saving,
            last_saved: self.last_saved,
            error: self.last_error.as_ref().map(SyncError::kind),
            show_saved_indicator: self.show_saved_indicator,
        }
    }

    /// Current text equals the last upload, blank titles read as "Untitled"
    fn is_unchanged(&self) -> bool {
        match (&self.last_synced_title, &self.last_synced_content) {
            (Some(title), Some(content)) => {
                display_title(title) == display_title(&self.title)
                    && content.trim() == self.content.trim()
            }
            _ => false,
        }
    }

    fn begin_save(&mut self) -> Snapshot {
        self.is_saving = true;
        self.last_error = None;
        Snapshot {
            title: self.title.clone(),
            content: self.content.clone(),
            remote_file_id: self.remote_file_id.clone(),
        }
    }
}

struct Inner {
    me: Weak<Inner>,
    client: Arc<RemoteSyncClient>,
    session: Mutex<Session>,
    listener: RwLock<Option<Arc<dyn StatusListener>>>,
    debounce: Mutex<CancellableTimer>,
    indicator: Mutex<CancellableTimer>,
}

impl Inner {
    fn session(&self) -> MutexGuard<'_, Session> {
        self.session.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn debounce(&self) -> MutexGuard<'_, CancellableTimer> {
        self.debounce.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn indicator(&self) -> MutexGuard<'_, CancellableTimer> {
        self.indicator.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn listener(&self) -> Option<Arc<dyn StatusListener>> {
        self.listener
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn notify_status(&self) {
        let status = {
            let session = self.session();
            if session.torn_down {
                return;
            }
            session.status()
        };
        if let Some(listener) = self.listener() {
            listener.on_status(&status);
        }
    }

    fn notify_notice(&self, notice: &Notice) {
        if self.session().torn_down {
            return;
        }
        if let Some(listener) = self.listener() {
            listener.on_notice(notice);
        }
    }

    fn fire(self: Arc<Self>, generation: u64) {
        let snapshot = {
            let mut session = self.session();
            if session.torn_down || session.pending_generation != Some(generation) {
                return;
            }
            session.pending_generation = None;

            if session.is_saving {
                log::debug!("Autosave skipped: upload already in flight");
                None
            } else if session.is_unchanged() {
                log::debug!("Autosave skipped: content unchanged since last upload");
                None
            } else {
                Some(session.begin_save())
            }
        };

        self.notify_status();
        if let Some(snapshot) = snapshot {
            tokio::spawn(async move {
                let _ = self.run_save(snapshot, true).await;
            });
        }
    }

    async fn run_save(&self, snapshot: Snapshot, autosave: bool) -> Result<RemoteFileId, SyncError> {
        let result = self
            .client
            .save(
                &snapshot.title,
                &snapshot.content,
                snapshot.remote_file_id.as_ref(),
            )
            .await;
        self.finish_save(&snapshot, &result, autosave);
        result
    }

    fn finish_save(
        &self,
        snapshot: &Snapshot,
        result: &Result<RemoteFileId, SyncError>,
        autosave: bool,
    ) {
        let notice = {
            let mut session = self.session();
            session.is_saving = false;
            match result {
                Ok(id) => {
                    let now = Utc::now();
                    session.remote_file_id = Some(id.clone());
                    session.last_synced_title = Some(snapshot.title.clone());
                    session.last_synced_content = Some(snapshot.content.clone());
                    session.last_saved = Some(now);
                    if !session.torn_down {
                        self.show_indicator(&mut session);
                    }
                    Some(Notice::Saved { at: now })
                }
                Err(e) => {
                    log::warn!("Save failed, keeping local state: {}", e);
                    session.last_error = Some(e.clone());
                    autosave.then(|| Notice::for_error(e))
                }
            }
        };

        self.notify_status();
        if let Some(notice) = notice {
            self.notify_notice(&notice);
        }
    }

    /// Show "Saved", replacing any indicator already on screen
    fn show_indicator(&self, session: &mut Session) {
        session.show_saved_indicator = true;
        session.indicator_generation += 1;
        let generation = session.indicator_generation;
        let weak = self.me.clone();
        self.indicator().arm(SAVED_INDICATOR_DURATION, move || {
            if let Some(inner) = weak.upgrade() {
                inner.hide_indicator(generation);
            }
        });
    }

    fn hide_indicator(&self, generation: u64) {
        {
            let mut session = self.session();
            if session.indicator_generation != generation || !session.show_saved_indicator {
                return;
            }
            session.show_saved_indicator = false;
        }
        self.notify_status();
    }
}

/// Autosave coordinator for one entry being edited.
///
/// Dropping the coordinator tears the session down: the pending save is
/// cancelled and an upload already in flight finishes silently.
pub struct SaveCoordinator {
    inner: Arc<Inner>,
}

impl SaveCoordinator {
    pub fn new(client: Arc<RemoteSyncClient>, config: &AutosaveConfig) -> Self {
        Self {
            inner: Arc::new_cyclic(|me| {
                Inner {
                    me: me.clone(),
                    client,
                    session: Mutex::new(Session::new(config)),
                    listener: RwLock::new(None),
                    debounce: Mutex::new(CancellableTimer::new()),
                    indicator: Mutex::new(CancellableTimer::new()),
                }
            }),
        }
    }

    /// Resume a session whose entry was uploaded before
    pub fn with_remote_file_id(self, id: RemoteFileId) -> Self {
        self.inner.session().remote_file_id = Some(id);
        self
    }

    pub fn subscribe(&self, listener: Arc<dyn StatusListener>) {
        *self
            .inner
            .listener
            .write()
            .unwrap_or_else(PoisonError::into_inner) = Some(listener);
    }

    /// Set the session text without scheduling a save, as when an entry is
    /// opened in the editor
    pub fn load(&self, title: impl Into<String>, content: impl Into<String>) {
        let mut session = self.inner.session();
        session.title = title.into();
        session.content = content.into();
    }

    /// Record an edit and restart the quiet period.
    ///
    /// An edit whose content is blank cancels any pending save and schedules
    /// nothing.
    pub fn on_edit(&self, title: impl Into<String>, content: impl Into<String>) {
        let before = {
            let mut session = self.inner.session();
            if session.torn_down {
                return;
            }
            let before = session.state();
            session.title = title.into();
            session.content = content.into();

            if session.content.trim().is_empty() || !session.enabled {
                session.pending_generation = None;
                self.inner.debounce().cancel();
            } else {
                session.generation += 1;
                let generation = session.generation;
                session.pending_generation = Some(generation);
                let weak = Arc::downgrade(&self.inner);
                self.inner.debounce().arm(session.quiet_period, move || {
                    if let Some(inner) = weak.upgrade() {
                        inner.fire(generation);
                    }
                });
            }
            before
        };

        if before != self.inner.session().state() {
            self.inner.notify_status();
        }
    }

    /// Save now instead of waiting for the quiet period
    pub async fn flush(&self) -> Result<SaveOutcome, SyncError> {
        let prepared = {
            let mut session = self.inner.session();
            if session.is_saving {
                return Err(SyncError::Busy);
            }
            session.pending_generation = None;
            self.inner.debounce().cancel();

            if session.content.trim().is_empty() {
                Err(SyncError::Validation("content must not be empty".to_string()))
            } else if session.is_unchanged() {
                log::debug!("Flush skipped: content unchanged since last upload");
                Ok(None)
            } else {
                Ok(Some(session.begin_save()))
            }
        };

        self.inner.notify_status();
        let Some(snapshot) = prepared? else {
            return Ok(SaveOutcome::Unchanged);
        };

        // Spawned so a dropped flush future cannot leave the session saving
        let inner = self.inner.clone();
        tokio::spawn(async move { inner.run_save(snapshot, false).await })
            .await
            .map_err(|e| SyncError::Unknown(e.to_string()))?
            .map(SaveOutcome::Saved)
    }

    /// Share the current entry, uploading it first if it has no remote file.
    ///
    /// A file created by that upload is kept even if sharing then fails.
    pub async fn share(&self) -> Result<SharedLink, SyncError> {
        let existing = {
            let mut session = self.inner.session();
            match session.remote_file_id.clone() {
                Some(id) => Ok(id),
                None if session.is_saving => return Err(SyncError::Busy),
                None => Err(session.begin_save()),
            }
        };

        let snapshot = match existing {
            Ok(id) => {
                let url = self.inner.client.share_existing(&id).await?;
                return Ok(SharedLink { file_id: id, url });
            }
            Err(snapshot) => snapshot,
        };

        self.inner.notify_status();
        let inner = self.inner.clone();
        tokio::spawn(async move {
            let result = inner
                .client
                .share(&snapshot.title, &snapshot.content, None)
                .await;
            match &result {
                Ok(link) => inner.finish_save(&snapshot, &Ok(link.file_id.clone()), false),
                Err(failure) => match &failure.file_id {
                    Some(id) => inner.finish_save(&snapshot, &Ok(id.clone()), false),
                    None => inner.finish_save(&snapshot, &Err(failure.error.clone()), false),
                },
            }
            result.map_err(|failure| failure.error)
        })
        .await
        .map_err(|e| SyncError::Unknown(e.to_string()))?
    }

    pub fn status(&self) -> AutosaveStatus {
        self.inner.session().status()
    }

    pub fn remote_file_id(&self) -> Option<RemoteFileId> {
        self.inner.session().remote_file_id.clone()
    }

    pub fn last_error(&self) -> Option<SyncError> {
        self.inner.session().last_error.clone()
    }

    /// Applies from the next edit on
    pub fn set_quiet_period(&self, quiet_period: Duration) {
        self.inner.session().quiet_period = quiet_period.max(Duration::from_millis(1));
    }

    /// Cancel pending work and stop reporting to the listener
    pub fn teardown(&self) {
        let mut session = self.inner.session();
        if session.torn_down {
            return;
        }
        session.torn_down = true;
        session.pending_generation = None;
        session.show_saved_indicator = false;
        self.inner.debounce().cancel();
        self.inner.indicator().cancel();
    }
}

impl Drop for SaveCoordinator {
    fn drop(&mut self) {
        self.teardown();
    }
}
