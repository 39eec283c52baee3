pub mod config;
pub mod coordinator;
pub mod drive;
pub mod error;
pub mod provider;
pub mod remote;

mod timer;

#[cfg(test)]
mod fake;

pub use config::{
    AutosaveConfig, AutosaveStatus, Backoff, Notice, RetryPolicy, SaveState,
    DEFAULT_QUIET_PERIOD_MS, QUIET_PERIOD_PRESETS_MS, SAVED_INDICATOR_DURATION,
};
pub use coordinator::{SaveCoordinator, SaveOutcome, StatusListener};
pub use drive::{CredentialStore, DriveConfig, DriveCredentials, DriveFile, GoogleDriveClient};
pub use error::{SyncError, SyncErrorKind};
pub use provider::{ProviderError, RemoteFile, RemoteFileId, StorageProvider};
pub use remote::{
    derive_file_name, display_title, RemoteSyncClient, ShareFailure, SharedLink, Sleeper,
    TokioSleeper, TEXT_MIME_TYPE, UNTITLED,
};
pub use timer::CancellableTimer;
