use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::error::{SyncError, SyncErrorKind};

/// Default quiet period before a debounced save fires
pub const DEFAULT_QUIET_PERIOD_MS: u64 = 5000;

/// Quiet periods offered to the user
pub const QUIET_PERIOD_PRESETS_MS: [u64; 3] = [2000, 5000, 10000];

/// How long the "Saved" indicator stays visible
pub const SAVED_INDICATOR_DURATION: Duration = Duration::from_secs(2);

/// Autosave configuration for an editing session
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct AutosaveConfig {
    /// Whether edits are uploaded automatically
    pub enabled: bool,
    /// Inactivity required before a pending save fires, in milliseconds
    #[serde(alias = "quiet_period_ms")]
    pub quiet_period_ms: u64,
}

impl Default for AutosaveConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            quiet_period_ms: DEFAULT_QUIET_PERIOD_MS,
        }
    }
}

impl AutosaveConfig {
    pub fn quiet_period(&self) -> Duration {
        Duration::from_millis(self.quiet_period_ms.max(1))
    }
}

/// Growth of the delay between retry attempts
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Backoff {
    Linear,
    #[default]
    Exponential,
}

/// Bounded retry for transient provider failures
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct RetryPolicy {
    /// Total attempts including the first one
    #[serde(alias = "max_attempts")]
    pub max_attempts: u32,
    /// Delay after the first failed attempt, in milliseconds
    #[serde(alias = "initial_delay_ms")]
    pub initial_delay_ms: u64,
    /// Upper bound for any single delay, in milliseconds
    #[serde(alias = "max_delay_ms")]
    pub max_delay_ms: u64,
    pub backoff: Backoff,
    /// Client-side bound on each provider call, in seconds
    #[serde(alias = "call_timeout_secs")]
    pub call_timeout_secs: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay_ms: 500,
            max_delay_ms: 8000,
            backoff: Backoff::Exponential,
            call_timeout_secs: 30,
        }
    }
}

impl RetryPolicy {
    /// Delay to wait after failed attempt number `attempt` (1-based)
    pub fn delay_after(&self, attempt: u32) -> Duration {
        let attempt = attempt.max(1);
        let ms = match self.backoff {
            Backoff::Linear => self.initial_delay_ms.saturating_mul(u64::from(attempt)),
            Backoff::Exponential => self
                .initial_delay_ms
                .saturating_mul(1u64 << (attempt - 1).min(20)),
        };
        Duration::from_millis(ms.min(self.max_delay_ms))
    }

    pub fn call_timeout(&self) -> Duration {
        Duration::from_secs(self.call_timeout_secs.max(1))
    }
}

/// Where an editing session is in the autosave cycle
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum SaveState {
    /// Nothing scheduled
    #[default]
    Idle,
    /// Quiet-period timer armed
    Pending,
    /// Upload in flight
    Saving,
}

/// Autosave status shown by the editor
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct AutosaveStatus {
    pub state: SaveState,
    pub is_saving: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_saved: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<SyncErrorKind>,
    /// Transient "Saved" badge
    pub show_saved_indicator: bool,
}

/// Messages for the user, separate from the status badge
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Notice {
    /// A save completed
    Saved { at: DateTime<Utc> },
    /// Non-blocking: the background upload failed, local state is intact
    AutosaveFailed { kind: SyncErrorKind, detail: String },
    /// The bearer credential is missing or no longer accepted
    ReauthenticationRequired,
}

impl Notice {
    pub fn for_error(error: &SyncError) -> Self {
        if error.requires_reauthentication() {
            Notice::ReauthenticationRequired
        } else {
            Notice::AutosaveFailed {
                kind: error.kind(),
                detail: error.to_string(),
            }
        }
    }

    /// Text for a toast
    pub fn message(&self) -> String {
        match self {
            Notice::Saved { .. } => "Saved".to_string(),
            Notice::AutosaveFailed { .. } => {
                "Autosave failed. Your work is still saved locally.".to_string()
            }
            Notice::ReauthenticationRequired => {
                "Your Google Drive session has expired. Sign in again to resume backups.".to_string()
            }
        }
    }
}
