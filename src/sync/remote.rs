//! Create-or-update uploads of one entry to the storage provider.
//!
//! Whether a call creates or updates depends only on whether a remote id is
//! already known. Transient provider failures are retried with a bounded,
//! increasing delay.

use std::future::Future;
use std::sync::{Arc, OnceLock};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Local, NaiveDateTime};
use regex::Regex;
use thiserror::Error;

use super::config::RetryPolicy;
use super::error::SyncError;
use super::provider::{ProviderError, RemoteFileId, StorageProvider};
use crate::storage::MAX_TITLE_CHARS;

/// Title used when the user left it blank
pub const UNTITLED: &str = "Untitled";

/// MIME type of uploaded entry bodies
pub const TEXT_MIME_TYPE: &str = "text/plain";

/// Longest sanitised title kept in a file name
const MAX_FILE_STEM_CHARS: usize = 100;

/// Waits between retry attempts
#[async_trait]
pub trait Sleeper: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

/// Real delays on the Tokio timer
pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Source of the timestamp embedded in file names
pub type Clock = fn() -> DateTime<Local>;

/// Title shown to the provider: trimmed, "Untitled" when blank
pub fn display_title(title: &str) -> &str {
    let trimmed = title.trim();
    if trimmed.is_empty() {
        UNTITLED
    } else {
        trimmed
    }
}

fn disallowed_chars() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[^A-Za-z0-9\-_ ]").expect("literal pattern"))
}

fn whitespace_runs() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\s+").expect("literal pattern"))
}

/// Remote file name for a title at a given minute.
///
/// `"My Entry! #1"` at 2024-03-05 09:07 becomes `My-Entry-1-2024-03-05-0907`.
pub fn derive_file_name(title: &str, at: NaiveDateTime) -> String {
    let stripped = disallowed_chars().replace_all(title, "");
    let dashed = whitespace_runs().replace_all(stripped.trim(), "-");
    let mut stem: String = dashed.chars().take(MAX_FILE_STEM_CHARS).collect();
    if dashed.chars().count() > MAX_FILE_STEM_CHARS {
        let kept = stem.trim_end_matches('-').len();
        stem.truncate(kept);
    }
    if stem.is_empty() {
        stem = UNTITLED.to_string();
    }
    format!("{}-{}", stem, at.format("%Y-%m-%d-%H%M"))
}

/// A file that is now publicly readable
#[derive(Debug, Clone, PartialEq)]
pub struct SharedLink {
    pub file_id: RemoteFileId,
    pub url: String,
}

/// Share failed; `file_id` is set when the upload step had already created
/// the remote file, so the caller can keep it and retry the share later.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("{error}")]
pub struct ShareFailure {
    pub file_id: Option<RemoteFileId>,
    #[source]
    pub error: SyncError,
}

pub struct RemoteSyncClient {
    provider: Arc<dyn StorageProvider>,
    retry: RetryPolicy,
    sleeper: Arc<dyn Sleeper>,
    clock: Clock,
}

impl RemoteSyncClient {
    pub fn new(provider: Arc<dyn StorageProvider>, retry: RetryPolicy) -> Self {
        Self {
            provider,
            retry,
            sleeper: Arc::new(TokioSleeper),
            clock: Local::now,
        }
    }

    /// Replace the retry delay (tests use a no-op sleeper)
    pub fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry
    }

    /// Upload `content`, creating the remote file when `remote_file_id` is
    /// `None` and overwriting it otherwise. Returns the id now holding the
    /// content, which is `remote_file_id` itself on update.
    pub async fn save(
        &self,
        title: &str,
        content: &str,
        remote_file_id: Option<&RemoteFileId>,
    ) -> Result<RemoteFileId, SyncError> {
        if content.trim().is_empty() {
            return Err(SyncError::Validation("content must not be empty".to_string()));
        }
        let title = display_title(title);
        let title_len = title.chars().count();
        if title_len > MAX_TITLE_CHARS {
            return Err(SyncError::Validation(format!(
                "title must be at most {} characters (got {})",
                MAX_TITLE_CHARS, title_len
            )));
        }

        let file_name = derive_file_name(title, (self.clock)().naive_local());
        let name = file_name.as_str();

        match remote_file_id {
            Some(id) => {
                self.with_retry("update", || {
                    self.provider.update_file(id, content, Some(name))
                })
                .await?;
                log::info!("Updated remote file {} as {:?}", id, name);
                Ok(id.clone())
            }
            None => {
                let file = self
                    .with_retry("create", || {
                        self.provider.create_file(name, TEXT_MIME_TYPE, content)
                    })
                    .await?;
                log::info!("Created remote file {} as {:?}", file.id, name);
                Ok(file.id)
            }
        }
    }

    /// Make an uploaded file publicly readable and return its view link
    pub async fn share_existing(&self, id: &RemoteFileId) -> Result<String, SyncError> {
        self.with_retry("set permission", || {
            self.provider.set_public_read_permission(id)
        })
        .await?;
        self.with_retry("get share link", || self.provider.get_share_link(id))
            .await
    }

    /// Share an entry, uploading it first when it has no remote file yet
    pub async fn share(
        &self,
        title: &str,
        content: &str,
        remote_file_id: Option<&RemoteFileId>,
    ) -> Result<SharedLink, ShareFailure> {
        let file_id = match remote_file_id {
            Some(id) => id.clone(),
            None => self
                .save(title, content, None)
                .await
                .map_err(|error| ShareFailure {
                    file_id: None,
                    error,
                })?,
        };

        match self.share_existing(&file_id).await {
            Ok(url) => Ok(SharedLink { file_id, url }),
            Err(error) => Err(ShareFailure {
                file_id: Some(file_id),
                error,
            }),
        }
    }

    /// Run `call` until it succeeds, fails permanently, or the attempt budget
    /// is spent. Each attempt is bounded by the policy's call timeout.
    async fn with_retry<T, F, Fut>(&self, operation: &str, mut call: F) -> Result<T, SyncError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, ProviderError>>,
    {
        let max_attempts = self.retry.max_attempts.max(1);
        let mut attempt = 0;

        loop {
            attempt += 1;
            let outcome = match tokio::time::timeout(self.retry.call_timeout(), call()).await {
                Ok(result) => result,
                Err(_) => Err(ProviderError::Timeout),
            };

            match outcome {
                Ok(value) => {
                    if attempt > 1 {
                        log::info!("{} succeeded on attempt {}", operation, attempt);
                    }
                    return Ok(value);
                }
                Err(e) if e.is_transient() && attempt < max_attempts => {
                    let delay = self.retry.delay_after(attempt);
                    log::warn!(
                        "{} failed (attempt {}/{}), retrying in {:?}: {}",
                        operation,
                        attempt,
                        max_attempts,
                        delay,
                        e
                    );
                    self.sleeper.sleep(delay).await;
                }
                Err(e) => {
                    log::error!("{} failed after {} attempt(s): {}", operation, attempt, e);
                    return Err(SyncError::from_provider(e, attempt));
                }
            }
        }
    }
}
