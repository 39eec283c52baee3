use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Identifier the storage provider assigned to an uploaded file
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RemoteFileId(String);

impl RemoteFileId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RemoteFileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Response body of a create or update call
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RemoteFile {
    pub id: RemoteFileId,
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ProviderError {
    #[error("No access token available")]
    CredentialMissing,
    #[error("Access token expired")]
    CredentialExpired,
    #[error("Authentication failed: {status} - {message}")]
    Unauthorized { status: u16, message: String },
    #[error("Network error: {0}")]
    Network(String),
    #[error("Request timed out")]
    Timeout,
    #[error("Server error: {status} - {message}")]
    Server { status: u16, message: String },
    #[error("Request rejected: {status} - {message}")]
    Rejected { status: u16, message: String },
    #[error("Unexpected response: {0}")]
    Unexpected(String),
}

impl ProviderError {
    /// Map a non-success HTTP status onto an error
    pub fn from_status(status: u16, message: impl Into<String>) -> Self {
        let message = message.into();
        match status {
            401 | 403 => ProviderError::Unauthorized { status, message },
            408 | 429 | 500..=599 => ProviderError::Server { status, message },
            _ => ProviderError::Rejected { status, message },
        }
    }

    /// Likely to succeed if the same call is repeated
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            ProviderError::Network(_) | ProviderError::Timeout | ProviderError::Server { .. }
        )
    }

    pub fn is_auth(&self) -> bool {
        matches!(
            self,
            ProviderError::CredentialMissing
                | ProviderError::CredentialExpired
                | ProviderError::Unauthorized { .. }
        )
    }
}

/// Remote file storage used for backup and sharing.
#[async_trait]
pub trait StorageProvider: Send + Sync {
    async fn create_file(
        &self,
        name: &str,
        mime_type: &str,
        body: &str,
    ) -> Result<RemoteFile, ProviderError>;

    /// Replace the body, and the display name when one is given
    async fn update_file(
        &self,
        id: &RemoteFileId,
        body: &str,
        name: Option<&str>,
    ) -> Result<RemoteFile, ProviderError>;

    async fn set_public_read_permission(&self, id: &RemoteFileId) -> Result<(), ProviderError>;

    async fn get_share_link(&self, id: &RemoteFileId) -> Result<String, ProviderError>;
}
