use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::provider::ProviderError;

/// Classified failure of a sync operation. Provider errors never leave the
/// sync client unwrapped; they are mapped onto one of these.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SyncError {
    #[error("Validation error: {0}")]
    Validation(String),
    #[error("Authentication required: {0}")]
    Authentication(String),
    #[error("Upload failed after {attempts} attempt(s): {message}")]
    Transient { attempts: u32, message: String },
    #[error("Storage provider error: {0}")]
    Unknown(String),
    #[error("Another save is already in progress")]
    Busy,
}

/// Error kind without detail, for status display
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum SyncErrorKind {
    Validation,
    Authentication,
    Transient,
    Unknown,
    Busy,
}

impl SyncError {
    pub fn kind(&self) -> SyncErrorKind {
        match self {
            SyncError::Validation(_) => SyncErrorKind::Validation,
            SyncError::Authentication(_) => SyncErrorKind::Authentication,
            SyncError::Transient { .. } => SyncErrorKind::Transient,
            SyncError::Unknown(_) => SyncErrorKind::Unknown,
            SyncError::Busy => SyncErrorKind::Busy,
        }
    }

    pub fn requires_reauthentication(&self) -> bool {
        matches!(self, SyncError::Authentication(_))
    }

    /// Classify a provider failure after `attempts` calls
    pub fn from_provider(err: ProviderError, attempts: u32) -> Self {
        if err.is_auth() {
            SyncError::Authentication(err.to_string())
        } else if err.is_transient() {
            SyncError::Transient {
                attempts,
                message: err.to_string(),
            }
        } else {
            SyncError::Unknown(err.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classification() {
        let auth = SyncError::from_provider(ProviderError::CredentialExpired, 1);
        assert_eq!(auth.kind(), SyncErrorKind::Authentication);
        assert!(auth.requires_reauthentication());

        let transient = SyncError::from_provider(ProviderError::from_status(503, "busy"), 3);
        assert!(matches!(transient, SyncError::Transient { attempts: 3, .. }));

        let rejected = SyncError::from_provider(ProviderError::from_status(400, "bad"), 1);
        assert_eq!(rejected.kind(), SyncErrorKind::Unknown);
    }
}
