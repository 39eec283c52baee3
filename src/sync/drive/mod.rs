mod client;

pub use client::{
    CredentialStore, DriveConfig, DriveCredentials, DriveFile, GoogleDriveClient,
    DEFAULT_API_BASE_URL, DEFAULT_FOLDER_NAME, DEFAULT_UPLOAD_BASE_URL,
};
