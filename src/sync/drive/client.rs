use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{Client, Method, RequestBuilder, Response};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::sync::provider::{ProviderError, RemoteFile, RemoteFileId, StorageProvider};

pub const DEFAULT_API_BASE_URL: &str = "https://www.googleapis.com";
pub const DEFAULT_UPLOAD_BASE_URL: &str = "https://www.googleapis.com/upload";
pub const DEFAULT_FOLDER_NAME: &str = "Journal Entries";

const FOLDER_MIME_TYPE: &str = "application/vnd.google-apps.folder";

/// Drive endpoints and target folder
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct DriveConfig {
    #[serde(alias = "api_base_url")]
    pub api_base_url: String,
    #[serde(alias = "upload_base_url")]
    pub upload_base_url: String,
    /// Folder all entries are uploaded into, created on first use
    #[serde(alias = "folder_name")]
    pub folder_name: String,
    /// Static bearer token; normally supplied by the sign-in flow instead
    #[serde(skip_serializing_if = "Option::is_none")]
    #[serde(alias = "access_token")]
    pub access_token: Option<String>,
}

impl Default for DriveConfig {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            upload_base_url: DEFAULT_UPLOAD_BASE_URL.to_string(),
            folder_name: DEFAULT_FOLDER_NAME.to_string(),
            access_token: None,
        }
    }
}

/// OAuth bearer credential issued by the identity provider
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DriveCredentials {
    pub access_token: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
}

impl DriveCredentials {
    pub fn new(access_token: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
            expires_at: None,
        }
    }

    pub fn is_expired(&self) -> bool {
        self.expires_at.is_some_and(|at| at <= Utc::now())
    }
}

/// Credential slot shared with whatever performs sign-in.
///
/// Clones refer to the same slot, so a refreshed token is picked up by the
/// next request without rebuilding the client.
#[derive(Debug, Clone, Default)]
pub struct CredentialStore {
    inner: Arc<RwLock<Option<DriveCredentials>>>,
}

impl CredentialStore {
    pub fn new(credentials: Option<DriveCredentials>) -> Self {
        Self {
            inner: Arc::new(RwLock::new(credentials)),
        }
    }

    pub fn set(&self, credentials: DriveCredentials) {
        *self.inner.write().unwrap_or_else(PoisonError::into_inner) = Some(credentials);
    }

    pub fn clear(&self) {
        *self.inner.write().unwrap_or_else(PoisonError::into_inner) = None;
    }

    pub fn get(&self) -> Option<DriveCredentials> {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn bearer(&self) -> Result<String, ProviderError> {
        match self.get() {
            None => Err(ProviderError::CredentialMissing),
            Some(c) if c.access_token.trim().is_empty() => Err(ProviderError::CredentialMissing),
            Some(c) if c.is_expired() => Err(ProviderError::CredentialExpired),
            Some(c) => Ok(c.access_token),
        }
    }
}

impl From<reqwest::Error> for ProviderError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            ProviderError::Timeout
        } else if e.is_decode() {
            ProviderError::Unexpected(e.to_string())
        } else {
            ProviderError::Network(e.to_string())
        }
    }
}

#[derive(Debug, Deserialize)]
struct FileList {
    #[serde(default)]
    files: Vec<RemoteFile>,
}

/// A backup in the entries folder
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DriveFile {
    pub id: RemoteFileId,
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub web_view_link: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_time: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DriveFilePage {
    #[serde(default)]
    files: Vec<DriveFile>,
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ShareLinkResponse {
    web_view_link: Option<String>,
}

/// Google Drive v3 storage provider
pub struct GoogleDriveClient {
    client: Client,
    config: DriveConfig,
    credentials: CredentialStore,
    folder_id: Mutex<Option<String>>,
}

impl GoogleDriveClient {
    pub fn new(config: DriveConfig, credentials: CredentialStore) -> Result<Self, ProviderError> {
        for url in [&config.api_base_url, &config.upload_base_url] {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err(ProviderError::Unexpected(format!(
                    "Invalid base URL {:?}: must start with http:// or https://",
                    url
                )));
            }
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(60))
            .connect_timeout(Duration::from_secs(15))
            .build()?;

        let config = DriveConfig {
            api_base_url: config.api_base_url.trim_end_matches('/').to_string(),
            upload_base_url: config.upload_base_url.trim_end_matches('/').to_string(),
            ..config
        };

        Ok(Self {
            client,
            config,
            credentials,
            folder_id: Mutex::new(None),
        })
    }

    pub fn credentials(&self) -> &CredentialStore {
        &self.credentials
    }

    fn api_url(&self, path: &str) -> String {
        format!("{}/drive/v3/{}", self.config.api_base_url, path)
    }

    fn upload_url(&self, path: &str) -> String {
        format!("{}/drive/v3/{}", self.config.upload_base_url, path)
    }

    fn request(&self, method: Method, url: &str) -> Result<RequestBuilder, ProviderError> {
        let token = self.credentials.bearer()?;
        Ok(self.client.request(method, url).bearer_auth(token))
    }

    /// Id of the entries folder, created on first use and cached
    pub async fn ensure_folder(&self) -> Result<String, ProviderError> {
        let mut cached = self.folder_id.lock().await;
        if let Some(id) = cached.as_ref() {
            return Ok(id.clone());
        }

        let query = format!(
            "name='{}' and mimeType='{}' and trashed=false",
            escape_query(&self.config.folder_name),
            FOLDER_MIME_TYPE
        );
        let response = self
            .request(Method::GET, &self.api_url("files"))?
            .query(&[
                ("q", query.as_str()),
                ("spaces", "drive"),
                ("fields", "files(id)"),
            ])
            .send()
            .await?;
        let list: FileList = check(response).await?.json().await?;

        let id = match list.files.into_iter().next() {
            Some(folder) => folder.id.as_str().to_string(),
            None => {
                let response = self
                    .request(Method::POST, &self.api_url("files"))?
                    .query(&[("fields", "id")])
                    .json(&serde_json::json!({
                        "name": self.config.folder_name,
                        "mimeType": FOLDER_MIME_TYPE,
                    }))
                    .send()
                    .await?;
                let folder: RemoteFile = check(response).await?.json().await?;
                log::info!(
                    "Created Drive folder '{}' ({})",
                    self.config.folder_name,
                    folder.id
                );
                folder.id.as_str().to_string()
            }
        };

        *cached = Some(id.clone());
        Ok(id)
    }

    /// Every file in the entries folder, newest first
    pub async fn list_files(&self) -> Result<Vec<DriveFile>, ProviderError> {
        let folder_id = self.ensure_folder().await?;
        let query = format!("'{}' in parents and trashed=false", escape_query(&folder_id));

        let mut files = Vec::new();
        let mut page_token: Option<String> = None;
        loop {
            let mut request = self.request(Method::GET, &self.api_url("files"))?.query(&[
                ("q", query.as_str()),
                ("orderBy", "createdTime desc"),
                ("pageSize", "100"),
                ("fields", "nextPageToken, files(id, name, webViewLink, createdTime)"),
            ]);
            if let Some(token) = &page_token {
                request = request.query(&[("pageToken", token.as_str())]);
            }

            let page: DriveFilePage = check(request.send().await?).await?.json().await?;
            files.extend(page.files);
            match page.next_page_token {
                Some(token) if !token.is_empty() => page_token = Some(token),
                _ => break,
            }
        }

        log::debug!("Listed {} file(s) in '{}'", files.len(), self.config.folder_name);
        Ok(files)
    }
}

#[async_trait]
impl StorageProvider for GoogleDriveClient {
    async fn create_file(
        &self,
        name: &str,
        mime_type: &str,
        body: &str,
    ) -> Result<RemoteFile, ProviderError> {
        let folder_id = self.ensure_folder().await?;
        let metadata = serde_json::json!({
            "name": name,
            "mimeType": mime_type,
            "parents": [folder_id],
        });

        let upload = multipart_related(&metadata, mime_type, body);
        let response = self
            .request(Method::POST, &self.upload_url("files"))?
            .query(&[("uploadType", "multipart"), ("fields", "id")])
            .header("Content-Type", upload.content_type)
            .body(upload.body)
            .send()
            .await?;
        let file: RemoteFile = check(response).await?.json().await?;
        Ok(file)
    }

    async fn update_file(
        &self,
        id: &RemoteFileId,
        body: &str,
        name: Option<&str>,
    ) -> Result<RemoteFile, ProviderError> {
        let url = self.upload_url(&format!("files/{}", id));
        let request = match name {
            Some(name) => {
                let upload = multipart_related(
                    &serde_json::json!({ "name": name }),
                    crate::sync::TEXT_MIME_TYPE,
                    body,
                );
                self.request(Method::PATCH, &url)?
                    .query(&[("uploadType", "multipart"), ("fields", "id")])
                    .header("Content-Type", upload.content_type)
                    .body(upload.body)
            }
            None => self
                .request(Method::PATCH, &url)?
                .query(&[("uploadType", "media"), ("fields", "id")])
                .header("Content-Type", crate::sync::TEXT_MIME_TYPE)
                .body(body.to_string()),
        };

        let file: RemoteFile = check(request.send().await?).await?.json().await?;
        Ok(file)
    }

    async fn set_public_read_permission(&self, id: &RemoteFileId) -> Result<(), ProviderError> {
        let response = self
            .request(Method::POST, &self.api_url(&format!("files/{}/permissions", id)))?
            .json(&serde_json::json!({ "role": "reader", "type": "anyone" }))
            .send()
            .await?;
        check(response).await?;
        Ok(())
    }

    async fn get_share_link(&self, id: &RemoteFileId) -> Result<String, ProviderError> {
        let response = self
            .request(Method::GET, &self.api_url(&format!("files/{}", id)))?
            .query(&[("fields", "webViewLink")])
            .send()
            .await?;
        let link: ShareLinkResponse = check(response).await?.json().await?;
        link.web_view_link
            .ok_or_else(|| ProviderError::Unexpected(format!("No share link for file {}", id)))
    }
}

/// Pass successful responses through, map the rest onto provider errors
async fn check(response: Response) -> Result<Response, ProviderError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let text = response.text().await.unwrap_or_default();
    Err(ProviderError::from_status(status.as_u16(), error_message(&text)))
}

/// Drive errors look like `{"error": {"message": "..."}}`
fn error_message(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| v["error"]["message"].as_str().map(str::to_string))
        .unwrap_or_else(|| body.trim().to_string())
}

fn escape_query(value: &str) -> String {
    value.replace('\\', "\\\\").replace('\'', "\\'")
}

/// `multipart/related` upload body: JSON metadata part then the media part
struct MultipartRelated {
    content_type: String,
    body: String,
}

fn multipart_related(
    metadata: &serde_json::Value,
    mime_type: &str,
    body: &str,
) -> MultipartRelated {
    let metadata = metadata.to_string();
    // The delimiter must not occur in either part
    let boundary = loop {
        let candidate = format!("journal-part-{}", uuid::Uuid::new_v4().simple());
        if !body.contains(&candidate) && !metadata.contains(&candidate) {
            break candidate;
        }
    };

    MultipartRelated {
        content_type: format!("multipart/related; boundary={}", boundary),
        body: format!(
            "--{b}\r\nContent-Type: application/json; charset=UTF-8\r\n\r\n{meta}\r\n--{b}\r\nContent-Type: {mime}\r\n\r\n{body}\r\n--{b}--\r\n",
            b = boundary,
            meta = metadata,
            mime = mime_type,
            body = body,
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::extract::{Path, Query, State};
    use axum::http::{HeaderMap, StatusCode};
    use axum::routing::{get, patch, post};
    use axum::{Json, Router};
    use std::collections::HashMap;

    #[derive(Debug, Clone)]
    struct Recorded {
        method: &'static str,
        path: String,
        query: HashMap<String, String>,
        authorization: Option<String>,
        content_type: Option<String>,
        body: String,
    }

    #[derive(Default)]
    struct FakeDrive {
        requests: std::sync::Mutex<Vec<Recorded>>,
        existing_folder: Option<String>,
        /// Status returned by every upload instead of success
        upload_status: Option<StatusCode>,
        /// Contents of the entries folder, served one file per page
        backups: Vec<serde_json::Value>,
    }

    type Shared = Arc<FakeDrive>;

    impl FakeDrive {
        fn record(
            &self,
            method: &'static str,
            path: String,
            query: HashMap<String, String>,
            headers: &HeaderMap,
            body: String,
        ) {
            let header = |name: &str| {
                headers
                    .get(name)
                    .and_then(|v| v.to_str().ok())
                    .map(str::to_string)
            };
            self.requests.lock().unwrap().push(Recorded {
                method,
                path,
                query,
                authorization: header("authorization"),
                content_type: header("content-type"),
                body,
            });
        }

        fn requests(&self) -> Vec<Recorded> {
            self.requests.lock().unwrap().clone()
        }
    }

    async fn list_files(
        State(drive): State<Shared>,
        Query(query): Query<HashMap<String, String>>,
        headers: HeaderMap,
    ) -> Json<serde_json::Value> {
        if query.get("q").is_some_and(|q| q.contains("in parents")) {
            let page: usize = query
                .get("pageToken")
                .and_then(|t| t.strip_prefix("page-"))
                .and_then(|n| n.parse().ok())
                .unwrap_or(0);
            drive.record("GET", "files".into(), query, &headers, String::new());
            let mut body = serde_json::json!({
                "files": drive.backups.get(page).into_iter().collect::<Vec<_>>()
            });
            if page + 1 < drive.backups.len() {
                body["nextPageToken"] = serde_json::json!(format!("page-{}", page + 1));
            }
            return Json(body);
        }

        drive.record("GET", "files".into(), query, &headers, String::new());
        let files: Vec<_> = drive
            .existing_folder
            .iter()
            .map(|id| serde_json::json!({ "id": id }))
            .collect();
        Json(serde_json::json!({ "files": files }))
    }

    async fn create_folder(
        State(drive): State<Shared>,
        Query(query): Query<HashMap<String, String>>,
        headers: HeaderMap,
        body: String,
    ) -> Json<serde_json::Value> {
        drive.record("POST", "files".into(), query, &headers, body);
        Json(serde_json::json!({ "id": "folder-1" }))
    }

    async fn upload(
        State(drive): State<Shared>,
        Query(query): Query<HashMap<String, String>>,
        headers: HeaderMap,
        body: String,
    ) -> Result<Json<serde_json::Value>, (StatusCode, String)> {
        drive.record("POST", "upload/files".into(), query, &headers, body);
        if let Some(status) = drive.upload_status {
            return Err((
                status,
                r#"{"error": {"code": 0, "message": "Upload refused"}}"#.to_string(),
            ));
        }
        Ok(Json(serde_json::json!({ "id": "file-1" })))
    }

    async fn update(
        State(drive): State<Shared>,
        Path(id): Path<String>,
        Query(query): Query<HashMap<String, String>>,
        headers: HeaderMap,
        body: String,
    ) -> Json<serde_json::Value> {
        drive.record("PATCH", format!("upload/files/{}", id), query, &headers, body);
        Json(serde_json::json!({ "id": id }))
    }

    async fn add_permission(
        State(drive): State<Shared>,
        Path(id): Path<String>,
        headers: HeaderMap,
        body: String,
    ) -> Json<serde_json::Value> {
        drive.record("POST", format!("files/{}/permissions", id), HashMap::new(), &headers, body);
        Json(serde_json::json!({ "id": "perm-1" }))
    }

    async fn file_metadata(
        State(drive): State<Shared>,
        Path(id): Path<String>,
        Query(query): Query<HashMap<String, String>>,
        headers: HeaderMap,
    ) -> Json<serde_json::Value> {
        drive.record("GET", format!("files/{}", id), query, &headers, String::new());
        Json(serde_json::json!({
            "webViewLink": format!("https://drive.google.com/file/d/{}/view", id)
        }))
    }

    async fn serve(drive: FakeDrive) -> (String, Shared) {
        let drive = Arc::new(drive);
        let app = Router::new()
            .route("/drive/v3/files", get(list_files).post(create_folder))
            .route("/drive/v3/files/{id}", get(file_metadata))
            .route("/drive/v3/files/{id}/permissions", post(add_permission))
            .route("/upload/drive/v3/files", post(upload))
            .route("/upload/drive/v3/files/{id}", patch(update))
            .with_state(drive.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        (format!("http://{}", addr), drive)
    }

    fn client_for(base: &str, credentials: CredentialStore) -> GoogleDriveClient {
        let config = DriveConfig {
            api_base_url: base.to_string(),
            upload_base_url: format!("{}/upload/", base),
            ..Default::default()
        };
        GoogleDriveClient::new(config, credentials).unwrap()
    }

    fn signed_in() -> CredentialStore {
        CredentialStore::new(Some(DriveCredentials::new("token-123")))
    }

    #[tokio::test]
    async fn test_create_makes_folder_once_and_uploads_multipart() {
        let (base, drive) = serve(FakeDrive::default()).await;
        let client = client_for(&base, signed_in());

        let file = client
            .create_file("Day-2024-03-05-0907", "text/plain", "Dear diary")
            .await
            .unwrap();
        assert_eq!(file.id.as_str(), "file-1");
        client.create_file("Other", "text/plain", "x").await.unwrap();

        let requests = drive.requests();
        let folder_lookups = requests.iter().filter(|r| r.method == "GET" && r.path == "files").count();
        let folder_creates = requests.iter().filter(|r| r.method == "POST" && r.path == "files").count();
        assert_eq!(folder_lookups, 1);
        assert_eq!(folder_creates, 1);

        let lookup = &requests[0];
        assert!(lookup.query["q"].contains("name='Journal Entries'"));
        assert_eq!(lookup.authorization.as_deref(), Some("Bearer token-123"));

        let upload = requests.iter().find(|r| r.path == "upload/files").unwrap();
        assert_eq!(upload.query["uploadType"], "multipart");
        assert!(upload
            .content_type
            .as_deref()
            .unwrap()
            .starts_with("multipart/related; boundary="));
        assert!(upload.body.contains(r#""parents":["folder-1"]"#));
        assert!(upload.body.contains(r#""name":"Day-2024-03-05-0907""#));
        assert!(upload.body.contains("Dear diary"));
    }

    #[tokio::test]
    async fn test_existing_folder_is_reused() {
        let (base, drive) = serve(FakeDrive {
            existing_folder: Some("folder-9".into()),
            ..Default::default()
        })
        .await;
        let client = client_for(&base, signed_in());

        assert_eq!(client.ensure_folder().await.unwrap(), "folder-9");
        assert!(drive.requests().iter().all(|r| r.method != "POST"));
    }

    #[tokio::test]
    async fn test_update_with_and_without_name() {
        let (base, drive) = serve(FakeDrive::default()).await;
        let client = client_for(&base, signed_in());
        let id = RemoteFileId::new("abc");

        let file = client.update_file(&id, "new body", Some("Renamed")).await.unwrap();
        assert_eq!(file.id, id);
        client.update_file(&id, "body only", None).await.unwrap();

        let requests = drive.requests();
        assert_eq!(requests[0].path, "upload/files/abc");
        assert_eq!(requests[0].query["uploadType"], "multipart");
        assert!(requests[0].body.contains(r#""name":"Renamed""#));
        assert_eq!(requests[1].query["uploadType"], "media");
        assert_eq!(requests[1].body, "body only");
    }

    #[tokio::test]
    async fn test_share_sets_permission_and_reads_link() {
        let (base, drive) = serve(FakeDrive::default()).await;
        let client = client_for(&base, signed_in());
        let id = RemoteFileId::new("abc");

        client.set_public_read_permission(&id).await.unwrap();
        let link = client.get_share_link(&id).await.unwrap();
        assert_eq!(link, "https://drive.google.com/file/d/abc/view");

        let requests = drive.requests();
        let permission: serde_json::Value = serde_json::from_str(&requests[0].body).unwrap();
        assert_eq!(permission, serde_json::json!({ "role": "reader", "type": "anyone" }));
        assert_eq!(requests[1].query["fields"], "webViewLink");
    }

    #[tokio::test]
    async fn test_status_mapping() {
        for (status, transient, auth) in [
            (StatusCode::UNAUTHORIZED, false, true),
            (StatusCode::FORBIDDEN, false, true),
            (StatusCode::TOO_MANY_REQUESTS, true, false),
            (StatusCode::SERVICE_UNAVAILABLE, true, false),
            (StatusCode::BAD_REQUEST, false, false),
        ] {
            let (base, _) = serve(FakeDrive {
                existing_folder: Some("folder-1".into()),
                upload_status: Some(status),
                ..Default::default()
            })
            .await;
            let err = client_for(&base, signed_in())
                .create_file("n", "text/plain", "b")
                .await
                .unwrap_err();
            assert_eq!(err.is_transient(), transient, "{}", status);
            assert_eq!(err.is_auth(), auth, "{}", status);
            assert!(err.to_string().contains("Upload refused"));
        }
    }

    #[tokio::test]
    async fn test_missing_or_expired_credentials_fail_before_request() {
        let (base, drive) = serve(FakeDrive::default()).await;

        let err = client_for(&base, CredentialStore::default())
            .create_file("n", "text/plain", "b")
            .await
            .unwrap_err();
        assert_eq!(err, ProviderError::CredentialMissing);

        let expired = DriveCredentials {
            access_token: "old".into(),
            expires_at: Some(Utc::now() - chrono::Duration::minutes(1)),
        };
        let err = client_for(&base, CredentialStore::new(Some(expired)))
            .get_share_link(&RemoteFileId::new("abc"))
            .await
            .unwrap_err();
        assert_eq!(err, ProviderError::CredentialExpired);
        assert!(drive.requests().is_empty());
    }

    #[tokio::test]
    async fn test_refreshed_token_is_picked_up() {
        let (base, drive) = serve(FakeDrive::default()).await;
        let store = CredentialStore::default();
        let client = client_for(&base, store.clone());

        store.set(DriveCredentials::new("fresh"));
        client.get_share_link(&RemoteFileId::new("abc")).await.unwrap();
        assert_eq!(drive.requests()[0].authorization.as_deref(), Some("Bearer fresh"));
    }

    #[tokio::test]
    async fn test_unreachable_server_is_transient() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base = format!("http://{}", listener.local_addr().unwrap());
        drop(listener);

        let err = client_for(&base, signed_in())
            .get_share_link(&RemoteFileId::new("abc"))
            .await
            .unwrap_err();
        assert!(err.is_transient(), "{:?}", err);
    }

    #[test]
    fn test_invalid_base_url() {
        let config = DriveConfig {
            api_base_url: "ftp://example.com".into(),
            ..Default::default()
        };
        assert!(GoogleDriveClient::new(config, CredentialStore::default()).is_err());
    }

    #[tokio::test]
    async fn test_list_files_follows_pages() {
        let (base, drive) = serve(FakeDrive {
            existing_folder: Some("folder-9".into()),
            backups: vec![
                serde_json::json!({
                    "id": "b",
                    "name": "Later-2024-03-06-1000",
                    "webViewLink": "https://drive.google.com/file/d/b/view",
                    "createdTime": "2024-03-06T10:00:00.000Z",
                }),
                serde_json::json!({ "id": "a", "name": "Earlier-2024-03-05-0907" }),
            ],
            ..Default::default()
        })
        .await;
        let client = client_for(&base, signed_in());

        let files = client.list_files().await.unwrap();
        assert_eq!(files.len(), 2);
        assert_eq!(files[0].id.as_str(), "b");
        assert_eq!(files[0].name, "Later-2024-03-06-1000");
        assert!(files[0].created_time.is_some());
        assert_eq!(files[1].web_view_link, None);

        let listings: Vec<_> = drive
            .requests()
            .into_iter()
            .filter(|r| r.query.get("q").is_some_and(|q| q.contains("in parents")))
            .collect();
        assert_eq!(listings.len(), 2);
        assert!(listings[0].query["q"].starts_with("'folder-9' in parents"));
        assert_eq!(listings[0].query.get("pageToken"), None);
        assert_eq!(listings[1].query["pageToken"], "page-1");
    }

    #[tokio::test]
    async fn test_list_files_needs_credentials() {
        let (base, drive) = serve(FakeDrive::default()).await;
        let client = client_for(&base, CredentialStore::default());
        assert_eq!(client.list_files().await.unwrap_err(), ProviderError::CredentialMissing);
        assert!(drive.requests().is_empty());
    }

    #[test]
    fn test_multipart_boundary_is_not_in_content() {
        let metadata = serde_json::json!({ "name": "Day" });
        let tricky = "line one\r\n--journal-part-\r\nline three";
        let a = multipart_related(&metadata, "text/plain", tricky);
        let b = multipart_related(&metadata, "text/plain", tricky);

        let boundary = a.content_type.trim_start_matches("multipart/related; boundary=");
        assert!(boundary.starts_with("journal-part-"));
        assert!(!tricky.contains(boundary));
        assert_ne!(a.content_type, b.content_type);

        let delimiter = format!("--{}", boundary);
        assert_eq!(a.body.matches(&delimiter).count(), 3);
        assert!(a.body.ends_with(&format!("{}--\r\n", delimiter)));
        assert!(a.body.contains(tricky));
    }

    #[test]
    fn test_query_escaping() {
        assert_eq!(escape_query("Bob's \\ notes"), "Bob\\'s \\\\ notes");
    }
}
