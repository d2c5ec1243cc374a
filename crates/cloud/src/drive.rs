//! Async Google Drive client.
//!
//! Exports land in the service account's own Drive; this client finds,
//! downloads and removes them, and offers the maintenance calls behind
//! `geefetch drive`.

use std::path::Path;
use std::sync::Arc;

use crate::auth::CloudAuth;
use crate::drive_models::{
    CreateFileRequest, DriveFile, FileList, Query, FILE_FIELDS, FOLDER_MIME_TYPE,
};
use crate::error::Result;
use crate::http::{HttpClient, HttpOptions};

pub const DEFAULT_BASE_URL: &str = "https://www.googleapis.com/drive/v3";

/// Configuration for [`DriveClient`].
#[derive(Debug, Clone)]
pub struct DriveOptions {
    /// API root, without trailing slash.
    pub base_url: String,
    /// Files per `files.list` page (default 100, max 1000).
    pub page_size: u32,
    pub http: HttpOptions,
}

impl Default for DriveOptions {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            page_size: 100,
            http: HttpOptions::default(),
        }
    }
}

pub struct DriveClient {
    http: HttpClient,
    auth: Arc<dyn CloudAuth>,
    options: DriveOptions,
}

impl DriveClient {
    pub fn new(options: DriveOptions, auth: Arc<dyn CloudAuth>) -> Result<Self> {
        let http = HttpClient::new(options.http.clone())?;
        Ok(Self {
            http,
            auth,
            options,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.options.base_url.trim_end_matches('/'), path)
    }

    /// All files matching `query`, following pagination.
    pub async fn list(&self, query: &Query) -> Result<Vec<DriveFile>> {
        let url = self.url("files");
        let q = query.build();
        let fields = format!("nextPageToken,files({FILE_FIELDS})");
        let page_size = self.options.page_size.to_string();

        let mut files = Vec::new();
        let mut page_token: Option<String> = None;
        loop {
            let mut params = vec![
                ("q", q.as_str()),
                ("fields", fields.as_str()),
                ("pageSize", page_size.as_str()),
            ];
            if let Some(token) = page_token.as_deref() {
                params.push(("pageToken", token));
            }

            let page: FileList = self.http.get_json(&url, &params, self.auth.as_ref()).await?;
            files.extend(page.files);
            match page.next_page_token {
                Some(token) if !token.is_empty() => page_token = Some(token),
                _ => break,
            }
        }

        tracing::debug!("drive query [{}] matched {} file(s)", q, files.len());
        Ok(files)
    }

    /// Create a folder, under `parent` or at the root.
    pub async fn create_directory(
        &self,
        name: &str,
        parent: Option<&DriveFile>,
    ) -> Result<DriveFile> {
        let body = CreateFileRequest {
            name,
            mime_type: FOLDER_MIME_TYPE,
            parents: parent.map(|p| vec![p.id.as_str()]).unwrap_or_default(),
        };
        self.http
            .post_json(&self.url("files"), &body, self.auth.as_ref())
            .await
    }

    /// Content of `folder`, or of the root when `None`.
    pub async fn list_directory(&self, folder: Option<&DriveFile>) -> Result<Vec<DriveFile>> {
        let parent = folder.map(|f| f.id.as_str()).unwrap_or("root");
        self.list(&Query::new().in_parent(parent)).await
    }

    /// Files whose name contains `text`, anywhere in Drive.
    pub async fn search(&self, text: &str) -> Result<Vec<DriveFile>> {
        self.list(&Query::new().name_contains(text)).await
    }

    pub async fn search_in_folder(&self, folder: &DriveFile, text: &str) -> Result<Vec<DriveFile>> {
        self.list(&Query::new().in_parent(&folder.id).name_contains(text))
            .await
    }

    /// Folders named exactly `name`.
    pub async fn find_folders(&self, name: &str) -> Result<Vec<DriveFile>> {
        self.list(&Query::new().name_is(name).folders_only()).await
    }

    /// Download the content of `file` to `path`. Returns the byte count.
    pub async fn download_file(&self, file: &DriveFile, path: &Path) -> Result<u64> {
        let url = self.url(&format!("files/{}", file.id));
        let bytes = self
            .http
            .download(&url, &[("alt", "media")], path, self.auth.as_ref())
            .await?;
        tracing::debug!("downloaded {} ({} bytes) to {}", file.name, bytes, path.display());
        Ok(bytes)
    }

    /// Permanently delete `file`. Folders are deleted with their content.
    pub async fn delete_file(&self, file: &DriveFile) -> Result<()> {
        self.http
            .delete(&self.url(&format!("files/{}", file.id)), self.auth.as_ref())
            .await
    }

    pub async fn list_trash(&self) -> Result<Vec<DriveFile>> {
        self.list(&Query::trashed()).await
    }

    pub async fn empty_trash(&self) -> Result<()> {
        self.http
            .delete(&self.url("files/trash"), self.auth.as_ref())
            .await
    }
}
