//! Serde models and query helpers for the Google Drive API (v3).

use serde::{Deserialize, Serialize};

pub const FOLDER_MIME_TYPE: &str = "application/vnd.google-apps.folder";

/// Fields requested for every listed file.
pub const FILE_FIELDS: &str = "id,name,mimeType,size";

/// A file or folder in Drive.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DriveFile {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
    /// Size in bytes, as a decimal string. Absent for folders.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<String>,
}

impl DriveFile {
    pub fn is_folder(&self) -> bool {
        self.mime_type.as_deref() == Some(FOLDER_MIME_TYPE)
    }

    pub fn size_bytes(&self) -> Option<u64> {
        self.size.as_deref().and_then(|s| s.parse().ok())
    }
}

/// One page of a `files.list` response.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileList {
    #[serde(default)]
    pub files: Vec<DriveFile>,
    pub next_page_token: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateFileRequest<'a> {
    pub name: &'a str,
    pub mime_type: &'a str,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub parents: Vec<&'a str>,
}

/// Quote `value` as a string literal of the Drive query language.
pub fn quote(value: &str) -> String {
    format!("'{}'", value.replace('\\', "\\\\").replace('\'', "\\'"))
}

/// Query clauses for `files.list`; every query excludes trashed files
/// unless built with [`Query::trashed`].
pub struct Query {
    clauses: Vec<String>,
}

impl Query {
    pub fn new() -> Self {
        Self {
            clauses: vec!["trashed = false".to_string()],
        }
    }

    pub fn trashed() -> Self {
        Self {
            clauses: vec!["trashed = true".to_string()],
        }
    }

    /// Direct children of the folder `parent` (`root` for My Drive).
    pub fn in_parent(mut self, parent: &str) -> Self {
        self.clauses.push(format!("{} in parents", quote(parent)));
        self
    }

    pub fn name_contains(mut self, text: &str) -> Self {
        self.clauses.push(format!("name contains {}", quote(text)));
        self
    }

    pub fn name_is(mut self, name: &str) -> Self {
        self.clauses.push(format!("name = {}", quote(name)));
        self
    }

    pub fn folders_only(mut self) -> Self {
        self.clauses
            .push(format!("mimeType = {}", quote(FOLDER_MIME_TYPE)));
        self
    }

    pub fn build(&self) -> String {
        self.clauses.join(" and ")
    }
}

impl Default for Query {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quotes_are_escaped() {
        assert_eq!(quote("it's"), r"'it\'s'");
        assert_eq!(quote(r"a\b"), r"'a\\b'");
    }

    #[test]
    fn builds_folder_search() {
        let q = Query::new().in_parent("root").name_is("GEE").folders_only();
        assert_eq!(
            q.build(),
            "trashed = false and 'root' in parents and name = 'GEE' \
             and mimeType = 'application/vnd.google-apps.folder'"
        );
        assert_eq!(Query::trashed().build(), "trashed = true");
    }

    #[test]
    fn folder_detection_and_size() {
        let file: DriveFile = serde_json::from_str(
            r#"{"id": "1", "name": "NDVI.tif", "mimeType": "image/tiff", "size": "2048"}"#,
        )
        .unwrap();
        assert!(!file.is_folder());
        assert_eq!(file.size_bytes(), Some(2048));
    }
}
