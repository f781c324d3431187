//! Data contracts exchanged with the remote content store.
//! Field names follow the GitHub contents API so the same types serve both
//! the HTTP backend and the in-memory one.

use serde::{Deserialize, Serialize};

use super::error::StoreError;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    File,
    Dir,
    #[serde(other)]
    Other,
}

/// One entry of a directory listing.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DirEntry {
    pub name: String,
    pub path: String,
    #[serde(rename = "type")]
    pub kind: EntryKind,
    #[serde(default)]
    pub sha: String,
    #[serde(default)]
    pub size: u64,
    /// Direct retrieval locator for the raw bytes, when the store supplies one.
    #[serde(default)]
    pub download_url: Option<String>,
}

impl DirEntry {
    pub fn is_file(&self) -> bool {
        self.kind == EntryKind::File
    }
}

/// A file read back from the store, content already decoded from base64.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileContents {
    pub path: String,
    pub revision_id: String,
    pub content: Vec<u8>,
    pub download_url: Option<String>,
}

impl FileContents {
    pub fn text(&self) -> Result<String, StoreError> {
        String::from_utf8(self.content.clone())
            .map_err(|e| StoreError::Decode(format!("{} is not valid UTF-8: {}", self.path, e)))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteContents {
    File(FileContents),
    Dir(Vec<DirEntry>),
}

/// Body of a create-or-update call. `sha` must carry the current revision
/// when the path already exists.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PutRequest {
    pub message: String,
    /// Base64 (standard alphabet) encoded file content.
    pub content: String,
    pub branch: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sha: Option<String>,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct WriteReceipt {
    pub path: String,
    pub revision_id: String,
    pub commit_id: Option<String>,
}
