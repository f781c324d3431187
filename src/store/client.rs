//! Content client: the store operations the gallery needs, layered over a
//! `ContentApi` with a per-call deadline, not-found handling and revision
//! lookup before every write.

use std::future::Future;
use std::time::Duration;

use base64::Engine;
use tracing::{debug, info, warn};

use crate::settings::EffectiveSettings;

use super::api::ContentApi;
use super::error::StoreError;
use super::paths::validate_store_path;
use super::types::{DirEntry, FileContents, PutRequest, RemoteContents, WriteReceipt};

pub struct ContentClient<A> {
    api: A,
    target: EffectiveSettings,
    timeout: Duration,
}

impl<A: ContentApi> ContentClient<A> {
    pub fn new(api: A, target: EffectiveSettings, timeout: Duration) -> Self {
        Self { api, target, timeout }
    }

    pub fn target(&self) -> &EffectiveSettings {
        &self.target
    }

    async fn with_deadline<T>(&self, fut: impl Future<Output = Result<T, StoreError>>) -> Result<T, StoreError> {
        match tokio::time::timeout(self.timeout, fut).await {
            Ok(res) => res,
            Err(_) => Err(StoreError::Timeout { after_ms: self.timeout.as_millis() as u64 }),
        }
    }

    /// List a directory. Missing directories and failed listings both yield an
    /// empty list; the latter is logged. Never retried.
    pub async fn read_directory(&self, path: &str) -> Vec<DirEntry> {
        match self.with_deadline(self.api.get_contents(&self.target, path)).await {
            Ok(RemoteContents::Dir(entries)) => entries,
            Ok(RemoteContents::File(_)) => {
                debug!(target: "repogallery::store", "read_directory: '{}' is a file, not a directory", path);
                Vec::new()
            }
            Err(e) if e.is_not_found() => {
                debug!(target: "repogallery::store", "read_directory: '{}' not found", path);
                Vec::new()
            }
            Err(e) => {
                warn!(target: "repogallery::store", "read_directory: listing '{}' failed: {}", path, e);
                Vec::new()
            }
        }
    }

    /// Read a file with its current revision id.
    pub async fn read_file(&self, path: &str) -> Result<FileContents, StoreError> {
        validate_store_path(path)?;
        match self.with_deadline(self.api.get_contents(&self.target, path)).await? {
            RemoteContents::File(f) => Ok(f),
            RemoteContents::Dir(_) => Err(StoreError::Decode(format!("{} is a directory, not a file", path))),
        }
    }

    pub async fn read_text(&self, path: &str) -> Result<String, StoreError> {
        self.read_file(path).await?.text()
    }

    /// Revision id currently stored at `path`; `None` when nothing is there yet.
    ///
    /// Rejections other than not-found are logged and treated as "no revision":
    /// the write then goes out without one and the store decides.
    pub async fn current_revision(&self, path: &str) -> Result<Option<String>, StoreError> {
        match self.with_deadline(self.api.get_contents(&self.target, path)).await {
            Ok(RemoteContents::File(f)) => Ok(Some(f.revision_id)),
            Ok(RemoteContents::Dir(_)) => Ok(None),
            Err(e) if e.is_not_found() => Ok(None),
            Err(StoreError::RemoteRejected { status, message }) => {
                warn!(target: "repogallery::store", "revision lookup for '{}' rejected ({}): {}", path, status, message);
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    /// Create or update `path`. Looks up the current revision first and sends
    /// it along so the store only accepts the write against that exact revision.
    /// A rejection is returned as-is; there is no retry here.
    pub async fn write_file(&self, path: &str, content: &[u8], message: &str) -> Result<WriteReceipt, StoreError> {
        validate_store_path(path)?;
        if self.target.token.is_none() {
            return Err(StoreError::MissingCredentials);
        }
        let sha = self.current_revision(path).await?;
        let request = PutRequest {
            message: if message.is_empty() { format!("Update {}", path) } else { message.to_string() },
            content: base64::engine::general_purpose::STANDARD.encode(content),
            branch: self.target.branch.clone(),
            sha,
        };
        let is_update = request.sha.is_some();
        match self.with_deadline(self.api.put_contents(&self.target, path, &request)).await {
            Ok(receipt) => {
                info!(target: "repogallery::store", "wrote '{}' ({} bytes, update={}) rev={}", path, content.len(), is_update, receipt.revision_id);
                Ok(receipt)
            }
            Err(e) => {
                warn!(target: "repogallery::store", "write of '{}' failed: {}", path, e);
                Err(e)
            }
        }
    }

    /// UTF-8 text write; the encoding is lossless for any `str`.
    pub async fn write_text(&self, path: &str, text: &str, message: &str) -> Result<WriteReceipt, StoreError> {
        self.write_file(path, text.as_bytes(), message).await
    }
}

#[cfg(test)]
#[path = "client_tests.rs"]
mod tests;
