//! In-process content store with the same optimistic-concurrency rules as the
//! hosted one: creating needs no revision id, updating needs the current one.
//! Used by tests and by the fake HTTP content API in the integration suite.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

use async_trait::async_trait;
use base64::Engine;
use parking_lot::{Mutex, RwLock};
use xxhash_rust::xxh3::xxh3_64;

use crate::settings::EffectiveSettings;

use super::api::ContentApi;
use super::error::StoreError;
use super::paths::validate_store_path;
use super::types::{DirEntry, EntryKind, FileContents, PutRequest, RemoteContents, WriteReceipt};

/// Stable revision id for a byte slice using xxh3_64; fixed-width lowercase hex.
pub fn revision_id_for(bytes: &[u8]) -> String {
    format!("{:016x}", xxh3_64(bytes))
}

#[derive(Debug, Clone)]
struct StoredFile {
    content: Vec<u8>,
    sha: String,
}

#[derive(Default)]
pub struct MemoryContentApi {
    files: RwLock<BTreeMap<String, StoredFile>>,
    require_token: bool,
    raw_base: Option<String>,
    // (path fragment, status, remaining)
    put_faults: Mutex<Vec<(String, u16, usize)>>,
    // (path, replacement) written right after the next read of `path`
    interleaved_write: Mutex<Option<(String, Vec<u8>)>>,
    reads: AtomicUsize,
    writes: AtomicUsize,
    commits: AtomicU64,
}

impl MemoryContentApi {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reject writes without a bearer token, as the hosted store does.
    pub fn requiring_token(mut self) -> Self {
        self.require_token = true;
        self
    }

    /// Advertise `<raw_base>/<owner>/<repo>/<branch>/<path>` as each entry's download URL.
    pub fn with_raw_base(mut self, raw_base: impl Into<String>) -> Self {
        self.raw_base = Some(raw_base.into());
        self
    }

    /// Seed a file directly, bypassing revision checks.
    pub fn insert(&self, path: &str, content: impl Into<Vec<u8>>) -> String {
        let content = content.into();
        let sha = revision_id_for(&content);
        self.files.write().insert(path.to_string(), StoredFile { content, sha: sha.clone() });
        sha
    }

    pub fn file(&self, path: &str) -> Option<Vec<u8>> {
        self.files.read().get(path).map(|f| f.content.clone())
    }

    pub fn paths(&self) -> Vec<String> {
        self.files.read().keys().cloned().collect()
    }

    /// Fail the next `count` writes with `status` before they touch any file.
    pub fn fail_next_writes(&self, status: u16, count: usize) {
        self.fail_writes_matching("", status, count);
    }

    /// Like `fail_next_writes`, limited to paths containing `fragment`.
    pub fn fail_writes_matching(&self, fragment: &str, status: u16, count: usize) {
        self.put_faults.lock().push((fragment.to_string(), status, count));
    }

    fn take_fault(&self, path: &str) -> Option<u16> {
        let mut faults = self.put_faults.lock();
        let slot = faults.iter_mut().find(|(frag, _, left)| *left > 0 && path.contains(frag.as_str()))?;
        slot.2 -= 1;
        Some(slot.1)
    }

    /// Simulate another writer updating `path` right after our next read of it.
    pub fn interleave_write_after_read(&self, path: &str, content: impl Into<Vec<u8>>) {
        *self.interleaved_write.lock() = Some((path.to_string(), content.into()));
    }

    pub fn read_count(&self) -> usize {
        self.reads.load(Ordering::Relaxed)
    }

    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::Relaxed)
    }

    fn download_url(&self, target: &EffectiveSettings, path: &str) -> Option<String> {
        self.raw_base
            .as_ref()
            .map(|base| format!("{}/{}/{}/{}/{}", base.trim_end_matches('/'), target.owner, target.repo, target.branch, path))
    }

    fn apply_interleaved(&self, path: &str) {
        let pending = {
            let mut slot = self.interleaved_write.lock();
            match slot.as_ref() {
                Some((p, _)) if p == path => slot.take(),
                _ => None,
            }
        };
        if let Some((p, content)) = pending {
            self.insert(&p, content);
        }
    }

    fn list_dir(&self, target: &EffectiveSettings, path: &str) -> Vec<DirEntry> {
        let files = self.files.read();
        let prefix = if path.is_empty() { String::new() } else { format!("{}/", path) };
        let mut out = Vec::new();
        let mut seen_dirs = BTreeSet::new();
        for (key, file) in files.range(prefix.clone()..) {
            let Some(rest) = key.strip_prefix(&prefix) else { break };
            match rest.split_once('/') {
                Some((dir, _)) => {
                    if seen_dirs.insert(dir.to_string()) {
                        out.push(DirEntry {
                            name: dir.to_string(),
                            path: format!("{}{}", prefix, dir),
                            kind: EntryKind::Dir,
                            sha: String::new(),
                            size: 0,
                            download_url: None,
                        });
                    }
                }
                None => out.push(DirEntry {
                    name: rest.to_string(),
                    path: key.clone(),
                    kind: EntryKind::File,
                    sha: file.sha.clone(),
                    size: file.content.len() as u64,
                    download_url: self.download_url(target, key),
                }),
            }
        }
        out
    }
}

#[async_trait]
impl ContentApi for MemoryContentApi {
    async fn get_contents(&self, target: &EffectiveSettings, path: &str) -> Result<RemoteContents, StoreError> {
        self.reads.fetch_add(1, Ordering::Relaxed);
        let file = self.files.read().get(path).cloned();
        let result = match file {
            Some(f) => Ok(RemoteContents::File(FileContents {
                path: path.to_string(),
                revision_id: f.sha,
                content: f.content,
                download_url: self.download_url(target, path),
            })),
            None => {
                let entries = self.list_dir(target, path);
                if entries.is_empty() && !path.is_empty() {
                    Err(StoreError::not_found(path))
                } else {
                    Ok(RemoteContents::Dir(entries))
                }
            }
        };
        self.apply_interleaved(path);
        result
    }

    async fn put_contents(&self, target: &EffectiveSettings, path: &str, request: &PutRequest) -> Result<WriteReceipt, StoreError> {
        self.writes.fetch_add(1, Ordering::Relaxed);
        if self.require_token && target.token.is_none() {
            return Err(StoreError::rejected(401, "Requires authentication"));
        }
        if let Some(status) = self.take_fault(path) {
            return Err(StoreError::rejected(status, "injected failure"));
        }
        validate_store_path(path).map_err(|e| StoreError::rejected(422, e.to_string()))?;
        let content = base64::engine::general_purpose::STANDARD
            .decode(request.content.as_bytes())
            .map_err(|e| StoreError::rejected(422, format!("content is not valid Base64: {}", e)))?;

        let mut files = self.files.write();
        match (files.get(path), request.sha.as_deref()) {
            (Some(_), None) => return Err(StoreError::rejected(422, "Invalid request. \"sha\" wasn't supplied.")),
            (Some(existing), Some(sha)) if existing.sha != sha => {
                return Err(StoreError::rejected(409, format!("{} does not match {}", path, sha)));
            }
            (None, Some(sha)) => return Err(StoreError::rejected(409, format!("{} does not match {}", path, sha))),
            _ => {}
        }
        let sha = revision_id_for(&content);
        files.insert(path.to_string(), StoredFile { content, sha: sha.clone() });
        let commit = self.commits.fetch_add(1, Ordering::Relaxed) + 1;
        Ok(WriteReceipt {
            path: path.to_string(),
            revision_id: sha,
            commit_id: Some(format!("{:040x}", commit)),
        })
    }
}
