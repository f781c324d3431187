//!
//! Uploader
//! --------
//! Writes one media file and its sidecar metadata record into a category:
//!
//! 1. `uploads/<category>/<ts>_<name>` with the file bytes (base64 on the wire)
//! 2. `uploads/<category>/meta_<ts>_<name>.json` with description and timestamp
//!
//! A failed media write aborts the upload. The metadata write is retried with
//! backoff; if it still fails the media stays and the outcome is `Partial`.

use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};
use uuid::Uuid;

use crate::config::{Category, GalleryConfig};
use crate::store::paths::{join, media_file_name, metadata_name_for, sanitize_file_name};
use crate::store::retry::retry_async;
use crate::store::{ContentApi, ContentClient, RetryPolicy, StoreError, WriteReceipt};

/// A file picked by the operator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalFile {
    pub name: String,
    pub bytes: Vec<u8>,
}

impl LocalFile {
    pub fn new(name: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self { name: name.into(), bytes: bytes.into() }
    }

    pub async fn read(path: &Path) -> std::io::Result<Self> {
        let bytes = tokio::fs::read(path).await?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "upload".to_string());
        Ok(Self { name, bytes })
    }

    pub fn size(&self) -> u64 {
        self.bytes.len() as u64
    }
}

#[derive(Debug, Clone)]
pub struct UploadRequest {
    pub category: Category,
    pub file: Option<LocalFile>,
    pub description: String,
}

/// Sidecar record stored next to each upload. All fields default so partial
/// or older records still parse.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct MetadataRecord {
    #[serde(default)]
    pub filename: String,
    #[serde(default)]
    pub original_name: String,
    #[serde(default)]
    pub uploaded_at: String,
    #[serde(default)]
    pub description: String,
}

pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

pub struct FixedClock(pub DateTime<Utc>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

/// Store paths and timestamps for one upload, derived before anything is written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UploadPlan {
    pub category: Category,
    pub safe_name: String,
    pub timestamp_ms: i64,
    pub uploaded_at: String,
    pub media_path: String,
    pub metadata_path: String,
}

impl UploadPlan {
    pub fn new(category: Category, original_name: &str, now: DateTime<Utc>) -> Self {
        let safe_name = sanitize_file_name(original_name);
        let timestamp_ms = now.timestamp_millis();
        let media_name = media_file_name(timestamp_ms, &safe_name);
        let dir = category.dir();
        Self {
            category,
            media_path: join(&dir, &media_name),
            metadata_path: join(&dir, &metadata_name_for(&media_name)),
            safe_name,
            timestamp_ms,
            uploaded_at: now.to_rfc3339_opts(SecondsFormat::Millis, true),
        }
    }

    pub fn media_name(&self) -> &str {
        crate::store::paths::basename(&self.media_path)
    }

    pub fn metadata_record(&self, original_name: &str, description: &str) -> MetadataRecord {
        MetadataRecord {
            filename: self.media_name().to_string(),
            original_name: original_name.to_string(),
            uploaded_at: self.uploaded_at.clone(),
            description: description.to_string(),
        }
    }
}

/// Passed to the confirmation hook when a file reaches the size threshold.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LargeFileNotice {
    pub name: String,
    pub size: u64,
    pub threshold: u64,
}

/// Files at or above `threshold` bytes need the operator's explicit go-ahead.
pub fn requires_confirmation(size: u64, threshold: u64) -> bool {
    size >= threshold
}

#[derive(Debug)]
pub enum UploadOutcome {
    Complete { plan: UploadPlan, media: WriteReceipt, metadata: WriteReceipt },
    /// Media stored, sidecar metadata could not be written.
    Partial { plan: UploadPlan, media: WriteReceipt, metadata_error: StoreError },
}

impl UploadOutcome {
    pub fn plan(&self) -> &UploadPlan {
        match self {
            UploadOutcome::Complete { plan, .. } | UploadOutcome::Partial { plan, .. } => plan,
        }
    }

    pub fn is_complete(&self) -> bool {
        matches!(self, UploadOutcome::Complete { .. })
    }
}

#[derive(Debug, Error)]
pub enum UploadError {
    #[error("choose a file to upload")]
    NoFileSelected,
    #[error("admin token missing: save a token before uploading")]
    MissingCredentials,
    #[error("upload of {size} bytes not confirmed (threshold {threshold} bytes)")]
    NotConfirmed { size: u64, threshold: u64 },
    #[error("another upload is still in progress")]
    Busy,
    #[error("upload failed: {0}")]
    MediaWrite(#[source] StoreError),
}

struct InFlight<'a>(&'a AtomicBool);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

pub struct Uploader<A> {
    client: Arc<ContentClient<A>>,
    clock: Arc<dyn Clock>,
    threshold: u64,
    metadata_retry: RetryPolicy,
    in_flight: AtomicBool,
}

impl<A: ContentApi> Uploader<A> {
    pub fn new(client: Arc<ContentClient<A>>, config: &GalleryConfig) -> Self {
        Self {
            client,
            clock: Arc::new(SystemClock),
            threshold: config.large_file_threshold_bytes,
            metadata_retry: config.metadata_retry.clone(),
            in_flight: AtomicBool::new(false),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    fn begin(&self) -> Result<InFlight<'_>, UploadError> {
        self.in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map(|_| InFlight(&self.in_flight))
            .map_err(|_| UploadError::Busy)
    }

    /// Upload `request.file` into its category. `confirm` is consulted only
    /// for files at or above the size threshold; returning false cancels
    /// before anything is written.
    pub async fn upload<F>(&self, request: UploadRequest, confirm: F) -> Result<UploadOutcome, UploadError>
    where
        F: FnOnce(&LargeFileNotice) -> bool,
    {
        let UploadRequest { category, file, description } = request;
        let file = file.ok_or(UploadError::NoFileSelected)?;
        let _guard = self.begin()?;
        if self.client.target().token.is_none() {
            return Err(UploadError::MissingCredentials);
        }

        let size = file.size();
        if requires_confirmation(size, self.threshold) {
            let notice = LargeFileNotice { name: file.name.clone(), size, threshold: self.threshold };
            if !confirm(&notice) {
                info!(target: "repogallery::upload", "upload of '{}' ({} bytes) declined at confirmation", file.name, size);
                return Err(UploadError::NotConfirmed { size, threshold: self.threshold });
            }
        }

        let corr = Uuid::new_v4();
        let plan = UploadPlan::new(category, &file.name, self.clock.now());
        info!(target: "repogallery::upload", "upload start category={} path={} size={} [corr={}]", category, plan.media_path, size, corr);

        let media = self
            .client
            .write_file(&plan.media_path, &file.bytes, &format!("Upload {}", plan.safe_name))
            .await
            .map_err(|e| {
                warn!(target: "repogallery::upload", "media write failed for {}: {} [corr={}]", plan.media_path, e, corr);
                UploadError::MediaWrite(e)
            })?;

        let record = plan.metadata_record(&file.name, &description);
        let meta_result = match serde_json::to_string_pretty(&record) {
            Ok(json) => {
                retry_async(&self.metadata_retry, "metadata write", |_| {
                    self.client.write_text(&plan.metadata_path, &json, "Meta")
                })
                .await
            }
            Err(e) => Err(StoreError::from(e)),
        };

        match meta_result {
            Ok(metadata) => {
                info!(target: "repogallery::upload", "upload complete path={} meta={} [corr={}]", plan.media_path, plan.metadata_path, corr);
                Ok(UploadOutcome::Complete { plan, media, metadata })
            }
            Err(metadata_error) => {
                warn!(
                    target: "repogallery::upload",
                    "upload partial: media stored at {} but metadata {} failed: {} [corr={}]",
                    plan.media_path, plan.metadata_path, metadata_error, corr
                );
                Ok(UploadOutcome::Partial { plan, media, metadata_error })
            }
        }
    }
}

#[cfg(test)]
#[path = "upload_tests.rs"]
mod tests;
