use std::sync::Arc;

use async_trait::async_trait;

use crate::settings::EffectiveSettings;

use super::error::StoreError;
use super::types::{PutRequest, RemoteContents, WriteReceipt};

/// The remote content store. Concrete impls live in `github` (HTTP) and
/// `memory` (in-process).
///
/// `target` names the repository, branch and optional bearer token the call
/// runs against.
#[async_trait]
pub trait ContentApi: Send + Sync {
    /// Metadata and content of a file, or the listing of a directory.
    async fn get_contents(&self, target: &EffectiveSettings, path: &str) -> Result<RemoteContents, StoreError>;

    /// Create or update a file. Updates must carry the current revision id.
    async fn put_contents(&self, target: &EffectiveSettings, path: &str, request: &PutRequest) -> Result<WriteReceipt, StoreError>;
}

#[async_trait]
impl<A: ContentApi + ?Sized> ContentApi for Arc<A> {
    async fn get_contents(&self, target: &EffectiveSettings, path: &str) -> Result<RemoteContents, StoreError> {
        (**self).get_contents(target, path).await
    }

    async fn put_contents(&self, target: &EffectiveSettings, path: &str, request: &PutRequest) -> Result<WriteReceipt, StoreError> {
        (**self).put_contents(target, path, request).await
    }
}
