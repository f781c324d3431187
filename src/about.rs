//! The single free-text "about" document, stored at `about/ABOUT.md` and
//! mirrored in the local settings cache.

use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, warn};

use crate::settings::{KvAdapter, SettingsStore};
use crate::store::{ContentApi, ContentClient, StoreError, WriteReceipt};

pub const ABOUT_PATH: &str = "about/ABOUT.md";
pub const ABOUT_COMMIT_MESSAGE: &str = "Update About";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AboutSource {
    Remote,
    Cache,
    Empty,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AboutText {
    pub text: String,
    pub source: AboutSource,
}

pub struct AboutDocument<A, K> {
    client: Arc<ContentClient<A>>,
    settings: Arc<SettingsStore<K>>,
}

impl<A: ContentApi, K: KvAdapter> AboutDocument<A, K> {
    pub fn new(client: Arc<ContentClient<A>>, settings: Arc<SettingsStore<K>>) -> Self {
        Self { client, settings }
    }

    /// Trim, cache locally, then write to the store.
    pub async fn publish(&self, text: &str) -> Result<WriteReceipt, StoreError> {
        let text = text.trim();
        self.settings.cache_about(text);
        self.client.write_text(ABOUT_PATH, text, ABOUT_COMMIT_MESSAGE).await
    }

    /// Stored document, else the cached copy, else empty.
    pub async fn load(&self) -> AboutText {
        match self.client.read_text(ABOUT_PATH).await {
            Ok(text) => AboutText { text, source: AboutSource::Remote },
            Err(e) => {
                if e.is_not_found() {
                    debug!(target: "repogallery::store", "no about document yet");
                } else {
                    warn!(target: "repogallery::store", "could not load about document: {}", e);
                }
                match self.settings.cached_about() {
                    Some(text) => AboutText { text, source: AboutSource::Cache },
                    None => AboutText { text: String::new(), source: AboutSource::Empty },
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use crate::settings::{EffectiveSettings, MemoryKv};
    use crate::store::MemoryContentApi;

    fn about(api: Arc<MemoryContentApi>, token: Option<&str>) -> AboutDocument<Arc<MemoryContentApi>, MemoryKv> {
        let target = EffectiveSettings { owner: "o".into(), repo: "r".into(), branch: "main".into(), token: token.map(str::to_string) };
        let client = Arc::new(ContentClient::new(api, target, Duration::from_secs(5)));
        AboutDocument::new(client, Arc::new(SettingsStore::new(MemoryKv::new())))
    }

    #[tokio::test]
    async fn republishing_same_text_keeps_content() {
        let api = Arc::new(MemoryContentApi::new());
        let doc = about(api.clone(), Some("tok"));

        let first = doc.publish("  Hello, I animate things.\n").await.unwrap();
        let second = doc.publish("Hello, I animate things.").await.unwrap();
        assert_eq!(first.revision_id, second.revision_id);
        assert_eq!(api.file(ABOUT_PATH).unwrap(), b"Hello, I animate things.");
        assert_eq!(api.write_count(), 2);
    }

    #[tokio::test]
    async fn multibyte_text_round_trips() {
        let api = Arc::new(MemoryContentApi::new());
        let doc = about(api, Some("tok"));
        let text = "Animação · アニメ · 🎬 café";
        doc.publish(text).await.unwrap();
        assert_eq!(doc.load().await, AboutText { text: text.to_string(), source: AboutSource::Remote });
    }

    #[tokio::test]
    async fn falls_back_to_cache_then_empty() {
        let api = Arc::new(MemoryContentApi::new());
        let doc = about(api.clone(), None);
        assert_eq!(doc.load().await.source, AboutSource::Empty);

        // publishing without a token fails remotely but still caches
        let err = doc.publish("offline note").await.unwrap_err();
        assert_eq!(err, StoreError::MissingCredentials);
        assert_eq!(doc.load().await, AboutText { text: "offline note".into(), source: AboutSource::Cache });
        assert!(api.paths().is_empty());
    }
}
