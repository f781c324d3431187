//!
//! GitHub contents API backend
//! ---------------------------
//! `GET  /repos/{owner}/{repo}/contents/{path}?ref={branch}` returns a file
//! object or an array listing; `PUT` on the same URL creates or updates a file.
//! Requests are authenticated with a bearer token when one is configured and
//! anonymous otherwise (public repositories allow anonymous reads). The token
//! only ever goes to the API host and the configured raw host.

use async_trait::async_trait;
use base64::Engine;
use reqwest::header::{HeaderValue, ACCEPT};
use reqwest::{RequestBuilder, StatusCode, Url};
use serde::Deserialize;
use tracing::{debug, warn};

use crate::settings::EffectiveSettings;

use super::api::ContentApi;
use super::error::StoreError;
use super::paths::encode_path;
use super::types::{DirEntry, FileContents, PutRequest, RemoteContents, WriteReceipt};

pub const DEFAULT_API_BASE: &str = "https://api.github.com";
const GITHUB_JSON: &str = "application/vnd.github+json";
const MAX_ERROR_BODY: usize = 300;

#[derive(Debug, Deserialize)]
struct FileObject {
    #[serde(rename = "type")]
    kind: String,
    path: String,
    #[serde(default)]
    sha: String,
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    encoding: Option<String>,
    #[serde(default)]
    download_url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PutResponse {
    content: PutResponseContent,
    #[serde(default)]
    commit: Option<PutResponseCommit>,
}

#[derive(Debug, Deserialize)]
struct PutResponseContent {
    path: String,
    sha: String,
}

#[derive(Debug, Deserialize)]
struct PutResponseCommit {
    sha: String,
}

#[derive(Clone)]
pub struct GithubApi {
    base: Url,
    raw_origin: Option<String>,
    client: reqwest::Client,
}

impl GithubApi {
    pub fn new(api_base: &str) -> Result<Self, StoreError> {
        // Url::join drops the last path segment unless the base ends with '/'
        let normalized = if api_base.ends_with('/') { api_base.to_string() } else { format!("{}/", api_base) };
        let base = Url::parse(&normalized)
            .map_err(|e| StoreError::Transport(format!("invalid API base URL '{}': {}", api_base, e)))?;
        let client = reqwest::Client::builder()
            .user_agent(concat!("repogallery/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { base, raw_origin: None, client })
    }

    /// Also trust `raw_host` with the bearer token when fetching raw bytes.
    pub fn with_raw_host(mut self, raw_host: &str) -> Result<Self, StoreError> {
        let url = Url::parse(raw_host)
            .map_err(|e| StoreError::Transport(format!("invalid raw host URL '{}': {}", raw_host, e)))?;
        self.raw_origin = Some(url.origin().ascii_serialization());
        Ok(self)
    }

    fn trusts(&self, url: &Url) -> bool {
        let origin = url.origin();
        if !origin.is_tuple() {
            return false;
        }
        origin == self.base.origin() || self.raw_origin.as_deref() == Some(origin.ascii_serialization().as_str())
    }

    fn contents_url(&self, target: &EffectiveSettings, path: &str) -> Result<Url, StoreError> {
        let rel = format!(
            "repos/{}/{}/contents/{}",
            urlencoding::encode(&target.owner),
            urlencoding::encode(&target.repo),
            encode_path(path)
        );
        self.base
            .join(&rel)
            .map_err(|e| StoreError::Transport(format!("cannot build URL for '{}': {}", path, e)))
    }

    fn authorize(&self, rb: RequestBuilder, target: &EffectiveSettings) -> RequestBuilder {
        let rb = rb.header(ACCEPT, HeaderValue::from_static(GITHUB_JSON));
        match target.token.as_deref() {
            Some(token) => rb.bearer_auth(token),
            None => rb,
        }
    }

    async fn rejection(path: &str, resp: reqwest::Response) -> StoreError {
        let status = resp.status();
        if status == StatusCode::NOT_FOUND {
            return StoreError::not_found(path);
        }
        let body = resp.text().await.unwrap_or_default();
        let message = match serde_json::from_str::<serde_json::Value>(&body) {
            Ok(v) => v.get("message").and_then(|m| m.as_str()).map(str::to_string).unwrap_or(body),
            Err(_) => body,
        };
        StoreError::rejected(status.as_u16(), message.chars().take(MAX_ERROR_BODY).collect::<String>())
    }

    /// Large files come back without inline content; fetch them from their raw locator.
    async fn fetch_raw(&self, target: &EffectiveSettings, path: &str, url: &str) -> Result<Vec<u8>, StoreError> {
        let url = Url::parse(url)
            .map_err(|e| StoreError::Transport(format!("invalid download URL for '{}': {}", path, e)))?;
        let mut rb = self.client.get(url.clone());
        match target.token.as_deref() {
            Some(token) if self.trusts(&url) => rb = rb.bearer_auth(token),
            Some(_) => warn!(target: "repogallery::store", "fetching {} anonymously: {} is not a trusted host", path, url.origin().ascii_serialization()),
            None => {}
        }
        let resp = rb.send().await?;
        if !resp.status().is_success() {
            return Err(Self::rejection(path, resp).await);
        }
        Ok(resp.bytes().await?.to_vec())
    }
}

/// Decode the API's base64 payload, which is wrapped with newlines.
pub fn decode_content(encoded: &str) -> Result<Vec<u8>, StoreError> {
    let compact: String = encoded.chars().filter(|c| !c.is_whitespace()).collect();
    Ok(base64::engine::general_purpose::STANDARD.decode(compact)?)
}

#[async_trait]
impl ContentApi for GithubApi {
    async fn get_contents(&self, target: &EffectiveSettings, path: &str) -> Result<RemoteContents, StoreError> {
        let mut url = self.contents_url(target, path)?;
        url.query_pairs_mut().append_pair("ref", &target.branch);
        debug!(target: "repogallery::store", "GET {} (auth={})", url, target.token.is_some());

        let resp = self.authorize(self.client.get(url), target).send().await?;
        if !resp.status().is_success() {
            return Err(Self::rejection(path, resp).await);
        }
        let value: serde_json::Value = resp.json().await?;
        if value.is_array() {
            let entries: Vec<DirEntry> = serde_json::from_value(value)?;
            return Ok(RemoteContents::Dir(entries));
        }

        let file: FileObject = serde_json::from_value(value)?;
        if file.kind != "file" {
            return Err(StoreError::Decode(format!("{} is a {}, not a file", file.path, file.kind)));
        }
        let content = match (file.encoding.as_deref(), file.content.as_deref()) {
            (Some("base64"), Some(encoded)) if !encoded.is_empty() => decode_content(encoded)?,
            _ => match file.download_url.as_deref() {
                Some(raw) => self.fetch_raw(target, path, raw).await?,
                None => Vec::new(),
            },
        };
        Ok(RemoteContents::File(FileContents {
            path: file.path,
            revision_id: file.sha,
            content,
            download_url: file.download_url,
        }))
    }

    async fn put_contents(&self, target: &EffectiveSettings, path: &str, request: &PutRequest) -> Result<WriteReceipt, StoreError> {
        let url = self.contents_url(target, path)?;
        debug!(target: "repogallery::store", "PUT {} (sha={:?}, bytes_b64={})", url, request.sha, request.content.len());

        let resp = self.authorize(self.client.put(url), target).json(request).send().await?;
        if !resp.status().is_success() {
            return Err(Self::rejection(path, resp).await);
        }
        let body: PutResponse = resp.json().await?;
        Ok(WriteReceipt {
            path: body.content.path,
            revision_id: body.content.sha,
            commit_id: body.commit.map(|c| c.sha),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn target() -> EffectiveSettings {
        EffectiveSettings { owner: "octo cat".into(), repo: "site".into(), branch: "main".into(), token: None }
    }

    #[test]
    fn contents_url_keeps_base_path() {
        let api = GithubApi::new("http://127.0.0.1:9000/api/v3").unwrap();
        let url = api.contents_url(&target(), "uploads/all/1_a b.png").unwrap();
        assert_eq!(url.as_str(), "http://127.0.0.1:9000/api/v3/repos/octo%20cat/site/contents/uploads/all/1_a%20b.png");
    }

    #[test]
    fn token_only_goes_to_known_hosts() {
        let api = GithubApi::new("http://127.0.0.1:9000/api/v3").unwrap().with_raw_host("https://raw.test").unwrap();
        let url = |s: &str| Url::parse(s).unwrap();
        assert!(api.trusts(&url("http://127.0.0.1:9000/raw/uploads/all/1_a.png")));
        assert!(api.trusts(&url("https://raw.test/octo/site/main/uploads/all/1_a.png")));
        assert!(!api.trusts(&url("https://elsewhere.test/octo/site/main/uploads/all/1_a.png")));
        assert!(!api.trusts(&url("http://raw.test/octo/site/main/uploads/all/1_a.png")));

        let bare = GithubApi::new("http://127.0.0.1:9000/api/v3").unwrap();
        assert!(!bare.trusts(&url("https://raw.test/octo/site/main/uploads/all/1_a.png")));
    }

    #[test]
    fn decode_ignores_line_wrapping() {
        let bytes = decode_content("aGVs\nbG8g\nd29y\nbGQ=\n").unwrap();
        assert_eq!(bytes, b"hello world");
        assert!(matches!(decode_content("!!"), Err(StoreError::Decode(_))));
    }
}
