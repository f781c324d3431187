#![allow(dead_code)]

// In-process stand-in for the GitHub contents API, backed by MemoryContentApi.

use std::collections::HashMap;
use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use base64::Engine;
use parking_lot::Mutex;
use serde_json::json;
use tokio::task::JoinHandle;

use repogallery::settings::EffectiveSettings;
use repogallery::store::{ContentApi, MemoryContentApi, PutRequest, RemoteContents, StoreError};

#[derive(Debug, Clone)]
pub struct SeenRequest {
    pub method: String,
    pub path: String,
    pub branch: Option<String>,
    pub authorization: Option<String>,
    pub accept: Option<String>,
    pub user_agent: Option<String>,
    pub sha: Option<String>,
}

#[derive(Clone)]
struct FakeState {
    store: Arc<MemoryContentApi>,
    seen: Arc<Mutex<Vec<SeenRequest>>>,
}

pub struct FakeGithub {
    pub store: Arc<MemoryContentApi>,
    pub seen: Arc<Mutex<Vec<SeenRequest>>>,
    pub base_url: String,
    handle: JoinHandle<()>,
}

impl Drop for FakeGithub {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

fn header(headers: &HeaderMap, name: &str) -> Option<String> {
    headers.get(name).and_then(|v| v.to_str().ok()).map(str::to_string)
}

fn target(owner: &str, repo: &str, branch: &str, headers: &HeaderMap) -> EffectiveSettings {
    let token = header(headers, "authorization").and_then(|v| v.strip_prefix("Bearer ").map(str::to_string));
    EffectiveSettings { owner: owner.to_string(), repo: repo.to_string(), branch: branch.to_string(), token }
}

fn error_response(err: StoreError) -> Response {
    match err {
        StoreError::NotFound { .. } => (StatusCode::NOT_FOUND, Json(json!({"message": "Not Found"}))).into_response(),
        StoreError::RemoteRejected { status, message } => {
            let status = StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
            (status, Json(json!({"message": message}))).into_response()
        }
        other => (StatusCode::INTERNAL_SERVER_ERROR, Json(json!({"message": other.to_string()}))).into_response(),
    }
}

// The real API wraps base64 content at 60 columns.
fn wrapped_base64(bytes: &[u8]) -> String {
    let encoded = base64::engine::general_purpose::STANDARD.encode(bytes);
    let mut out = String::new();
    for chunk in encoded.as_bytes().chunks(60) {
        out.push_str(std::str::from_utf8(chunk).unwrap());
        out.push('\n');
    }
    out
}

async fn get_contents(
    State(state): State<FakeState>,
    Path((owner, repo, path)): Path<(String, String, String)>,
    Query(query): Query<HashMap<String, String>>,
    headers: HeaderMap,
) -> Response {
    let branch = query.get("ref").cloned();
    state.seen.lock().push(SeenRequest {
        method: "GET".into(),
        path: path.clone(),
        branch: branch.clone(),
        authorization: header(&headers, "authorization"),
        accept: header(&headers, "accept"),
        user_agent: header(&headers, "user-agent"),
        sha: None,
    });
    let t = target(&owner, &repo, branch.as_deref().unwrap_or("main"), &headers);
    match state.store.get_contents(&t, &path).await {
        Ok(RemoteContents::File(f)) => {
            let name = f.path.rsplit('/').next().unwrap_or_default().to_string();
            Json(json!({
                "type": "file",
                "name": name,
                "path": f.path,
                "sha": f.revision_id,
                "size": f.content.len(),
                "encoding": "base64",
                "content": wrapped_base64(&f.content),
                "download_url": f.download_url,
            }))
            .into_response()
        }
        Ok(RemoteContents::Dir(entries)) => Json(entries).into_response(),
        Err(e) => error_response(e),
    }
}

async fn put_contents(
    State(state): State<FakeState>,
    Path((owner, repo, path)): Path<(String, String, String)>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let request: PutRequest = match serde_json::from_slice(&body) {
        Ok(r) => r,
        Err(e) => return (StatusCode::BAD_REQUEST, Json(json!({"message": e.to_string()}))).into_response(),
    };
    state.seen.lock().push(SeenRequest {
        method: "PUT".into(),
        path: path.clone(),
        branch: Some(request.branch.clone()),
        authorization: header(&headers, "authorization"),
        accept: header(&headers, "accept"),
        user_agent: header(&headers, "user-agent"),
        sha: request.sha.clone(),
    });
    let t = target(&owner, &repo, &request.branch, &headers);
    match state.store.put_contents(&t, &path, &request).await {
        Ok(receipt) => {
            let status = if request.sha.is_some() { StatusCode::OK } else { StatusCode::CREATED };
            (
                status,
                Json(json!({
                    "content": {"path": receipt.path, "sha": receipt.revision_id},
                    "commit": {"sha": receipt.commit_id},
                })),
            )
                .into_response()
        }
        Err(e) => error_response(e),
    }
}

/// Serve the fake API on an ephemeral localhost port.
pub async fn start_fake_github(store: MemoryContentApi) -> FakeGithub {
    let store = Arc::new(store);
    let seen = Arc::new(Mutex::new(Vec::new()));
    let app = Router::new()
        .route("/api/v3/repos/{owner}/{repo}/contents/{*path}", get(get_contents).put(put_contents))
        .with_state(FakeState { store: store.clone(), seen: seen.clone() });

    let listener = tokio::net::TcpListener::bind(("127.0.0.1", 0)).await.expect("bind 127.0.0.1:0");
    let port = listener.local_addr().unwrap().port();
    let handle = tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            eprintln!("fake github server error: {e:?}");
        }
    });
    FakeGithub { store, seen, base_url: format!("http://127.0.0.1:{}/api/v3", port), handle }
}
