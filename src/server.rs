//!
//! repogallery visitor viewer
//! --------------------------
//! Axum-based read-only HTTP front for the gallery. Every request reads the
//! current operator settings, layers them over the configured public defaults
//! and renders straight from the content store. No route writes to the store.
//! With no repository known from either layer, content routes answer 500
//! `repository_unconfigured`.
//!
//! Routes:
//! - `GET /` HTML page with both galleries and the about text.
//! - `GET /api/gallery/{category}` gallery items as JSON.
//! - `GET /api/about` about text and where it came from.
//! - `GET /health`

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use axum::{routing::get, Json, Router};
use tracing::{info, warn};

use crate::about::{AboutDocument, AboutText};
use crate::config::{Category, GalleryConfig};
use crate::error::{AppError, AppResult};
use crate::gallery::{html_escape, render_html, Gallery, GalleryRenderer};
use crate::settings::{FileKv, KvAdapter, SettingsStore};
use crate::store::{ContentApi, ContentClient, GithubApi};

pub const DEFAULT_HTTP_PORT: u16 = 7878;

/// Shared state injected into all handlers.
pub struct ViewerState<A, K> {
    pub api: A,
    pub settings: Arc<SettingsStore<K>>,
    pub config: Arc<GalleryConfig>,
}

impl<A: Clone, K> Clone for ViewerState<A, K> {
    fn clone(&self) -> Self {
        Self { api: self.api.clone(), settings: self.settings.clone(), config: self.config.clone() }
    }
}

impl<A: ContentApi + Clone, K: KvAdapter> ViewerState<A, K> {
    pub fn new(api: A, settings: SettingsStore<K>, config: GalleryConfig) -> Self {
        Self { api, settings: Arc::new(settings), config: Arc::new(config) }
    }

    /// Client for one request. Visitors read anonymously, so a stored token is
    /// never used here.
    fn client(&self) -> AppResult<Arc<ContentClient<A>>> {
        let mut target = self.config.target(&self.settings.load())?;
        target.token = None;
        Ok(Arc::new(ContentClient::new(self.api.clone(), target, self.config.request_timeout())))
    }

    fn renderer(&self) -> AppResult<GalleryRenderer<A>> {
        Ok(GalleryRenderer::new(self.client()?, &self.config))
    }

    fn about(&self) -> AppResult<AboutDocument<A, K>> {
        Ok(AboutDocument::new(self.client()?, self.settings.clone()))
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(self)).into_response()
    }
}

pub fn router<A, K>(state: ViewerState<A, K>) -> Router
where
    A: ContentApi + Clone + 'static,
    K: KvAdapter + 'static,
{
    Router::new()
        .route("/", get(index::<A, K>))
        .route("/health", get(|| async { Json(serde_json::json!({"status": "ok"})) }))
        .route("/api/gallery/{category}", get(gallery_json::<A, K>))
        .route("/api/about", get(about_json::<A, K>))
        .with_state(state)
}

async fn gallery_json<A, K>(
    State(state): State<ViewerState<A, K>>,
    Path(category): Path<String>,
) -> Result<Json<Gallery>, AppError>
where
    A: ContentApi + Clone + 'static,
    K: KvAdapter + 'static,
{
    let category: Category = category
        .parse()
        .map_err(|e: String| AppError::not_found("unknown_category".to_string(), e))?;
    Ok(Json(state.renderer()?.render(category).await))
}

async fn about_json<A, K>(State(state): State<ViewerState<A, K>>) -> Result<Json<AboutText>, AppError>
where
    A: ContentApi + Clone + 'static,
    K: KvAdapter + 'static,
{
    Ok(Json(state.about()?.load().await))
}

async fn index<A, K>(State(state): State<ViewerState<A, K>>) -> Result<Html<String>, AppError>
where
    A: ContentApi + Clone + 'static,
    K: KvAdapter + 'static,
{
    let renderer = state.renderer()?;
    let mut sections = String::new();
    for category in Category::EVERY {
        sections.push_str(&render_html(&renderer.render(category).await));
    }
    let about = state.about()?.load().await;
    Ok(Html(page(&about.text, &sections)))
}

fn page(about: &str, sections: &str) -> String {
    format!(
        "<!doctype html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n<title>Gallery</title>\n\
         <style>.item{{margin:1em 0}} .item img{{max-width:100%}} .desc{{color:#555}}</style>\n\
         </head>\n<body>\n<section class=\"about\">\n<h2>About</h2>\n<p id=\"aboutText\">{}</p>\n</section>\n{}</body>\n</html>\n",
        html_escape(about),
        sections
    )
}

pub async fn serve(listener: tokio::net::TcpListener, app: Router) -> anyhow::Result<()> {
    axum::serve(listener, app).await?;
    Ok(())
}

/// Start the viewer bound to `http_port`, reading operator settings from `settings_path`.
pub async fn run_with_port(http_port: u16, settings_path: std::path::PathBuf) -> anyhow::Result<()> {
    let config = GalleryConfig::from_env();
    let api = GithubApi::new(&config.api_base)
        .and_then(|api| api.with_raw_host(&config.raw_host))
        .with_context(|| format!("invalid content API base '{}' or raw host '{}'", config.api_base, config.raw_host))?;
    info!(
        target: "repogallery::server",
        "viewer config: api_base={}, raw_host={}, public={}/{}@{}, settings={}",
        config.api_base, config.raw_host, config.public_owner, config.public_repo, config.public_branch, settings_path.display()
    );
    let settings = SettingsStore::new(FileKv::open(settings_path));
    if let Err(e) = config.target(&settings.load()) {
        warn!(target: "repogallery::server", "{}", e);
    }
    let app = router(ViewerState::new(api, settings, config));

    let addr: SocketAddr = format!("0.0.0.0:{}", http_port).parse()?;
    info!(target: "repogallery::server", "Starting viewer on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    serve(listener, app).await
}
