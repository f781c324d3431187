//! Gallery renderer: turns a category listing into viewable items.
//!
//! Sidecar metadata entries (`meta_*`) are never shown. Each media entry is
//! paired with exactly `meta_<media-name>.json` when that entry is present in
//! the same listing; a missing or unreadable sidecar just means no description.

use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info};

use crate::config::{Category, GalleryConfig};
use crate::settings::EffectiveSettings;
use crate::store::paths::{is_metadata_name, metadata_name_for, timestamp_prefix};
use crate::store::{ContentApi, ContentClient, DirEntry};
use crate::upload::MetadataRecord;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Video,
    Image,
    Link,
}

/// Classify by extension, case-insensitively.
pub fn classify(name: &str) -> MediaKind {
    let ext = name.rsplit_once('.').map(|(_, e)| e.to_ascii_lowercase()).unwrap_or_default();
    match ext.as_str() {
        "mp4" | "webm" | "ogg" => MediaKind::Video,
        "jpg" | "jpeg" | "png" | "gif" => MediaKind::Image,
        _ => MediaKind::Link,
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GalleryItem {
    pub name: String,
    pub path: String,
    pub kind: MediaKind,
    pub url: String,
    pub description: Option<String>,
    pub uploaded_at: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Gallery {
    pub category: Category,
    pub items: Vec<GalleryItem>,
}

impl Gallery {
    pub fn empty(category: Category) -> Self {
        Self { category, items: Vec::new() }
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Newest upload first. Timestamped names order by their numeric prefix, ties
/// by name descending; names without a prefix come last, by name descending.
pub fn newest_first(a: &str, b: &str) -> Ordering {
    match (timestamp_prefix(a), timestamp_prefix(b)) {
        (Some(x), Some(y)) => y.cmp(&x).then_with(|| b.cmp(a)),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => b.cmp(a),
    }
}

/// Media entries of a listing in display order.
pub fn media_entries(entries: &[DirEntry]) -> Vec<&DirEntry> {
    let mut media: Vec<&DirEntry> = entries
        .iter()
        .filter(|e| e.is_file() && !is_metadata_name(&e.name))
        .collect();
    media.sort_by(|a, b| newest_first(&a.name, &b.name));
    media
}

/// `<raw-host>/<owner>/<repo>/<branch>/<path>`
pub fn raw_url(raw_host: &str, target: &EffectiveSettings, path: &str) -> String {
    format!(
        "{}/{}/{}/{}/{}",
        raw_host.trim_end_matches('/'),
        target.owner,
        target.repo,
        target.branch,
        crate::store::paths::encode_path(path)
    )
}

pub struct GalleryRenderer<A> {
    client: Arc<ContentClient<A>>,
    raw_host: String,
}

impl<A: ContentApi> GalleryRenderer<A> {
    pub fn new(client: Arc<ContentClient<A>>, config: &GalleryConfig) -> Self {
        Self { client, raw_host: config.raw_host.clone() }
    }

    pub async fn render(&self, category: Category) -> Gallery {
        let listing = self.client.read_directory(&category.dir()).await;
        if listing.is_empty() {
            debug!(target: "repogallery::gallery", "category '{}' is empty", category);
            return Gallery::empty(category);
        }

        let by_name: HashMap<&str, &DirEntry> = listing
            .iter()
            .filter(|e| e.is_file())
            .map(|e| (e.name.as_str(), e))
            .collect();

        let mut items = Vec::new();
        for entry in media_entries(&listing) {
            let record = match by_name.get(metadata_name_for(&entry.name).as_str()) {
                Some(sidecar) => self.read_metadata(sidecar).await,
                None => None,
            };
            let (description, uploaded_at) = match record {
                Some(r) => (non_empty(r.description), non_empty(r.uploaded_at)),
                None => (None, None),
            };
            items.push(GalleryItem {
                name: entry.name.clone(),
                path: entry.path.clone(),
                kind: classify(&entry.name),
                url: entry
                    .download_url
                    .clone()
                    .unwrap_or_else(|| raw_url(&self.raw_host, self.client.target(), &entry.path)),
                description,
                uploaded_at,
            });
        }
        info!(target: "repogallery::gallery", "rendered {} item(s) for '{}'", items.len(), category);
        Gallery { category, items }
    }

    async fn read_metadata(&self, sidecar: &DirEntry) -> Option<MetadataRecord> {
        let text = match self.client.read_text(&sidecar.path).await {
            Ok(t) => t,
            Err(e) => {
                debug!(target: "repogallery::gallery", "sidecar {} unreadable: {}", sidecar.path, e);
                return None;
            }
        };
        match serde_json::from_str::<MetadataRecord>(&text) {
            Ok(r) => Some(r),
            Err(e) => {
                debug!(target: "repogallery::gallery", "sidecar {} is not valid metadata: {}", sidecar.path, e);
                None
            }
        }
    }
}

fn non_empty(s: String) -> Option<String> {
    let t = s.trim();
    if t.is_empty() { None } else { Some(t.to_string()) }
}

pub fn html_escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#x27;")
}

/// HTML fragment for one gallery section.
pub fn render_html(gallery: &Gallery) -> String {
    let mut out = format!(
        "<section class=\"gallery\" id=\"gallery-{}\">\n<h2>{}</h2>\n",
        gallery.category.as_str(),
        html_escape(gallery.category.title())
    );
    if gallery.is_empty() {
        out.push_str("<p class=\"empty\">Nothing here yet.</p>\n");
    }
    for item in &gallery.items {
        let url = html_escape(&item.url);
        out.push_str("<div class=\"item\">\n");
        match item.kind {
            MediaKind::Video => out.push_str(&format!("<video controls style=\"width:100%\" src=\"{}\"></video>\n", url)),
            MediaKind::Image => out.push_str(&format!("<img src=\"{}\" alt=\"{}\">\n", url, html_escape(&item.name))),
            MediaKind::Link => out.push_str(&format!("<a href=\"{}\">{}</a>\n", url, html_escape(&item.name))),
        }
        if let Some(desc) = &item.description {
            out.push_str(&format!("<p class=\"desc\">{}</p>\n", html_escape(desc)));
        }
        out.push_str("</div>\n");
    }
    out.push_str("</section>\n");
    out
}
