use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};
use crate::settings::{ConnectionSettings, EffectiveSettings};
use crate::store::github::DEFAULT_API_BASE;
use crate::store::RetryPolicy;

pub const DEFAULT_RAW_HOST: &str = "https://raw.githubusercontent.com";
pub const LARGE_FILE_THRESHOLD_BYTES: u64 = 100 * 1024 * 1024;

/// Process-wide configuration. Every field can be overridden from the
/// environment (`REPOGALLERY_*`); persisted operator settings are layered on
/// top per request via [`GalleryConfig::effective`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GalleryConfig {
    /// Repository shown to visitors when the operator has not configured one.
    pub public_owner: String,
    pub public_repo: String,
    pub public_branch: String,

    pub api_base: String,
    /// Host serving raw file bytes, used to build media URLs.
    pub raw_host: String,

    pub request_timeout_ms: u64,
    /// Uploads at or above this size need explicit confirmation.
    pub large_file_threshold_bytes: u64,
    /// Applies to the sidecar metadata write only.
    pub metadata_retry: RetryPolicy,
}

impl Default for GalleryConfig {
    fn default() -> Self {
        Self {
            public_owner: String::new(),
            public_repo: String::new(),
            public_branch: "main".to_string(),
            api_base: DEFAULT_API_BASE.to_string(),
            raw_host: DEFAULT_RAW_HOST.to_string(),
            request_timeout_ms: 30_000,
            large_file_threshold_bytes: LARGE_FILE_THRESHOLD_BYTES,
            metadata_retry: RetryPolicy::default(),
        }
    }
}

impl GalleryConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|k| std::env::var(k).ok())
    }

    /// Defaults overlaid with whatever `lookup` returns for the known keys.
    /// Unparseable numbers keep the default.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut cfg = Self::default();
        let text = |k: &str| lookup(k).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let num = |k: &str| text(k).and_then(|v| v.parse::<u64>().ok());

        if let Some(v) = text("REPOGALLERY_PUBLIC_OWNER") { cfg.public_owner = v; }
        if let Some(v) = text("REPOGALLERY_PUBLIC_REPO") { cfg.public_repo = v; }
        if let Some(v) = text("REPOGALLERY_PUBLIC_BRANCH") { cfg.public_branch = v; }
        if let Some(v) = text("REPOGALLERY_API_BASE") { cfg.api_base = v; }
        if let Some(v) = text("REPOGALLERY_RAW_HOST") { cfg.raw_host = v; }
        if let Some(v) = num("REPOGALLERY_TIMEOUT_MS") { cfg.request_timeout_ms = v; }
        if let Some(v) = num("REPOGALLERY_LARGE_FILE_BYTES") { cfg.large_file_threshold_bytes = v; }
        if let Some(v) = num("REPOGALLERY_META_RETRY_ATTEMPTS") { cfg.metadata_retry.max_attempts = v as usize; }
        if let Some(v) = num("REPOGALLERY_META_RETRY_BACKOFF_MS") { cfg.metadata_retry.base_backoff_ms = v; }
        cfg
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    /// Build effective settings: operator values where set, public defaults otherwise.
    pub fn effective(&self, settings: &ConnectionSettings) -> EffectiveSettings {
        let pick = |own: &str, fallback: &str| {
            let own = own.trim();
            if own.is_empty() { fallback.to_string() } else { own.to_string() }
        };
        let token = settings.token.trim();
        EffectiveSettings {
            owner: pick(&settings.owner, &self.public_owner),
            repo: pick(&settings.repo, &self.public_repo),
            branch: pick(&settings.branch, &self.public_branch),
            token: if token.is_empty() { None } else { Some(token.to_string()) },
        }
    }

    /// Effective settings for a remote call. Errors, naming the environment
    /// variables to set, when no repository is known from either layer.
    pub fn target(&self, settings: &ConnectionSettings) -> AppResult<EffectiveSettings> {
        let eff = self.effective(settings);
        let mut missing = Vec::new();
        if eff.owner.is_empty() {
            missing.push("REPOGALLERY_PUBLIC_OWNER");
        }
        if eff.repo.is_empty() {
            missing.push("REPOGALLERY_PUBLIC_REPO");
        }
        if missing.is_empty() {
            return Ok(eff);
        }
        Err(AppError::internal(
            "repository_unconfigured".to_string(),
            format!("no gallery repository configured: set {} or save owner and repo in the operator settings", missing.join(" and ")),
        ))
    }
}

/// Fixed subdivision of the upload area.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    All,
    Toonboom,
}

impl Category {
    pub const EVERY: [Category; 2] = [Category::All, Category::Toonboom];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::All => "all",
            Category::Toonboom => "toonboom",
        }
    }

    /// Store directory holding this category's uploads.
    pub fn dir(&self) -> String {
        format!("{}/{}", crate::store::paths::UPLOADS_ROOT, self.as_str())
    }

    pub fn title(&self) -> &'static str {
        match self {
            Category::All => "All work",
            Category::Toonboom => "Toon Boom",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "all" => Ok(Category::All),
            "toonboom" | "toon" => Ok(Category::Toonboom),
            other => Err(format!("unknown category '{}' (expected one of: all, toonboom)", other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn env_overrides_apply() {
        let env: HashMap<&str, &str> = [
            ("REPOGALLERY_PUBLIC_OWNER", "octo"),
            ("REPOGALLERY_TIMEOUT_MS", "1500"),
            ("REPOGALLERY_LARGE_FILE_BYTES", "not a number"),
            ("REPOGALLERY_RAW_HOST", "   "),
        ]
        .into_iter()
        .collect();
        let cfg = GalleryConfig::from_lookup(|k| env.get(k).map(|v| v.to_string()));
        assert_eq!(cfg.public_owner, "octo");
        assert_eq!(cfg.request_timeout_ms, 1500);
        assert_eq!(cfg.large_file_threshold_bytes, LARGE_FILE_THRESHOLD_BYTES);
        assert_eq!(cfg.raw_host, DEFAULT_RAW_HOST);
    }

    #[test]
    fn operator_settings_override_public_defaults() {
        let cfg = GalleryConfig { public_owner: "pub".into(), public_repo: "site".into(), ..Default::default() };
        let eff = cfg.effective(&ConnectionSettings { owner: "me".into(), token: "  ".into(), ..Default::default() });
        assert_eq!(eff.owner, "me");
        assert_eq!(eff.repo, "site");
        assert_eq!(eff.branch, "main");
        assert_eq!(eff.token, None);
    }

    #[test]
    fn unconfigured_repository_names_the_variables() {
        let cfg = GalleryConfig::default();
        let err = cfg.target(&ConnectionSettings::default()).unwrap_err();
        assert_eq!(err.code_str(), "repository_unconfigured");
        assert!(err.message().contains("REPOGALLERY_PUBLIC_OWNER and REPOGALLERY_PUBLIC_REPO"));

        let err = cfg.target(&ConnectionSettings { owner: "me".into(), ..Default::default() }).unwrap_err();
        assert!(!err.message().contains("REPOGALLERY_PUBLIC_OWNER"));
        assert!(err.message().contains("REPOGALLERY_PUBLIC_REPO"));

        let cfg = GalleryConfig { public_owner: "pub".into(), public_repo: "site".into(), ..Default::default() };
        assert_eq!(cfg.target(&ConnectionSettings::default()).unwrap().owner, "pub");
    }

    #[test]
    fn categories_parse_and_map_to_dirs() {
        assert_eq!("ToonBoom".parse::<Category>().unwrap(), Category::Toonboom);
        assert_eq!(Category::All.dir(), "uploads/all");
        assert!("misc".parse::<Category>().is_err());
    }
}
