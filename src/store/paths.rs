//! Store path rules and the upload naming scheme.
//!
//! Media lives at `uploads/<category>/<timestamp>_<name>` and its sidecar at
//! `uploads/<category>/meta_<timestamp>_<name>.json`.

use once_cell::sync::Lazy;
use regex::Regex;
use unicode_normalization::UnicodeNormalization;

use super::error::StoreError;

pub const UPLOADS_ROOT: &str = "uploads";
pub const METADATA_PREFIX: &str = "meta_";
pub const METADATA_SUFFIX: &str = ".json";

static WHITESPACE_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("static regex"));
static TIMESTAMP_PREFIX: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(\d+)_").expect("static regex"));

/// Normalize a UTF-8 string to NFC.
pub fn normalize_nfc(input: &str) -> String {
    input.nfc().collect::<String>()
}

/// Validate a store path:
/// - segments separated by '/', no empty segments, no leading or trailing '/'
/// - no NUL characters
/// - no '.' or '..' segments
pub fn validate_store_path(path: &str) -> Result<(), StoreError> {
    if path.is_empty() {
        return Err(StoreError::InvalidPath("store path cannot be empty".into()));
    }
    if path.contains('\u{0000}') {
        return Err(StoreError::InvalidPath("store path cannot contain NUL characters".into()));
    }
    if path.starts_with('/') || path.ends_with('/') {
        return Err(StoreError::InvalidPath(format!("leading or trailing '/' in '{}'", path)));
    }
    for seg in path.split('/') {
        if seg.is_empty() {
            return Err(StoreError::InvalidPath(format!("empty segment in '{}'", path)));
        }
        if seg == "." || seg == ".." {
            return Err(StoreError::InvalidPath(format!("dot segment in '{}'", path)));
        }
    }
    Ok(())
}

/// Original file name made safe for a store path: NFC-normalized, whitespace
/// runs collapsed to a single '_', and '/' replaced so the name stays one segment.
pub fn sanitize_file_name(name: &str) -> String {
    let nfc = normalize_nfc(name.trim());
    let collapsed = WHITESPACE_RUN.replace_all(&nfc, "_");
    collapsed.replace(['/', '\\'], "_")
}

/// Last segment of a store path.
pub fn basename(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

pub fn join(dir: &str, name: &str) -> String {
    if dir.is_empty() {
        name.to_string()
    } else {
        format!("{}/{}", dir.trim_end_matches('/'), name)
    }
}

/// `<timestamp>_<safe-name>`
pub fn media_file_name(timestamp_ms: i64, safe_name: &str) -> String {
    format!("{}_{}", timestamp_ms, safe_name)
}

/// Sidecar name for a media file name: `meta_<media-name>.json`.
pub fn metadata_name_for(media_name: &str) -> String {
    format!("{}{}{}", METADATA_PREFIX, media_name, METADATA_SUFFIX)
}

pub fn is_metadata_name(name: &str) -> bool {
    name.starts_with(METADATA_PREFIX)
}

/// Numeric upload timestamp encoded at the start of a media name, if any.
pub fn timestamp_prefix(name: &str) -> Option<u64> {
    TIMESTAMP_PREFIX
        .captures(name)
        .and_then(|c| c.get(1))
        .and_then(|m| m.as_str().parse::<u64>().ok())
}

/// Percent-encode each segment of a store path for use in a URL.
pub fn encode_path(path: &str) -> String {
    path.split('/')
        .map(|seg| urlencoding::encode(seg).into_owned())
        .collect::<Vec<_>>()
        .join("/")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitize_collapses_whitespace() {
        assert_eq!(sanitize_file_name("my cat  video.mp4"), "my_cat_video.mp4");
        assert_eq!(sanitize_file_name("tab\tname.png"), "tab_name.png");
        assert_eq!(sanitize_file_name("a/b.png"), "a_b.png");
    }

    #[test]
    fn sanitize_normalizes_to_nfc() {
        let s = "Cafe\u{0301} photo.jpg";
        assert_eq!(sanitize_file_name(s), "Caf\u{e9}_photo.jpg");
    }

    #[test]
    fn invalid_paths_are_rejected() {
        assert!(validate_store_path("").is_err());
        assert!(validate_store_path("/leading").is_err());
        assert!(validate_store_path("trailing/").is_err());
        assert!(validate_store_path("double//slash").is_err());
        assert!(validate_store_path("a/../b").is_err());
        assert!(validate_store_path("uploads/all/171_cat.png").is_ok());
    }

    #[test]
    fn sidecar_names_and_timestamps() {
        assert_eq!(metadata_name_for("171_cat.png"), "meta_171_cat.png.json");
        assert!(is_metadata_name("meta_171_cat.png.json"));
        assert!(!is_metadata_name("171_cat.png"));
        assert_eq!(timestamp_prefix("1700000000123_cat.png"), Some(1_700_000_000_123));
        assert_eq!(timestamp_prefix("cat.png"), None);
        assert_eq!(timestamp_prefix("123cat.png"), None);
    }

    #[test]
    fn encode_keeps_separators() {
        assert_eq!(encode_path("uploads/all/1_a b.png"), "uploads/all/1_a%20b.png");
        assert_eq!(basename("uploads/all/1_a.png"), "1_a.png");
        assert_eq!(join("uploads/all", "x"), "uploads/all/x");
    }
}
