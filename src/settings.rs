//! Operator settings: connection parameters and the cached about text, kept in
//! a local key/value file behind the `KvAdapter` seam.

use std::collections::BTreeMap;
use std::io;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

pub const KEY_OWNER: &str = "gh_owner";
pub const KEY_REPO: &str = "gh_repo";
pub const KEY_BRANCH: &str = "gh_branch";
pub const KEY_TOKEN: &str = "gh_token";
pub const KEY_ABOUT: &str = "about_text";

const CONNECTION_KEYS: [&str; 4] = [KEY_OWNER, KEY_REPO, KEY_BRANCH, KEY_TOKEN];

/// Persistent string key/value storage.
pub trait KvAdapter: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: &str) -> io::Result<()>;
    fn clear(&self, key: &str) -> io::Result<()>;
}

/// Volatile adapter for tests and one-off runs.
#[derive(Default)]
pub struct MemoryKv {
    map: RwLock<BTreeMap<String, String>>,
}

impl MemoryKv {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KvAdapter for MemoryKv {
    fn get(&self, key: &str) -> Option<String> {
        self.map.read().get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) -> io::Result<()> {
        self.map.write().insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn clear(&self, key: &str) -> io::Result<()> {
        self.map.write().remove(key);
        Ok(())
    }
}

/// Modification time and length of the settings file, `None` when absent.
type FileStamp = Option<(SystemTime, u64)>;

fn stamp_of(path: &Path) -> FileStamp {
    let meta = std::fs::metadata(path).ok()?;
    Some((meta.modified().ok()?, meta.len()))
}

/// Unreadable or corrupt files are logged and read as empty.
fn read_map(path: &Path) -> BTreeMap<String, String> {
    match std::fs::read(path) {
        Ok(bytes) => serde_json::from_slice::<BTreeMap<String, String>>(&bytes).unwrap_or_else(|e| {
            warn!(target: "repogallery::settings", "ignoring unreadable settings file {}: {}", path.display(), e);
            BTreeMap::new()
        }),
        Err(e) if e.kind() == io::ErrorKind::NotFound => BTreeMap::new(),
        Err(e) => {
            warn!(target: "repogallery::settings", "cannot read settings file {}: {}", path.display(), e);
            BTreeMap::new()
        }
    }
}

struct Snapshot {
    stamp: FileStamp,
    map: BTreeMap<String, String>,
}

/// JSON object file on disk. The whole map is rewritten on every change
/// through a temp file and rename. Reads pick up changes made by other
/// processes (e.g. the CLI saving while the viewer runs).
pub struct FileKv {
    path: PathBuf,
    state: RwLock<Snapshot>,
}

impl FileKv {
    /// Open (or lazily create) the settings file.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let stamp = stamp_of(&path);
        let map = read_map(&path);
        Self { path, state: RwLock::new(Snapshot { stamp, map }) }
    }

    /// Reload the snapshot when the file on disk changed since it was taken.
    fn refresh(&self) {
        let current = stamp_of(&self.path);
        if self.state.read().stamp == current {
            return;
        }
        let mut state = self.state.write();
        if state.stamp == current {
            return;
        }
        debug!(target: "repogallery::settings", "settings file {} changed on disk, reloading", self.path.display());
        state.map = read_map(&self.path);
        state.stamp = current;
    }

    fn persist(&self, map: &BTreeMap<String, String>) -> io::Result<()> {
        if let Some(dir) = self.path.parent() {
            if !dir.as_os_str().is_empty() {
                std::fs::create_dir_all(dir)?;
            }
        }
        let bytes = serde_json::to_vec_pretty(map).map_err(io::Error::other)?;
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, bytes)?;
        std::fs::rename(&tmp, &self.path)
    }
}

impl KvAdapter for FileKv {
    fn get(&self, key: &str) -> Option<String> {
        self.refresh();
        self.state.read().map.get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) -> io::Result<()> {
        self.refresh();
        let mut state = self.state.write();
        state.map.insert(key.to_string(), value.to_string());
        self.persist(&state.map)?;
        state.stamp = stamp_of(&self.path);
        Ok(())
    }

    fn clear(&self, key: &str) -> io::Result<()> {
        self.refresh();
        let mut state = self.state.write();
        if state.map.remove(key).is_some() {
            self.persist(&state.map)?;
            state.stamp = stamp_of(&self.path);
        }
        Ok(())
    }
}

/// Default settings file: `$HOME/.repogallery/settings.json`, or the
/// working directory when no home is known.
pub fn default_settings_path() -> PathBuf {
    let home = std::env::var("HOME").or_else(|_| std::env::var("USERPROFILE")).ok();
    match home {
        Some(h) => PathBuf::from(h).join(".repogallery").join("settings.json"),
        None => PathBuf::from(".repogallery").join("settings.json"),
    }
}

/// Connection parameters as entered by the operator. Empty string means unset.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionSettings {
    pub owner: String,
    pub repo: String,
    pub branch: String,
    pub token: String,
}

/// Connection parameters a request actually runs with: unset fields filled
/// from the public defaults, token only when the operator provided one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EffectiveSettings {
    pub owner: String,
    pub repo: String,
    pub branch: String,
    #[serde(skip)]
    pub token: Option<String>,
}

pub struct SettingsStore<K> {
    kv: K,
}

impl<K: KvAdapter> SettingsStore<K> {
    pub fn new(kv: K) -> Self {
        Self { kv }
    }

    pub fn load(&self) -> ConnectionSettings {
        let get = |k: &str| self.kv.get(k).unwrap_or_default();
        ConnectionSettings {
            owner: get(KEY_OWNER),
            repo: get(KEY_REPO),
            branch: get(KEY_BRANCH),
            token: get(KEY_TOKEN),
        }
    }

    /// Persist every field, trimmed. Storage failures are logged and otherwise ignored.
    pub fn save(&self, settings: &ConnectionSettings) {
        let fields = [
            (KEY_OWNER, &settings.owner),
            (KEY_REPO, &settings.repo),
            (KEY_BRANCH, &settings.branch),
            (KEY_TOKEN, &settings.token),
        ];
        for (key, value) in fields {
            if let Err(e) = self.kv.set(key, value.trim()) {
                warn!(target: "repogallery::settings", "could not persist '{}': {}", key, e);
            }
        }
        debug!(target: "repogallery::settings", "settings saved (owner='{}', repo='{}', branch='{}')", settings.owner.trim(), settings.repo.trim(), settings.branch.trim());
    }

    pub fn clear(&self) {
        for key in CONNECTION_KEYS {
            if let Err(e) = self.kv.clear(key) {
                warn!(target: "repogallery::settings", "could not clear '{}': {}", key, e);
            }
        }
    }

    pub fn cached_about(&self) -> Option<String> {
        self.kv.get(KEY_ABOUT)
    }

    pub fn cache_about(&self, text: &str) {
        if let Err(e) = self.kv.set(KEY_ABOUT, text) {
            warn!(target: "repogallery::settings", "could not cache about text: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn load_defaults_to_empty_strings() {
        let store = SettingsStore::new(MemoryKv::new());
        assert_eq!(store.load(), ConnectionSettings::default());
    }

    #[test]
    fn save_trims_and_clear_removes() {
        let store = SettingsStore::new(MemoryKv::new());
        store.save(&ConnectionSettings {
            owner: " octo ".into(),
            repo: "site".into(),
            branch: "main\n".into(),
            token: " t0k ".into(),
        });
        let loaded = store.load();
        assert_eq!(loaded.owner, "octo");
        assert_eq!(loaded.branch, "main");
        assert_eq!(loaded.token, "t0k");

        store.cache_about("hello");
        store.clear();
        assert_eq!(store.load(), ConnectionSettings::default());
        // about cache is not a connection field
        assert_eq!(store.cached_about().as_deref(), Some("hello"));
    }

    #[test]
    fn file_kv_persists_across_opens() {
        let tmp = tempdir().unwrap();
        let path = tmp.path().join("nested").join("settings.json");
        {
            let store = SettingsStore::new(FileKv::open(&path));
            store.save(&ConnectionSettings { owner: "o".into(), repo: "r".into(), branch: "b".into(), token: "t".into() });
        }
        let reopened = SettingsStore::new(FileKv::open(&path));
        assert_eq!(reopened.load().repo, "r");
        assert_eq!(reopened.load().token, "t");
    }

    #[test]
    fn file_kv_sees_saves_from_another_handle() {
        let tmp = tempdir().unwrap();
        let path = tmp.path().join("settings.json");
        let viewer = SettingsStore::new(FileKv::open(&path));
        assert_eq!(viewer.load().owner, "");

        let cli = SettingsStore::new(FileKv::open(&path));
        cli.save(&ConnectionSettings { owner: "octo".into(), repo: "site".into(), ..Default::default() });
        assert_eq!(viewer.load().owner, "octo");
        assert_eq!(viewer.load().repo, "site");

        // a write through the stale handle keeps the other handle's fields
        viewer.cache_about("hello");
        assert_eq!(cli.cached_about().as_deref(), Some("hello"));
        assert_eq!(cli.load().owner, "octo");

        cli.clear();
        assert_eq!(viewer.load(), ConnectionSettings::default());
    }

    #[test]
    fn corrupt_file_is_treated_as_empty() {
        let tmp = tempdir().unwrap();
        let path = tmp.path().join("settings.json");
        std::fs::write(&path, b"{not json").unwrap();
        let store = SettingsStore::new(FileKv::open(&path));
        assert_eq!(store.load(), ConnectionSettings::default());
    }

    #[test]
    fn unwritable_storage_is_not_fatal() {
        let tmp = tempdir().unwrap();
        // a directory where the file should be makes every persist fail
        let path = tmp.path().join("settings.json");
        std::fs::create_dir_all(&path).unwrap();
        let store = SettingsStore::new(FileKv::open(&path));
        store.save(&ConnectionSettings { owner: "o".into(), ..Default::default() });
        // the in-memory view still reflects the save
        assert_eq!(store.load().owner, "o");
    }
}
