//! Local preferences: last server URL and per-model last-used timestamps.
//! Stored as a flat JSON key/value map under the XDG config dir:
//! $XDG_CONFIG_HOME/vllmtop/prefs.json (fallback ~/.config/vllmtop/prefs.json)

use serde_json::Value;
use std::{
    collections::{BTreeMap, HashMap},
    fs, io,
    path::PathBuf,
    sync::Mutex,
};

pub const SERVER_URL_KEY: &str = "server_url";
pub const MODEL_USAGE_PREFIX: &str = "model_usage_";

#[derive(Debug, thiserror::Error)]
pub enum PrefsError {
    #[error("preferences io: {0}")]
    Io(#[from] io::Error),
    #[error("preferences encode: {0}")]
    Json(#[from] serde_json::Error),
}

pub trait PreferenceStore: Send + Sync {
    fn server_url(&self) -> Option<String>;
    fn save_server_url(&self, url: &str) -> Result<(), PrefsError>;
    fn record_model_usage(&self, model_id: &str, ts_ms: i64) -> Result<(), PrefsError>;
    fn model_usage(&self) -> HashMap<String, i64>;
}

pub fn config_dir() -> PathBuf {
    if let Some(xdg) = std::env::var_os("XDG_CONFIG_HOME") {
        PathBuf::from(xdg).join("vllmtop")
    } else {
        dirs_next::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("vllmtop")
    }
}

pub fn prefs_path() -> PathBuf {
    config_dir().join("prefs.json")
}

fn usage_key(model_id: &str) -> String {
    format!("{MODEL_USAGE_PREFIX}{model_id}")
}

fn usage_from_map(map: &BTreeMap<String, Value>) -> HashMap<String, i64> {
    map.range(MODEL_USAGE_PREFIX.to_string()..)
        .take_while(|(k, _)| k.starts_with(MODEL_USAGE_PREFIX))
        .filter_map(|(k, v)| Some((k[MODEL_USAGE_PREFIX.len()..].to_string(), v.as_i64()?)))
        .collect()
}

/// JSON-file backed store. Every write rewrites the whole file.
pub struct FilePrefs {
    path: PathBuf,
    map: Mutex<BTreeMap<String, Value>>,
}

impl FilePrefs {
    pub fn open_default() -> Self {
        Self::open(prefs_path())
    }

    /// Missing or unreadable files start empty.
    pub fn open(path: PathBuf) -> Self {
        let map = match fs::read_to_string(&path) {
            Ok(s) => serde_json::from_str(&s).unwrap_or_else(|e| {
                tracing::warn!(path = %path.display(), error = %e, "ignoring corrupt preferences");
                BTreeMap::new()
            }),
            Err(_) => BTreeMap::new(),
        };
        Self {
            path,
            map: Mutex::new(map),
        }
    }

    pub fn path(&self) -> &PathBuf {
        &self.path
    }

    fn set(&self, key: String, value: Value) -> Result<(), PrefsError> {
        let mut map = self.map.lock().unwrap_or_else(|p| p.into_inner());
        map.insert(key, value);
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let data = serde_json::to_vec_pretty(&*map)?;
        fs::write(&self.path, data)?;
        Ok(())
    }

    fn get(&self, key: &str) -> Option<Value> {
        let map = self.map.lock().unwrap_or_else(|p| p.into_inner());
        map.get(key).cloned()
    }
}

impl PreferenceStore for FilePrefs {
    fn server_url(&self) -> Option<String> {
        self.get(SERVER_URL_KEY)
            .and_then(|v| v.as_str().map(str::to_string))
    }

    fn save_server_url(&self, url: &str) -> Result<(), PrefsError> {
        self.set(SERVER_URL_KEY.to_string(), Value::from(url))
    }

    fn record_model_usage(&self, model_id: &str, ts_ms: i64) -> Result<(), PrefsError> {
        self.set(usage_key(model_id), Value::from(ts_ms))
    }

    fn model_usage(&self) -> HashMap<String, i64> {
        let map = self.map.lock().unwrap_or_else(|p| p.into_inner());
        usage_from_map(&map)
    }
}

/// Process-local store; nothing survives a restart.
#[derive(Default)]
pub struct MemoryPrefs {
    map: Mutex<BTreeMap<String, Value>>,
}

impl MemoryPrefs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_usage(usage: &[(&str, i64)]) -> Self {
        let map = usage
            .iter()
            .map(|(id, ts)| (usage_key(id), Value::from(*ts)))
            .collect();
        Self {
            map: Mutex::new(map),
        }
    }
}

impl PreferenceStore for MemoryPrefs {
    fn server_url(&self) -> Option<String> {
        let map = self.map.lock().unwrap_or_else(|p| p.into_inner());
        map.get(SERVER_URL_KEY)
            .and_then(|v| v.as_str().map(str::to_string))
    }

    fn save_server_url(&self, url: &str) -> Result<(), PrefsError> {
        let mut map = self.map.lock().unwrap_or_else(|p| p.into_inner());
        map.insert(SERVER_URL_KEY.to_string(), Value::from(url));
        Ok(())
    }

    fn record_model_usage(&self, model_id: &str, ts_ms: i64) -> Result<(), PrefsError> {
        let mut map = self.map.lock().unwrap_or_else(|p| p.into_inner());
        map.insert(usage_key(model_id), Value::from(ts_ms));
        Ok(())
    }

    fn model_usage(&self) -> HashMap<String, i64> {
        let map = self.map.lock().unwrap_or_else(|p| p.into_inner());
        usage_from_map(&map)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn usage_scan_only_sees_prefixed_keys() {
        let p = MemoryPrefs::with_usage(&[("a", 100), ("b", 50)]);
        p.save_server_url("http://h:9090").unwrap();
        let usage = p.model_usage();
        assert_eq!(usage.len(), 2);
        assert_eq!(usage["a"], 100);
        assert_eq!(usage["b"], 50);
        assert_eq!(p.server_url().as_deref(), Some("http://h:9090"));
    }

    #[test]
    fn non_integer_usage_values_are_skipped() {
        let mut map = BTreeMap::new();
        map.insert("model_usage_ok".to_string(), Value::from(7));
        map.insert("model_usage_bad".to_string(), Value::from("soon"));
        map.insert("zzz".to_string(), Value::from(1));
        let usage = usage_from_map(&map);
        assert_eq!(usage.len(), 1);
        assert_eq!(usage["ok"], 7);
    }

    #[test]
    fn model_ids_keep_their_own_underscores() {
        let p = MemoryPrefs::new();
        p.record_model_usage("llama_3_70b", 1).unwrap();
        assert!(p.model_usage().contains_key("llama_3_70b"));
    }
}
