//! Persisted key/value flags

use crate::core::Result;
use parking_lot::Mutex;
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};

/// A small string key/value store that outlives the process
pub trait FlagStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>>;

    fn set(&self, key: &str, value: &str) -> Result<()>;
}

/// Process-local store. Nothing survives a restart.
#[derive(Debug, Default)]
pub struct MemoryFlagStore {
    flags: Mutex<HashMap<String, String>>,
}

impl MemoryFlagStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl FlagStore for MemoryFlagStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.flags.lock().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.flags.lock().insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// Flags stored as a JSON object in a file
///
/// The file is read once, on first access; writes go straight through so
/// the next process sees them.
///
/// # Example
///
/// ```no_run
/// use client_telemetry::live::{FileFlagStore, FlagStore};
///
/// let store = FileFlagStore::new("/var/lib/myapp/flags.json");
/// store.set("sm.live_logs", "1").unwrap();
/// ```
#[derive(Debug)]
pub struct FileFlagStore {
    path: PathBuf,
    cache: Mutex<Option<BTreeMap<String, String>>>,
}

impl FileFlagStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            cache: Mutex::new(None),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> Result<BTreeMap<String, String>> {
        match fs::read(&self.path) {
            Ok(bytes) if bytes.is_empty() => Ok(BTreeMap::new()),
            Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(BTreeMap::new()),
            Err(e) => Err(e.into()),
        }
    }

    fn persist(&self, flags: &BTreeMap<String, String>) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        fs::write(&self.path, serde_json::to_vec_pretty(flags)?)?;
        Ok(())
    }
}

impl FlagStore for FileFlagStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let mut cache = self.cache.lock();
        if cache.is_none() {
            *cache = Some(self.load()?);
        }
        Ok(cache.as_ref().and_then(|flags| flags.get(key).cloned()))
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let mut cache = self.cache.lock();
        let mut flags = match cache.take() {
            Some(flags) => flags,
            None => self.load()?,
        };
        flags.insert(key.to_string(), value.to_string());

        let written = self.persist(&flags);
        *cache = Some(flags);
        written
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_memory_store() {
        let store = MemoryFlagStore::new();
        assert_eq!(store.get("sm.live_logs").unwrap(), None);

        store.set("sm.live_logs", "1").unwrap();
        assert_eq!(store.get("sm.live_logs").unwrap().as_deref(), Some("1"));
    }

    #[test]
    fn test_file_store_survives_reopen() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("nested").join("flags.json");

        let store = FileFlagStore::new(&path);
        assert_eq!(store.get("sm.live_logs").unwrap(), None);
        store.set("sm.live_logs", "1").unwrap();
        store.set("other", "x").unwrap();

        let reopened = FileFlagStore::new(&path);
        assert_eq!(reopened.get("sm.live_logs").unwrap().as_deref(), Some("1"));
        assert_eq!(reopened.get("other").unwrap().as_deref(), Some("x"));
    }

    #[test]
    fn test_file_store_rejects_garbage() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("flags.json");
        fs::write(&path, b"not json").unwrap();

        let store = FileFlagStore::new(&path);
        assert!(store.get("sm.live_logs").is_err());
    }
}
