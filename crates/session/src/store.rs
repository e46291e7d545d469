use crate::error::StoreError;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};
use tracing::{debug, warn};

pub const KEEP_LOGGED_IN_KEY: &str = "keepLoggedIn";
pub const LAST_ACTIVITY_KEY: &str = "lastActivity";

/// Durable key-value storage for session preferences. Last write wins.
pub trait PreferenceStore: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;

    /// # Errors
    ///
    /// Returns an error if the value cannot be persisted.
    fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;

    /// # Errors
    ///
    /// Returns an error if the removal cannot be persisted.
    fn remove(&self, key: &str) -> Result<(), StoreError>;
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    values: Mutex<BTreeMap<String, String>>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, BTreeMap<String, String>> {
        self.values.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl PreferenceStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.lock().get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.lock().insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        self.lock().remove(key);
        Ok(())
    }
}

/// Preference store backed by a JSON object on disk.
///
/// The whole file is rewritten on every change. An unreadable or corrupt file
/// is treated as empty so the session falls back to the restrictive defaults.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    values: Mutex<BTreeMap<String, String>>,
}

impl FileStore {
    #[must_use]
    pub fn open(path: &Path) -> Self {
        let values = match fs::read_to_string(path) {
            Ok(content) => serde_json::from_str(&content).unwrap_or_else(|e| {
                warn!("Ignoring corrupt preference file {}: {}", path.display(), e);
                BTreeMap::new()
            }),
            Err(_) => BTreeMap::new(),
        };

        debug!("Opened preference store at {} ({} keys)", path.display(), values.len());
        Self {
            path: path.to_path_buf(),
            values: Mutex::new(values),
        }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Snapshot of every stored key and value.
    #[must_use]
    pub fn entries(&self) -> BTreeMap<String, String> {
        self.lock().clone()
    }

    /// # Errors
    ///
    /// Returns an error if the file cannot be written.
    pub fn clear(&self) -> Result<(), StoreError> {
        let mut values = self.lock();
        values.clear();
        self.save(&values)
    }

    fn lock(&self) -> MutexGuard<'_, BTreeMap<String, String>> {
        self.values.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn save(&self, values: &BTreeMap<String, String>) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|source| StoreError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        let content = serde_json::to_string_pretty(values)?;
        fs::write(&self.path, content).map_err(|source| StoreError::Io {
            path: self.path.clone(),
            source,
        })
    }
}

impl PreferenceStore for FileStore {
    fn get(&self, key: &str) -> Option<String> {
        self.lock().get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let mut values = self.lock();
        values.insert(key.to_string(), value.to_string());
        self.save(&values)
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        let mut values = self.lock();
        if values.remove(key).is_some() {
            self.save(&values)?;
        }
        Ok(())
    }
}

/// The persisted "keep me logged in" choice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SessionPreference {
    pub keep_logged_in: bool,
}

impl SessionPreference {
    /// Reads the preference; anything but `"true"` or `"false"` counts as `false`.
    #[must_use]
    pub fn load(store: &dyn PreferenceStore) -> Self {
        let keep_logged_in = match store.get(KEEP_LOGGED_IN_KEY).as_deref() {
            Some("true") => true,
            Some("false") | None => false,
            Some(other) => {
                warn!("Unrecognized {KEEP_LOGGED_IN_KEY} value '{other}', treating as false");
                false
            }
        };
        Self { keep_logged_in }
    }

    /// # Errors
    ///
    /// Returns an error if the store rejects the write.
    pub fn save(self, store: &dyn PreferenceStore) -> Result<(), StoreError> {
        store.set(KEEP_LOGGED_IN_KEY, if self.keep_logged_in { "true" } else { "false" })
    }
}

/// Persists `at` under `lastActivity` as epoch milliseconds.
///
/// # Errors
///
/// Returns an error if the store rejects the write.
pub fn save_last_activity(store: &dyn PreferenceStore, at: DateTime<Utc>) -> Result<(), StoreError> {
    store.set(LAST_ACTIVITY_KEY, &at.timestamp_millis().to_string())
}

#[must_use]
pub fn load_last_activity(store: &dyn PreferenceStore) -> Option<DateTime<Utc>> {
    store
        .get(LAST_ACTIVITY_KEY)
        .and_then(|raw| raw.trim().parse::<i64>().ok())
        .and_then(DateTime::from_timestamp_millis)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_preference_defaults_to_false() {
        let store = MemoryStore::new();
        assert!(!SessionPreference::load(&store).keep_logged_in);
    }

    #[test]
    fn test_corrupt_preference_reads_as_false() {
        let store = MemoryStore::new();
        store.set(KEEP_LOGGED_IN_KEY, "yes please").unwrap();
        assert!(!SessionPreference::load(&store).keep_logged_in);

        store.set(KEEP_LOGGED_IN_KEY, "TRUE").unwrap();
        assert!(!SessionPreference::load(&store).keep_logged_in);
    }

    #[test]
    fn test_preference_save_and_load() {
        let store = MemoryStore::new();
        SessionPreference { keep_logged_in: true }.save(&store).unwrap();
        assert_eq!(store.get(KEEP_LOGGED_IN_KEY).as_deref(), Some("true"));
        assert!(SessionPreference::load(&store).keep_logged_in);
    }

    #[test]
    fn test_last_activity_is_epoch_millis() {
        let store = MemoryStore::new();
        let at = DateTime::from_timestamp_millis(1_717_171_717_171).unwrap();

        save_last_activity(&store, at).unwrap();

        assert_eq!(store.get(LAST_ACTIVITY_KEY).as_deref(), Some("1717171717171"));
        assert_eq!(load_last_activity(&store), Some(at));
    }

    #[test]
    fn test_last_activity_garbage_is_none() {
        let store = MemoryStore::new();
        store.set(LAST_ACTIVITY_KEY, "yesterday").unwrap();
        assert_eq!(load_last_activity(&store), None);
    }

    #[test]
    fn test_file_store_survives_reopen() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("nested").join("preferences.json");

        let store = FileStore::open(&path);
        store.set(KEEP_LOGGED_IN_KEY, "true").unwrap();
        store.set(LAST_ACTIVITY_KEY, "42").unwrap();
        store.remove(LAST_ACTIVITY_KEY).unwrap();

        let reopened = FileStore::open(&path);
        assert_eq!(reopened.get(KEEP_LOGGED_IN_KEY).as_deref(), Some("true"));
        assert_eq!(reopened.get(LAST_ACTIVITY_KEY), None);
    }

    #[test]
    fn test_file_store_treats_corrupt_file_as_empty() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("preferences.json");
        fs::write(&path, "[1, 2").unwrap();

        let store = FileStore::open(&path);
        assert!(store.entries().is_empty());
        assert!(!SessionPreference::load(&store).keep_logged_in);
    }

    #[test]
    fn test_file_store_clear() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("preferences.json");
        let store = FileStore::open(&path);
        store.set(KEEP_LOGGED_IN_KEY, "false").unwrap();

        store.clear().unwrap();

        assert!(FileStore::open(&path).entries().is_empty());
    }

    #[test]
    fn test_writes_survive_a_poisoned_lock() {
        let temp_dir = TempDir::new().unwrap();
        let file_store = FileStore::open(&temp_dir.path().join("preferences.json"));
        let memory_store = MemoryStore::new();

        let _ = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let _file = file_store.values.lock().unwrap();
            let _memory = memory_store.values.lock().unwrap();
            panic!("writer crashed while holding the store");
        }));
        assert!(file_store.values.is_poisoned());
        assert!(memory_store.values.is_poisoned());

        file_store.set(KEEP_LOGGED_IN_KEY, "true").unwrap();
        memory_store.set(KEEP_LOGGED_IN_KEY, "true").unwrap();

        assert!(SessionPreference::load(&file_store).keep_logged_in);
        assert!(SessionPreference::load(&memory_store).keep_logged_in);
        assert!(SessionPreference::load(&FileStore::open(file_store.path())).keep_logged_in);
    }
}
