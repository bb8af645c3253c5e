//! Local key-value storage for the library snapshot and scalar settings.
//!
//! Values are opaque strings under fixed keys. [`FileStore`] keeps one file
//! per key under the data directory; [`MemoryStore`] backs tests and
//! throwaway sessions.

use crate::error::StorageError;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::debug;

pub mod keys {
    pub const BOOKS: &str = "lingualecta-books";
    pub const THEME: &str = "lingualecta-theme";
    pub const FONT_SIZE: &str = "lingualecta-fontsize";
    pub const RATE: &str = "lingualecta-rate";
    pub const PITCH: &str = "lingualecta-pitch";
    pub const VOICE: &str = "lingualecta-voice";
}

pub trait KeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;
    fn set(&mut self, key: &str, value: &str) -> Result<(), StorageError>;
    fn remove(&mut self, key: &str) -> Result<(), StorageError>;
}

/// Decode a JSON value stored under `key`.
pub fn load_json<T: DeserializeOwned>(
    store: &dyn KeyValueStore,
    key: &str,
) -> Result<Option<T>, StorageError> {
    let Some(raw) = store.get(key)? else {
        return Ok(None);
    };
    serde_json::from_str(&raw)
        .map(Some)
        .map_err(|source| StorageError::Serde {
            key: key.to_string(),
            source,
        })
}

pub fn save_json<T: Serialize + ?Sized>(
    store: &mut dyn KeyValueStore,
    key: &str,
    value: &T,
) -> Result<(), StorageError> {
    let raw = serde_json::to_string(value).map_err(|source| StorageError::Serde {
        key: key.to_string(),
        source,
    })?;
    store.set(key, &raw)
}

#[derive(Debug, Clone)]
pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, key: &str) -> PathBuf {
        let file: String = key
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '-' { c } else { '_' })
            .collect();
        self.root.join(format!("{file}.value"))
    }

    fn io_error(key: &str, source: std::io::Error) -> StorageError {
        StorageError::Io {
            key: key.to_string(),
            source,
        }
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        match fs::read_to_string(self.path_for(key)) {
            Ok(value) => Ok(Some(value)),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
            Err(err) => Err(Self::io_error(key, err)),
        }
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StorageError> {
        fs::create_dir_all(&self.root).map_err(|err| Self::io_error(key, err))?;
        let path = self.path_for(key);
        let tmp = path.with_extension("value.tmp");
        fs::write(&tmp, value).map_err(|err| Self::io_error(key, err))?;
        fs::rename(&tmp, &path).map_err(|err| Self::io_error(key, err))?;
        debug!(key, path = %path.display(), bytes = value.len(), "Persisted value");
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), StorageError> {
        match fs::remove_file(self.path_for(key)) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
            Err(err) => Err(Self::io_error(key, err)),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: HashMap<String, String>,
    read_only: bool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store whose writes all fail; reads still succeed.
    pub fn read_only(entries: HashMap<String, String>) -> Self {
        Self {
            entries,
            read_only: true,
        }
    }

    pub fn with_entry(mut self, key: &str, value: &str) -> Self {
        self.entries.insert(key.to_string(), value.to_string());
        self
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StorageError> {
        if self.read_only {
            return Err(StorageError::ReadOnly);
        }
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), StorageError> {
        if self.read_only {
            return Err(StorageError::ReadOnly);
        }
        self.entries.remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_store_persists_across_instances() {
        let temp = tempfile::tempdir().expect("temp dir should be created");
        let mut store = FileStore::with_root(temp.path().join("data"));
        assert_eq!(store.get(keys::RATE).unwrap(), None);

        store.set(keys::RATE, "1.5").unwrap();
        let reopened = FileStore::with_root(temp.path().join("data"));
        assert_eq!(reopened.get(keys::RATE).unwrap().as_deref(), Some("1.5"));

        store.remove(keys::RATE).unwrap();
        store.remove(keys::RATE).unwrap();
        assert_eq!(store.get(keys::RATE).unwrap(), None);
    }

    #[test]
    fn json_helpers_surface_decode_errors() {
        let store = MemoryStore::new().with_entry(keys::BOOKS, "{not json");
        let result: Result<Option<Vec<String>>, _> = load_json(&store, keys::BOOKS);
        assert!(matches!(result, Err(StorageError::Serde { .. })));

        let mut store = MemoryStore::new();
        save_json(&mut store, keys::BOOKS, &vec!["a", "b"]).unwrap();
        let loaded: Option<Vec<String>> = load_json(&store, keys::BOOKS).unwrap();
        assert_eq!(loaded, Some(vec!["a".to_string(), "b".to_string()]));
    }

    #[test]
    fn read_only_store_rejects_writes() {
        let mut store = MemoryStore::read_only(HashMap::new());
        assert!(matches!(store.set("k", "v"), Err(StorageError::ReadOnly)));
        assert_eq!(store.get("k").unwrap(), None);
    }
}
