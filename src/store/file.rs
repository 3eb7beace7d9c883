// ABOUTME: JSON file-backed store; changes stay in memory until save().
// ABOUTME: Writes go to a temp file and are renamed into place.

use serde_json::{Map, Value};
use std::path::{Path, PathBuf};

use super::{ConfigStore, MemoryStore, StoreError};

/// A store persisted as a single JSON object on disk.
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    inner: MemoryStore,
}

impl JsonFileStore {
    /// Open the store at `path`. A missing file starts an empty store.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        let root = match std::fs::read_to_string(&path) {
            Ok(content) if content.trim().is_empty() => Map::new(),
            Ok(content) => serde_json::from_str::<Map<String, Value>>(&content).map_err(
                |source| StoreError::Parse {
                    path: path.clone(),
                    source,
                },
            )?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Map::new(),
            Err(source) => return Err(StoreError::Read { path, source }),
        };

        Ok(Self {
            path,
            inner: MemoryStore::from_map(root),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ConfigStore for JsonFileStore {
    fn get(&self, key: &str) -> Option<Value> {
        self.inner.get(key)
    }

    fn set(&mut self, key: &str, value: Value) -> Result<(), StoreError> {
        self.inner.set(key, value)
    }

    fn unset(&mut self, key: &str) -> Result<(), StoreError> {
        self.inner.unset(key)
    }

    fn save(&mut self) -> Result<(), StoreError> {
        if !self.inner.is_dirty() {
            return Ok(());
        }

        let write_err = |source| StoreError::Write {
            path: self.path.clone(),
            source,
        };

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(write_err)?;
        }

        let content = serde_json::to_string_pretty(self.inner.as_map()).map_err(|source| {
            StoreError::Parse {
                path: self.path.clone(),
                source,
            }
        })?;

        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, content).map_err(write_err)?;
        std::fs::rename(&tmp, &self.path).map_err(write_err)?;

        tracing::debug!(path = %self.path.display(), "store saved");
        self.inner.mark_saved();
        Ok(())
    }
}
