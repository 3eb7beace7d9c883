// ABOUTME: In-memory store with dotted-path semantics and a save counter.
// ABOUTME: Backs the file store and serves as a standalone store for embedding.

use serde_json::{Map, Value};

use super::{ConfigStore, StoreError};

/// A store held entirely in memory.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    root: Map<String, Value>,
    dirty: bool,
    saves: usize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_map(root: Map<String, Value>) -> Self {
        Self {
            root,
            dirty: false,
            saves: 0,
        }
    }

    /// Number of `save()` calls that had pending changes.
    pub fn save_count(&self) -> usize {
        self.saves
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.root
    }

    pub(super) fn mark_saved(&mut self) {
        self.dirty = false;
        self.saves += 1;
    }
}

impl ConfigStore for MemoryStore {
    fn get(&self, key: &str) -> Option<Value> {
        let mut current = &self.root;
        let mut parts = key.split('.').peekable();
        while let Some(part) = parts.next() {
            let value = current.get(part)?;
            if parts.peek().is_none() {
                return Some(value.clone());
            }
            current = value.as_object()?;
        }
        None
    }

    fn set(&mut self, key: &str, value: Value) -> Result<(), StoreError> {
        let parts: Vec<&str> = key.split('.').collect();
        if parts.iter().any(|p| p.is_empty()) {
            return Err(StoreError::InvalidKey {
                key: key.to_string(),
                reason: "empty path segment".to_string(),
            });
        }

        let (last, parents) = parts.split_last().ok_or_else(|| StoreError::InvalidKey {
            key: key.to_string(),
            reason: "empty key".to_string(),
        })?;

        let mut current = &mut self.root;
        for part in parents {
            let entry = current
                .entry(part.to_string())
                .or_insert_with(|| Value::Object(Map::new()));
            match entry {
                Value::Object(map) => current = map,
                _ => {
                    return Err(StoreError::InvalidKey {
                        key: key.to_string(),
                        reason: format!("'{part}' is not an object"),
                    });
                }
            }
        }

        current.insert(last.to_string(), value);
        self.dirty = true;
        Ok(())
    }

    fn unset(&mut self, key: &str) -> Result<(), StoreError> {
        let parts: Vec<&str> = key.split('.').collect();
        let Some((last, parents)) = parts.split_last() else {
            return Ok(());
        };

        let mut current = &mut self.root;
        for part in parents {
            match current.get_mut(*part) {
                Some(Value::Object(map)) => current = map,
                _ => return Ok(()),
            }
        }

        if current.remove(*last).is_some() {
            self.dirty = true;
        }
        Ok(())
    }

    fn save(&mut self) -> Result<(), StoreError> {
        self.mark_saved();
        Ok(())
    }
}
