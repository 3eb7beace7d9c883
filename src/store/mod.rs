// ABOUTME: Configuration and environment store boundary.
// ABOUTME: Writes are buffered in memory until save(), the only durability point.

mod file;
mod memory;

pub use file::JsonFileStore;
pub use memory::MemoryStore;

use serde_json::Value;
use std::path::PathBuf;

/// Errors from persisting or reading a store.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid store contents in {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("cannot set '{key}': {reason}")]
    InvalidKey { key: String, reason: String },
}

/// A key-value store. Keys may be dotted paths (`infra.parameters.name`).
pub trait ConfigStore: Send + Sync {
    fn get(&self, key: &str) -> Option<Value>;

    fn set(&mut self, key: &str, value: Value) -> Result<(), StoreError>;

    fn unset(&mut self, key: &str) -> Result<(), StoreError>;

    /// Persist all pending changes.
    fn save(&mut self) -> Result<(), StoreError>;

    /// String view of a value, for environment-style keys.
    fn get_string(&self, key: &str) -> Option<String> {
        match self.get(key)? {
            Value::String(s) => Some(s),
            Value::Null => None,
            other => Some(other.to_string()),
        }
    }
}
