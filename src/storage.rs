use std::collections::BTreeMap;
use std::path::PathBuf;

use thiserror::Error;

/// Last-edited source text.
pub const SOURCE_KEY: &str = "mermaid-code";
/// History log, as JSON-encoded snapshots.
pub const HISTORY_KEY: &str = "mermaid_snapshots";

#[derive(Debug, Error)]
pub enum StorageError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error("malformed store: {0}")]
    Corrupt(String),
}

pub trait Storage {
    fn read(&self, key: &str) -> Result<Option<String>, StorageError>;
    fn write(&mut self, key: &str, value: &str) -> Result<(), StorageError>;
    fn remove(&mut self, key: &str) -> Result<(), StorageError>;
}

/// In-memory store for tests and one-shot invocations.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    map: BTreeMap<String, String>,
}

impl Storage for MemoryStorage {
    fn read(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.map.get(key).cloned())
    }

    fn write(&mut self, key: &str, value: &str) -> Result<(), StorageError> {
        self.map.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), StorageError> {
        self.map.remove(key);
        Ok(())
    }
}

/// Single JSON file holding all keys. Rewritten wholesale on every write;
/// the store is tiny (one source string and a capped history log).
#[derive(Debug)]
pub struct FileStorage {
    path: PathBuf,
}

impl FileStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn load(&self) -> Result<BTreeMap<String, String>, StorageError> {
        if !self.path.exists() {
            return Ok(BTreeMap::new());
        }
        let contents = std::fs::read_to_string(&self.path)?;
        if contents.trim().is_empty() {
            return Ok(BTreeMap::new());
        }
        serde_json::from_str(&contents).map_err(|err| StorageError::Corrupt(err.to_string()))
    }

    fn save(&self, map: &BTreeMap<String, String>) -> Result<(), StorageError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let body = serde_json::to_string_pretty(map)
            .map_err(|err| StorageError::Corrupt(err.to_string()))?;
        std::fs::write(&self.path, body)?;
        Ok(())
    }
}

impl Storage for FileStorage {
    fn read(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.load()?.get(key).cloned())
    }

    fn write(&mut self, key: &str, value: &str) -> Result<(), StorageError> {
        let mut map = self.load().unwrap_or_else(|err| {
            tracing::warn!(%err, "discarding corrupt store");
            BTreeMap::new()
        });
        map.insert(key.to_string(), value.to_string());
        self.save(&map)
    }

    fn remove(&mut self, key: &str) -> Result<(), StorageError> {
        let mut map = self.load()?;
        if map.remove(key).is_some() {
            self.save(&map)?;
        }
        Ok(())
    }
}
