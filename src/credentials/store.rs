//! Key/value persistence backends for credentials.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use crate::error::{AuditdashError, Result};

/// Process-wide string key/value persistence.
///
/// Absence of a key is a valid state, not an error.
pub trait KeyValueStore: Send + Sync {
    /// Read the value stored under `key`.
    fn get(&self, key: &str) -> Result<Option<String>>;

    /// Store `value` under `key`, replacing any previous value.
    fn set(&self, key: &str, value: &str) -> Result<()>;

    /// Remove `key`. Removing an absent key is not an error.
    fn remove(&self, key: &str) -> Result<()>;

    /// Store several entries together.
    ///
    /// Backends that can persist them in one write should override this. The
    /// default writes them in order and removes the earlier ones if a later
    /// write fails.
    fn set_many(&self, entries: &[(&str, &str)]) -> Result<()> {
        for (i, (key, value)) in entries.iter().enumerate() {
            if let Err(e) = self.set(key, value) {
                for (written, _) in &entries[..i] {
                    let _ = self.remove(written);
                }
                return Err(e);
            }
        }
        Ok(())
    }
}

/// In-memory store. Lives as long as the process.
#[derive(Debug, Default)]
pub struct MemoryStore {
    values: RwLock<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let values = self
            .values
            .read()
            .map_err(|e| AuditdashError::CredentialStore(e.to_string()))?;
        Ok(values.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let mut values = self
            .values
            .write()
            .map_err(|e| AuditdashError::CredentialStore(e.to_string()))?;
        values.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        let mut values = self
            .values
            .write()
            .map_err(|e| AuditdashError::CredentialStore(e.to_string()))?;
        values.remove(key);
        Ok(())
    }

    fn set_many(&self, entries: &[(&str, &str)]) -> Result<()> {
        let mut values = self
            .values
            .write()
            .map_err(|e| AuditdashError::CredentialStore(e.to_string()))?;
        for (key, value) in entries {
            values.insert(key.to_string(), value.to_string());
        }
        Ok(())
    }
}

/// JSON-file store with an in-memory cache.
///
/// Every write rewrites the file, so values survive process restarts.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    cache: RwLock<HashMap<String, String>>,
}

impl FileStore {
    /// Open the store at `path`, loading existing values if the file exists.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        let values = if path.exists() {
            let content = fs::read_to_string(&path)?;
            if content.trim().is_empty() {
                HashMap::new()
            } else {
                serde_json::from_str(&content)?
            }
        } else {
            HashMap::new()
        };

        log::debug!("Opened credential file {} ({} keys)", path.display(), values.len());

        Ok(Self {
            path,
            cache: RwLock::new(values),
        })
    }

    /// Location of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn persist(&self, values: &HashMap<String, String>) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&self.path, serde_json::to_string_pretty(values)?)?;
        Ok(())
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let cache = self
            .cache
            .read()
            .map_err(|e| AuditdashError::CredentialStore(e.to_string()))?;
        Ok(cache.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let mut cache = self
            .cache
            .write()
            .map_err(|e| AuditdashError::CredentialStore(e.to_string()))?;
        cache.insert(key.to_string(), value.to_string());
        self.persist(&cache)
    }

    fn remove(&self, key: &str) -> Result<()> {
        let mut cache = self
            .cache
            .write()
            .map_err(|e| AuditdashError::CredentialStore(e.to_string()))?;
        if cache.remove(key).is_some() {
            self.persist(&cache)?;
        }
        Ok(())
    }

    /// All entries land in a single file write; on failure the cache is rolled back.
    fn set_many(&self, entries: &[(&str, &str)]) -> Result<()> {
        let mut cache = self
            .cache
            .write()
            .map_err(|e| AuditdashError::CredentialStore(e.to_string()))?;
        let mut next = cache.clone();
        for (key, value) in entries {
            next.insert(key.to_string(), value.to_string());
        }
        self.persist(&next)?;
        *cache = next;
        Ok(())
    }
}
