//! Durable client storage for the credential token.
//!
//! SYSTEM CONTEXT
//! ==============
//! Plays the role browser `localStorage` plays for a web client: a small
//! string key-value store that outlives the process. Only the session store
//! touches it, and only under [`TOKEN_KEY`].

#[cfg(test)]
#[path = "storage_test.rs"]
mod storage_test;

use std::collections::{BTreeMap, HashMap};
use std::ffi::OsString;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

/// Storage key holding the credential token.
pub const TOKEN_KEY: &str = "token";

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("storage I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("storage file is corrupt: {0}")]
    Corrupt(#[from] serde_json::Error),
}

/// String key-value store that survives restarts.
pub trait DurableStorage: Send + Sync {
    /// Read `key`.
    ///
    /// # Errors
    ///
    /// Returns a [`StorageError`] if the backing store cannot be read.
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Write `key`, replacing any previous value.
    ///
    /// # Errors
    ///
    /// Returns a [`StorageError`] if the backing store cannot be written.
    fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Delete `key`. Deleting a missing key is not an error.
    ///
    /// # Errors
    ///
    /// Returns a [`StorageError`] if the backing store cannot be written.
    fn remove_item(&self, key: &str) -> Result<(), StorageError>;
}

// =============================================================================
// MEMORY
// =============================================================================

/// Process-local storage for tests and demo runs.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    items: Mutex<HashMap<String, String>>,
}

impl MemoryStorage {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl DurableStorage for MemoryStorage {
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.items.lock().unwrap_or_else(PoisonError::into_inner).get(key).cloned())
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.items
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.to_owned(), value.to_owned());
        Ok(())
    }

    fn remove_item(&self, key: &str) -> Result<(), StorageError> {
        self.items.lock().unwrap_or_else(PoisonError::into_inner).remove(key);
        Ok(())
    }
}

// =============================================================================
// FILE
// =============================================================================

/// JSON object on disk, one member per key. A missing file reads as empty.
///
/// Writes go to a sibling temp file that is renamed over the target, so an
/// interrupted write leaves the previous contents intact. A file that is
/// corrupt anyway fails reads but is overwritten by the next write.
#[derive(Debug)]
pub struct FileStorage {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl FileStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into(), write_lock: Mutex::new(()) }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> Result<BTreeMap<String, String>, StorageError> {
        let raw = match std::fs::read(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(BTreeMap::new()),
            Err(e) => return Err(e.into()),
        };
        if raw.iter().all(u8::is_ascii_whitespace) {
            return Ok(BTreeMap::new());
        }
        Ok(serde_json::from_slice(&raw)?)
    }

    /// Contents to build the next write on. Returns `true` alongside the map
    /// when the file was corrupt and must be rewritten regardless.
    fn load_for_write(&self) -> Result<(BTreeMap<String, String>, bool), StorageError> {
        match self.load() {
            Ok(items) => Ok((items, false)),
            Err(StorageError::Corrupt(e)) => {
                tracing::warn!(path = %self.path.display(), error = %e, "resetting corrupt storage file");
                Ok((BTreeMap::new(), true))
            }
            Err(e) => Err(e),
        }
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self.path.file_name().map(OsString::from).unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }

    fn save(&self, items: &BTreeMap<String, String>) -> Result<(), StorageError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let raw = serde_json::to_vec_pretty(items)?;
        let temp = self.temp_path();
        std::fs::write(&temp, raw)?;
        std::fs::rename(&temp, &self.path)?;
        Ok(())
    }
}

impl DurableStorage for FileStorage {
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.load()?.remove(key))
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let _guard = self.write_lock.lock().unwrap_or_else(PoisonError::into_inner);
        let (mut items, _) = self.load_for_write()?;
        items.insert(key.to_owned(), value.to_owned());
        self.save(&items)
    }

    fn remove_item(&self, key: &str) -> Result<(), StorageError> {
        let _guard = self.write_lock.lock().unwrap_or_else(PoisonError::into_inner);
        let (mut items, reset) = self.load_for_write()?;
        if items.remove(key).is_none() && !reset {
            return Ok(());
        }
        self.save(&items)
    }
}
