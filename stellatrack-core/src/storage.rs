//! Whole-collection persistence of runs over a string key-value store.
use std::cell::RefCell;
use std::collections::HashMap;
use std::convert::Infallible;
use std::rc::Rc;
use thiserror::Error;

use crate::constants::{BACKUP_KEY_SUFFIX, STORAGE_KEY};
use crate::run::Run;

/// Trait for abstracting the local persistence medium.
/// Platform-specific implementations should provide this
pub trait KeyValueStore {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Read the document stored under `key`.
    ///
    /// # Errors
    ///
    /// Returns an error if the medium cannot be read.
    fn get(&self, key: &str) -> Result<Option<String>, Self::Error>;

    /// Replace the document stored under `key`.
    ///
    /// # Errors
    ///
    /// Returns an error if the medium rejects the write.
    fn set(&self, key: &str, value: &str) -> Result<(), Self::Error>;
}

/// In-process store, shared between clones.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: Rc<RefCell<HashMap<String, String>>>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a raw document, bypassing serialization.
    pub fn insert_raw(&self, key: &str, value: impl Into<String>) {
        self.entries.borrow_mut().insert(key.to_string(), value.into());
    }

    #[must_use]
    pub fn raw(&self, key: &str) -> Option<String> {
        self.entries.borrow().get(key).cloned()
    }
}

impl KeyValueStore for MemoryStore {
    type Error = Infallible;

    fn get(&self, key: &str) -> Result<Option<String>, Self::Error> {
        Ok(self.raw(key))
    }

    fn set(&self, key: &str, value: &str) -> Result<(), Self::Error> {
        self.insert_raw(key, value);
        Ok(())
    }
}

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Storage error: {0}")]
    Backend(String),
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("stored runs under {0} could not be read and will not be overwritten")]
    Unreadable(String),
}

/// Why the last load produced no runs although a document may exist.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Discarded {
    /// The backend failed to read the document.
    Unreadable,
    /// The document was read but is not a run collection.
    Malformed(String),
}

/// Loads and saves the full run collection as one JSON document.
///
/// A document that could not be read is never overwritten. A malformed one is
/// copied under [`RunStore::backup_key`] before the first replacement.
#[derive(Debug, Clone)]
pub struct RunStore<K> {
    store: K,
    key: String,
    discarded: RefCell<Option<Discarded>>,
}

impl<K: KeyValueStore> RunStore<K> {
    /// Store runs under the default key.
    pub fn new(store: K) -> Self {
        Self::with_key(store, STORAGE_KEY)
    }

    pub fn with_key(store: K, key: impl Into<String>) -> Self {
        Self {
            store,
            key: key.into(),
            discarded: RefCell::new(None),
        }
    }

    #[must_use]
    pub fn backup_key(&self) -> String {
        format!("{}{BACKUP_KEY_SUFFIX}", self.key)
    }

    /// Load every stored run.
    ///
    /// Missing or malformed data degrades to an empty collection, as does a
    /// failed read.
    #[must_use]
    pub fn load_all(&self) -> Vec<Run> {
        self.discarded.replace(None);
        let raw = match self.store.get(&self.key) {
            Ok(Some(raw)) => raw,
            Ok(None) => return Vec::new(),
            Err(e) => {
                log::warn!("could not read stored runs under {}: {e}", self.key);
                self.discarded.replace(Some(Discarded::Unreadable));
                return Vec::new();
            }
        };
        match serde_json::from_str::<Option<Vec<Run>>>(&raw) {
            Ok(runs) => runs.unwrap_or_default(),
            Err(e) => {
                log::warn!("discarding malformed run document under {}: {e}", self.key);
                self.discarded.replace(Some(Discarded::Malformed(raw)));
                Vec::new()
            }
        }
    }

    /// Replace the stored collection with `runs`.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Unreadable`] while the last load failed to read
    /// the document, or an error if serialization fails or the backend rejects
    /// a write.
    pub fn save_all(&self, runs: &[Run]) -> Result<(), StorageError> {
        match self.discarded.borrow().as_ref() {
            Some(Discarded::Unreadable) => return Err(StorageError::Unreadable(self.key.clone())),
            Some(Discarded::Malformed(raw)) => {
                let backup = self.backup_key();
                self.store
                    .set(&backup, raw)
                    .map_err(|e| StorageError::Backend(e.to_string()))?;
                log::warn!("kept the discarded run document under {backup}");
            }
            None => {}
        }
        self.discarded.replace(None);

        let json = serde_json::to_string(runs)?;
        self.store
            .set(&self.key, &json)
            .map_err(|e| StorageError::Backend(e.to_string()))?;
        log::debug!("saved {} run(s) under {}", runs.len(), self.key);
        Ok(())
    }
}
