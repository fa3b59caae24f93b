use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::error::{StoreError, StoreResult};
use crate::resolver::Location;
use crate::traits::LogStorage;

type Documents = HashMap<PathBuf, Vec<u8>>;

/// In-memory, HashMap-based document storage.
///
/// Intended for tests and embedding. Documents are keyed by resolved path
/// and held behind a `RwLock`; data is lost when the storage is dropped.
#[derive(Debug, Default)]
pub struct InMemoryLogStorage {
    documents: RwLock<Documents>,
}

impl InMemoryLogStorage {
    /// Create a new empty storage.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of documents currently stored.
    pub fn len(&self) -> StoreResult<usize> {
        Ok(self.read_lock()?.len())
    }

    /// Returns `true` if nothing has been written.
    pub fn is_empty(&self) -> StoreResult<bool> {
        Ok(self.read_lock()?.is_empty())
    }

    fn read_lock(&self) -> StoreResult<RwLockReadGuard<'_, Documents>> {
        self.documents
            .read()
            .map_err(|e| StoreError::LockPoisoned(e.to_string()))
    }

    fn write_lock(&self) -> StoreResult<RwLockWriteGuard<'_, Documents>> {
        self.documents
            .write()
            .map_err(|e| StoreError::LockPoisoned(e.to_string()))
    }
}

impl LogStorage for InMemoryLogStorage {
    fn read(&self, location: &Location) -> StoreResult<Option<Vec<u8>>> {
        Ok(self.read_lock()?.get(location.path()).cloned())
    }

    fn write(&self, location: &Location, bytes: &[u8]) -> StoreResult<()> {
        self.write_lock()?
            .insert(location.path().to_path_buf(), bytes.to_vec());
        Ok(())
    }

    fn exists(&self, location: &Location) -> StoreResult<bool> {
        Ok(self.read_lock()?.contains_key(location.path()))
    }
}
