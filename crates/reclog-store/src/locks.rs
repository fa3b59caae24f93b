//! Per-key mutual exclusion for read-modify-write sequences.
//!
//! Every mutating operation loads a log, computes the next one and replaces
//! it. [`KeyLocks`] serializes those sequences per location while leaving
//! different locations fully concurrent. Entries are created on demand and
//! dropped once no thread holds or waits on them.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use crate::error::{StoreError, StoreResult};

type Slot = Arc<Mutex<()>>;

/// Table of per-location mutexes.
#[derive(Debug, Default)]
pub struct KeyLocks {
    table: Mutex<HashMap<PathBuf, Slot>>,
}

impl KeyLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `f` while holding the exclusive lock for `path`.
    pub fn with_key<T>(&self, path: &Path, f: impl FnOnce() -> StoreResult<T>) -> StoreResult<T> {
        let slot = self.acquire(path)?;
        let result = {
            // The guarded value is `()`, so a poisoned slot carries no bad state.
            let _guard = slot.lock().unwrap_or_else(PoisonError::into_inner);
            f()
        };
        self.release(path, slot)?;
        result
    }

    /// Number of locations with a live lock entry.
    #[cfg(test)]
    fn active(&self) -> StoreResult<usize> {
        Ok(self.table()?.len())
    }

    fn acquire(&self, path: &Path) -> StoreResult<Slot> {
        let mut table = self.table()?;
        Ok(Arc::clone(table.entry(path.to_path_buf()).or_default()))
    }

    fn release(&self, path: &Path, slot: Slot) -> StoreResult<()> {
        let mut table = self.table()?;
        // Only the table and this caller hold the slot: nobody is waiting.
        if Arc::strong_count(&slot) == 2 {
            table.remove(path);
        }
        Ok(())
    }

    fn table(&self) -> StoreResult<std::sync::MutexGuard<'_, HashMap<PathBuf, Slot>>> {
        self.table
            .lock()
            .map_err(|e| StoreError::LockPoisoned(e.to_string()))
    }
}
