//! The record log store: load, replace, write, append, dequeue, clear.
//!
//! Every mutation runs load → compute → replace inside the key's
//! [`KeyLocks`] section. Reads take no lock; storage replacement is atomic,
//! so a reader sees either the previous or the next log.

use std::io;

use serde_json::Value;
use tracing::{debug, warn};

use crate::config::{AppendMode, StoreConfig};
use crate::document::{Shape, StoredLog};
use crate::error::{StoreError, StoreResult};
use crate::fs::FileLogStorage;
use crate::locks::KeyLocks;
use crate::memory::InMemoryLogStorage;
use crate::merge::{is_blank, merge_legacy, ContentKind};
use crate::resolver::{KeyResolver, Location};
use crate::traits::LogStorage;

/// Outcome of [`RecordLogStore::dequeue`].
#[derive(Clone, Debug, PartialEq)]
pub enum Dequeued {
    /// The oldest record, now removed from the log.
    Record(Value),
    /// The key is absent or its log is empty. Nothing was written.
    Empty,
}

/// Outcome of [`RecordLogStore::latest`].
#[derive(Clone, Debug, PartialEq)]
pub enum Latest {
    /// Content written since the last "latest" read. Now marked read.
    Fresh(Value),
    /// Nothing new since the last "latest" read.
    Seen,
}

/// Durable per-key record logs over a [`LogStorage`] backend.
pub struct RecordLogStore<S = FileLogStorage> {
    storage: S,
    resolver: KeyResolver,
    locks: KeyLocks,
    config: StoreConfig,
}

impl RecordLogStore<FileLogStorage> {
    /// Store backed by the filesystem under `config.root`.
    pub fn open(config: StoreConfig) -> Self {
        Self::with_storage(FileLogStorage::new(config.root.clone()), config)
    }
}

impl RecordLogStore<InMemoryLogStorage> {
    /// Store that keeps documents in memory.
    pub fn in_memory(config: StoreConfig) -> Self {
        Self::with_storage(InMemoryLogStorage::new(), config)
    }
}

impl<S: LogStorage> RecordLogStore<S> {
    pub fn with_storage(storage: S, config: StoreConfig) -> Self {
        Self {
            storage,
            resolver: KeyResolver::from_config(&config),
            locks: KeyLocks::new(),
            config,
        }
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    /// Resolve a client key to its location under the storage root.
    pub fn resolve(&self, key: &str) -> StoreResult<Location> {
        self.resolver.resolve(key)
    }

    /// Load the persisted log, `None` if the key was never written.
    pub fn load(&self, location: &Location) -> StoreResult<Option<StoredLog>> {
        match self.read_bytes(location)? {
            Some(bytes) => StoredLog::decode(location.key(), &bytes).map(Some),
            None => Ok(None),
        }
    }

    /// Load the log content, failing with [`StoreError::NotFound`] if absent.
    /// Leaves the unread flag alone.
    pub fn read(&self, location: &Location) -> StoreResult<Value> {
        self.load(location)?
            .map(|log| log.content())
            .ok_or_else(|| not_found(location))
    }

    /// Load the log content and mark it read, so a following
    /// [`latest`](Self::latest) reports [`Latest::Seen`] until the next
    /// write or append.
    pub fn read_and_mark(&self, location: &Location) -> StoreResult<Value> {
        self.locks.with_key(location.path(), || {
            let mut log = self.load(location)?.ok_or_else(|| not_found(location))?;
            if log.unread {
                log.unread = false;
                self.replace_locked(location, &log, true)?;
            }
            Ok(log.content())
        })
    }

    /// Overwrite the whole log.
    ///
    /// With `allow_blank == false`, an empty log or one whose first record
    /// is blank is rejected before anything is written. An empty log is
    /// stored as already read.
    pub fn replace(
        &self,
        location: &Location,
        log: Vec<Value>,
        allow_blank: bool,
    ) -> StoreResult<()> {
        let log = if log.is_empty() {
            StoredLog::empty()
        } else {
            StoredLog::fresh(Shape::Sequence(log))
        };
        self.locks
            .with_key(location.path(), || self.replace_locked(location, &log, allow_blank))
    }

    /// Replace the log with the single record `record`. Returns the new content.
    pub fn write(&self, location: &Location, record: Value) -> StoreResult<Value> {
        self.locks.with_key(location.path(), || {
            let shape = match self.config.append_mode {
                AppendMode::Sequence => Shape::Sequence(vec![record]),
                AppendMode::Legacy => Shape::LegacySingle(record),
            };
            let log = StoredLog::fresh(shape);
            self.replace_locked(location, &log, false)?;
            debug!(key = location.key(), "log written");
            Ok(log.content())
        })
    }

    /// Append `record` to the log, creating it if absent. Returns the new content.
    pub fn append(&self, location: &Location, record: Value) -> StoreResult<Value> {
        self.locks.with_key(location.path(), || {
            // Sequence appends may add blank records; a merged legacy record may not be blank.
            let (shape, allow_blank) = match self.config.append_mode {
                AppendMode::Sequence => (self.next_sequence(location, record)?, true),
                AppendMode::Legacy => (self.next_merged(location, record)?, false),
            };
            let log = StoredLog::fresh(shape);
            self.replace_locked(location, &log, allow_blank)?;
            debug!(key = location.key(), records = log.len(), "record appended");
            Ok(log.content())
        })
    }

    /// Remove and return the oldest record.
    ///
    /// A single-record legacy document is a log of one: its record is
    /// returned and an empty log is left behind.
    pub fn dequeue(&self, location: &Location) -> StoreResult<Dequeued> {
        self.locks.with_key(location.path(), || {
            let Some(mut log) = self.load(location)? else {
                return Ok(Dequeued::Empty);
            };
            let head = match std::mem::replace(&mut log.shape, Shape::Sequence(Vec::new())) {
                Shape::Sequence(records) if records.is_empty() => return Ok(Dequeued::Empty),
                Shape::Sequence(mut records) => {
                    let head = records.remove(0);
                    log.shape = Shape::Sequence(records);
                    head
                }
                Shape::LegacySingle(record) => record,
            };
            self.replace_locked(location, &log, true)?;
            debug!(key = location.key(), remaining = log.len(), "record dequeued");
            Ok(Dequeued::Record(head))
        })
    }

    /// Truncate the log to empty. Succeeds whether or not the key exists.
    pub fn clear(&self, location: &Location) -> StoreResult<()> {
        self.locks.with_key(location.path(), || {
            self.replace_locked(location, &StoredLog::empty(), true)?;
            debug!(key = location.key(), "log cleared");
            Ok(())
        })
    }

    /// Return the content if it changed since the previous call, marking it read.
    pub fn latest(&self, location: &Location) -> StoreResult<Latest> {
        self.locks.with_key(location.path(), || {
            let mut log = self.load(location)?.ok_or_else(|| not_found(location))?;
            if !log.unread {
                return Ok(Latest::Seen);
            }
            log.unread = false;
            self.replace_locked(location, &log, true)?;
            Ok(Latest::Fresh(log.content()))
        })
    }

    fn next_sequence(&self, location: &Location, record: Value) -> StoreResult<Shape> {
        match self.load(location)? {
            None => Ok(Shape::Sequence(vec![record])),
            Some(StoredLog { shape: Shape::Sequence(mut records), .. }) => {
                records.push(record);
                Ok(Shape::Sequence(records))
            }
            Some(StoredLog { shape: Shape::LegacySingle(existing), .. }) => {
                Err(not_a_sequence(location, &existing))
            }
        }
    }

    /// The merged legacy record. A cleared or drained log holds nothing to
    /// merge into, so the incoming record is stored as is.
    fn next_merged(&self, location: &Location, record: Value) -> StoreResult<Shape> {
        let merged = match self.load(location)? {
            None => record,
            Some(log) if log.is_empty() => record,
            Some(log) => {
                let mut existing = log.shape.into_value();
                merge_legacy(location.key(), &mut existing, record)?;
                existing
            }
        };
        Ok(Shape::LegacySingle(merged))
    }

    /// Validate and persist `log` as the key's whole document.
    /// The caller holds the key lock.
    fn replace_locked(
        &self,
        location: &Location,
        log: &StoredLog,
        allow_blank: bool,
    ) -> StoreResult<()> {
        check_writable(&log.shape, allow_blank)?;
        self.persist(location, log)
    }

    fn persist(&self, location: &Location, log: &StoredLog) -> StoreResult<()> {
        let bytes = log.encode(location.key())?;
        self.storage.write(location, &bytes)
    }

    /// Read raw bytes, retrying transient I/O failures up to `read_retries` times.
    fn read_bytes(&self, location: &Location) -> StoreResult<Option<Vec<u8>>> {
        let mut attempt = 0;
        loop {
            match self.storage.read(location) {
                Err(StoreError::Io(e))
                    if is_transient(&e) && attempt < self.config.read_retries =>
                {
                    attempt += 1;
                    warn!(
                        key = location.key(),
                        attempt,
                        error = %e,
                        "transient read failure; retrying"
                    );
                    std::thread::sleep(self.config.retry_backoff);
                }
                other => return other,
            }
        }
    }
}

fn is_transient(e: &io::Error) -> bool {
    matches!(
        e.kind(),
        io::ErrorKind::Interrupted | io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut
    )
}

fn check_writable(shape: &Shape, allow_blank: bool) -> StoreResult<()> {
    if allow_blank {
        return Ok(());
    }
    let blank = match shape {
        Shape::Sequence(records) => records.first().map_or(true, is_blank),
        Shape::LegacySingle(record) => is_blank(record),
    };
    if blank {
        return Err(StoreError::Validation);
    }
    Ok(())
}

fn not_found(location: &Location) -> StoreError {
    StoreError::NotFound {
        key: location.key().to_string(),
    }
}

fn not_a_sequence(location: &Location, record: &Value) -> StoreError {
    StoreError::corruption(
        location.key(),
        format!("expected a record sequence, found a single {} record", ContentKind::of(record)),
    )
}
