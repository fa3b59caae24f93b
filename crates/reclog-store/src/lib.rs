//! Per-key, append-only JSON record logs.
//!
//! A *key* names one log; a *log* is an ordered sequence of JSON *records*
//! persisted as a single document under `<root>/<key>/<file_name>`. Every
//! mutation loads the whole log, computes the next one and replaces the
//! document atomically.
//!
//! # Operations
//!
//! All operations take a [`Location`] produced by [`RecordLogStore::resolve`]:
//!
//! - [`load`](RecordLogStore::load) / [`read`](RecordLogStore::read) -- the full log
//! - [`replace`](RecordLogStore::replace) -- overwrite, optionally rejecting blanks
//! - [`write`](RecordLogStore::write) -- replace with a single record
//! - [`append`](RecordLogStore::append) -- push one record (or merge, in legacy mode)
//! - [`dequeue`](RecordLogStore::dequeue) -- remove and return the oldest record
//! - [`clear`](RecordLogStore::clear) -- truncate to an empty log
//! - [`latest`](RecordLogStore::latest) -- content only if unread since last call
//!
//! # Design Rules
//!
//! 1. Keys are validated against an allow-list; no key escapes the root.
//! 2. Mutations on one key are serialized by [`KeyLocks`]; different keys
//!    proceed in parallel.
//! 3. Documents are replaced whole via temp file + rename.
//! 4. The persisted shape is decided once at decode time ([`Shape`]).
//! 5. Reads decode once; only transient I/O errors are retried, a bounded
//!    number of times.

pub mod config;
pub mod document;
pub mod error;
pub mod fs;
pub mod locks;
pub mod memory;
pub mod merge;
pub mod resolver;
pub mod store;
pub mod traits;

pub use config::{AppendMode, StoreConfig};
pub use document::{Document, Shape, StoredLog};
pub use error::{StoreError, StoreResult};
pub use fs::FileLogStorage;
pub use locks::KeyLocks;
pub use memory::InMemoryLogStorage;
pub use merge::{is_blank, merge_legacy, ContentKind};
pub use resolver::{validate_key, KeyResolver, Location};
pub use store::{Dequeued, Latest, RecordLogStore};
pub use traits::LogStorage;
