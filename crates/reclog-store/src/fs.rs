//! Filesystem storage: `<root>/<key>/<file_name>`, replaced by rename.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use tracing::debug;

use crate::error::StoreResult;
use crate::resolver::Location;
use crate::traits::LogStorage;

/// Documents on the local filesystem.
///
/// Writes go to a temporary file in the key's directory, are synced, and
/// then renamed over the document, so readers never observe a torn write.
#[derive(Clone, Debug)]
pub struct FileLogStorage {
    root: PathBuf,
}

impl FileLogStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl LogStorage for FileLogStorage {
    fn read(&self, location: &Location) -> StoreResult<Option<Vec<u8>>> {
        match fs::read(location.path()) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn write(&self, location: &Location, bytes: &[u8]) -> StoreResult<()> {
        let dir = location.dir();
        fs::create_dir_all(dir)?;

        let mut tmp = NamedTempFile::new_in(dir)?;
        tmp.write_all(bytes)?;
        tmp.as_file().sync_all()?;
        tmp.persist(location.path()).map_err(|e| e.error)?;

        debug!(key = location.key(), len = bytes.len(), "document replaced");
        Ok(())
    }

    fn exists(&self, location: &Location) -> StoreResult<bool> {
        Ok(location.path().is_file())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolver::KeyResolver;

    #[test]
    fn read_missing_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FileLogStorage::new(dir.path());
        let loc = KeyResolver::new(dir.path(), "file.json").resolve("absent").unwrap();
        assert!(storage.read(&loc).unwrap().is_none());
        assert!(!storage.exists(&loc).unwrap());
    }

    #[test]
    fn write_creates_key_directory() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FileLogStorage::new(dir.path());
        let loc = KeyResolver::new(dir.path(), "file.json").resolve("inbox").unwrap();

        storage.write(&loc, b"{\"content\": []}").unwrap();

        assert!(dir.path().join("inbox").join("file.json").is_file());
        assert_eq!(storage.read(&loc).unwrap().unwrap(), b"{\"content\": []}");
        assert!(storage.exists(&loc).unwrap());
    }

    #[test]
    fn write_replaces_and_leaves_no_temp_files() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FileLogStorage::new(dir.path());
        let loc = KeyResolver::new(dir.path(), "file.json").resolve("k").unwrap();

        storage.write(&loc, b"first, and longer").unwrap();
        storage.write(&loc, b"second").unwrap();

        assert_eq!(storage.read(&loc).unwrap().unwrap(), b"second");
        let entries: Vec<_> = fs::read_dir(dir.path().join("k")).unwrap().collect();
        assert_eq!(entries.len(), 1);
    }

    #[test]
    fn failed_write_keeps_previous_document() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FileLogStorage::new(dir.path());
        let loc = KeyResolver::new(dir.path(), "file.json").resolve("k").unwrap();
        storage.write(&loc, b"kept").unwrap();

        // A directory squatting on the target name makes the rename fail.
        let blocked = KeyResolver::new(dir.path(), "blocked").resolve("k").unwrap();
        fs::create_dir_all(blocked.path()).unwrap();
        fs::write(blocked.path().join("inner"), b"x").unwrap();
        assert!(storage.write(&blocked, b"new").is_err());

        assert_eq!(storage.read(&loc).unwrap().unwrap(), b"kept");
    }
}
