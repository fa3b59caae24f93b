use crate::error::StoreResult;
use crate::resolver::Location;

/// Raw byte storage for persisted documents, one per location.
///
/// Implementations must satisfy these invariants:
/// - `write` replaces the whole document atomically: a concurrent or later
///   `read` sees either the old bytes or the new bytes, never a mix.
/// - A failed `write` leaves the previous document in place.
/// - `read` of a location that was never written returns `Ok(None)`.
/// - The storage never interprets document contents.
/// - All I/O errors are propagated, never silently ignored.
pub trait LogStorage: Send + Sync {
    /// Read the document at `location`.
    fn read(&self, location: &Location) -> StoreResult<Option<Vec<u8>>>;

    /// Replace the document at `location` with `bytes`.
    fn write(&self, location: &Location, bytes: &[u8]) -> StoreResult<()>;

    /// Check whether a document exists at `location`.
    ///
    /// Default implementation reads the document. Backends may override
    /// with a cheaper probe.
    fn exists(&self, location: &Location) -> StoreResult<bool> {
        Ok(self.read(location)?.is_some())
    }
}
