//! Key validation and resolution to storage locations.
//!
//! A key names one log and becomes a single directory under the storage
//! root: `<root>/<key>/<file_name>`. Valid keys:
//! - Must be non-empty and at most [`MAX_KEY_LEN`] bytes
//! - Must only contain ASCII letters, digits, `-`, `_` and `.`
//! - Must not start with `.` (covers `.` and `..`)
//! - Must not contain `..`
//!
//! Anything else is rejected rather than sanitized, so two distinct keys
//! never resolve to the same location.

use std::fmt;
use std::path::{Path, PathBuf};

use crate::config::StoreConfig;
use crate::error::{StoreError, StoreResult};

/// Longest accepted key, in bytes.
pub const MAX_KEY_LEN: usize = 128;

/// Punctuation allowed in keys besides ASCII alphanumerics.
const ALLOWED_PUNCT: &[char] = &['-', '_', '.'];

/// Validate a key, returning `Ok(())` if it is confined to a single
/// directory component.
///
/// # Examples
///
/// ```
/// use reclog_store::resolver::validate_key;
///
/// assert!(validate_key("chat-room_1").is_ok());
/// assert!(validate_key("").is_err());
/// assert!(validate_key("../etc").is_err());
/// assert!(validate_key("a/b").is_err());
/// ```
pub fn validate_key(key: &str) -> StoreResult<()> {
    let invalid = |reason: String| StoreError::InvalidKey {
        key: key.to_string(),
        reason,
    };

    if key.is_empty() {
        return Err(invalid("key must not be empty".into()));
    }
    if key.len() > MAX_KEY_LEN {
        return Err(invalid(format!("key longer than {MAX_KEY_LEN} bytes")));
    }
    if let Some(ch) = key
        .chars()
        .find(|c| !(c.is_ascii_alphanumeric() || ALLOWED_PUNCT.contains(c)))
    {
        return Err(invalid(format!("contains forbidden character: {ch:?}")));
    }
    if key.starts_with('.') {
        return Err(invalid("must not start with '.'".into()));
    }
    if key.contains("..") {
        return Err(invalid("must not contain '..'".into()));
    }
    Ok(())
}

/// A validated key and the storage path it maps to.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Location {
    key: String,
    path: PathBuf,
}

impl Location {
    /// The client-supplied key, verbatim.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Path of the persisted document.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Directory holding the persisted document.
    pub fn dir(&self) -> &Path {
        self.path.parent().unwrap_or(&self.path)
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.key, self.path.display())
    }
}

/// Maps keys to locations under a fixed root. Stateless.
#[derive(Clone, Debug)]
pub struct KeyResolver {
    root: PathBuf,
    file_name: String,
}

impl KeyResolver {
    pub fn new(root: impl Into<PathBuf>, file_name: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            file_name: file_name.into(),
        }
    }

    pub fn from_config(config: &StoreConfig) -> Self {
        Self::new(config.root.clone(), config.file_name.clone())
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve a key to its location, rejecting keys that would escape the root.
    pub fn resolve(&self, key: &str) -> StoreResult<Location> {
        validate_key(key)?;
        Ok(Location {
            key: key.to_string(),
            path: self.root.join(key).join(&self.file_name),
        })
    }
}
