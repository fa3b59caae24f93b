use crate::merge::ContentKind;

/// Errors from record log operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The key has no persisted log.
    #[error("file path does not exist: {key}")]
    NotFound { key: String },

    /// The key cannot be confined to the storage root.
    #[error("invalid key {key:?}: {reason}")]
    InvalidKey { key: String, reason: String },

    /// Blank content where a non-blank write is required.
    #[error("no write content specified")]
    Validation,

    /// Legacy merge across incompatible content kinds.
    #[error("read type of {key} ({existing}) different from write type ({incoming})")]
    TypeMismatch {
        key: String,
        existing: ContentKind,
        incoming: ContentKind,
    },

    /// Legacy merge on a kind that has no merge rule.
    #[error("{kind} type not supported (only string, sequence, and map merge)")]
    UnsupportedKind { kind: ContentKind },

    /// The persisted document does not have the expected shape.
    #[error("corrupt log for {key}: {reason}")]
    Corruption { key: String, reason: String },

    /// Encoding a document failed.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// I/O error from the underlying storage backend.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A shared lock table was poisoned by a panicking writer.
    #[error("lock poisoned: {0}")]
    LockPoisoned(String),
}

impl StoreError {
    /// Stable name of the error kind, used in user-facing messages.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::NotFound { .. } => "NotFound",
            Self::InvalidKey { .. } => "InvalidKey",
            Self::Validation => "ValidationError",
            Self::TypeMismatch { .. } => "TypeMismatchError",
            Self::UnsupportedKind { .. } => "UnsupportedKindError",
            Self::Corruption { .. } => "CorruptionError",
            Self::Serialization(_) => "SerializationError",
            Self::Io(_) => "IOError",
            Self::LockPoisoned(_) => "LockPoisoned",
        }
    }

    pub(crate) fn corruption(key: &str, reason: impl Into<String>) -> Self {
        Self::Corruption {
            key: key.to_string(),
            reason: reason.into(),
        }
    }
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
