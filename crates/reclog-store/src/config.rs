use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// How `append` combines new content with a key's existing log.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AppendMode {
    /// The log is a sequence of records; append pushes one record.
    #[default]
    Sequence,
    /// The log is a single record; append merges by content kind.
    #[serde(alias = "legacy-merge")]
    Legacy,
}

impl AppendMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sequence => "sequence",
            Self::Legacy => "legacy",
        }
    }
}

impl FromStr for AppendMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sequence" => Ok(Self::Sequence),
            "legacy" | "legacy-merge" => Ok(Self::Legacy),
            other => Err(format!("unknown append mode: {other:?}")),
        }
    }
}

/// Configuration for a [`RecordLogStore`](crate::RecordLogStore).
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Directory every key is confined to.
    pub root: PathBuf,
    /// Name of the document file inside each key's directory.
    pub file_name: String,
    /// Append semantics.
    pub append_mode: AppendMode,
    /// Extra attempts after a transient read failure.
    pub read_retries: u32,
    /// Pause between read attempts.
    #[serde(with = "millis")]
    pub retry_backoff: Duration,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("files"),
            file_name: "file.json".into(),
            append_mode: AppendMode::Sequence,
            read_retries: 2,
            retry_backoff: Duration::from_millis(10),
        }
    }
}

impl StoreConfig {
    /// Default configuration rooted at `root`.
    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            ..Default::default()
        }
    }
}

mod millis {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        u64::deserialize(d).map(Duration::from_millis)
    }
}
