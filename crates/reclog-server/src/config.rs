use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use reclog_store::{AppendMode, StoreConfig};
use serde::{Deserialize, Serialize};

use crate::error::{ServerError, ServerResult};

/// Prefix of every environment variable the server reads.
pub const ENV_PREFIX: &str = "RECLOG_";

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind_addr: SocketAddr,
    pub store: StoreConfig,
    /// HS256 secret for bearer tokens. Without one, mutating endpoints are open.
    pub token_secret: Option<String>,
    pub cors: bool,
    pub verbose: bool,
    pub max_body_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 5000)),
            store: StoreConfig::default(),
            token_secret: None,
            cors: true,
            verbose: false,
            max_body_bytes: 2 * 1024 * 1024,
        }
    }
}

impl ServerConfig {
    /// Parse a TOML configuration; missing fields take their defaults.
    pub fn from_toml_str(text: &str) -> ServerResult<Self> {
        toml::from_str(text).map_err(|e| ServerError::Config(e.to_string()))
    }

    /// Load from an optional TOML file, then apply `RECLOG_*` environment overrides.
    pub fn load(path: Option<&Path>) -> ServerResult<Self> {
        let mut config = match path {
            Some(path) => Self::from_toml_str(&std::fs::read_to_string(path)?)?,
            None => Self::default(),
        };
        config.apply_vars(std::env::vars())?;
        Ok(config)
    }

    /// Apply overrides from `(name, value)` pairs. Unknown names are ignored.
    pub fn apply_vars<I>(&mut self, vars: I) -> ServerResult<()>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        for (name, value) in vars {
            let Some(field) = name.strip_prefix(ENV_PREFIX) else {
                continue;
            };
            match field {
                "BIND" => {
                    self.bind_addr = value
                        .parse()
                        .map_err(|e| ServerError::Config(format!("{name}: {e}")))?;
                }
                "ROOT" => self.store.root = PathBuf::from(value),
                "FILE_NAME" => self.store.file_name = value,
                "APPEND_MODE" => {
                    self.store.append_mode = value
                        .parse::<AppendMode>()
                        .map_err(|e| ServerError::Config(format!("{name}: {e}")))?;
                }
                "TOKEN_SECRET" => {
                    self.token_secret = Some(value).filter(|s| !s.is_empty());
                }
                "CORS" => self.cors = parse_flag(&name, &value)?,
                "VERBOSE" => self.verbose = parse_flag(&name, &value)?,
                _ => {}
            }
        }
        Ok(())
    }
}

fn parse_flag(name: &str, value: &str) -> ServerResult<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        other => Err(ServerError::Config(format!("{name}: not a boolean: {other:?}"))),
    }
}
