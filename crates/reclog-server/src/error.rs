use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("store error: {0}")]
    Store(#[from] reclog_store::StoreError),

    #[error("authentication failed: token is missing")]
    TokenMissing,

    #[error("authentication failed: {0}")]
    TokenInvalid(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("internal error: {0}")]
    Internal(String),
}

impl ServerError {
    /// Stable name of the error kind, used in user-facing messages.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::Store(e) => e.kind_name(),
            Self::TokenMissing | Self::TokenInvalid(_) => "AuthError",
            Self::Config(_) => "ConfigError",
            Self::Io(_) => "IOError",
            Self::Internal(_) => "InternalError",
        }
    }
}

pub type ServerResult<T> = Result<T, ServerError>;
