use std::sync::Arc;

use reclog_store::{RecordLogStore, StoreResult};
use tracing::warn;

use crate::auth::{AllowAllAuth, AuthProvider, Hs256Auth};
use crate::config::ServerConfig;
use crate::error::{ServerError, ServerResult};

/// Shared handler state: the store and the token gate.
#[derive(Clone)]
pub struct AppState {
    store: Arc<RecordLogStore>,
    auth: Arc<dyn AuthProvider>,
}

impl AppState {
    pub fn new(store: RecordLogStore, auth: Arc<dyn AuthProvider>) -> Self {
        Self { store: Arc::new(store), auth }
    }

    pub fn from_config(config: &ServerConfig) -> Self {
        let auth: Arc<dyn AuthProvider> = match &config.token_secret {
            Some(secret) => Arc::new(Hs256Auth::new(secret)),
            None => {
                warn!("no token secret configured; mutating endpoints accept any request");
                Arc::new(AllowAllAuth)
            }
        };
        Self::new(RecordLogStore::open(config.store.clone()), auth)
    }

    pub fn store(&self) -> &RecordLogStore {
        &self.store
    }

    pub fn auth(&self) -> &dyn AuthProvider {
        self.auth.as_ref()
    }

    /// Run a blocking store operation off the async executor.
    pub async fn run<T, F>(&self, f: F) -> ServerResult<T>
    where
        F: FnOnce(&RecordLogStore) -> StoreResult<T> + Send + 'static,
        T: Send + 'static,
    {
        let store = Arc::clone(&self.store);
        let result = tokio::task::spawn_blocking(move || f(&store))
            .await
            .map_err(|e| ServerError::Internal(format!("store task failed: {e}")))?;
        Ok(result?)
    }
}
