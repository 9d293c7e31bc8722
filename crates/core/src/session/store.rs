use std::{future::Future, sync::Arc, time::Duration};

use chrono::Utc;
use tracing::{debug, warn};

use super::{
    backend::{CacheBackend, MemoryBackend},
    file::FileBackend,
    lock::{IdentityLocks, SessionLease},
    models::{Session, SessionKey},
};
use crate::{
    config::{AppConfig, BackendKind, SessionConfig},
    error::StoreError,
    models::Status,
};

/// Loads and saves sessions through a [`CacheBackend`].
pub struct SessionStore {
    backend: Arc<dyn CacheBackend>,
    config: SessionConfig,
    key_prefix: String,
    locks: IdentityLocks,
}

impl SessionStore {
    /// Store over `backend`, using the `[session]` and `[cache]` sections of `config`.
    pub fn new(backend: Arc<dyn CacheBackend>, config: &AppConfig) -> Self {
        Self {
            backend,
            config: config.session.clone(),
            key_prefix: config.cache.key_prefix.clone(),
            locks: IdentityLocks::new(),
        }
    }

    /// Build the store with the backend selected in `[session]`.
    pub fn from_config(config: &AppConfig) -> Self {
        let backend: Arc<dyn CacheBackend> = match config.session.backend {
            BackendKind::Memory => Arc::new(MemoryBackend::new()),
            BackendKind::File => Arc::new(FileBackend::new(config.session.dir_or_default())),
        };
        Self::new(backend, config)
    }

    /// Backend behind the store.
    pub fn backend(&self) -> &Arc<dyn CacheBackend> {
        &self.backend
    }

    /// `[session]` section in effect.
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Backend key of a session: `{prefix}{session name}:{msisdn}`.
    pub fn backend_key(&self, key: &SessionKey) -> String {
        format!("{}{}:{}", self.key_prefix, self.config.name, key.msisdn)
    }

    /// Serialize turns of one subscriber.
    pub async fn lock(&self, msisdn: &str) -> Result<SessionLease, StoreError> {
        self.locks.acquire(msisdn, self.config.lock_timeout()).await
    }

    /// Load the session for `key`, or start a fresh one.
    ///
    /// Sessions older than the configured lifetime come back marked stale.
    pub async fn open(&self, key: SessionKey) -> Result<Session, StoreError> {
        let backend_key = self.backend_key(&key);
        let stored = self.bounded("get", self.backend.get(&backend_key)).await?;

        let Some(bytes) = stored else {
            debug!(key = %key, "Starting new session");
            return Ok(Session::new(key, self.config.history_size));
        };

        let mut session: Session = match serde_json::from_slice(&bytes) {
            Ok(session) => session,
            Err(err) => {
                warn!(key = %key, error = %err, "Discarding unreadable session payload");
                return Ok(Session::new(key, self.config.history_size));
            }
        };

        if session.key.session_id != key.session_id {
            debug!(
                key = %key,
                previous = %session.key.session_id,
                "Resuming session under a new transport session id"
            );
        }
        session.key = key;
        session.stale = session.is_expired(self.config.lifetime(), Utc::now());
        if session.stale {
            debug!(key = %session.key, created_at = %session.created_at, "Session is stale");
        }
        Ok(session)
    }

    /// Persist the session with the configured TTL.
    ///
    /// With `clear_on_end`, a session that just ended is deleted instead.
    pub async fn close(&self, session: &Session) -> Result<(), StoreError> {
        let backend_key = self.backend_key(&session.key);
        if self.config.clear_on_end && session.last_status == Some(Status::End) {
            debug!(key = %session.key, "Clearing ended session");
            return self.bounded("delete", self.backend.delete(&backend_key)).await;
        }

        let payload = serde_json::to_vec(session)?;
        self.bounded(
            "set",
            self.backend.set(&backend_key, payload, self.config.timeout()),
        )
        .await
    }

    /// Extend the TTL of the stored session without changing it.
    pub async fn touch(&self, key: &SessionKey) -> Result<bool, StoreError> {
        let backend_key = self.backend_key(key);
        self.bounded(
            "expire",
            self.backend.expire(&backend_key, self.config.timeout()),
        )
        .await
    }

    /// Delete the stored session.
    pub async fn remove(&self, key: &SessionKey) -> Result<(), StoreError> {
        let backend_key = self.backend_key(key);
        self.bounded("delete", self.backend.delete(&backend_key)).await
    }

    async fn bounded<T>(
        &self,
        operation: &'static str,
        call: impl Future<Output = Result<T, StoreError>>,
    ) -> Result<T, StoreError> {
        let limit: Duration = self.config.io_timeout();
        tokio::time::timeout(limit, call)
            .await
            .map_err(|_| StoreError::Timeout(limit, operation))?
    }
}
