//! Key/value backends holding serialized sessions.

use std::{
    collections::HashMap,
    time::{Duration, Instant},
};

use async_trait::async_trait;
use parking_lot::RwLock;

use crate::error::StoreError;

/// Byte-oriented key/value cache with per-key expiry.
///
/// Implementations must be safe to share between concurrent turns.
#[async_trait]
pub trait CacheBackend: Send + Sync {
    /// Fetch a live value; expired keys read as missing.
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError>;

    /// Store a value that expires after `ttl`.
    async fn set(&self, key: &str, value: Vec<u8>, ttl: Duration) -> Result<(), StoreError>;

    /// Remove a key. Missing keys are not an error.
    async fn delete(&self, key: &str) -> Result<(), StoreError>;

    /// Reset the expiry of an existing key; returns whether the key existed.
    async fn expire(&self, key: &str, ttl: Duration) -> Result<bool, StoreError>;
}

struct Entry {
    value: Vec<u8>,
    expires_at: Instant,
}

impl Entry {
    fn is_live(&self, now: Instant) -> bool {
        self.expires_at > now
    }
}

/// In-process backend. Expired entries are dropped lazily.
#[derive(Default)]
pub struct MemoryBackend {
    entries: RwLock<HashMap<String, Entry>>,
}

impl MemoryBackend {
    /// Empty backend.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live entries.
    pub fn len(&self) -> usize {
        let now = Instant::now();
        self.entries
            .read()
            .values()
            .filter(|entry| entry.is_live(now))
            .count()
    }

    /// Whether no live entries remain.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl CacheBackend for MemoryBackend {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        let now = Instant::now();
        {
            let entries = self.entries.read();
            match entries.get(key) {
                Some(entry) if entry.is_live(now) => return Ok(Some(entry.value.clone())),
                Some(_) => {}
                None => return Ok(None),
            }
        }
        self.entries.write().remove(key);
        Ok(None)
    }

    async fn set(&self, key: &str, value: Vec<u8>, ttl: Duration) -> Result<(), StoreError> {
        let entry = Entry {
            value,
            expires_at: deadline(Instant::now(), ttl),
        };
        self.entries.write().insert(key.to_string(), entry);
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        self.entries.write().remove(key);
        Ok(())
    }

    async fn expire(&self, key: &str, ttl: Duration) -> Result<bool, StoreError> {
        let now = Instant::now();
        let mut entries = self.entries.write();
        match entries.get_mut(key) {
            Some(entry) if entry.is_live(now) => {
                entry.expires_at = deadline(now, ttl);
                Ok(true)
            }
            Some(_) => {
                entries.remove(key);
                Ok(false)
            }
            None => Ok(false),
        }
    }
}

/// Longest TTL honoured by the bundled backends; longer ones are capped.
pub(crate) const MAX_TTL: Duration = Duration::from_secs(365 * 24 * 60 * 60);

fn deadline(now: Instant, ttl: Duration) -> Instant {
    now.checked_add(ttl.min(MAX_TTL)).unwrap_or(now)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn values_expire() -> anyhow::Result<()> {
        let backend = MemoryBackend::new();
        backend
            .set("a", b"one".to_vec(), Duration::from_millis(20))
            .await?;
        backend.set("b", b"two".to_vec(), Duration::from_secs(60)).await?;
        assert_eq!(backend.get("a").await?, Some(b"one".to_vec()));
        assert_eq!(backend.len(), 2);

        tokio::time::sleep(Duration::from_millis(40)).await;
        assert_eq!(backend.get("a").await?, None);
        assert!(!backend.expire("a", Duration::from_secs(1)).await?);
        assert_eq!(backend.len(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn expire_extends_and_delete_removes() -> anyhow::Result<()> {
        let backend = MemoryBackend::new();
        backend
            .set("k", b"v".to_vec(), Duration::from_millis(20))
            .await?;
        assert!(backend.expire("k", Duration::from_secs(60)).await?);
        tokio::time::sleep(Duration::from_millis(40)).await;
        assert_eq!(backend.get("k").await?, Some(b"v".to_vec()));

        backend.delete("k").await?;
        backend.delete("k").await?;
        assert!(backend.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn huge_ttls_are_capped() -> anyhow::Result<()> {
        let backend = MemoryBackend::new();
        backend.set("k", b"v".to_vec(), Duration::MAX).await?;
        assert_eq!(backend.get("k").await?, Some(b"v".to_vec()));
        assert!(backend.expire("k", Duration::MAX).await?);
        assert_eq!(backend.len(), 1);
        Ok(())
    }
}
