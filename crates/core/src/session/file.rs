//! File-backed session storage: one JSON envelope per key.

use std::{
    fs,
    io::{ErrorKind, Write},
    path::{Path, PathBuf},
    time::Duration,
};

use async_trait::async_trait;
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use tracing::{debug, warn};

use super::backend::{CacheBackend, MAX_TTL};
use crate::error::StoreError;

#[derive(Debug, Serialize, Deserialize)]
struct Envelope {
    key: String,
    expires_at: DateTime<Utc>,
    value: String,
}

impl Envelope {
    fn is_live(&self, now: DateTime<Utc>) -> bool {
        self.expires_at > now
    }
}

/// Backend persisting each key to `<root>/<escaped key>.json`.
///
/// Writes go to a temporary file in the same directory and are renamed into
/// place, so readers never observe a partial envelope.
#[derive(Debug, Clone)]
pub struct FileBackend {
    root: PathBuf,
}

impl FileBackend {
    /// Backend rooted at `root`. The directory is created on first write.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Directory holding the session files.
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.root.join(format!("{}.json", escape_component(key)))
    }

    async fn blocking<T, F>(&self, op: F) -> Result<T, StoreError>
    where
        T: Send + 'static,
        F: FnOnce() -> Result<T, StoreError> + Send + 'static,
    {
        tokio::task::spawn_blocking(op)
            .await
            .map_err(|err| StoreError::Backend(format!("file backend task failed: {err}")))?
    }
}

#[async_trait]
impl CacheBackend for FileBackend {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        let path = self.path_for(key);
        let key = key.to_string();
        self.blocking(move || {
            let Some(envelope) = read_envelope(&path)? else {
                return Ok(None);
            };
            if envelope.key != key {
                warn!(path = %path.display(), "Session file holds a different key");
                return Ok(None);
            }
            if !envelope.is_live(Utc::now()) {
                debug!(key = %key, "Session file expired");
                remove_file(&path)?;
                return Ok(None);
            }
            Ok(Some(envelope.value.into_bytes()))
        })
        .await
    }

    async fn set(&self, key: &str, value: Vec<u8>, ttl: Duration) -> Result<(), StoreError> {
        let path = self.path_for(key);
        let root = self.root.clone();
        let value = String::from_utf8(value)
            .map_err(|err| StoreError::Backend(format!("session payload is not UTF-8: {err}")))?;
        let envelope = Envelope {
            key: key.to_string(),
            expires_at: expiry(ttl),
            value,
        };
        self.blocking(move || write_envelope(&root, &path, &envelope))
            .await
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        let path = self.path_for(key);
        self.blocking(move || remove_file(&path)).await
    }

    async fn expire(&self, key: &str, ttl: Duration) -> Result<bool, StoreError> {
        let path = self.path_for(key);
        let root = self.root.clone();
        self.blocking(move || {
            let Some(mut envelope) = read_envelope(&path)? else {
                return Ok(false);
            };
            if !envelope.is_live(Utc::now()) {
                remove_file(&path)?;
                return Ok(false);
            }
            envelope.expires_at = expiry(ttl);
            write_envelope(&root, &path, &envelope)?;
            Ok(true)
        })
        .await
    }
}

fn expiry(ttl: Duration) -> DateTime<Utc> {
    let now = Utc::now();
    ChronoDuration::from_std(ttl.min(MAX_TTL))
        .ok()
        .and_then(|ttl| now.checked_add_signed(ttl))
        .unwrap_or(now)
}

fn read_envelope(path: &Path) -> Result<Option<Envelope>, StoreError> {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(err) if err.kind() == ErrorKind::NotFound => return Ok(None),
        Err(err) => return Err(err.into()),
    };
    if content.trim().is_empty() {
        return Ok(None);
    }
    Ok(Some(serde_json::from_str(&content)?))
}

fn write_envelope(root: &Path, path: &Path, envelope: &Envelope) -> Result<(), StoreError> {
    fs::create_dir_all(root)?;
    let serialised = serde_json::to_vec(envelope)?;
    let mut tmp = NamedTempFile::new_in(root)?;
    tmp.write_all(&serialised)?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|err| StoreError::Io(err.error))?;
    Ok(())
}

fn remove_file(path: &Path) -> Result<(), StoreError> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
        Err(err) => Err(err.into()),
    }
}

/// Make a key safe as a file name; other characters become `~XX` hex escapes.
fn escape_component(input: &str) -> String {
    let mut result = String::with_capacity(input.len());
    for byte in input.bytes() {
        if byte.is_ascii_alphanumeric() || matches!(byte, b'-' | b'_') {
            result.push(byte as char);
        } else {
            result.push_str(&format!("~{byte:02X}"));
        }
    }
    if result.is_empty() {
        "session".to_string()
    } else {
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn file_round_trip() -> anyhow::Result<()> {
        let dir = tempdir()?;
        let backend = FileBackend::new(dir.path().join("sessions"));

        assert_eq!(backend.get("ussd_session:2547").await?, None);
        backend
            .set("ussd_session:2547", b"{\"a\":1}".to_vec(), Duration::from_secs(60))
            .await?;
        assert!(backend.root().join("ussd_session~3A2547.json").exists());
        assert_eq!(
            backend.get("ussd_session:2547").await?,
            Some(b"{\"a\":1}".to_vec())
        );

        assert!(backend.expire("ussd_session:2547", Duration::from_secs(5)).await?);
        backend.delete("ussd_session:2547").await?;
        assert_eq!(backend.get("ussd_session:2547").await?, None);
        assert!(!backend.expire("ussd_session:2547", Duration::from_secs(5)).await?);
        Ok(())
    }

    #[tokio::test]
    async fn huge_ttls_are_capped() -> anyhow::Result<()> {
        let dir = tempdir()?;
        let backend = FileBackend::new(dir.path());
        backend.set("k", b"v".to_vec(), Duration::MAX).await?;
        assert_eq!(backend.get("k").await?, Some(b"v".to_vec()));
        assert!(backend.expire("k", Duration::from_secs(u64::MAX)).await?);
        Ok(())
    }

    #[tokio::test]
    async fn expired_files_are_removed_on_read() -> anyhow::Result<()> {
        let dir = tempdir()?;
        let backend = FileBackend::new(dir.path());
        backend.set("k", b"v".to_vec(), Duration::ZERO).await?;
        assert_eq!(backend.get("k").await?, None);
        assert!(!dir.path().join("k.json").exists());
        Ok(())
    }

    #[test]
    fn escaping_keeps_keys_distinct() {
        assert_eq!(escape_component("a:b"), "a~3Ab");
        assert_ne!(escape_component("a:b"), escape_component("ab"));
        assert_eq!(escape_component(""), "session");
    }
}
