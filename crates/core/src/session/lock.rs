use std::{collections::HashMap, sync::Arc, time::Duration};

use parking_lot::Mutex;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

use crate::error::StoreError;

type LockMap = Mutex<HashMap<String, Arc<AsyncMutex<()>>>>;

/// Per-identity leases serializing turns of one subscriber within a process.
#[derive(Default)]
pub struct IdentityLocks {
    locks: Arc<LockMap>,
}

/// Exclusive right to run a turn for one identity. Released on drop.
pub struct SessionLease {
    identity: String,
    locks: Arc<LockMap>,
    guard: Option<OwnedMutexGuard<()>>,
}

impl IdentityLocks {
    /// Empty lock table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait up to `timeout` for the lease of `identity`.
    pub async fn acquire(
        &self,
        identity: &str,
        timeout: Duration,
    ) -> Result<SessionLease, StoreError> {
        let mutex = self
            .locks
            .lock()
            .entry(identity.to_string())
            .or_default()
            .clone();

        let guard = tokio::time::timeout(timeout, mutex.lock_owned())
            .await
            .map_err(|_| StoreError::LockTimeout(timeout, identity.to_string()))?;

        Ok(SessionLease {
            identity: identity.to_string(),
            locks: Arc::clone(&self.locks),
            guard: Some(guard),
        })
    }

    /// Identities with a held or awaited lease.
    pub fn active(&self) -> usize {
        self.locks.lock().len()
    }
}

impl SessionLease {
    /// Identity this lease serializes.
    pub fn identity(&self) -> &str {
        &self.identity
    }
}

impl Drop for SessionLease {
    fn drop(&mut self) {
        let mut locks = self.locks.lock();
        self.guard.take();
        // Only the map's own reference left: nobody holds or waits for it.
        if locks
            .get(&self.identity)
            .map(|mutex| Arc::strong_count(mutex) == 1)
            .unwrap_or(false)
        {
            locks.remove(&self.identity);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn second_lease_waits_for_the_first() -> anyhow::Result<()> {
        let locks = IdentityLocks::new();
        let lease = locks.acquire("2547", Duration::from_secs(1)).await?;
        assert_eq!(lease.identity(), "2547");

        let err = locks
            .acquire("2547", Duration::from_millis(20))
            .await
            .err()
            .map(|err| err.to_string());
        assert!(err.is_some_and(|err| err.contains("2547")));

        let other = locks.acquire("2548", Duration::from_millis(20)).await?;
        drop(other);

        drop(lease);
        let again = locks.acquire("2547", Duration::from_millis(20)).await?;
        drop(again);
        assert_eq!(locks.active(), 0);
        Ok(())
    }

    #[tokio::test]
    async fn waiter_gets_the_lease_after_release() -> anyhow::Result<()> {
        let locks = Arc::new(IdentityLocks::new());
        let lease = locks.acquire("2547", Duration::from_secs(1)).await?;

        let waiter = {
            let locks = Arc::clone(&locks);
            tokio::spawn(async move {
                locks
                    .acquire("2547", Duration::from_secs(2))
                    .await
                    .map(|lease| lease.identity().to_string())
            })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        drop(lease);

        assert_eq!(waiter.await??, "2547");
        assert_eq!(locks.active(), 0);
        Ok(())
    }
}
