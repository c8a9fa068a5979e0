use crate::models::{ordered_pair, UserId};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};
use tokio::time::{timeout_at, Instant};

#[derive(Debug, Error)]
#[error("timed out after {waited:?} waiting for lock on user {user}")]
pub struct LockTimeout {
    pub user: UserId,
    pub waited: Duration,
}

#[derive(Debug)]
struct Entry {
    lock: Arc<AsyncMutex<()>>,
    leases: usize,
}

type LockTable = Mutex<HashMap<UserId, Entry>>;

/// Issues one mutual-exclusion lock per user
///
/// Table entries are leased: a caller takes a lease before waiting and
/// returns it after unlocking, and an entry is removed only when its last
/// lease comes back. A waiter always waits on the lock the holder releases.
#[derive(Clone)]
pub struct UserLockRegistry {
    table: Arc<LockTable>,
    timeout: Duration,
}

impl UserLockRegistry {
    pub fn new(timeout: Duration) -> Self {
        Self {
            table: Arc::new(Mutex::new(HashMap::new())),
            timeout,
        }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Wait for exclusive access to `user`, bounded by the registry timeout.
    pub async fn acquire(&self, user: UserId) -> Result<UserLockGuard, LockTimeout> {
        let deadline = Instant::now() + self.timeout;
        self.acquire_until(user, deadline).await
    }

    /// Lock both users, smallest id first, under one shared deadline.
    pub async fn acquire_pair(&self, a: UserId, b: UserId) -> Result<PairLockGuard, LockTimeout> {
        let deadline = Instant::now() + self.timeout;
        let (low, high) = ordered_pair(a, b);

        let first = self.acquire_until(low, deadline).await?;
        let second = if high == low {
            None
        } else {
            Some(self.acquire_until(high, deadline).await?)
        };

        Ok(PairLockGuard {
            _second: second,
            _first: first,
        })
    }

    /// Number of users currently holding or waiting on a lock
    pub fn active_entries(&self) -> usize {
        self.table.lock().len()
    }

    async fn acquire_until(
        &self,
        user: UserId,
        deadline: Instant,
    ) -> Result<UserLockGuard, LockTimeout> {
        let (lock, lease) = self.lease(user);

        match timeout_at(deadline, lock.lock_owned()).await {
            Ok(guard) => Ok(UserLockGuard {
                _guard: guard,
                _lease: lease,
            }),
            Err(_) => {
                tracing::warn!("Lock wait timed out for user {} after {:?}", user, self.timeout);
                Err(LockTimeout {
                    user,
                    waited: self.timeout,
                })
            }
        }
    }

    fn lease(&self, user: UserId) -> (Arc<AsyncMutex<()>>, Lease) {
        let mut table = self.table.lock();
        let entry = table.entry(user).or_insert_with(|| Entry {
            lock: Arc::new(AsyncMutex::new(())),
            leases: 0,
        });
        entry.leases += 1;
        let lock = Arc::clone(&entry.lock);
        drop(table);

        (
            lock,
            Lease {
                table: Arc::clone(&self.table),
                user,
            },
        )
    }

    #[cfg(test)]
    fn lock_identity(&self, user: UserId) -> Option<(usize, usize)> {
        self.table
            .lock()
            .get(&user)
            .map(|entry| (Arc::as_ptr(&entry.lock) as usize, entry.leases))
    }
}

impl std::fmt::Debug for UserLockRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UserLockRegistry")
            .field("active_entries", &self.active_entries())
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// Claim on a table entry, returned on drop
#[derive(Debug)]
struct Lease {
    table: Arc<LockTable>,
    user: UserId,
}

impl Drop for Lease {
    fn drop(&mut self) {
        let mut table = self.table.lock();
        if let Some(entry) = table.get_mut(&self.user) {
            entry.leases -= 1;
            if entry.leases == 0 {
                table.remove(&self.user);
            }
        }
    }
}

/// Exclusive access to one user; released on drop
#[derive(Debug)]
pub struct UserLockGuard {
    // field order matters: the mutex is released before the lease is returned
    _guard: OwnedMutexGuard<()>,
    _lease: Lease,
}

/// Exclusive access to both users of a pair
#[derive(Debug)]
pub struct PairLockGuard {
    _second: Option<UserLockGuard>,
    _first: UserLockGuard,
}
