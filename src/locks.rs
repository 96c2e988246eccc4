use crate::domain::UserId;
use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

type LockMap = DashMap<UserId, Arc<Mutex<()>>>;

/// Per-user mutual exclusion
///
/// Balance mutations for the same user must not interleave their read and write steps.
/// Each user gets their own lock, so work on different users never waits on each other.
/// A user's entry only lives while someone holds or waits for its lock.
#[derive(Clone, Debug, Default)]
pub struct UserLocks {
    locks: Arc<LockMap>,
}

impl UserLocks {
    /// Wait until no other mutation holds the lock for `user_id`
    ///
    /// The lock is released when the returned guard is dropped.
    pub async fn lock(&self, user_id: UserId) -> UserLockGuard {
        // Clone the Arc out so the map shard is not held while waiting
        let lock = self.locks.entry(user_id).or_default().value().clone();
        let guard = lock.lock_owned().await;
        UserLockGuard {
            user_id,
            locks: self.locks.clone(),
            guard: Some(guard),
        }
    }

    /// Number of users with a held or awaited lock
    pub fn len(&self) -> usize {
        self.locks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locks.is_empty()
    }
}

/// Exclusive access to one user's balance
///
/// Dropping the guard releases the lock and forgets the user if nobody else is waiting.
#[derive(Debug)]
pub struct UserLockGuard {
    user_id: UserId,
    locks: Arc<LockMap>,
    guard: Option<OwnedMutexGuard<()>>,
}

impl Drop for UserLockGuard {
    fn drop(&mut self) {
        // Releasing first drops this guard's reference to the mutex
        self.guard.take();
        // Waiters hold their own clone, so a count of 1 means only the map is left
        self.locks
            .remove_if(&self.user_id, |_, lock| Arc::strong_count(lock) == 1);
    }
}
