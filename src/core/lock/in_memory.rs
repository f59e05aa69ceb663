//! In-process lock manager
//!
//! Leases live in a single table guarded by a `parking_lot` mutex; waiters
//! sleep on a condition variable that is signalled on every release. A lease
//! whose hold timeout has passed counts as free and is taken over by the next
//! acquirer.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};
use tracing::{debug, warn};
use uuid::Uuid;

use super::{LockHandle, LockManager};
use crate::types::LockError;

#[derive(Debug, Clone, Copy)]
struct Lease {
    token: Uuid,
    expires_at: Instant,
}

/// Lock manager backed by an in-process lease table
#[derive(Debug, Default)]
pub struct InMemoryLockManager {
    leases: Mutex<HashMap<String, Lease>>,
    released: Condvar,
}

impl InMemoryLockManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether `key` currently has an unexpired lease
    pub fn is_held(&self, key: &str) -> bool {
        let now = Instant::now();
        self.leases
            .lock()
            .get(key)
            .is_some_and(|lease| lease.expires_at > now)
    }
}

impl LockManager for InMemoryLockManager {
    fn acquire(
        &self,
        key: &str,
        wait_timeout: Duration,
        hold_timeout: Duration,
    ) -> Result<LockHandle, LockError> {
        debug!(key, "trying lock");
        let started = Instant::now();
        let deadline = started + wait_timeout;
        let mut leases = self.leases.lock();

        loop {
            let now = Instant::now();
            let wake_at = match leases.get(key) {
                Some(lease) if lease.expires_at > now => {
                    if now >= deadline {
                        let waited = now - started;
                        warn!(key, ?waited, "lock acquisition timed out");
                        return Err(LockError::timeout(key, waited));
                    }
                    deadline.min(lease.expires_at)
                }
                Some(_) => {
                    warn!(key, "force-releasing expired lease");
                    break;
                }
                None => break,
            };

            // Wakes on release, on the lease expiring, or on our own deadline
            self.released.wait_until(&mut leases, wake_at);
        }

        let handle = LockHandle::new(key, hold_timeout);
        leases.insert(
            key.to_string(),
            Lease {
                token: handle.token(),
                expires_at: handle.expires_at(),
            },
        );
        debug!(key, "lock acquired");
        Ok(handle)
    }

    fn release(&self, handle: &LockHandle) {
        let mut leases = self.leases.lock();
        match leases.get(handle.key()) {
            Some(lease) if lease.token == handle.token() => {
                leases.remove(handle.key());
                drop(leases);
                debug!(key = handle.key(), "lock released");
                self.released.notify_all();
            }
            _ => debug!(key = handle.key(), "release of stale lease ignored"),
        }
    }
}
