//! Per-account mutual exclusion
//!
//! A [`LockManager`] hands out exclusive leases on a string key (an account
//! number plus a prefix) with a bounded wait for acquisition and a bounded hold
//! time after which the lease is force-released. Callers normally go through
//! [`LockGuard`] or [`with_lock`], which release on every exit path, including
//! `?` propagation and panics.
//!
//! # Implementations
//!
//! - [`InMemoryLockManager`]: in-process lease table, used by tests and the
//!   replay CLI
//! - `RedisLockManager` (feature `redis`): lease stored in Redis with
//!   `SET NX PX`, released with a compare-and-delete script

use std::time::{Duration, Instant};

use uuid::Uuid;

use crate::types::LockError;

pub mod in_memory;
#[cfg(feature = "redis")]
pub mod redis;

pub use in_memory::InMemoryLockManager;
#[cfg(feature = "redis")]
pub use self::redis::RedisLockManager;

/// Proof of a successful acquisition
///
/// The token distinguishes this acquisition from any later one on the same key,
/// which is what makes releasing a stale handle a no-op.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LockHandle {
    key: String,
    token: Uuid,
    expires_at: Instant,
}

impl LockHandle {
    pub fn new(key: impl Into<String>, hold_timeout: Duration) -> Self {
        Self {
            key: key.into(),
            token: Uuid::new_v4(),
            expires_at: Instant::now() + hold_timeout,
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn token(&self) -> Uuid {
        self.token
    }

    /// When the lease is force-released if not released earlier
    pub fn expires_at(&self) -> Instant {
        self.expires_at
    }

    pub fn is_expired(&self) -> bool {
        Instant::now() >= self.expires_at
    }
}

/// Mutual exclusion scoped to a resource key
pub trait LockManager: Send + Sync {
    /// Acquire the lock for `key`
    ///
    /// Blocks for at most `wait_timeout`. The returned lease stays exclusive
    /// until it is released or `hold_timeout` elapses. On error, the caller
    /// holds nothing.
    fn acquire(
        &self,
        key: &str,
        wait_timeout: Duration,
        hold_timeout: Duration,
    ) -> Result<LockHandle, LockError>;

    /// Release a lease
    ///
    /// Idempotent: releasing an expired or already released handle is a no-op.
    fn release(&self, handle: &LockHandle);
}

/// Scoped lease that releases itself when dropped
pub struct LockGuard<'a> {
    manager: &'a dyn LockManager,
    handle: Option<LockHandle>,
}

impl<'a> LockGuard<'a> {
    /// Acquire `key` and wrap the lease in a guard
    pub fn acquire(
        manager: &'a dyn LockManager,
        key: &str,
        wait_timeout: Duration,
        hold_timeout: Duration,
    ) -> Result<Self, LockError> {
        let handle = manager.acquire(key, wait_timeout, hold_timeout)?;
        Ok(Self {
            manager,
            handle: Some(handle),
        })
    }

    pub fn handle(&self) -> Option<&LockHandle> {
        self.handle.as_ref()
    }

    /// Release now instead of at end of scope
    pub fn release(mut self) {
        self.release_inner();
    }

    fn release_inner(&mut self) {
        if let Some(handle) = self.handle.take() {
            self.manager.release(&handle);
        }
    }
}

impl Drop for LockGuard<'_> {
    fn drop(&mut self) {
        self.release_inner();
    }
}

/// Run `f` while holding the lock for `key`
///
/// The lock is released before this function returns, whether `f` returns
/// normally or unwinds.
pub fn with_lock<T, F>(
    manager: &dyn LockManager,
    key: &str,
    wait_timeout: Duration,
    hold_timeout: Duration,
    f: F,
) -> Result<T, LockError>
where
    F: FnOnce() -> T,
{
    with_lease(manager, key, wait_timeout, hold_timeout, |_| f())
}

/// Like [`with_lock`], but `f` sees the lease it runs under
///
/// Work that may outlive `hold_timeout` checks [`LockHandle::is_expired`]
/// before touching the protected state.
pub fn with_lease<T, F>(
    manager: &dyn LockManager,
    key: &str,
    wait_timeout: Duration,
    hold_timeout: Duration,
    f: F,
) -> Result<T, LockError>
where
    F: FnOnce(&LockHandle) -> T,
{
    let handle = manager.acquire(key, wait_timeout, hold_timeout)?;
    let guard = LockGuard {
        manager,
        handle: Some(handle.clone()),
    };
    let value = f(&handle);
    guard.release();
    Ok(value)
}
