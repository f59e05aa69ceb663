//! Redis-backed lock manager
//!
//! A lease is a Redis key holding the acquirer's token, created with
//! `SET key token NX PX hold_ms` so Redis itself expires it when the holder
//! never releases. Release deletes the key only if it still holds the caller's
//! token, so a stale handle can never free somebody else's lease.
//!
//! Connection failures surface as `LockError::BackendUnavailable`. Connecting
//! and every command are bounded by the caller's remaining wait, so an
//! unreachable server cannot stall `acquire` past `wait_timeout`.

use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use tracing::{debug, warn};

use super::{LockHandle, LockManager};
use crate::types::LockError;

/// Delay between `SET NX` attempts while the key is held elsewhere
const DEFAULT_RETRY_INTERVAL: Duration = Duration::from_millis(25);

/// Bound on connecting and deleting during `release`
const DEFAULT_RELEASE_TIMEOUT: Duration = Duration::from_secs(1);

/// Floor for socket timeouts; a zero timeout is rejected by the socket layer
const MIN_IO_TIMEOUT: Duration = Duration::from_millis(10);

const RELEASE_SCRIPT: &str = r#"
if redis.call("GET", KEYS[1]) == ARGV[1] then
    return redis.call("DEL", KEYS[1])
else
    return 0
end
"#;

#[derive(Debug, Clone)]
pub struct RedisLockManager {
    client: Arc<redis::Client>,
    retry_interval: Duration,
    release_timeout: Duration,
}

impl RedisLockManager {
    /// Create a lock manager for the Redis server at `redis_url`
    ///
    /// Only the URL is validated here; the server is contacted on first use.
    pub fn new(redis_url: impl AsRef<str>) -> Result<Self, LockError> {
        let client = redis::Client::open(redis_url.as_ref())
            .map_err(|e| LockError::backend_unavailable(redis_url.as_ref(), e.to_string()))?;

        Ok(Self {
            client: Arc::new(client),
            retry_interval: DEFAULT_RETRY_INTERVAL,
            release_timeout: DEFAULT_RELEASE_TIMEOUT,
        })
    }

    pub fn with_retry_interval(mut self, retry_interval: Duration) -> Self {
        self.retry_interval = retry_interval;
        self
    }

    pub fn with_release_timeout(mut self, release_timeout: Duration) -> Self {
        self.release_timeout = release_timeout;
        self
    }

    /// Open a connection that gives up by `deadline`
    fn connect(&self, key: &str, deadline: Instant) -> Result<redis::Connection, LockError> {
        let conn = self
            .client
            .get_connection_with_timeout(io_budget(deadline, Instant::now()))
            .map_err(|e| LockError::backend_unavailable(key, e.to_string()))?;
        bound_io(&conn, key, deadline)?;
        Ok(conn)
    }

    fn try_set(
        &self,
        conn: &mut redis::Connection,
        handle: &LockHandle,
        hold_timeout: Duration,
    ) -> Result<bool, LockError> {
        // PX 0 is rejected by Redis
        let hold_ms = hold_timeout.as_millis().max(1) as u64;
        let reply: Option<String> = redis::cmd("SET")
            .arg(handle.key())
            .arg(handle.token().to_string())
            .arg("NX")
            .arg("PX")
            .arg(hold_ms)
            .query(conn)
            .map_err(|e| LockError::backend_unavailable(handle.key(), e.to_string()))?;

        Ok(reply.is_some())
    }
}

impl LockManager for RedisLockManager {
    fn acquire(
        &self,
        key: &str,
        wait_timeout: Duration,
        hold_timeout: Duration,
    ) -> Result<LockHandle, LockError> {
        debug!(key, "trying lock");
        let started = Instant::now();
        let deadline = started + wait_timeout;
        let mut conn = self.connect(key, deadline)?;

        loop {
            bound_io(&conn, key, deadline)?;
            let handle = LockHandle::new(key, hold_timeout);
            if self.try_set(&mut conn, &handle, hold_timeout)? {
                debug!(key, "lock acquired");
                return Ok(handle);
            }

            let now = Instant::now();
            if now >= deadline {
                let waited = now - started;
                warn!(key, ?waited, "lock acquisition timed out");
                return Err(LockError::timeout(key, waited));
            }
            thread::sleep(self.retry_interval.min(deadline - now));
        }
    }

    fn release(&self, handle: &LockHandle) {
        let deadline = Instant::now() + self.release_timeout;
        let mut conn = match self.connect(handle.key(), deadline) {
            Ok(conn) => conn,
            Err(e) => {
                warn!(key = handle.key(), error = %e, "could not reach redis to release lock");
                return;
            }
        };

        let deleted: Result<i64, _> = redis::Script::new(RELEASE_SCRIPT)
            .key(handle.key())
            .arg(handle.token().to_string())
            .invoke(&mut conn);

        match deleted {
            Ok(1) => debug!(key = handle.key(), "lock released"),
            Ok(_) => debug!(key = handle.key(), "release of stale lease ignored"),
            Err(e) => warn!(key = handle.key(), error = %e, "lock release failed"),
        }
    }
}

/// Time left until `deadline`, never below the socket timeout floor
fn io_budget(deadline: Instant, now: Instant) -> Duration {
    deadline.saturating_duration_since(now).max(MIN_IO_TIMEOUT)
}

/// Cap reads and writes on `conn` at the time left until `deadline`
fn bound_io(conn: &redis::Connection, key: &str, deadline: Instant) -> Result<(), LockError> {
    let budget = io_budget(deadline, Instant::now());
    conn.set_read_timeout(Some(budget))
        .and_then(|()| conn.set_write_timeout(Some(budget)))
        .map_err(|e| LockError::backend_unavailable(key, e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_url_is_backend_unavailable() {
        let result = RedisLockManager::new("not a url");
        assert!(matches!(result, Err(LockError::BackendUnavailable { .. })));
    }

    #[test]
    fn test_unreachable_server_is_backend_unavailable() {
        // Port 1 is reserved; nothing listens there
        let manager = RedisLockManager::new("redis://127.0.0.1:1/").unwrap();

        let result = manager.acquire("ACLK:1000000000", Duration::ZERO, Duration::from_secs(1));

        assert!(matches!(result, Err(LockError::BackendUnavailable { .. })));
    }

    #[test]
    fn test_io_budget_is_remaining_wait_with_a_floor() {
        let now = Instant::now();

        assert_eq!(io_budget(now + Duration::from_millis(300), now), Duration::from_millis(300));
        assert_eq!(io_budget(now, now), MIN_IO_TIMEOUT);
        assert_eq!(io_budget(now, now + Duration::from_secs(1)), MIN_IO_TIMEOUT);
    }

    #[test]
    fn test_unroutable_server_fails_within_wait_bound() {
        // Non-routable address: connecting either fails at once or hangs
        let manager = RedisLockManager::new("redis://10.255.255.1:6379/").unwrap();

        let started = Instant::now();
        let result = manager.acquire(
            "ACLK:1000000000",
            Duration::from_millis(200),
            Duration::from_secs(1),
        );

        assert!(matches!(result, Err(LockError::BackendUnavailable { .. })));
        assert!(started.elapsed() < Duration::from_secs(2));
    }

    #[test]
    fn test_release_against_unroutable_server_is_bounded() {
        let manager = RedisLockManager::new("redis://10.255.255.1:6379/")
            .unwrap()
            .with_release_timeout(Duration::from_millis(200));
        let handle = LockHandle::new("ACLK:1000000000", Duration::from_secs(1));

        let started = Instant::now();
        manager.release(&handle);

        assert!(started.elapsed() < Duration::from_secs(2));
    }
}
