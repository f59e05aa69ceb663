//! Balance engine configuration

use std::time::Duration;

use tracing::warn;

use crate::types::LedgerError;

/// Smallest amount a single use may request
pub const DEFAULT_MIN_AMOUNT: u64 = 10;

/// Largest amount a single use may request
pub const DEFAULT_MAX_AMOUNT: u64 = 1_000_000_000;

/// How long a caller waits for a busy account lock
pub const DEFAULT_LOCK_WAIT: Duration = Duration::from_secs(1);

/// How long a lock may be held before it is force-released
pub const DEFAULT_LOCK_HOLD: Duration = Duration::from_secs(15);

pub const DEFAULT_LOCK_KEY_PREFIX: &str = "ACLK:";

/// How far back (in months) a use may still be cancelled
pub const DEFAULT_CANCELLATION_WINDOW_MONTHS: u32 = 12;

/// Configuration for the balance engine
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EngineConfig {
    /// Smallest amount accepted per request
    pub min_amount: u64,
    /// Largest amount accepted per request
    pub max_amount: u64,
    /// Bound on waiting for an account lock
    pub lock_wait: Duration,
    /// Bound on holding an account lock
    pub lock_hold: Duration,
    /// Prefix prepended to account numbers to form lock keys
    pub lock_key_prefix: String,
    /// Cancellation window in months
    pub cancellation_window_months: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            min_amount: DEFAULT_MIN_AMOUNT,
            max_amount: DEFAULT_MAX_AMOUNT,
            lock_wait: DEFAULT_LOCK_WAIT,
            lock_hold: DEFAULT_LOCK_HOLD,
            lock_key_prefix: DEFAULT_LOCK_KEY_PREFIX.to_string(),
            cancellation_window_months: DEFAULT_CANCELLATION_WINDOW_MONTHS,
        }
    }
}

impl EngineConfig {
    /// Create an EngineConfig with custom amount bounds and lock timings
    ///
    /// Invalid values are replaced by defaults with a warning: a zero minimum,
    /// a maximum below the minimum, and a zero hold time.
    pub fn new(min_amount: u64, max_amount: u64, lock_wait: Duration, lock_hold: Duration) -> Self {
        let default = Self::default();

        let (min_amount, max_amount) = if min_amount == 0 || max_amount < min_amount {
            warn!(
                min_amount,
                max_amount,
                "invalid amount bounds, using defaults [{}, {}]",
                default.min_amount,
                default.max_amount
            );
            (default.min_amount, default.max_amount)
        } else {
            (min_amount, max_amount)
        };

        let lock_hold = if lock_hold.is_zero() {
            warn!(
                "invalid lock hold time (0), using default ({:?})",
                default.lock_hold
            );
            default.lock_hold
        } else {
            lock_hold
        };

        Self {
            min_amount,
            max_amount,
            lock_wait,
            lock_hold,
            ..default
        }
    }

    pub fn with_lock_key_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.lock_key_prefix = prefix.into();
        self
    }

    pub fn with_cancellation_window_months(mut self, months: u32) -> Self {
        self.cancellation_window_months = months;
        self
    }

    /// Lock key for an account number
    pub fn lock_key(&self, account_number: &str) -> String {
        format!("{}{}", self.lock_key_prefix, account_number)
    }

    /// Check a requested amount against the configured bounds
    pub fn validate_amount(&self, amount: u64) -> Result<(), LedgerError> {
        if amount < self.min_amount || amount > self.max_amount {
            return Err(LedgerError::invalid_amount(
                amount,
                self.min_amount,
                self.max_amount,
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn test_defaults() {
        let config = EngineConfig::default();

        assert_eq!(config.min_amount, 10);
        assert_eq!(config.max_amount, 1_000_000_000);
        assert_eq!(config.lock_wait, Duration::from_secs(1));
        assert_eq!(config.lock_hold, Duration::from_secs(15));
        assert_eq!(config.cancellation_window_months, 12);
    }

    #[test]
    fn test_lock_key_uses_prefix() {
        let config = EngineConfig::default();
        assert_eq!(config.lock_key("1000000000"), "ACLK:1000000000");

        let config = config.with_lock_key_prefix("lock/");
        assert_eq!(config.lock_key("1000000000"), "lock/1000000000");
    }

    #[rstest]
    #[case::below_min(9, false)]
    #[case::min(10, true)]
    #[case::middle(1_000, true)]
    #[case::max(1_000_000_000, true)]
    #[case::above_max(1_000_000_001, false)]
    fn test_validate_amount(#[case] amount: u64, #[case] valid: bool) {
        let config = EngineConfig::default();
        assert_eq!(config.validate_amount(amount).is_ok(), valid);
    }

    #[rstest]
    #[case::zero_min(0, 100, 10, 1_000_000_000)]
    #[case::max_below_min(100, 50, 10, 1_000_000_000)]
    #[case::valid(1, 500, 1, 500)]
    fn test_new_amount_bounds_fallback(
        #[case] min: u64,
        #[case] max: u64,
        #[case] expected_min: u64,
        #[case] expected_max: u64,
    ) {
        let config = EngineConfig::new(min, max, DEFAULT_LOCK_WAIT, DEFAULT_LOCK_HOLD);

        assert_eq!(config.min_amount, expected_min);
        assert_eq!(config.max_amount, expected_max);
    }

    #[test]
    fn test_new_zero_hold_falls_back_to_default() {
        let config = EngineConfig::new(10, 100, Duration::ZERO, Duration::ZERO);

        assert_eq!(config.lock_wait, Duration::ZERO);
        assert_eq!(config.lock_hold, DEFAULT_LOCK_HOLD);
    }
}
