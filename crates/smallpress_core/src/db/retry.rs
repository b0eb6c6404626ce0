//! Retry wrapper for transient store contention.
//!
//! # Responsibility
//! - Re-issue store operations that failed with a transient busy/locked
//!   condition, with jittered linearly-increasing backoff.
//!
//! # Invariants
//! - Non-transient errors propagate on the first occurrence, unretried.
//! - Attempts are bounded; the last error is re-raised after exhaustion.
//! - The wrapper sleeps between attempts; it never busy-spins.

use log::warn;
use rand::Rng;
use rusqlite::ErrorCode;
use std::thread;
use std::time::Duration;

/// Attempt and backoff bounds for one wrapped operation.
///
/// Which errors count as transient is not part of the policy; callers pass
/// a driver-specific predicate to [`run`], so the same policy serves both
/// store variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts including the first one.
    pub max_attempts: u32,
    /// Backoff grows linearly in multiples of this delay.
    pub base_delay: Duration,
    /// Per-attempt backoff ceiling.
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            base_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(2),
        }
    }
}

impl RetryPolicy {
    /// Backoff before retry number `attempt` (1-based), without jitter.
    fn backoff(&self, attempt: u32) -> Duration {
        self.base_delay.saturating_mul(attempt).min(self.max_delay)
    }
}

/// Runs `op`, retrying while `is_transient` accepts the error.
///
/// The operation is re-executed from scratch on every attempt, so it must
/// be safe to repeat (single statements are; multi-statement sequences are
/// the caller's responsibility).
pub fn run<T, E, F>(
    policy: &RetryPolicy,
    is_transient: impl Fn(&E) -> bool,
    mut op: F,
) -> Result<T, E>
where
    E: std::fmt::Display,
    F: FnMut() -> Result<T, E>,
{
    let mut attempt = 1;
    loop {
        match op() {
            Ok(value) => return Ok(value),
            Err(err) if attempt < policy.max_attempts && is_transient(&err) => {
                let backoff = policy.backoff(attempt);
                let jitter_ms = rand::rng().random_range(0..=backoff.as_millis() as u64 / 4);
                warn!(
                    "event=store_retry module=db status=transient attempt={} backoff_ms={} error={}",
                    attempt,
                    backoff.as_millis() as u64 + jitter_ms,
                    err
                );
                thread::sleep(backoff + Duration::from_millis(jitter_ms));
                attempt += 1;
            }
            Err(err) => return Err(err),
        }
    }
}

/// Transience predicate for the embedded store.
///
/// `SQLITE_BUSY`/`SQLITE_LOCKED` mean another writer holds the file and the
/// statement may succeed if re-issued; everything else (constraint
/// violations included) is permanent.
pub fn sqlite_is_transient(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(failure, _)
            if failure.code == ErrorCode::DatabaseBusy
                || failure.code == ErrorCode::DatabaseLocked
    )
}

/// Transience predicate for the networked store.
///
/// Lock-wait timeouts (1205) and deadlock victims (1213) are safe to
/// re-issue; other server and transport errors propagate.
pub fn mysql_is_transient(err: &mysql::Error) -> bool {
    matches!(
        err,
        mysql::Error::MySqlError(server) if server.code == 1205 || server.code == 1213
    )
}

#[cfg(test)]
mod tests {
    use super::{run, sqlite_is_transient, RetryPolicy};
    use std::time::Duration;

    fn fast_policy() -> RetryPolicy {
        RetryPolicy {
            max_attempts: 3,
            base_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(2),
        }
    }

    fn busy_error() -> rusqlite::Error {
        rusqlite::Error::SqliteFailure(
            rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_BUSY),
            Some("database is locked".to_string()),
        )
    }

    #[test]
    fn returns_first_success() {
        let result: Result<u32, rusqlite::Error> =
            run(&fast_policy(), sqlite_is_transient, || Ok(7));
        assert_eq!(result.unwrap(), 7);
    }

    #[test]
    fn retries_transient_errors_until_success() {
        let mut calls = 0;
        let result: Result<u32, rusqlite::Error> = run(&fast_policy(), sqlite_is_transient, || {
            calls += 1;
            if calls < 3 {
                Err(busy_error())
            } else {
                Ok(calls)
            }
        });
        assert_eq!(result.unwrap(), 3);
    }

    #[test]
    fn gives_up_after_max_attempts() {
        let mut calls = 0;
        let result: Result<u32, rusqlite::Error> = run(&fast_policy(), sqlite_is_transient, || {
            calls += 1;
            Err(busy_error())
        });
        assert!(result.is_err());
        assert_eq!(calls, 3);
    }

    #[test]
    fn non_transient_errors_propagate_immediately() {
        let mut calls = 0;
        let result: Result<u32, rusqlite::Error> = run(&fast_policy(), sqlite_is_transient, || {
            calls += 1;
            Err(rusqlite::Error::InvalidQuery)
        });
        assert!(result.is_err());
        assert_eq!(calls, 1);
    }

    #[test]
    fn backoff_grows_linearly_and_caps() {
        let policy = RetryPolicy {
            max_attempts: 10,
            base_delay: Duration::from_millis(100),
            max_delay: Duration::from_millis(250),
        };
        assert_eq!(policy.backoff(1), Duration::from_millis(100));
        assert_eq!(policy.backoff(2), Duration::from_millis(200));
        assert_eq!(policy.backoff(3), Duration::from_millis(250));
        assert_eq!(policy.backoff(9), Duration::from_millis(250));
    }

    #[test]
    fn busy_and_locked_are_transient_but_constraints_are_not() {
        assert!(sqlite_is_transient(&busy_error()));

        let constraint = rusqlite::Error::SqliteFailure(
            rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_CONSTRAINT),
            Some("UNIQUE constraint failed: posts.slug".to_string()),
        );
        assert!(!sqlite_is_transient(&constraint));
    }
}
