//! Sliding-window login throttle.
//!
//! Counts login attempts per identifier inside a rolling window and
//! rejects further attempts once the cap is hit. Purely in-memory; a
//! restart clears the counters.

use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use tokio::sync::RwLock;

use crate::error::ApiError;

/// Map size above which a full sweep of stale identifiers runs.
const PURGE_THRESHOLD: usize = 1024;

/// Per-identifier sliding-window attempt counter.
#[derive(Debug)]
pub struct LoginThrottle {
    max_attempts: u32,
    window: Duration,
    attempts: RwLock<HashMap<String, Vec<DateTime<Utc>>>>,
}

impl LoginThrottle {
    /// Creates a throttle allowing `max_attempts` per `window`.
    #[must_use]
    pub fn new(max_attempts: u32, window: Duration) -> Self {
        Self {
            max_attempts,
            window,
            attempts: RwLock::new(HashMap::new()),
        }
    }

    /// Records one attempt for `identifier` at `now`.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::TooManyLoginAttempts`] when the identifier has
    /// already used up its window allowance. The rejected attempt itself
    /// is not recorded, so the caller's window does not extend forever.
    pub async fn check_and_record(
        &self,
        identifier: &str,
        now: DateTime<Utc>,
    ) -> Result<(), ApiError> {
        let cutoff = now - self.window;
        let mut map = self.attempts.write().await;

        if map.len() > PURGE_THRESHOLD {
            map.retain(|_, stamps| stamps.iter().any(|t| *t > cutoff));
        }

        let stamps = map.entry(identifier.to_lowercase()).or_default();
        stamps.retain(|t| *t > cutoff);
        if stamps.len() >= self.max_attempts as usize {
            return Err(ApiError::TooManyLoginAttempts);
        }
        stamps.push(now);
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn allows_up_to_the_cap() {
        let throttle = LoginThrottle::new(3, Duration::minutes(15));
        let now = Utc::now();
        for _ in 0..3 {
            assert!(throttle.check_and_record("alice", now).await.is_ok());
        }
        let denied = throttle.check_and_record("alice", now).await;
        assert!(matches!(denied, Err(ApiError::TooManyLoginAttempts)));
    }

    #[tokio::test]
    async fn identifiers_are_isolated() {
        let throttle = LoginThrottle::new(1, Duration::minutes(15));
        let now = Utc::now();
        assert!(throttle.check_and_record("alice", now).await.is_ok());
        assert!(throttle.check_and_record("bob", now).await.is_ok());
    }

    #[tokio::test]
    async fn identifier_matching_ignores_case() {
        let throttle = LoginThrottle::new(1, Duration::minutes(15));
        let now = Utc::now();
        assert!(throttle.check_and_record("Alice", now).await.is_ok());
        let denied = throttle.check_and_record("alice", now).await;
        assert!(denied.is_err());
    }

    #[tokio::test]
    async fn window_expiry_frees_the_allowance() {
        let throttle = LoginThrottle::new(1, Duration::minutes(15));
        let start = Utc::now();
        assert!(throttle.check_and_record("alice", start).await.is_ok());
        assert!(throttle.check_and_record("alice", start).await.is_err());

        let later = start + Duration::minutes(16);
        assert!(throttle.check_and_record("alice", later).await.is_ok());
    }
}
