//! The alias record stored for each live alias.

use crate::storage::access_log::AccessLog;
use std::time::{Duration, Instant};

/// A stored alias with its deadline and access history.
#[derive(Debug, Clone)]
pub struct AliasRecord {
    /// The alias this record is stored under
    pub alias: String,
    /// Where the alias points
    pub target: String,
    /// When this record was created
    pub created_at: Instant,
    /// When this record stops being live
    pub expires_at: Instant,
    /// Number of successful resolves
    pub access_count: u64,
    /// Most recent resolve instants, oldest first
    pub access_log: AccessLog,
    /// Bumped every time `expires_at` changes
    pub version: u64,
}

impl AliasRecord {
    /// Creates a version-0 record expiring `ttl` after `now`.
    pub fn new(
        alias: String,
        target: String,
        now: Instant,
        ttl: Duration,
        access_log_capacity: usize,
    ) -> Self {
        Self {
            alias,
            target,
            created_at: now,
            expires_at: now + ttl,
            access_count: 0,
            access_log: AccessLog::with_capacity(access_log_capacity),
            version: 0,
        }
    }

    /// Checks if this record has expired as of `now`.
    #[inline]
    pub fn is_expired(&self, now: Instant) -> bool {
        now >= self.expires_at
    }

    /// Time left before expiry, zero if already expired.
    pub fn remaining(&self, now: Instant) -> Duration {
        self.expires_at.saturating_duration_since(now)
    }

    /// Counts a successful resolve at `now`.
    pub fn record_access(&mut self, now: Instant) {
        self.access_count += 1;
        self.access_log.record(now);
    }

    /// Moves the deadline to `now + ttl` and bumps the version.
    ///
    /// Returns the new deadline.
    pub fn rearm(&mut self, now: Instant, ttl: Duration) -> Instant {
        self.expires_at = now + ttl;
        self.version += 1;
        self.expires_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(now: Instant, ttl: Duration) -> AliasRecord {
        AliasRecord::new("abc".into(), "http://example.com".into(), now, ttl, 10)
    }

    #[test]
    fn test_expiry_boundary() {
        let now = Instant::now();
        let rec = record(now, Duration::from_secs(1));

        assert!(!rec.is_expired(now));
        assert!(!rec.is_expired(now + Duration::from_millis(999)));
        assert!(rec.is_expired(now + Duration::from_secs(1)));
    }

    #[test]
    fn test_remaining() {
        let now = Instant::now();
        let rec = record(now, Duration::from_secs(10));

        assert_eq!(rec.remaining(now), Duration::from_secs(10));
        assert_eq!(rec.remaining(now + Duration::from_secs(4)), Duration::from_secs(6));
        assert_eq!(rec.remaining(now + Duration::from_secs(20)), Duration::ZERO);
    }

    #[test]
    fn test_rearm_bumps_version() {
        let now = Instant::now();
        let mut rec = record(now, Duration::from_secs(100));
        assert_eq!(rec.version, 0);

        let later = now + Duration::from_secs(5);
        let deadline = rec.rearm(later, Duration::from_secs(1));

        assert_eq!(deadline, later + Duration::from_secs(1));
        assert_eq!(rec.expires_at, deadline);
        assert_eq!(rec.version, 1);
        assert!(rec.expires_at >= rec.created_at);
    }

    #[test]
    fn test_record_access() {
        let now = Instant::now();
        let mut rec = record(now, Duration::from_secs(10));

        rec.record_access(now);
        rec.record_access(now + Duration::from_secs(1));

        assert_eq!(rec.access_count, 2);
        assert_eq!(rec.access_log.len(), 2);
    }
}
