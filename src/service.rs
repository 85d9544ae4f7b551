//! Request-facing operations on top of the alias store.
//!
//! [`Shortener`] is what a transport layer talks to. It takes TTLs as
//! signed seconds the way clients send them, decides whether an update is a
//! rename or a re-arm, and returns plain result structs instead of store
//! records.

use crate::error::StoreResult;
use crate::storage::AliasStore;
use std::sync::Arc;
use std::time::Instant;

/// A newly created alias.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Created {
    pub alias: String,
    pub target: String,
    pub expires_at: Instant,
}

/// Access statistics for a live alias.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AliasStats {
    pub alias: String,
    pub target: String,
    pub access_count: u64,
    /// Most recent accesses, oldest first
    pub access_times: Vec<Instant>,
    pub created_at: Instant,
    pub expires_at: Instant,
}

/// Result of an update: the alias now in effect and its deadline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Updated {
    pub alias: String,
    pub expires_at: Instant,
}

/// Result of a removal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Removed {
    pub alias: String,
    /// The record had already passed its deadline but was not yet swept
    pub was_expired: bool,
}

/// The alias service.
///
/// Cheap to clone; clones share the same store.
///
/// # Example
///
/// ```
/// use flashlink::service::Shortener;
/// use flashlink::storage::AliasStore;
/// use std::sync::Arc;
///
/// let shortener = Shortener::new(Arc::new(AliasStore::new()));
///
/// let created = shortener.create(None, "https://example.com", Some(60)).unwrap();
/// assert_eq!(shortener.resolve(&created.alias).unwrap(), "https://example.com");
///
/// let stats = shortener.get_stats(&created.alias).unwrap();
/// assert_eq!(stats.access_count, 1);
/// ```
#[derive(Debug, Clone)]
pub struct Shortener {
    store: Arc<AliasStore>,
}

impl Shortener {
    pub fn new(store: Arc<AliasStore>) -> Self {
        Self { store }
    }

    /// The underlying store, for wiring up the sweeper.
    pub fn store(&self) -> &Arc<AliasStore> {
        &self.store
    }

    /// Creates an alias for `target`.
    ///
    /// An empty `alias` is treated like a missing one and gets generated.
    pub fn create(
        &self,
        alias: Option<&str>,
        target: &str,
        ttl_seconds: Option<i64>,
    ) -> StoreResult<Created> {
        let alias = alias.filter(|alias| !alias.is_empty());
        let ttl = ttl_seconds.map(|secs| self.store.config().ttl_from_secs(secs));

        let record = self.store.create(alias, target, ttl)?;
        Ok(Created {
            alias: record.alias,
            target: record.target,
            expires_at: record.expires_at,
        })
    }

    /// Returns the target for `alias` and counts the access.
    pub fn resolve(&self, alias: &str) -> StoreResult<String> {
        self.store.resolve(alias)
    }

    pub fn get_stats(&self, alias: &str) -> StoreResult<AliasStats> {
        let record = self.store.get(alias)?;
        Ok(AliasStats {
            access_times: record.access_log.to_vec(),
            alias: record.alias,
            target: record.target,
            access_count: record.access_count,
            created_at: record.created_at,
            expires_at: record.expires_at,
        })
    }

    /// Renames `alias` and/or gives it a new TTL.
    ///
    /// A `new_alias` different from `alias` renames the record, carrying
    /// over `ttl_seconds` if given and the remaining TTL otherwise. Without
    /// one, `ttl_seconds` re-arms the existing record. With neither, the
    /// result is `NothingToUpdate` for a live alias.
    pub fn update(
        &self,
        alias: &str,
        new_alias: Option<&str>,
        ttl_seconds: Option<i64>,
    ) -> StoreResult<Updated> {
        let ttl = ttl_seconds.map(|secs| self.store.config().ttl_from_secs(secs));

        match new_alias.filter(|new_alias| !new_alias.is_empty()) {
            Some(new_alias) if new_alias != alias => {
                let record = self.store.rename(alias, new_alias, ttl)?;
                Ok(Updated {
                    alias: record.alias,
                    expires_at: record.expires_at,
                })
            }
            _ => {
                let expires_at = self.store.rearm(alias, ttl)?;
                Ok(Updated {
                    alias: alias.to_string(),
                    expires_at,
                })
            }
        }
    }

    pub fn remove(&self, alias: &str) -> StoreResult<Removed> {
        let was_expired = self.store.delete(alias)?;
        Ok(Removed {
            alias: alias.to_string(),
            was_expired,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StoreError;
    use crate::storage::config::MAX_TTL;
    use crate::storage::{sweep_due, Clock, ManualClock, StoreConfig, Sweeper};
    use std::time::Duration;
    use tokio_test::{assert_err, assert_ok};

    fn shortener_with_clock() -> (Shortener, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new());
        let store = AliasStore::new().with_clock(clock.clone());
        (Shortener::new(Arc::new(store)), clock)
    }

    #[test]
    fn test_create_resolve_then_expire() {
        let (shortener, clock) = shortener_with_clock();

        let created = assert_ok!(shortener.create(Some("abc"), "http://example.com", Some(1)));
        assert_eq!(created.alias, "abc");
        assert_eq!(created.target, "http://example.com");

        assert_eq!(assert_ok!(shortener.resolve("abc")), "http://example.com");
        assert_eq!(assert_ok!(shortener.get_stats("abc")).access_count, 1);

        clock.advance(Duration::from_millis(1500));
        assert_eq!(assert_err!(shortener.resolve("abc")), StoreError::NotFound);
        assert_eq!(assert_err!(shortener.get_stats("abc")), StoreError::NotFound);
    }

    #[test]
    fn test_create_twice_conflicts() {
        let (shortener, _) = shortener_with_clock();

        assert_ok!(shortener.create(Some("x"), "http://example.com", None));
        assert_eq!(
            assert_err!(shortener.create(Some("x"), "http://example.com", None)),
            StoreError::AliasConflict
        );
    }

    #[test]
    fn test_empty_alias_is_generated() {
        let (shortener, _) = shortener_with_clock();

        let created = assert_ok!(shortener.create(Some(""), "http://example.com", None));
        assert!(!created.alias.is_empty());
        assert!(shortener.store().contains(&created.alias));
    }

    #[test]
    fn test_negative_ttl_is_clamped() {
        let (shortener, clock) = shortener_with_clock();

        let created = assert_ok!(shortener.create(Some("neg"), "http://example.com", Some(-10)));
        assert_eq!(created.expires_at, clock.now() + Duration::from_secs(1));
        assert_ok!(shortener.resolve("neg"));
    }

    #[test]
    fn test_huge_ttl_is_capped() {
        let (shortener, clock) = shortener_with_clock();

        let created = assert_ok!(shortener.create(Some("big"), "http://example.com", Some(i64::MAX)));
        assert_eq!(created.expires_at, clock.now() + MAX_TTL);

        assert_ok!(shortener.create(Some("a"), "http://example.com", Some(5)));
        let updated = assert_ok!(shortener.update("a", None, Some(i64::MAX)));
        assert_eq!(updated.expires_at, clock.now() + MAX_TTL);

        let renamed = assert_ok!(shortener.update("a", Some("b"), Some(i64::MAX)));
        assert_eq!(renamed.expires_at, clock.now() + MAX_TTL);
        assert_ok!(shortener.resolve("b"));
    }

    #[test]
    fn test_rearm_outlives_old_deadline() {
        let (shortener, clock) = shortener_with_clock();

        assert_ok!(shortener.create(Some("y"), "http://example.com", Some(100)));
        clock.advance(Duration::from_secs(10));

        let updated = assert_ok!(shortener.update("y", None, Some(1)));
        assert_eq!(updated.alias, "y");
        assert_eq!(updated.expires_at, clock.now() + Duration::from_secs(1));
        assert_eq!(shortener.store().get("y").unwrap().version, 1);

        clock.advance(Duration::from_millis(500));
        assert_eq!(sweep_due(shortener.store()).expired, 0);
        assert_ok!(shortener.resolve("y"));

        clock.advance(Duration::from_millis(600));
        assert_eq!(sweep_due(shortener.store()).expired, 1);
        assert_eq!(assert_err!(shortener.resolve("y")), StoreError::NotFound);
    }

    #[test]
    fn test_rearmed_alias_ignores_stale_entry() {
        let (shortener, clock) = shortener_with_clock();

        assert_ok!(shortener.create(Some("y"), "http://example.com", Some(2)));
        assert_ok!(shortener.update("y", None, Some(10)));

        // The version-0 deadline has passed, the version-1 one has not
        clock.advance(Duration::from_secs(3));
        let report = sweep_due(shortener.store());
        assert_eq!((report.expired, report.stale), (0, 1));
        assert_ok!(shortener.resolve("y"));
    }

    #[test]
    fn test_rename_resets_access_history() {
        let (shortener, clock) = shortener_with_clock();

        assert_ok!(shortener.create(Some("y"), "http://example.com", Some(100)));
        assert_ok!(shortener.resolve("y"));
        assert_ok!(shortener.resolve("y"));

        clock.advance(Duration::from_secs(40));
        let updated = assert_ok!(shortener.update("y", Some("z"), None));
        assert_eq!(updated.alias, "z");
        assert_eq!(updated.expires_at, clock.now() + Duration::from_secs(60));

        assert_eq!(assert_err!(shortener.resolve("y")), StoreError::NotFound);
        assert_eq!(assert_ok!(shortener.resolve("z")), "http://example.com");

        let stats = assert_ok!(shortener.get_stats("z"));
        assert_eq!(stats.access_count, 1);
        assert_eq!(stats.access_times, vec![clock.now()]);
    }

    #[test]
    fn test_rename_with_ttl() {
        let (shortener, clock) = shortener_with_clock();

        assert_ok!(shortener.create(Some("y"), "http://example.com", Some(100)));
        let updated = assert_ok!(shortener.update("y", Some("z"), Some(5)));
        assert_eq!(updated.expires_at, clock.now() + Duration::from_secs(5));
    }

    #[test]
    fn test_update_errors() {
        let (shortener, _) = shortener_with_clock();

        assert_eq!(
            assert_err!(shortener.update("missing", None, Some(5))),
            StoreError::NotFound
        );
        assert_eq!(
            assert_err!(shortener.update("missing", None, None)),
            StoreError::NotFound
        );

        assert_ok!(shortener.create(Some("y"), "http://example.com", None));
        assert_ok!(shortener.create(Some("taken"), "http://example.com", None));

        assert_eq!(
            assert_err!(shortener.update("y", None, None)),
            StoreError::NothingToUpdate
        );
        assert_eq!(
            assert_err!(shortener.update("y", Some("y"), None)),
            StoreError::NothingToUpdate
        );
        assert_eq!(
            assert_err!(shortener.update("y", Some("not valid!"), None)),
            StoreError::InvalidAliasFormat
        );
        assert_eq!(
            assert_err!(shortener.update("y", Some("taken"), Some(5))),
            StoreError::AliasConflict
        );
    }

    #[test]
    fn test_remove() {
        let (shortener, clock) = shortener_with_clock();

        assert_ok!(shortener.create(Some("a"), "http://example.com", Some(10)));
        let removed = assert_ok!(shortener.remove("a"));
        assert_eq!(removed.alias, "a");
        assert!(!removed.was_expired);
        assert_eq!(assert_err!(shortener.remove("a")), StoreError::NotFound);

        assert_ok!(shortener.create(Some("b"), "http://example.com", Some(1)));
        clock.advance(Duration::from_secs(5));
        assert!(assert_ok!(shortener.remove("b")).was_expired);
    }

    #[test]
    fn test_uniqueness_across_create_and_rename() {
        let (shortener, _) = shortener_with_clock();

        for alias in ["a", "b", "c"] {
            assert_ok!(shortener.create(Some(alias), "http://example.com", None));
        }
        assert_err!(shortener.update("a", Some("b"), None));
        assert_ok!(shortener.update("a", Some("d"), None));
        assert_err!(shortener.create(Some("d"), "http://example.com", None));
        assert_ok!(shortener.create(Some("a"), "http://example.com", None));

        assert_eq!(shortener.store().len(), 4);
    }

    #[tokio::test]
    async fn test_expiry_in_real_time() {
        let store = Arc::new(AliasStore::with_config(StoreConfig::default()));
        let shortener = Shortener::new(Arc::clone(&store));
        let sweeper = Sweeper::start(Arc::clone(&store));

        assert_ok!(shortener.create(Some("abc"), "http://example.com", Some(1)));
        assert_ok!(shortener.resolve("abc"));
        assert_eq!(assert_ok!(shortener.get_stats("abc")).access_count, 1);

        tokio::time::sleep(Duration::from_millis(1500)).await;

        assert_eq!(assert_err!(shortener.resolve("abc")), StoreError::NotFound);
        sweeper.shutdown().await;
    }
}
