//! Thread-Safe Alias Store
//!
//! The store is the authoritative owner of every alias record. Next to the
//! records it keeps an [`ExpiryIndex`] of pending deadlines that the sweeper
//! drains. The two are tied together by record versions:
//!
//! 1. Every operation that sets a deadline bumps the record's version (or
//!    starts a fresh record at version 0) and pushes the new
//!    `(alias, expires_at, version)` into the index.
//! 2. Nothing is ever removed from the index early. A delete, rename or
//!    re-arm simply leaves the older entries behind.
//! 3. When an entry is popped its version is compared with the live
//!    record. A mismatch, or no record at all, means the entry is stale and
//!    it is dropped.
//!
//! ## Concurrency Model
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                        AliasStore                           │
//! │  ┌─────────┐ ┌─────────┐ ┌─────────┐ ┌─────────┐            │
//! │  │ Shard 0 │ │ Shard 1 │ │ Shard 2 │ │ Shard N │            │
//! │  │ RwLock  │ │ RwLock  │ │ RwLock  │ │ RwLock  │            │
//! │  │ HashMap │ │ HashMap │ │ HashMap │ │ HashMap │            │
//! │  └─────────┘ └─────────┘ └─────────┘ └─────────┘            │
//! │                                                             │
//! │  ┌───────────────────────────────────────────────────────┐  │
//! │  │            Mutex<ExpiryIndex>  (BinaryHeap)            │  │
//! │  └───────────────────────────────────────────────────────┘  │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every read-decide-mutate sequence on an alias runs under its shard's
//! write lock. The index lock is only ever taken while holding shard locks
//! or on its own, never the other way round, so the lock order is
//! shards (ascending) then index.

use crate::alias::{is_valid_alias, parse_target, AliasGenerator, RandomAliasGenerator};
use crate::error::{StoreError, StoreResult};
use crate::storage::clock::{Clock, SystemClock};
use crate::storage::config::StoreConfig;
use crate::storage::expiry_index::{ExpiryIndex, IndexEntry};
use crate::storage::record::AliasRecord;
use std::collections::HashMap;
use std::hash::{DefaultHasher, Hash, Hasher};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::{Duration, Instant};
use tracing::{debug, trace};

/// Number of shards for the record map.
const NUM_SHARDS: usize = 16;

/// How many generated aliases are tried before giving up.
pub const MAX_ALIAS_ATTEMPTS: usize = 16;

type RecordMap = HashMap<String, AliasRecord>;

/// A single shard containing a portion of the records.
#[derive(Debug, Default)]
struct Shard {
    data: RwLock<RecordMap>,
}

impl Shard {
    fn read(&self) -> RwLockReadGuard<'_, RecordMap> {
        self.data.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, RecordMap> {
        self.data.write().unwrap_or_else(PoisonError::into_inner)
    }
}

/// The alias store.
///
/// Wrap it in an `Arc` to share it between request handlers and the
/// [`Sweeper`](crate::storage::Sweeper).
///
/// # Example
///
/// ```
/// use flashlink::storage::AliasStore;
/// use std::time::Duration;
///
/// let store = AliasStore::new();
///
/// let record = store
///     .create(Some("docs"), "https://example.com/docs", Some(Duration::from_secs(60)))
///     .unwrap();
/// assert_eq!(record.alias, "docs");
///
/// assert_eq!(store.resolve("docs").unwrap(), "https://example.com/docs");
/// assert_eq!(store.get("docs").unwrap().access_count, 1);
/// ```
pub struct AliasStore {
    shards: Vec<Shard>,
    index: Mutex<ExpiryIndex>,
    config: StoreConfig,
    clock: Arc<dyn Clock>,
    generator: Box<dyn AliasGenerator>,

    /// Statistics: records currently stored (approximate)
    key_count: AtomicU64,
    /// Statistics: records created (including rename targets)
    created_count: AtomicU64,
    /// Statistics: successful resolves
    resolved_count: AtomicU64,
    /// Statistics: expired records evicted on the request path
    expired_on_read: AtomicU64,
    /// Statistics: expired records removed by the sweeper
    expired_by_sweeper: AtomicU64,
    /// Statistics: index entries dropped as stale
    stale_discarded: AtomicU64,
    /// Statistics: explicit deletes
    removed_count: AtomicU64,
}

impl std::fmt::Debug for AliasStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AliasStore")
            .field("shards", &self.shards.len())
            .field("key_count", &self.key_count.load(Ordering::Relaxed))
            .field("index_len", &self.index_len())
            .field("config", &self.config)
            .finish()
    }
}

impl Default for AliasStore {
    fn default() -> Self {
        Self::new()
    }
}

impl AliasStore {
    /// Creates a store with default settings and the system clock.
    pub fn new() -> Self {
        Self::with_config(StoreConfig::default())
    }

    /// Creates a store with the given configuration and the system clock.
    pub fn with_config(config: StoreConfig) -> Self {
        let generator = RandomAliasGenerator::new(&config.alias_alphabet, config.alias_length);
        Self {
            shards: (0..NUM_SHARDS).map(|_| Shard::default()).collect(),
            index: Mutex::new(ExpiryIndex::new()),
            config,
            clock: Arc::new(SystemClock),
            generator: Box::new(generator),
            key_count: AtomicU64::new(0),
            created_count: AtomicU64::new(0),
            resolved_count: AtomicU64::new(0),
            expired_on_read: AtomicU64::new(0),
            expired_by_sweeper: AtomicU64::new(0),
            stale_discarded: AtomicU64::new(0),
            removed_count: AtomicU64::new(0),
        }
    }

    /// Replaces the time source.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Replaces the alias generator.
    pub fn with_generator(mut self, generator: impl AliasGenerator + 'static) -> Self {
        self.generator = Box::new(generator);
        self
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// Current time according to the store's clock.
    #[inline]
    pub fn now(&self) -> Instant {
        self.clock.now()
    }

    #[inline]
    fn shard_index(&self, alias: &str) -> usize {
        let mut hasher = DefaultHasher::new();
        alias.hash(&mut hasher);
        (hasher.finish() as usize) % NUM_SHARDS
    }

    #[inline]
    fn get_shard(&self, alias: &str) -> &Shard {
        &self.shards[self.shard_index(alias)]
    }

    fn index(&self) -> MutexGuard<'_, ExpiryIndex> {
        self.index.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Runs `f` with write access to the shards holding `a` and `b`.
    ///
    /// The second map is `None` when both aliases live in the same shard.
    fn with_pair<R>(
        &self,
        a: &str,
        b: &str,
        f: impl FnOnce(&mut RecordMap, Option<&mut RecordMap>) -> R,
    ) -> R {
        let (ia, ib) = (self.shard_index(a), self.shard_index(b));
        if ia == ib {
            let mut map = self.shards[ia].write();
            return f(&mut *map, None);
        }

        // Ascending shard order, so two renames in opposite directions
        // cannot deadlock.
        let mut low = self.shards[ia.min(ib)].write();
        let mut high = self.shards[ia.max(ib)].write();
        if ia < ib {
            f(&mut *low, Some(&mut *high))
        } else {
            f(&mut *high, Some(&mut *low))
        }
    }

    /// Removes `alias` from `map` if its record has expired.
    ///
    /// Returns `true` if a live record remains under `alias`.
    fn evict_if_expired(&self, map: &mut RecordMap, alias: &str, now: Instant) -> bool {
        match map.get(alias) {
            Some(record) if record.is_expired(now) => {
                map.remove(alias);
                self.key_count.fetch_sub(1, Ordering::Relaxed);
                self.expired_on_read.fetch_add(1, Ordering::Relaxed);
                debug!(alias = %alias, "Evicted expired alias on access");
                false
            }
            Some(_) => true,
            None => false,
        }
    }

    /// Pushes the record's current deadline into the index.
    fn schedule(&self, record: &AliasRecord) {
        self.index()
            .push(record.alias.clone(), record.expires_at, record.version);
    }

    /// Creates a new record.
    ///
    /// With `alias` set, it must be well-formed and not name a live record.
    /// Without it, aliases are generated until a free one is found, up to
    /// [`MAX_ALIAS_ATTEMPTS`] times. A missing `ttl` means the configured
    /// default TTL; short ones are clamped to the configured minimum.
    pub fn create(
        &self,
        alias: Option<&str>,
        target: &str,
        ttl: Option<Duration>,
    ) -> StoreResult<AliasRecord> {
        if parse_target(target).is_none() {
            return Err(StoreError::InvalidTarget);
        }
        let ttl = self.config.clamp_ttl(ttl.unwrap_or(self.config.default_ttl));

        if let Some(alias) = alias {
            if !is_valid_alias(alias) {
                return Err(StoreError::InvalidAliasFormat);
            }
            return self.insert_new(alias, target, ttl);
        }

        for attempt in 1..=MAX_ALIAS_ATTEMPTS {
            let candidate = self.generator.generate();
            if !is_valid_alias(&candidate) {
                continue;
            }
            match self.insert_new(&candidate, target, ttl) {
                Err(StoreError::AliasConflict) => {
                    trace!(alias = %candidate, attempt, "Generated alias collided, retrying");
                }
                result => return result,
            }
        }

        Err(StoreError::AliasGenerationFailed {
            attempts: MAX_ALIAS_ATTEMPTS,
        })
    }

    /// Inserts a version-0 record unless `alias` is live.
    fn insert_new(&self, alias: &str, target: &str, ttl: Duration) -> StoreResult<AliasRecord> {
        let mut data = self.get_shard(alias).write();
        let now = self.clock.now();

        if self.evict_if_expired(&mut data, alias, now) {
            return Err(StoreError::AliasConflict);
        }

        let record = AliasRecord::new(
            alias.to_string(),
            target.to_string(),
            now,
            ttl,
            self.config.access_log_capacity,
        );
        self.schedule(&record);
        data.insert(alias.to_string(), record.clone());

        self.key_count.fetch_add(1, Ordering::Relaxed);
        self.created_count.fetch_add(1, Ordering::Relaxed);
        debug!(alias = %alias, ttl_ms = ttl.as_millis() as u64, "Alias created");

        Ok(record)
    }

    /// Returns a snapshot of the live record for `alias`.
    ///
    /// An expired record is removed here and reported as `NotFound`, so
    /// callers never see an expired record regardless of sweeper timing.
    pub fn get(&self, alias: &str) -> StoreResult<AliasRecord> {
        let shard = self.get_shard(alias);
        let now = self.clock.now();

        // Read lock first: the common case is a live record
        {
            let data = shard.read();
            match data.get(alias) {
                Some(record) if !record.is_expired(now) => return Ok(record.clone()),
                Some(_) => {}
                None => return Err(StoreError::NotFound),
            }
        }

        // Expired: take the write lock to evict it
        let mut data = shard.write();
        if !self.evict_if_expired(&mut data, alias, now) {
            return Err(StoreError::NotFound);
        }
        // Another thread replaced the record in between
        data.get(alias).cloned().ok_or(StoreError::NotFound)
    }

    /// Counts an access on the live record for `alias`.
    ///
    /// Returns the new access count.
    pub fn record_access(&self, alias: &str) -> StoreResult<u64> {
        let mut data = self.get_shard(alias).write();
        let now = self.clock.now();

        if !self.evict_if_expired(&mut data, alias, now) {
            return Err(StoreError::NotFound);
        }
        let record = data.get_mut(alias).ok_or(StoreError::NotFound)?;
        record.record_access(now);
        Ok(record.access_count)
    }

    /// Looks up the target for `alias` and records the access in one step.
    pub fn resolve(&self, alias: &str) -> StoreResult<String> {
        let mut data = self.get_shard(alias).write();
        let now = self.clock.now();

        if !self.evict_if_expired(&mut data, alias, now) {
            return Err(StoreError::NotFound);
        }
        let record = data.get_mut(alias).ok_or(StoreError::NotFound)?;
        record.record_access(now);
        self.resolved_count.fetch_add(1, Ordering::Relaxed);

        Ok(record.target.clone())
    }

    /// Moves the deadline of a live record to `now + ttl`.
    ///
    /// The record's version is bumped and the new deadline is indexed; the
    /// entry for the previous deadline stays in the index and is discarded
    /// when it surfaces. Returns the new deadline.
    pub fn rearm(&self, alias: &str, ttl: Option<Duration>) -> StoreResult<Instant> {
        let mut data = self.get_shard(alias).write();
        let now = self.clock.now();

        if !self.evict_if_expired(&mut data, alias, now) {
            return Err(StoreError::NotFound);
        }
        let ttl = ttl.ok_or(StoreError::NothingToUpdate)?;
        let record = data.get_mut(alias).ok_or(StoreError::NotFound)?;

        let expires_at = record.rearm(now, self.config.clamp_ttl(ttl));
        self.schedule(record);
        debug!(alias = %alias, version = record.version, "Alias re-armed");

        Ok(expires_at)
    }

    /// Moves a live record to `new_alias`.
    ///
    /// The record under `new_alias` is a new identity: version 0, zero
    /// accesses, empty access log. Its deadline is `now + ttl` when `ttl` is
    /// given, otherwise the old record's remaining time, otherwise the
    /// default TTL. Renaming an alias to itself only re-arms it.
    pub fn rename(
        &self,
        alias: &str,
        new_alias: &str,
        ttl: Option<Duration>,
    ) -> StoreResult<AliasRecord> {
        if alias == new_alias {
            self.rearm(alias, ttl)?;
            return self.get(alias);
        }

        let record = self.with_pair(alias, new_alias, |src, dst| {
            let now = self.clock.now();

            if !self.evict_if_expired(src, alias, now) {
                return Err(StoreError::NotFound);
            }
            if !is_valid_alias(new_alias) {
                return Err(StoreError::InvalidAliasFormat);
            }

            let occupant_expired = {
                let target_map: &RecordMap = match &dst {
                    Some(map) => &**map,
                    None => &*src,
                };
                match target_map.get(new_alias) {
                    Some(occupant) if !occupant.is_expired(now) => {
                        return Err(StoreError::AliasConflict);
                    }
                    Some(_) => true,
                    None => false,
                }
            };

            let old = src.remove(alias).ok_or(StoreError::NotFound)?;
            let ttl = match ttl {
                Some(ttl) => self.config.clamp_ttl(ttl),
                None => match old.remaining(now) {
                    remaining if remaining.is_zero() => {
                        self.config.clamp_ttl(self.config.default_ttl)
                    }
                    remaining => remaining,
                },
            };

            let record = AliasRecord::new(
                new_alias.to_string(),
                old.target,
                now,
                ttl,
                self.config.access_log_capacity,
            );
            self.schedule(&record);

            let target_map = match dst {
                Some(map) => map,
                None => src,
            };
            target_map.insert(new_alias.to_string(), record.clone());

            if occupant_expired {
                self.key_count.fetch_sub(1, Ordering::Relaxed);
                self.expired_on_read.fetch_add(1, Ordering::Relaxed);
            }
            Ok(record)
        })?;

        self.created_count.fetch_add(1, Ordering::Relaxed);
        debug!(from = %alias, to = %new_alias, "Alias renamed");
        Ok(record)
    }

    /// Removes `alias`, live or not yet swept.
    ///
    /// Returns whether the record had already passed its deadline. Index
    /// entries for it are left to be discarded as stale.
    pub fn delete(&self, alias: &str) -> StoreResult<bool> {
        let mut data = self.get_shard(alias).write();
        let now = self.clock.now();

        let record = data.remove(alias).ok_or(StoreError::NotFound)?;
        self.key_count.fetch_sub(1, Ordering::Relaxed);
        self.removed_count.fetch_add(1, Ordering::Relaxed);
        debug!(alias = %alias, "Alias deleted");

        Ok(record.is_expired(now))
    }

    /// Checks if `alias` names a live record, without evicting anything.
    pub fn contains(&self, alias: &str) -> bool {
        let now = self.clock.now();
        self.get_shard(alias)
            .read()
            .get(alias)
            .map(|record| !record.is_expired(now))
            .unwrap_or(false)
    }

    /// Pops the earliest index entry if it is due at `now`.
    pub(crate) fn pop_due(&self, now: Instant) -> Option<IndexEntry> {
        self.index().pop_due(now)
    }

    /// Removes the record an index entry points at, if the entry is current.
    ///
    /// The entry is current when the record exists, still carries the
    /// entry's version and has passed its deadline. Anything else is a
    /// stale entry and only gets counted. Returns `true` if a record was
    /// removed.
    pub(crate) fn expire_entry(&self, entry: &IndexEntry, now: Instant) -> bool {
        let mut data = self.get_shard(&entry.alias).write();

        match data.get(&entry.alias) {
            Some(record) if record.version == entry.version && record.is_expired(now) => {
                data.remove(&entry.alias);
                self.key_count.fetch_sub(1, Ordering::Relaxed);
                self.expired_by_sweeper.fetch_add(1, Ordering::Relaxed);
                debug!(alias = %entry.alias, version = entry.version, "Alias expired");
                true
            }
            _ => {
                self.stale_discarded.fetch_add(1, Ordering::Relaxed);
                trace!(alias = %entry.alias, version = entry.version, "Discarded stale expiry entry");
                false
            }
        }
    }

    /// Returns the approximate number of stored records, including
    /// expired ones not yet evicted.
    pub fn len(&self) -> u64 {
        self.key_count.load(Ordering::Relaxed)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of entries in the expiry index, stale ones included.
    pub fn index_len(&self) -> usize {
        self.index().len()
    }

    /// Returns store statistics.
    pub fn stats(&self) -> StoreStats {
        StoreStats {
            aliases: self.key_count.load(Ordering::Relaxed),
            created: self.created_count.load(Ordering::Relaxed),
            resolved: self.resolved_count.load(Ordering::Relaxed),
            expired_on_read: self.expired_on_read.load(Ordering::Relaxed),
            expired_by_sweeper: self.expired_by_sweeper.load(Ordering::Relaxed),
            stale_discarded: self.stale_discarded.load(Ordering::Relaxed),
            removed: self.removed_count.load(Ordering::Relaxed),
            index_entries: self.index_len(),
        }
    }
}

/// Store statistics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoreStats {
    /// Records currently stored
    pub aliases: u64,
    /// Records created, rename targets included
    pub created: u64,
    /// Successful resolves
    pub resolved: u64,
    /// Expired records evicted on the request path
    pub expired_on_read: u64,
    /// Expired records removed by the sweeper
    pub expired_by_sweeper: u64,
    /// Index entries dropped as stale
    pub stale_discarded: u64,
    /// Explicit deletes
    pub removed: u64,
    /// Entries waiting in the expiry index
    pub index_entries: usize,
}
