//! Background Expiry Sweeper
//!
//! Read-time eviction only catches records that somebody asks for. A record
//! that expires and is never looked up again would stay in memory forever,
//! so a background task drains the expiry index on a fixed interval.
//!
//! ## Design
//!
//! The sweeper runs as a Tokio task and on every tick:
//! 1. Pops index entries whose deadline has passed, earliest first
//! 2. Removes the record an entry points at when the entry's version is
//!    still the record's version
//! 3. Drops the entry otherwise, since a later mutation superseded it
//! 4. Stops at the first entry that is not yet due and sleeps until the
//!    next tick
//!
//! A tick only drains what is due when it starts, so it cannot starve the
//! request path. Shutdown is observed between ticks; a tick that has
//! started always runs to completion.

use crate::storage::AliasStore;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info};

/// Outcome of one sweep.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SweepReport {
    /// Records removed because their current deadline passed
    pub expired: u64,
    /// Index entries dropped because they no longer matched a record
    pub stale: u64,
}

/// Drains every index entry that is due now.
pub fn sweep_due(store: &AliasStore) -> SweepReport {
    let now = store.now();
    let mut report = SweepReport::default();

    while let Some(entry) = store.pop_due(now) {
        if store.expire_entry(&entry, now) {
            report.expired += 1;
        } else {
            report.stale += 1;
        }
    }

    report
}

/// A handle to the running sweeper.
///
/// When this handle is dropped, the sweeper task is told to stop.
#[derive(Debug)]
pub struct Sweeper {
    /// Sender to signal shutdown
    shutdown_tx: watch::Sender<bool>,
    task: Option<JoinHandle<()>>,
}

impl Sweeper {
    /// Starts the sweeper with the store's configured interval.
    ///
    /// Must be called from within a Tokio runtime.
    ///
    /// # Example
    ///
    /// ```ignore
    /// use flashlink::storage::{AliasStore, Sweeper};
    /// use std::sync::Arc;
    ///
    /// let store = Arc::new(AliasStore::new());
    /// let sweeper = Sweeper::start(Arc::clone(&store));
    ///
    /// // Sweeper runs in the background...
    ///
    /// sweeper.shutdown().await;
    /// ```
    pub fn start(store: Arc<AliasStore>) -> Self {
        let interval = store.config().sweep_interval;
        Self::start_with_interval(store, interval)
    }

    /// Starts the sweeper with an explicit interval.
    pub fn start_with_interval(store: Arc<AliasStore>, interval: Duration) -> Self {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let task = tokio::spawn(sweeper_loop(store, interval, shutdown_rx));

        info!(interval_ms = interval.as_millis() as u64, "Background expiry sweeper started");

        Self {
            shutdown_tx,
            task: Some(task),
        }
    }

    /// Signals the sweeper to stop after its current tick.
    ///
    /// This is called automatically when the handle is dropped.
    pub fn stop(&self) {
        let _ = self.shutdown_tx.send(true);
    }

    /// Stops the sweeper and waits for the task to finish.
    pub async fn shutdown(mut self) {
        self.stop();
        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
    }
}

impl Drop for Sweeper {
    fn drop(&mut self) {
        self.stop();
    }
}

/// The main sweeper loop.
async fn sweeper_loop(
    store: Arc<AliasStore>,
    interval: Duration,
    mut shutdown_rx: watch::Receiver<bool>,
) {
    loop {
        // Wait for the interval or shutdown signal
        tokio::select! {
            _ = tokio::time::sleep(interval) => {}
            result = shutdown_rx.changed() => {
                if result.is_err() || *shutdown_rx.borrow() {
                    debug!("Expiry sweeper received shutdown signal");
                    break;
                }
            }
        }

        let report = sweep_due(&store);

        if report.expired > 0 || report.stale > 0 {
            debug!(
                expired = report.expired,
                stale = report.stale,
                aliases_remaining = store.len(),
                "Expiry sweep finished"
            );
        }
    }

    info!("Background expiry sweeper stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{ManualClock, StoreConfig};

    const TARGET: &str = "http://example.com";

    fn fast_store() -> Arc<AliasStore> {
        let config = StoreConfig::default()
            .with_min_ttl(Duration::from_millis(1))
            .with_sweep_interval(Duration::from_millis(10));
        Arc::new(AliasStore::with_config(config))
    }

    #[test]
    fn test_sweep_due_with_manual_clock() {
        let clock = Arc::new(ManualClock::new());
        let store = AliasStore::new().with_clock(clock.clone());

        store.create(Some("a"), TARGET, Some(Duration::from_secs(1))).unwrap();
        store.create(Some("b"), TARGET, Some(Duration::from_secs(5))).unwrap();

        assert_eq!(sweep_due(&store), SweepReport::default());

        clock.advance(Duration::from_secs(1));
        assert_eq!(sweep_due(&store), SweepReport { expired: 1, stale: 0 });
        assert!(!store.contains("a"));
        assert!(store.contains("b"));
        assert_eq!(store.index_len(), 1);
    }

    #[test]
    fn test_rearmed_alias_survives_old_deadline() {
        let clock = Arc::new(ManualClock::new());
        let store = AliasStore::new().with_clock(clock.clone());

        store.create(Some("y"), TARGET, Some(Duration::from_secs(2))).unwrap();
        store.rearm("y", Some(Duration::from_secs(10))).unwrap();

        clock.advance(Duration::from_secs(3));
        assert_eq!(sweep_due(&store), SweepReport { expired: 0, stale: 1 });
        assert!(store.contains("y"));

        clock.advance(Duration::from_secs(10));
        assert_eq!(sweep_due(&store), SweepReport { expired: 1, stale: 0 });
        assert!(store.is_empty());
    }

    #[test]
    fn test_deleted_and_renamed_aliases_leave_stale_entries() {
        let clock = Arc::new(ManualClock::new());
        let store = AliasStore::new().with_clock(clock.clone());

        store.create(Some("gone"), TARGET, Some(Duration::from_secs(1))).unwrap();
        store.create(Some("old"), TARGET, Some(Duration::from_secs(1))).unwrap();
        store.delete("gone").unwrap();
        store.rename("old", "new", Some(Duration::from_secs(60))).unwrap();

        clock.advance(Duration::from_secs(2));
        assert_eq!(sweep_due(&store), SweepReport { expired: 0, stale: 2 });
        assert!(store.contains("new"));
    }

    #[test]
    fn test_sweep_deletes_at_most_the_latest_version() {
        let clock = Arc::new(ManualClock::new());
        let store = AliasStore::new().with_clock(clock.clone());

        store.create(Some("a"), TARGET, Some(Duration::from_secs(1))).unwrap();
        for ttl in [3, 2, 4] {
            store.rearm("a", Some(Duration::from_secs(ttl))).unwrap();
        }

        clock.advance(Duration::from_secs(5));
        let report = sweep_due(&store);
        assert_eq!(report, SweepReport { expired: 1, stale: 3 });
        assert_eq!(store.stats().expired_by_sweeper, 1);
    }

    #[tokio::test]
    async fn test_sweeper_cleans_expired_aliases() {
        let store = fast_store();

        for i in 0..10 {
            store
                .create(Some(&format!("key{}", i)), TARGET, Some(Duration::from_millis(50)))
                .unwrap();
        }
        store
            .create(Some("long-lived"), TARGET, Some(Duration::from_secs(100)))
            .unwrap();
        assert_eq!(store.len(), 11);

        let _sweeper = Sweeper::start(Arc::clone(&store));

        tokio::time::sleep(Duration::from_millis(200)).await;

        assert_eq!(store.len(), 1);
        assert!(store.contains("long-lived"));
        assert_eq!(store.stats().expired_by_sweeper, 10);
    }

    #[tokio::test]
    async fn test_sweeper_ignores_rearmed_alias() {
        let store = fast_store();

        store.create(Some("y"), TARGET, Some(Duration::from_millis(30))).unwrap();
        store.rearm("y", Some(Duration::from_secs(100))).unwrap();

        let _sweeper = Sweeper::start(Arc::clone(&store));
        tokio::time::sleep(Duration::from_millis(150)).await;

        assert!(store.contains("y"));
        assert_eq!(store.stats().stale_discarded, 1);
    }

    #[tokio::test]
    async fn test_sweeper_stops_on_drop() {
        let store = fast_store();

        {
            let _sweeper = Sweeper::start(Arc::clone(&store));
            tokio::time::sleep(Duration::from_millis(50)).await;
            // Sweeper is dropped here
        }

        store.create(Some("key"), TARGET, Some(Duration::from_millis(10))).unwrap();
        tokio::time::sleep(Duration::from_millis(100)).await;

        // Nothing swept the record, but reads still never see it
        assert_eq!(store.len(), 1);
        assert!(store.get("key").is_err());
        assert_eq!(store.len(), 0);
    }

    #[tokio::test]
    async fn test_shutdown_waits_for_task() {
        let store = fast_store();
        let sweeper = Sweeper::start(Arc::clone(&store));

        tokio::time::timeout(Duration::from_secs(1), sweeper.shutdown())
            .await
            .expect("sweeper should stop promptly");

        store.create(Some("key"), TARGET, Some(Duration::from_millis(10))).unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(store.len(), 1);
    }
}
