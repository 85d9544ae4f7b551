//! Storage Module
//!
//! This module holds the core of FlashLink: the authoritative alias store,
//! the advisory expiry index next to it, and the background sweeper that
//! reclaims expired aliases.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                        AliasStore                           │
//! │  ┌─────────┐ ┌─────────┐ ┌─────────┐ ┌─────────┐            │
//! │  │ Shard 0 │ │ Shard 1 │ │ Shard 2 │ │...16    │            │
//! │  │ RwLock  │ │ RwLock  │ │ RwLock  │ │ shards  │            │
//! │  └─────────┘ └─────────┘ └─────────┘ └─────────┘            │
//! │              ExpiryIndex (alias, expires_at, version)       │
//! └─────────────────────────────────────────────────────────────┘
//!                            ▲
//!                            │ pop due entries, check version
//!              ┌─────────────┴─────────────┐
//!              │         Sweeper           │
//!              │  (Background Tokio Task)  │
//!              └───────────────────────────┘
//! ```
//!
//! ## Features
//!
//! - **Sharded Storage**: independent shards reduce lock contention
//! - **Versioned Deadlines**: every deadline change bumps the record version
//! - **Lazy Index Cleanup**: stale index entries are dropped when popped
//! - **Read-Time Eviction**: expired records are removed on access
//! - **Active Expiry**: the sweeper removes records nobody reads again
//!
//! ## Example
//!
//! ```
//! use flashlink::storage::AliasStore;
//! use std::time::Duration;
//!
//! let store = AliasStore::new();
//!
//! store.create(Some("docs"), "https://example.com/docs", None).unwrap();
//! let expires_at = store.rearm("docs", Some(Duration::from_secs(3600))).unwrap();
//! assert_eq!(store.get("docs").unwrap().expires_at, expires_at);
//! assert_eq!(store.get("docs").unwrap().version, 1);
//! ```

pub mod access_log;
pub mod clock;
pub mod config;
pub mod expiry;
pub mod expiry_index;
pub mod record;
pub mod store;

// Re-export commonly used types
pub use access_log::AccessLog;
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::StoreConfig;
pub use expiry::{sweep_due, SweepReport, Sweeper};
pub use expiry_index::{ExpiryIndex, IndexEntry};
pub use record::AliasRecord;
pub use store::{AliasStore, StoreStats, MAX_ALIAS_ATTEMPTS};
