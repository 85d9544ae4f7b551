//! # FlashLink - An In-Memory, Time-Bounded Alias Store
//!
//! FlashLink maps short aliases to target URLs. Every alias carries a
//! deadline; expired aliases disappear on the next read or on the next
//! pass of a background sweeper, whichever comes first. The store is
//! served over RESP, so `redis-cli` works as a client.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────────┐
//! │                               FlashLink                              │
//! │                                                                      │
//! │  ┌─────────────┐    ┌─────────────┐    ┌─────────────┐               │
//! │  │ TCP Server  │───>│ Connection  │───>│  Command    │               │
//! │  │ (Listener)  │    │  Handler    │    │  Handler    │               │
//! │  └─────────────┘    └─────────────┘    └──────┬──────┘               │
//! │                                               ▼                      │
//! │                                        ┌─────────────┐               │
//! │                                        │  Shortener  │               │
//! │                                        └──────┬──────┘               │
//! │                                               ▼                      │
//! │                     ┌──────────────────────────────────────────────┐ │
//! │                     │                AliasStore                    │ │
//! │                     │  ┌────────┐ ┌────────┐ ┌────────┐  ┌───────┐ │ │
//! │                     │  │Shard 0 │ │Shard 1 │ │...N    │  │Expiry │ │ │
//! │                     │  │RwLock  │ │RwLock  │ │shards  │  │Index  │ │ │
//! │                     │  └────────┘ └────────┘ └────────┘  └───────┘ │ │
//! │                     └──────────────────────────────────────────────┘ │
//! │                                               ▲                      │
//! │                     ┌─────────────────────────┴────────────────────┐ │
//! │                     │        Sweeper (background tokio task)       │ │
//! │                     └──────────────────────────────────────────────┘ │
//! └──────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```
//! use flashlink::service::Shortener;
//! use flashlink::storage::AliasStore;
//! use std::sync::Arc;
//!
//! let shortener = Shortener::new(Arc::new(AliasStore::new()));
//!
//! shortener.create(Some("docs"), "https://docs.rs", Some(300)).unwrap();
//! assert_eq!(shortener.resolve("docs").unwrap(), "https://docs.rs");
//!
//! let updated = shortener.update("docs", Some("rustdocs"), None).unwrap();
//! assert_eq!(updated.alias, "rustdocs");
//! assert!(shortener.resolve("docs").is_err());
//! ```
//!
//! ## Module Overview
//!
//! - [`storage`]: the alias store, its expiry index and the sweeper
//! - [`service`]: the request-facing [`Shortener`]
//! - [`alias`]: alias validation and generation
//! - [`protocol`]: RESP parsing and replies
//! - [`commands`]: RESP commands mapped onto the service
//! - [`connection`]: client connection management
//!
//! ## Expiry
//!
//! Deadlines are kept in a min-heap keyed by expiry time. Re-arming an
//! alias does not touch the heap; it bumps the record's version and pushes
//! a fresh entry. Entries whose version no longer matches are dropped when
//! they reach the top of the heap.

pub mod alias;
pub mod commands;
pub mod connection;
pub mod error;
pub mod protocol;
pub mod service;
pub mod storage;

pub use commands::CommandHandler;
pub use connection::{handle_connection, ConnectionStats};
pub use error::{StoreError, StoreResult};
pub use protocol::{parse_command, ParseError, RespValue};
pub use service::Shortener;
pub use storage::{AliasRecord, AliasStore, StoreConfig, Sweeper};

/// The default port FlashLink listens on (Redis' port plus one)
pub const DEFAULT_PORT: u16 = 6380;

/// The default host FlashLink binds to
pub const DEFAULT_HOST: &str = "127.0.0.1";

/// The default prefix for reported short URLs
pub const DEFAULT_BASE_URL: &str = "http://localhost:3000/api/urls";

/// Version of FlashLink
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
