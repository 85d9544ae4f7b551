//! Client Connections
//!
//! Every accepted TCP connection runs in its own task:
//!
//! ```text
//! ┌──────────────────────────────┐
//! │ TCP Listener (main.rs)       │
//! └──────────────┬───────────────┘
//!                │ accept() + spawn
//!                ▼
//! ┌──────────────────────────────┐
//! │ ConnectionHandler            │
//! │  read -> parse -> execute    │
//! │       -> write replies       │
//! └──────────────────────────────┘
//! ```
//!
//! Pipelined commands are executed in order and their replies flushed
//! together. `QUIT` and protocol errors close the connection.
//!
//! ## Example
//!
//! ```ignore
//! use flashlink::commands::CommandHandler;
//! use flashlink::connection::{handle_connection, ConnectionStats};
//! use flashlink::service::Shortener;
//! use flashlink::storage::AliasStore;
//! use std::sync::Arc;
//!
//! let shortener = Shortener::new(Arc::new(AliasStore::new()));
//! let handler = CommandHandler::new(shortener, "http://localhost:3000/api/urls");
//! let stats = Arc::new(ConnectionStats::new());
//!
//! let (stream, addr) = listener.accept().await?;
//! tokio::spawn(handle_connection(stream, addr, handler.clone(), stats));
//! ```

pub mod handler;

pub use handler::{handle_connection, ConnectionError, ConnectionHandler, ConnectionStats};
