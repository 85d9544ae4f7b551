//! Command Layer
//!
//! Receives parsed commands, runs them through the
//! [`Shortener`](crate::service::Shortener) and builds the RESP reply.
//!
//! ```text
//! Client Request
//!       │
//!       ▼
//! ┌─────────────────┐
//! │  Parser         │  (protocol module)
//! └────────┬────────┘
//!          ▼
//! ┌─────────────────┐
//! │ CommandHandler  │  (this module)
//! └────────┬────────┘
//!          ▼
//! ┌─────────────────┐
//! │ Shortener       │  (service module)
//! └────────┬────────┘
//!          ▼
//! ┌─────────────────┐
//! │ AliasStore      │  (storage module)
//! └─────────────────┘
//! ```
//!
//! ## Supported Commands
//!
//! - `SHORTEN`, `RESOLVE`, `STATS`, `UPDATE`, `REMOVE`
//! - `PING`, `INFO`, `QUIT`

pub mod handler;

pub use handler::CommandHandler;
