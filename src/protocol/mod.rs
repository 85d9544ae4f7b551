//! RESP Protocol Implementation
//!
//! FlashLink speaks the Redis Serialization Protocol so that `redis-cli`
//! and existing Redis client libraries can drive it.
//!
//! ## Modules
//!
//! - `types`: the `RespValue` replies and their serialization
//! - `parser`: incremental parser for incoming commands
//!
//! ## Example
//!
//! ```
//! use flashlink::protocol::{parse_command, RespValue};
//!
//! let data = b"*2\r\n$7\r\nRESOLVE\r\n$3\r\nabc\r\n";
//! let (args, consumed) = parse_command(data).unwrap().unwrap();
//! assert_eq!(&args[1][..], b"abc");
//! assert_eq!(consumed, data.len());
//!
//! let reply = RespValue::bulk_string("https://example.com");
//! assert_eq!(&reply.serialize()[..], b"$19\r\nhttps://example.com\r\n");
//! ```

pub mod parser;
pub mod types;

// Re-export commonly used types for convenience
pub use parser::{parse_command, ParseError, ParseResult};
pub use types::RespValue;
