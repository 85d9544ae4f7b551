//! Incremental command parser.
//!
//! Commands arrive either as RESP arrays of bulk strings (what Redis clients
//! send) or as inline lines of whitespace-separated words (what a human
//! typing into `nc` sends):
//!
//! ```text
//! *2\r\n$7\r\nRESOLVE\r\n$3\r\nabc\r\n
//! RESOLVE abc\r\n
//! ```
//!
//! [`parse_command`] returns:
//! - `Ok(Some((args, consumed)))` - a full command, `consumed` bytes used
//! - `Ok(None)` - the command is incomplete, read more data
//! - `Err(ParseError)` - the bytes cannot be a command

use crate::protocol::types::{prefix, CRLF};
use bytes::Bytes;
use thiserror::Error;

/// Errors that can occur while parsing a command.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// A length field is not a valid integer
    #[error("invalid integer: {0}")]
    InvalidInteger(String),

    /// Inline commands must be UTF-8
    #[error("invalid UTF-8: {0}")]
    InvalidUtf8(String),

    /// Negative bulk string length
    #[error("invalid bulk string length: {0}")]
    InvalidBulkLength(i64),

    /// Negative or oversized argument count
    #[error("invalid argument count: {0}")]
    InvalidArrayLength(i64),

    /// Protocol violation (missing CRLF, wrong element type, etc.)
    #[error("protocol error: {0}")]
    ProtocolError(String),

    /// An argument exceeds the maximum allowed size
    #[error("argument too large: {size} bytes (max: {max})")]
    MessageTooLarge { size: usize, max: usize },
}

/// Result type for parsing operations.
pub type ParseResult<T> = Result<T, ParseError>;

/// Largest single argument accepted (1 MB). Targets are URLs, not blobs.
pub const MAX_BULK_SIZE: usize = 1024 * 1024;

/// Most arguments a single command may carry.
pub const MAX_ARGS: usize = 32;

/// Parses one command from the front of `buf`.
pub fn parse_command(buf: &[u8]) -> ParseResult<Option<(Vec<Bytes>, usize)>> {
    match buf.first() {
        None => Ok(None),
        Some(&prefix::ARRAY) => parse_multibulk(buf),
        Some(_) => parse_inline(buf),
    }
}

/// Finds the CRLF-terminated line starting at `start`.
///
/// Returns the line without its terminator and the offset just past it.
fn read_line(buf: &[u8], start: usize) -> Option<(&[u8], usize)> {
    let rest = buf.get(start..)?;
    let pos = rest.windows(2).position(|w| w == CRLF)?;
    Some((&rest[..pos], start + pos + 2))
}

fn read_int(line: &[u8]) -> ParseResult<i64> {
    let s = std::str::from_utf8(line).map_err(|e| ParseError::InvalidUtf8(e.to_string()))?;
    s.parse()
        .map_err(|_| ParseError::InvalidInteger(s.to_string()))
}

/// `*<count>\r\n` followed by `count` bulk strings.
fn parse_multibulk(buf: &[u8]) -> ParseResult<Option<(Vec<Bytes>, usize)>> {
    let (line, mut pos) = match read_line(buf, 1) {
        Some(found) => found,
        None => return Ok(None),
    };

    let count = read_int(line)?;
    if count < 0 || count as usize > MAX_ARGS {
        return Err(ParseError::InvalidArrayLength(count));
    }

    let mut args = Vec::with_capacity(count as usize);
    for _ in 0..count {
        match buf.get(pos) {
            None => return Ok(None),
            Some(&prefix::BULK_STRING) => {}
            Some(&other) => {
                return Err(ParseError::ProtocolError(format!(
                    "expected bulk string, got {:#04x}",
                    other
                )))
            }
        }

        let (line, data_start) = match read_line(buf, pos + 1) {
            Some(found) => found,
            None => return Ok(None),
        };
        let len = read_int(line)?;
        if len < 0 {
            return Err(ParseError::InvalidBulkLength(len));
        }
        let len = len as usize;
        if len > MAX_BULK_SIZE {
            return Err(ParseError::MessageTooLarge {
                size: len,
                max: MAX_BULK_SIZE,
            });
        }

        let data_end = data_start + len;
        if buf.len() < data_end + 2 {
            return Ok(None);
        }
        if &buf[data_end..data_end + 2] != CRLF {
            return Err(ParseError::ProtocolError(
                "bulk string missing trailing CRLF".to_string(),
            ));
        }

        args.push(Bytes::copy_from_slice(&buf[data_start..data_end]));
        pos = data_end + 2;
    }

    Ok(Some((args, pos)))
}

/// A single line of whitespace-separated words, ended by LF or CRLF.
///
/// A blank line parses to an empty argument list.
fn parse_inline(buf: &[u8]) -> ParseResult<Option<(Vec<Bytes>, usize)>> {
    let newline = match buf.iter().position(|&b| b == b'\n') {
        Some(pos) => pos,
        None if buf.len() > MAX_BULK_SIZE => {
            return Err(ParseError::MessageTooLarge {
                size: buf.len(),
                max: MAX_BULK_SIZE,
            })
        }
        None => return Ok(None),
    };

    let line = buf[..newline].strip_suffix(b"\r").unwrap_or(&buf[..newline]);
    let line = std::str::from_utf8(line).map_err(|e| ParseError::InvalidUtf8(e.to_string()))?;

    let args: Vec<Bytes> = line
        .split_whitespace()
        .map(|word| Bytes::copy_from_slice(word.as_bytes()))
        .collect();
    if args.len() > MAX_ARGS {
        return Err(ParseError::InvalidArrayLength(args.len() as i64));
    }

    Ok(Some((args, newline + 1)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(words: &[&str]) -> Vec<Bytes> {
        words.iter().map(|w| Bytes::copy_from_slice(w.as_bytes())).collect()
    }

    #[test]
    fn test_multibulk_command() {
        let buf = b"*2\r\n$7\r\nRESOLVE\r\n$3\r\nabc\r\n";
        let (parsed, consumed) = parse_command(buf).unwrap().unwrap();
        assert_eq!(parsed, args(&["RESOLVE", "abc"]));
        assert_eq!(consumed, buf.len());
    }

    #[test]
    fn test_multibulk_is_binary_safe() {
        let buf = b"*1\r\n$4\r\na\r\nb\r\n";
        let (parsed, _) = parse_command(buf).unwrap().unwrap();
        assert_eq!(&parsed[0][..], b"a\r\nb");
    }

    #[test]
    fn test_incomplete_multibulk() {
        let full = b"*2\r\n$7\r\nRESOLVE\r\n$3\r\nabc\r\n";
        for cut in 0..full.len() {
            assert_eq!(parse_command(&full[..cut]).unwrap(), None, "cut at {}", cut);
        }
    }

    #[test]
    fn test_pipelined_commands() {
        let buf = b"*1\r\n$4\r\nPING\r\n*2\r\n$6\r\nREMOVE\r\n$1\r\nx\r\n";
        let (first, consumed) = parse_command(buf).unwrap().unwrap();
        assert_eq!(first, args(&["PING"]));

        let (second, rest) = parse_command(&buf[consumed..]).unwrap().unwrap();
        assert_eq!(second, args(&["REMOVE", "x"]));
        assert_eq!(consumed + rest, buf.len());
    }

    #[test]
    fn test_inline_command() {
        let (parsed, consumed) = parse_command(b"SHORTEN  http://a.b  TTL 5\r\n")
            .unwrap()
            .unwrap();
        assert_eq!(parsed, args(&["SHORTEN", "http://a.b", "TTL", "5"]));
        assert_eq!(consumed, 28);

        let (parsed, _) = parse_command(b"PING\n").unwrap().unwrap();
        assert_eq!(parsed, args(&["PING"]));

        assert_eq!(parse_command(b"PING").unwrap(), None);
    }

    #[test]
    fn test_blank_inline_line() {
        let (parsed, consumed) = parse_command(b"\r\n").unwrap().unwrap();
        assert!(parsed.is_empty());
        assert_eq!(consumed, 2);
    }

    #[test]
    fn test_malformed_commands() {
        assert!(matches!(
            parse_command(b"*x\r\n"),
            Err(ParseError::InvalidInteger(_))
        ));
        assert_eq!(
            parse_command(b"*-1\r\n"),
            Err(ParseError::InvalidArrayLength(-1))
        );
        assert_eq!(
            parse_command(b"*1\r\n$-3\r\n"),
            Err(ParseError::InvalidBulkLength(-3))
        );
        assert!(matches!(
            parse_command(b"*1\r\n:1\r\n"),
            Err(ParseError::ProtocolError(_))
        ));
        assert!(matches!(
            parse_command(b"*1\r\n$3\r\nabcXY"),
            Err(ParseError::ProtocolError(_))
        ));
        assert_eq!(
            parse_command(b"*1\r\n$99999999\r\n"),
            Err(ParseError::MessageTooLarge {
                size: 99_999_999,
                max: MAX_BULK_SIZE
            })
        );
    }
}
