//! RESP reply values.
//!
//! Clients send commands as arrays of bulk strings; the server answers
//! with one of the values below.
//!
//! ```text
//! +OK\r\n                      simple string
//! -NOTFOUND alias ...\r\n      error
//! :3\r\n                       integer
//! $4\r\nabcd\r\n               bulk string
//! $-1\r\n                      null
//! *2\r\n...                    array
//! ```

use bytes::{BufMut, Bytes, BytesMut};

/// The CRLF terminator used in RESP protocol
pub const CRLF: &[u8] = b"\r\n";

/// RESP protocol type prefixes
pub mod prefix {
    pub const SIMPLE_STRING: u8 = b'+';
    pub const ERROR: u8 = b'-';
    pub const INTEGER: u8 = b':';
    pub const BULK_STRING: u8 = b'$';
    pub const ARRAY: u8 = b'*';
}

/// A reply sent back to a client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RespValue {
    /// `+<string>\r\n`, must not contain CR or LF
    SimpleString(String),
    /// `-<message>\r\n`
    Error(String),
    /// `:<integer>\r\n`
    Integer(i64),
    /// `$<length>\r\n<data>\r\n`
    BulkString(Bytes),
    /// `$-1\r\n`
    Null,
    /// `*<count>\r\n<elements...>`
    Array(Vec<RespValue>),
}

impl RespValue {
    pub fn simple_string(s: impl Into<String>) -> Self {
        RespValue::SimpleString(s.into())
    }

    pub fn error(s: impl Into<String>) -> Self {
        RespValue::Error(s.into())
    }

    pub fn integer(n: i64) -> Self {
        RespValue::Integer(n)
    }

    pub fn bulk_string(data: impl Into<Bytes>) -> Self {
        RespValue::BulkString(data.into())
    }

    pub fn array(values: Vec<RespValue>) -> Self {
        RespValue::Array(values)
    }

    pub fn ok() -> Self {
        RespValue::simple_string("OK")
    }

    pub fn pong() -> Self {
        RespValue::simple_string("PONG")
    }

    pub fn is_error(&self) -> bool {
        matches!(self, RespValue::Error(_))
    }

    /// Serializes the value into its wire format.
    ///
    /// ```
    /// use flashlink::protocol::RespValue;
    ///
    /// let reply = RespValue::array(vec![
    ///     RespValue::bulk_string("abc"),
    ///     RespValue::integer(1),
    /// ]);
    /// assert_eq!(&reply.serialize()[..], b"*2\r\n$3\r\nabc\r\n:1\r\n");
    /// ```
    pub fn serialize(&self) -> Bytes {
        let mut buf = BytesMut::new();
        self.write_to(&mut buf);
        buf.freeze()
    }

    /// Appends the wire format to `buf`.
    pub fn write_to(&self, buf: &mut BytesMut) {
        match self {
            RespValue::SimpleString(s) => write_line(buf, prefix::SIMPLE_STRING, s.as_bytes()),
            RespValue::Error(s) => write_line(buf, prefix::ERROR, s.as_bytes()),
            RespValue::Integer(n) => write_line(buf, prefix::INTEGER, n.to_string().as_bytes()),
            RespValue::BulkString(data) => {
                write_line(buf, prefix::BULK_STRING, data.len().to_string().as_bytes());
                buf.put_slice(data);
                buf.put_slice(CRLF);
            }
            RespValue::Null => write_line(buf, prefix::BULK_STRING, b"-1"),
            RespValue::Array(values) => {
                write_line(buf, prefix::ARRAY, values.len().to_string().as_bytes());
                for value in values {
                    value.write_to(buf);
                }
            }
        }
    }
}

/// Writes `<prefix><content>\r\n`, replacing CR and LF in `content` with
/// spaces so a message can never break framing.
fn write_line(buf: &mut BytesMut, prefix: u8, content: &[u8]) {
    buf.reserve(content.len() + 3);
    buf.put_u8(prefix);
    for &b in content {
        buf.put_u8(if b == b'\r' || b == b'\n' { b' ' } else { b });
    }
    buf.put_slice(CRLF);
}
