//! RESP2 framing for the control connection.
//!
//! Requests are always arrays of bulk strings; replies may be any RESP2 type.

use std::fmt;

use bytes::Buf;
use bytes::BufMut;
use bytes::Bytes;
use bytes::BytesMut;
use tokio_util::codec::Decoder;
use tokio_util::codec::Encoder;

use crate::ProtocolError;

/// Largest bulk string a server may send (`proto-max-bulk-len` default)
const MAX_BULK_LEN: usize = 512 * 1024 * 1024;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RespValue {
    Simple(String),
    Error(String),
    Integer(i64),
    /// `None` is the null bulk string `$-1`
    Bulk(Option<Bytes>),
    /// `None` is the null array `*-1`
    Array(Option<Vec<RespValue>>),
}

impl RespValue {
    /// Text of a simple or bulk string reply
    pub fn as_text(&self) -> Option<String> {
        match self {
            RespValue::Simple(s) => Some(s.clone()),
            RespValue::Bulk(Some(b)) => Some(String::from_utf8_lossy(b).into_owned()),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, RespValue::Bulk(None) | RespValue::Array(None))
    }
}

impl fmt::Display for RespValue {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        match self {
            RespValue::Simple(s) => write!(f, "+{s}"),
            RespValue::Error(e) => write!(f, "-{e}"),
            RespValue::Integer(i) => write!(f, ":{i}"),
            RespValue::Bulk(None) | RespValue::Array(None) => f.write_str("(nil)"),
            RespValue::Bulk(Some(b)) => write!(f, "{:?}", String::from_utf8_lossy(b)),
            RespValue::Array(Some(items)) => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{item}")?;
                }
                f.write_str("]")
            }
        }
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct RespCodec;

impl Decoder for RespCodec {
    type Item = RespValue;
    type Error = ProtocolError;

    fn decode(
        &mut self,
        src: &mut BytesMut,
    ) -> Result<Option<RespValue>, ProtocolError> {
        match parse_value(&src[..], 0)? {
            Some((value, consumed)) => {
                src.advance(consumed);
                Ok(Some(value))
            }
            None => Ok(None),
        }
    }
}

impl Encoder<Vec<String>> for RespCodec {
    type Error = ProtocolError;

    fn encode(
        &mut self,
        args: Vec<String>,
        dst: &mut BytesMut,
    ) -> Result<(), ProtocolError> {
        dst.put_slice(format!("*{}\r\n", args.len()).as_bytes());
        for arg in args {
            dst.put_slice(format!("${}\r\n", arg.len()).as_bytes());
            dst.put_slice(arg.as_bytes());
            dst.put_slice(b"\r\n");
        }
        Ok(())
    }
}

/// Parses one value starting at `pos`. `Ok(None)` means more bytes are needed;
/// on success returns the value and the position right after it.
fn parse_value(
    buf: &[u8],
    pos: usize,
) -> Result<Option<(RespValue, usize)>, ProtocolError> {
    if pos >= buf.len() {
        return Ok(None);
    }
    let Some(line_end) = find_crlf(buf, pos + 1) else {
        return Ok(None);
    };
    let line = &buf[pos + 1..line_end];
    let next = line_end + 2;

    let value = match buf[pos] {
        b'+' => RespValue::Simple(text(line)?),
        b'-' => RespValue::Error(text(line)?),
        b':' => RespValue::Integer(integer(line)?),
        b'$' => {
            let Some(len) = length(line)? else {
                return Ok(Some((RespValue::Bulk(None), next)));
            };
            if len > MAX_BULK_LEN {
                return Err(ProtocolError::Malformed(format!("bulk length {len} out of range")));
            }
            let end = next + len;
            if buf.len().saturating_sub(2) < end {
                return Ok(None);
            }
            if &buf[end..end + 2] != b"\r\n" {
                return Err(ProtocolError::Malformed("bulk string not terminated by CRLF".into()));
            }
            return Ok(Some((RespValue::Bulk(Some(Bytes::copy_from_slice(&buf[next..end]))), end + 2)));
        }
        b'*' => {
            let Some(count) = length(line)? else {
                return Ok(Some((RespValue::Array(None), next)));
            };
            // every element takes at least three bytes; the header alone is not trusted
            let mut items = Vec::with_capacity(count.min(buf.len().saturating_sub(next) / 3));
            let mut cursor = next;
            for _ in 0..count {
                match parse_value(buf, cursor)? {
                    Some((item, after)) => {
                        items.push(item);
                        cursor = after;
                    }
                    None => return Ok(None),
                }
            }
            return Ok(Some((RespValue::Array(Some(items)), cursor)));
        }
        other => {
            return Err(ProtocolError::Malformed(format!(
                "unknown RESP type byte {:?}",
                other as char
            )))
        }
    };
    Ok(Some((value, next)))
}

fn find_crlf(
    buf: &[u8],
    from: usize,
) -> Option<usize> {
    buf.get(from..)?.windows(2).position(|w| w == b"\r\n").map(|i| from + i)
}

fn text(line: &[u8]) -> Result<String, ProtocolError> {
    String::from_utf8(line.to_vec()).map_err(|_| ProtocolError::Malformed("reply is not valid UTF-8".into()))
}

/// Bulk or array length; `None` for the `-1` null marker.
fn length(line: &[u8]) -> Result<Option<usize>, ProtocolError> {
    match integer(line)? {
        -1 => Ok(None),
        n => usize::try_from(n)
            .map(Some)
            .map_err(|_| ProtocolError::Malformed(format!("invalid length {n}"))),
    }
}

fn integer(line: &[u8]) -> Result<i64, ProtocolError> {
    text(line)?
        .parse()
        .map_err(|_| ProtocolError::Malformed(format!("invalid integer {:?}", String::from_utf8_lossy(line))))
}
