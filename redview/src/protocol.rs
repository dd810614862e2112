//! RESP2 protocol implementation
//!
//! Commands go out as arrays of bulk strings; replies are decoded
//! incrementally from whatever bytes have arrived so far.

use bytes::{Buf, BufMut, Bytes, BytesMut};
use redview_core::{
    error::{RedisError, RedisResult},
    value::RespValue,
};
use std::io::Cursor;

const CRLF: &[u8] = b"\r\n";

/// Encodes RESP values into bytes
pub struct RespEncoder;

impl RespEncoder {
    /// Encode a RESP value into a buffer
    pub fn encode(value: &RespValue, buf: &mut BytesMut) -> RedisResult<()> {
        match value {
            RespValue::SimpleString(s) => Self::put_line(b'+', s.as_bytes(), buf),
            RespValue::Error(e) => Self::put_line(b'-', e.as_bytes(), buf),
            RespValue::Integer(i) => Self::put_line(b':', i.to_string().as_bytes(), buf),
            RespValue::BulkString(data) => Self::put_bulk(data, buf),
            RespValue::Null => buf.put_slice(b"$-1\r\n"),
            RespValue::Array(items) => {
                Self::put_line(b'*', items.len().to_string().as_bytes(), buf);
                for item in items {
                    Self::encode(item, buf)?;
                }
            }
        }
        Ok(())
    }

    /// Encode a command with arguments.
    ///
    /// Servers only accept bulk strings inside a request, so integer and
    /// simple-string arguments are sent as their bulk-string rendering.
    pub fn encode_command(command: &str, args: &[RespValue]) -> RedisResult<Bytes> {
        let mut buf = BytesMut::new();

        Self::put_line(b'*', (1 + args.len()).to_string().as_bytes(), &mut buf);
        Self::put_bulk(command.as_bytes(), &mut buf);

        for arg in args {
            match arg {
                RespValue::BulkString(data) => Self::put_bulk(data, &mut buf),
                RespValue::SimpleString(s) => Self::put_bulk(s.as_bytes(), &mut buf),
                RespValue::Integer(i) => Self::put_bulk(i.to_string().as_bytes(), &mut buf),
                other => {
                    return Err(RedisError::Protocol(format!(
                        "Cannot send {other:?} as a command argument"
                    )))
                }
            }
        }

        Ok(buf.freeze())
    }

    fn put_line(prefix: u8, body: &[u8], buf: &mut BytesMut) {
        buf.put_u8(prefix);
        buf.put_slice(body);
        buf.put_slice(CRLF);
    }

    fn put_bulk(data: &[u8], buf: &mut BytesMut) {
        Self::put_line(b'$', data.len().to_string().as_bytes(), buf);
        buf.put_slice(data);
        buf.put_slice(CRLF);
    }
}

/// Decodes RESP values from bytes
pub struct RespDecoder;

impl RespDecoder {
    /// Decode one value starting at the cursor position.
    ///
    /// Returns `Ok(None)` when the buffer holds only part of a value; the
    /// cursor position is then meaningless and the caller should retry from
    /// the same start once more bytes have arrived.
    pub fn decode(buf: &mut Cursor<&[u8]>) -> RedisResult<Option<RespValue>> {
        if !buf.has_remaining() {
            return Ok(None);
        }

        match buf.get_u8() {
            b'+' => Ok(Self::read_text(buf)?.map(RespValue::SimpleString)),
            b'-' => Ok(Self::read_text(buf)?.map(RespValue::Error)),
            b':' => Ok(Self::read_decimal(buf)?.map(RespValue::Integer)),
            b'$' => Self::decode_bulk_string(buf),
            b'*' => Self::decode_array(buf),
            other => Err(RedisError::Protocol(format!(
                "Invalid RESP type byte: {:?}",
                other as char
            ))),
        }
    }

    fn decode_bulk_string(buf: &mut Cursor<&[u8]>) -> RedisResult<Option<RespValue>> {
        let Some(len) = Self::read_length(buf)? else {
            return Ok(None);
        };
        let Some(len) = len else {
            return Ok(Some(RespValue::Null));
        };

        if buf.remaining() < len + CRLF.len() {
            return Ok(None);
        }
        let data = Bytes::copy_from_slice(&buf.chunk()[..len]);
        buf.advance(len + CRLF.len());

        Ok(Some(RespValue::BulkString(data)))
    }

    fn decode_array(buf: &mut Cursor<&[u8]>) -> RedisResult<Option<RespValue>> {
        let Some(len) = Self::read_length(buf)? else {
            return Ok(None);
        };
        let Some(len) = len else {
            return Ok(Some(RespValue::Null));
        };

        // The header is untrusted; every element takes at least 3 bytes
        let mut items = Vec::with_capacity(len.min(buf.remaining() / 3));
        for _ in 0..len {
            match Self::decode(buf)? {
                Some(item) => items.push(item),
                None => return Ok(None),
            }
        }

        Ok(Some(RespValue::Array(items)))
    }

    /// Length header of a bulk string or array. The inner `None` is the
    /// `-1` null marker.
    fn read_length(buf: &mut Cursor<&[u8]>) -> RedisResult<Option<Option<usize>>> {
        let Some(len) = Self::read_decimal(buf)? else {
            return Ok(None);
        };
        if len == -1 {
            return Ok(Some(None));
        }
        usize::try_from(len)
            .map(|len| Some(Some(len)))
            .map_err(|_| RedisError::Protocol(format!("Negative length: {len}")))
    }

    fn read_decimal(buf: &mut Cursor<&[u8]>) -> RedisResult<Option<i64>> {
        match Self::read_text(buf)? {
            Some(text) => text
                .parse()
                .map(Some)
                .map_err(|e| RedisError::Protocol(format!("Invalid integer {text:?}: {e}"))),
            None => Ok(None),
        }
    }

    fn read_text(buf: &mut Cursor<&[u8]>) -> RedisResult<Option<String>> {
        match Self::read_line(buf) {
            Some(line) => String::from_utf8(line.to_vec())
                .map(Some)
                .map_err(|e| RedisError::Protocol(format!("Invalid UTF-8: {e}"))),
            None => Ok(None),
        }
    }

    /// Bytes up to the next CRLF; the cursor moves past the CRLF
    fn read_line<'a>(buf: &mut Cursor<&'a [u8]>) -> Option<&'a [u8]> {
        let data: &'a [u8] = *buf.get_ref();
        let start = usize::try_from(buf.position()).ok()?.min(data.len());
        let end = start + data[start..].windows(2).position(|w| w == CRLF)?;
        buf.set_position((end + CRLF.len()) as u64);
        Some(&data[start..end])
    }
}

/// Finds where a reply ends without building it.
///
/// Keeps its position across calls, so a reply that arrives over many reads
/// is only scanned once. Start a fresh scanner for each reply.
#[derive(Debug, Default)]
pub struct FrameScanner {
    pos: usize,
    // Elements still missing at each open array level
    open: Vec<usize>,
}

impl FrameScanner {
    /// Create a scanner positioned at the start of a reply
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `Ok(true)` once `buf` holds a complete reply. `buf` must be
    /// the same buffer as in earlier calls, possibly with more bytes appended.
    pub fn advance(&mut self, buf: &[u8]) -> RedisResult<bool> {
        loop {
            let rest = buf.get(self.pos..).unwrap_or_default();
            let Some(&kind) = rest.first() else {
                return Ok(false);
            };
            let Some(eol) = rest.windows(2).position(|w| w == CRLF) else {
                return Ok(false);
            };
            let header = &rest[1..eol];
            let mut next = self.pos + eol + CRLF.len();

            match kind {
                b'+' | b'-' | b':' => {}
                b'$' => {
                    if let Some(len) = Self::length(header)? {
                        let end = next + len + CRLF.len();
                        if buf.len() < end {
                            return Ok(false);
                        }
                        next = end;
                    }
                }
                b'*' => {
                    if let Some(len) = Self::length(header)?.filter(|len| *len > 0) {
                        self.pos = next;
                        self.open.push(len);
                        continue;
                    }
                }
                other => {
                    return Err(RedisError::Protocol(format!(
                        "Invalid RESP type byte: {:?}",
                        other as char
                    )))
                }
            }

            self.pos = next;
            // One value finished; close every array it completes
            loop {
                let Some(missing) = self.open.last_mut() else {
                    return Ok(true);
                };
                *missing -= 1;
                if *missing > 0 {
                    break;
                }
                self.open.pop();
            }
        }
    }

    fn length(header: &[u8]) -> RedisResult<Option<usize>> {
        let len: i64 = std::str::from_utf8(header)
            .ok()
            .and_then(|text| text.parse().ok())
            .ok_or_else(|| {
                RedisError::Protocol(format!(
                    "Invalid length header {:?}",
                    String::from_utf8_lossy(header)
                ))
            })?;
        if len == -1 {
            return Ok(None);
        }
        usize::try_from(len)
            .map(Some)
            .map_err(|_| RedisError::Protocol(format!("Negative length: {len}")))
    }
}
