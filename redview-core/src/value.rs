//! RESP (`REdis` Serialization Protocol) value types

use crate::error::{RedisError, RedisResult};
use bytes::Bytes;
use std::fmt;

/// RESP protocol value
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RespValue {
    /// Simple string: +OK\r\n
    SimpleString(String),
    /// Error: -ERR message\r\n
    Error(String),
    /// Integer: :1000\r\n
    Integer(i64),
    /// Bulk string: $6\r\nfoobar\r\n
    BulkString(Bytes),
    /// Null bulk string: $-1\r\n
    Null,
    /// Array: *2\r\n$3\r\nfoo\r\n$3\r\nbar\r\n
    Array(Vec<RespValue>),
}

impl RespValue {
    /// Convert to a string if possible
    ///
    /// # Errors
    ///
    /// Returns an error if the value cannot be converted to a string.
    pub fn as_string(&self) -> RedisResult<String> {
        match self {
            Self::SimpleString(s) => Ok(s.clone()),
            Self::BulkString(b) => utf8(b).map(str::to_string),
            Self::Null => Err(RedisError::Type("Value is null".to_string())),
            _ => Err(RedisError::Type(format!(
                "Cannot convert {self:?} to string"
            ))),
        }
    }

    /// Convert to an integer if possible
    ///
    /// # Errors
    ///
    /// Returns an error if the value cannot be converted to an integer.
    pub fn as_int(&self) -> RedisResult<i64> {
        match self {
            Self::Integer(i) => Ok(*i),
            Self::BulkString(b) => utf8(b)?
                .parse::<i64>()
                .map_err(|e| RedisError::Type(format!("Cannot parse integer: {e}"))),
            _ => Err(RedisError::Type(format!(
                "Cannot convert {self:?} to integer"
            ))),
        }
    }

    /// Convert to an unsigned integer if possible.
    ///
    /// Scan cursors use the full `u64` range and arrive as bulk strings.
    ///
    /// # Errors
    ///
    /// Returns an error if the value is not a non-negative integer.
    pub fn as_u64(&self) -> RedisResult<u64> {
        match self {
            Self::Integer(i) => u64::try_from(*i)
                .map_err(|e| RedisError::Type(format!("Negative integer {i}: {e}"))),
            Self::BulkString(b) => utf8(b)?
                .parse::<u64>()
                .map_err(|e| RedisError::Type(format!("Cannot parse unsigned integer: {e}"))),
            _ => Err(RedisError::Type(format!(
                "Cannot convert {self:?} to unsigned integer"
            ))),
        }
    }

    /// Convert to bytes if possible
    ///
    /// # Errors
    ///
    /// Returns an error if the value cannot be converted to bytes.
    pub fn as_bytes(&self) -> RedisResult<Bytes> {
        match self {
            Self::BulkString(b) => Ok(b.clone()),
            Self::SimpleString(s) => Ok(Bytes::from(s.as_bytes().to_vec())),
            Self::Null => Err(RedisError::Type("Value is null".to_string())),
            _ => Err(RedisError::Type(format!(
                "Cannot convert {self:?} to bytes"
            ))),
        }
    }

    /// Take the items out of an array
    ///
    /// # Errors
    ///
    /// Returns an error if the value is not an array.
    pub fn into_array(self) -> RedisResult<Vec<Self>> {
        match self {
            Self::Array(arr) => Ok(arr),
            other => Err(RedisError::Type(format!(
                "Cannot convert {other:?} to array"
            ))),
        }
    }

    /// Convert an array of strings, skipping null entries
    ///
    /// # Errors
    ///
    /// Returns an error if the value is not an array or an item is not a string.
    pub fn into_string_vec(self) -> RedisResult<Vec<String>> {
        self.into_array()?
            .iter()
            .filter(|item| !item.is_null())
            .map(Self::as_string)
            .collect()
    }

    /// Convert an array of strings, skipping null entries.
    ///
    /// Keys, fields and members are binary-safe, so bytes that are not UTF-8
    /// are replaced with U+FFFD instead of failing the whole reply.
    ///
    /// # Errors
    ///
    /// Returns an error if the value is not an array or an item is not a string.
    pub fn into_lossy_string_vec(self) -> RedisResult<Vec<String>> {
        self.into_array()?
            .into_iter()
            .filter(|item| !item.is_null())
            .map(|item| match item {
                Self::BulkString(b) => Ok(String::from_utf8_lossy(&b).into_owned()),
                other => other.as_string(),
            })
            .collect()
    }

    /// Check if this is a null value
    #[must_use]
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Check if this is an error
    #[must_use]
    pub const fn is_error(&self) -> bool {
        matches!(self, Self::Error(_))
    }

    /// Extract error message if this is an error
    #[must_use]
    pub fn into_error(self) -> Option<String> {
        match self {
            Self::Error(msg) => Some(msg),
            _ => None,
        }
    }
}

fn utf8(bytes: &[u8]) -> RedisResult<&str> {
    std::str::from_utf8(bytes).map_err(|e| RedisError::Type(format!("Invalid UTF-8: {e}")))
}

impl fmt::Display for RespValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SimpleString(s) => f.write_str(s),
            Self::Error(e) => write!(f, "(error) {e}"),
            Self::Integer(i) => write!(f, "{i}"),
            Self::BulkString(b) => f.write_str(&String::from_utf8_lossy(b)),
            Self::Null => f.write_str("(nil)"),
            Self::Array(items) => {
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

impl From<String> for RespValue {
    fn from(s: String) -> Self {
        Self::BulkString(Bytes::from(s.into_bytes()))
    }
}
impl From<&str> for RespValue {
    fn from(s: &str) -> Self {
        Self::BulkString(Bytes::copy_from_slice(s.as_bytes()))
    }
}
impl From<i64> for RespValue {
    fn from(i: i64) -> Self {
        Self::Integer(i)
    }
}
impl From<u64> for RespValue {
    fn from(i: u64) -> Self {
        Self::BulkString(Bytes::from(i.to_string()))
    }
}
impl From<Vec<u8>> for RespValue {
    fn from(b: Vec<u8>) -> Self {
        Self::BulkString(Bytes::from(b))
    }
}
impl From<Bytes> for RespValue {
    fn from(b: Bytes) -> Self {
        Self::BulkString(b)
    }
}

impl TryFrom<RespValue> for String {
    type Error = RedisError;

    fn try_from(value: RespValue) -> Result<Self, Self::Error> {
        value.as_string()
    }
}

impl TryFrom<RespValue> for i64 {
    type Error = RedisError;

    fn try_from(value: RespValue) -> Result<Self, Self::Error> {
        value.as_int()
    }
}
