//! Common types used throughout the library

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// One page of a cursor-based keyspace scan
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanBatch {
    /// Keys returned by this step, in server order
    pub keys: Vec<String>,
    /// Cursor for the next step; `0` means the traversal is complete
    pub cursor: u64,
}

impl ScanBatch {
    /// Create a new batch
    #[must_use]
    pub const fn new(keys: Vec<String>, cursor: u64) -> Self {
        Self { keys, cursor }
    }

    /// Whether the server reported the end of the traversal
    #[must_use]
    pub const fn is_final(&self) -> bool {
        self.cursor == 0
    }
}

/// Data type stored at a key, as reported by `TYPE`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum KeyType {
    /// The key does not exist
    None,
    /// String value
    String,
    /// List value
    List,
    /// Set value
    Set,
    /// Sorted set value
    ZSet,
    /// Hash value
    Hash,
    /// Stream value
    Stream,
    /// Any type this library has no dedicated support for (e.g. module types)
    Other(String),
}

impl From<&str> for KeyType {
    fn from(s: &str) -> Self {
        match s {
            "none" => Self::None,
            "string" => Self::String,
            "list" => Self::List,
            "set" => Self::Set,
            "zset" => Self::ZSet,
            "hash" => Self::Hash,
            "stream" => Self::Stream,
            other => Self::Other(other.to_string()),
        }
    }
}

impl FromStr for KeyType {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::from(s))
    }
}

impl fmt::Display for KeyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::None => "none",
            Self::String => "string",
            Self::List => "list",
            Self::Set => "set",
            Self::ZSet => "zset",
            Self::Hash => "hash",
            Self::Stream => "stream",
            Self::Other(name) => name.as_str(),
        };
        f.write_str(name)
    }
}

/// Remaining time to live of a key, as reported by `TTL`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyTtl {
    /// The key does not exist (`-2`)
    Missing,
    /// The key exists without an expiry (`-1`)
    Persistent,
    /// The key expires after the given duration
    ExpiresIn(Duration),
}

impl KeyTtl {
    /// Interpret the integer reply of `TTL`
    #[must_use]
    pub fn from_seconds(seconds: i64) -> Self {
        match seconds {
            -1 => Self::Persistent,
            s if s < 0 => Self::Missing,
            s => Self::ExpiresIn(Duration::from_secs(s.unsigned_abs())),
        }
    }
}

/// A sorted set member paired with its score
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredMember {
    /// Member name
    pub member: String,
    /// Member score
    pub score: f64,
}

/// Represents a slot range in a Redis cluster
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlotRange {
    /// Start of the slot range (inclusive)
    pub start: u16,
    /// End of the slot range (inclusive)
    pub end: u16,
}

impl SlotRange {
    /// Create a new slot range
    #[must_use]
    pub const fn new(start: u16, end: u16) -> Self {
        Self { start, end }
    }

    /// Check if a slot is within this range
    #[must_use]
    pub const fn contains(&self, slot: u16) -> bool {
        slot >= self.start && slot <= self.end
    }
}

/// Node information in a Redis cluster
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeInfo {
    /// Node ID (`host:port`)
    pub id: String,
    /// Host address
    pub host: String,
    /// Port number
    pub port: u16,
    /// Slot ranges owned by this node
    pub slots: Vec<SlotRange>,
    /// Whether this is a master node
    pub is_master: bool,
}

impl NodeInfo {
    /// Create a new node info
    #[must_use]
    pub const fn new(id: String, host: String, port: u16) -> Self {
        Self {
            id,
            host,
            port,
            slots: Vec::new(),
            is_master: true,
        }
    }

    /// Check if this node owns a given slot
    #[must_use]
    pub fn owns_slot(&self, slot: u16) -> bool {
        self.slots.iter().any(|range| range.contains(slot))
    }
}
