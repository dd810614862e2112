//! Command builders for Redis operations
//!
//! Typed builders implement [`Command`]; before dispatch every builder is
//! lowered to a [`RawCommand`], the single shape a client transports.

pub mod hash;
pub mod list;
pub mod set;
pub mod sorted_set;

use bytes::Bytes;
use redview_core::{
    error::{RedisError, RedisResult},
    types::{KeyTtl, KeyType, ScanBatch},
    value::RespValue,
};
use std::fmt;

pub use hash::{HGetCommand, HKeysCommand};
pub use list::LRangeCommand;
pub use set::SMembersCommand;
pub use sorted_set::ZRangeWithScoresCommand;

/// Trait for commands that can be executed
pub trait Command {
    /// The return type of the command
    type Output;

    /// Get the command name
    fn command_name(&self) -> &str;

    /// Get the command arguments
    fn args(&self) -> Vec<RespValue>;

    /// Parse the response into the output type
    fn parse_response(&self, response: RespValue) -> RedisResult<Self::Output>;

    /// Get the key(s) involved in this command (for cluster routing)
    fn keys(&self) -> Vec<&[u8]>;

    /// Lower this command to the form clients dispatch
    fn to_raw(&self) -> RawCommand {
        let raw = RawCommand::new(self.command_name(), self.args());
        match self.keys().first() {
            Some(key) => raw.with_routing_key(Bytes::copy_from_slice(key)),
            None => raw,
        }
    }
}

/// A fully built command as it travels through a client.
///
/// The routing key (if any) picks the cluster shard; keyless commands go to
/// the default node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawCommand {
    name: String,
    args: Vec<RespValue>,
    routing_key: Option<Bytes>,
}

impl RawCommand {
    /// Create a keyless command
    pub fn new(name: impl Into<String>, args: Vec<RespValue>) -> Self {
        Self {
            name: name.into(),
            args,
            routing_key: None,
        }
    }

    /// Build a command from positional tokens: the first token is the command
    /// name, the rest are its arguments. The first argument doubles as the
    /// routing key, which is where nearly every single-key command keeps it.
    pub fn from_tokens(tokens: Vec<String>) -> RedisResult<Self> {
        let mut tokens = tokens.into_iter();
        let name = tokens
            .next()
            .ok_or_else(|| RedisError::Protocol("Empty command".to_string()))?;
        let args: Vec<String> = tokens.collect();
        let routing_key = args.first().map(|key| Bytes::from(key.clone()));

        let raw = Self::new(name, args.into_iter().map(RespValue::from).collect());
        Ok(match routing_key {
            Some(key) => raw.with_routing_key(key),
            None => raw,
        })
    }

    /// Attach the key used for cluster routing
    #[must_use]
    pub fn with_routing_key(mut self, key: impl Into<Bytes>) -> Self {
        self.routing_key = Some(key.into());
        self
    }

    /// Command name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Command arguments
    pub fn args(&self) -> &[RespValue] {
        &self.args
    }

    /// Key used for cluster routing
    pub fn routing_key(&self) -> Option<&[u8]> {
        self.routing_key.as_deref()
    }

    /// Split into name and arguments for the transport
    pub fn into_parts(self) -> (String, Vec<RespValue>) {
        (self.name, self.args)
    }
}

impl fmt::Display for RawCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)?;
        for arg in &self.args {
            write!(f, " {arg}")?;
        }
        Ok(())
    }
}

/// GET command builder
#[derive(Debug, Clone)]
pub struct GetCommand {
    key: String,
}

impl GetCommand {
    /// Create a new GET command
    pub fn new(key: impl Into<String>) -> Self {
        Self { key: key.into() }
    }
}

impl Command for GetCommand {
    type Output = Option<String>;

    fn command_name(&self) -> &str {
        "GET"
    }

    fn args(&self) -> Vec<RespValue> {
        vec![RespValue::from(self.key.as_str())]
    }

    fn parse_response(&self, response: RespValue) -> RedisResult<Self::Output> {
        if response.is_null() {
            Ok(None)
        } else {
            Ok(Some(response.as_string()?))
        }
    }

    fn keys(&self) -> Vec<&[u8]> {
        vec![self.key.as_bytes()]
    }
}

/// TTL command builder
#[derive(Debug, Clone)]
pub struct TtlCommand {
    key: String,
}

impl TtlCommand {
    /// Create a new TTL command
    pub fn new(key: impl Into<String>) -> Self {
        Self { key: key.into() }
    }
}

impl Command for TtlCommand {
    type Output = KeyTtl;

    fn command_name(&self) -> &str {
        "TTL"
    }

    fn args(&self) -> Vec<RespValue> {
        vec![RespValue::from(self.key.as_str())]
    }

    fn parse_response(&self, response: RespValue) -> RedisResult<Self::Output> {
        Ok(KeyTtl::from_seconds(response.as_int()?))
    }

    fn keys(&self) -> Vec<&[u8]> {
        vec![self.key.as_bytes()]
    }
}

/// TYPE command builder
#[derive(Debug, Clone)]
pub struct TypeCommand {
    key: String,
}

impl TypeCommand {
    /// Create a new TYPE command
    pub fn new(key: impl Into<String>) -> Self {
        Self { key: key.into() }
    }
}

impl Command for TypeCommand {
    type Output = KeyType;

    fn command_name(&self) -> &str {
        "TYPE"
    }

    fn args(&self) -> Vec<RespValue> {
        vec![RespValue::from(self.key.as_str())]
    }

    fn parse_response(&self, response: RespValue) -> RedisResult<Self::Output> {
        Ok(KeyType::from(response.as_string()?.as_str()))
    }

    fn keys(&self) -> Vec<&[u8]> {
        vec![self.key.as_bytes()]
    }
}

/// KEYS command builder
///
/// Blocks the server for the whole keyspace walk; prefer [`ScanCommand`] for
/// anything but small databases.
#[derive(Debug, Clone)]
pub struct KeysCommand {
    pattern: String,
}

impl KeysCommand {
    /// Create a new KEYS command
    pub fn new(pattern: impl Into<String>) -> Self {
        Self {
            pattern: pattern.into(),
        }
    }
}

impl Command for KeysCommand {
    type Output = Vec<String>;

    fn command_name(&self) -> &str {
        "KEYS"
    }

    fn args(&self) -> Vec<RespValue> {
        vec![RespValue::from(self.pattern.as_str())]
    }

    fn parse_response(&self, response: RespValue) -> RedisResult<Self::Output> {
        response.into_lossy_string_vec()
    }

    fn keys(&self) -> Vec<&[u8]> {
        Vec::new()
    }
}

/// SCAN command builder (one step of a cursor traversal)
#[derive(Debug, Clone)]
pub struct ScanCommand {
    cursor: u64,
    pattern: String,
    count: u64,
}

impl ScanCommand {
    /// Create a new SCAN step starting at `cursor`
    pub fn new(cursor: u64, pattern: impl Into<String>, count: u64) -> Self {
        Self {
            cursor,
            pattern: pattern.into(),
            count,
        }
    }
}

impl Command for ScanCommand {
    type Output = ScanBatch;

    fn command_name(&self) -> &str {
        "SCAN"
    }

    fn args(&self) -> Vec<RespValue> {
        vec![
            RespValue::from(self.cursor),
            RespValue::from("MATCH"),
            RespValue::from(self.pattern.as_str()),
            RespValue::from("COUNT"),
            RespValue::from(self.count),
        ]
    }

    fn parse_response(&self, response: RespValue) -> RedisResult<Self::Output> {
        let mut parts = response.into_array()?.into_iter();
        match (parts.next(), parts.next(), parts.next()) {
            (Some(cursor), Some(keys), None) => {
                Ok(ScanBatch::new(keys.into_lossy_string_vec()?, cursor.as_u64()?))
            }
            _ => Err(RedisError::UnexpectedResponse(
                "SCAN reply must be [cursor, keys]".to_string(),
            )),
        }
    }

    fn keys(&self) -> Vec<&[u8]> {
        Vec::new()
    }
}

/// INFO command builder
#[derive(Debug, Clone, Default)]
pub struct InfoCommand {
    sections: Vec<String>,
}

impl InfoCommand {
    /// Create a new INFO command; no sections means the server default set
    pub fn new<S: Into<String>>(sections: impl IntoIterator<Item = S>) -> Self {
        Self {
            sections: sections.into_iter().map(Into::into).collect(),
        }
    }
}

impl Command for InfoCommand {
    type Output = String;

    fn command_name(&self) -> &str {
        "INFO"
    }

    fn args(&self) -> Vec<RespValue> {
        self.sections
            .iter()
            .map(|s| RespValue::from(s.as_str()))
            .collect()
    }

    fn parse_response(&self, response: RespValue) -> RedisResult<Self::Output> {
        response.as_string()
    }

    fn keys(&self) -> Vec<&[u8]> {
        Vec::new()
    }
}
