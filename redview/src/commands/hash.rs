//! Hash commands for Redis

use super::Command;
use redview_core::{error::RedisResult, value::RespValue};

/// HGET command - Get the value of a hash field
#[derive(Debug, Clone)]
pub struct HGetCommand {
    key: String,
    field: String,
}

impl HGetCommand {
    /// Create a new HGET command
    pub fn new(key: impl Into<String>, field: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            field: field.into(),
        }
    }
}

impl Command for HGetCommand {
    type Output = Option<String>;

    fn command_name(&self) -> &str {
        "HGET"
    }

    fn args(&self) -> Vec<RespValue> {
        vec![
            RespValue::from(self.key.as_str()),
            RespValue::from(self.field.as_str()),
        ]
    }

    fn parse_response(&self, response: RespValue) -> RedisResult<Self::Output> {
        match response {
            RespValue::Null => Ok(None),
            other => Ok(Some(other.as_string()?)),
        }
    }

    fn keys(&self) -> Vec<&[u8]> {
        vec![self.key.as_bytes()]
    }
}

/// HKEYS command - Get all field names of a hash
#[derive(Debug, Clone)]
pub struct HKeysCommand {
    key: String,
}

impl HKeysCommand {
    /// Create a new HKEYS command
    pub fn new(key: impl Into<String>) -> Self {
        Self { key: key.into() }
    }
}

impl Command for HKeysCommand {
    type Output = Vec<String>;

    fn command_name(&self) -> &str {
        "HKEYS"
    }

    fn args(&self) -> Vec<RespValue> {
        vec![RespValue::from(self.key.as_str())]
    }

    fn parse_response(&self, response: RespValue) -> RedisResult<Self::Output> {
        response.into_lossy_string_vec()
    }

    fn keys(&self) -> Vec<&[u8]> {
        vec![self.key.as_bytes()]
    }
}
