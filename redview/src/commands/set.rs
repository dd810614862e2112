//! Set commands for Redis

use super::Command;
use redview_core::{error::RedisResult, value::RespValue};

/// SMEMBERS command - Get all members of a set, in server order
#[derive(Debug, Clone)]
pub struct SMembersCommand {
    key: String,
}

impl SMembersCommand {
    /// Create a new SMEMBERS command
    pub fn new(key: impl Into<String>) -> Self {
        Self { key: key.into() }
    }
}

impl Command for SMembersCommand {
    type Output = Vec<String>;

    fn command_name(&self) -> &str {
        "SMEMBERS"
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
