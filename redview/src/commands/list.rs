//! List commands for Redis

use super::Command;
use redview_core::{error::RedisResult, value::RespValue};

/// LRANGE command - Get a range of elements from a list
#[derive(Debug, Clone)]
pub struct LRangeCommand {
    key: String,
    start: i64,
    stop: i64,
}

impl LRangeCommand {
    /// Create a new LRANGE command
    pub fn new(key: impl Into<String>, start: i64, stop: i64) -> Self {
        Self {
            key: key.into(),
            start,
            stop,
        }
    }
}

impl Command for LRangeCommand {
    type Output = Vec<String>;

    fn command_name(&self) -> &str {
        "LRANGE"
    }

    fn args(&self) -> Vec<RespValue> {
        vec![
            RespValue::from(self.key.as_str()),
            RespValue::from(self.start),
            RespValue::from(self.stop),
        ]
    }

    fn parse_response(&self, response: RespValue) -> RedisResult<Self::Output> {
        response.into_lossy_string_vec()
    }

    fn keys(&self) -> Vec<&[u8]> {
        vec![self.key.as_bytes()]
    }
}
