//! Command builders for Redis Sorted Set operations

use crate::commands::Command;
use redview_core::{
    error::{RedisError, RedisResult},
    types::ScoredMember,
    value::RespValue,
};

/// Represents `ZRANGE key start stop WITHSCORES`.
#[derive(Debug, Clone)]
pub struct ZRangeWithScoresCommand {
    key: String,
    start: i64,
    stop: i64,
}

impl ZRangeWithScoresCommand {
    /// Create a new `ZRANGE ... WITHSCORES` command.
    #[must_use]
    pub fn new(key: impl Into<String>, start: i64, stop: i64) -> Self {
        Self {
            key: key.into(),
            start,
            stop,
        }
    }
}

impl Command for ZRangeWithScoresCommand {
    type Output = Vec<ScoredMember>;

    fn command_name(&self) -> &str {
        "ZRANGE"
    }

    fn args(&self) -> Vec<RespValue> {
        vec![
            RespValue::from(self.key.as_str()),
            RespValue::from(self.start),
            RespValue::from(self.stop),
            RespValue::from("WITHSCORES"),
        ]
    }

    fn parse_response(&self, response: RespValue) -> RedisResult<Self::Output> {
        let items = response.into_array()?;
        if items.len() % 2 != 0 {
            return Err(RedisError::UnexpectedResponse(format!(
                "ZRANGE WITHSCORES returned {} items",
                items.len()
            )));
        }

        items
            .chunks(2)
            .map(|pair| -> RedisResult<ScoredMember> {
                let member = pair[0].as_string()?;
                let score = pair[1]
                    .as_string()?
                    .parse::<f64>()
                    .map_err(|e| RedisError::Type(format!("Invalid score: {e}")))?;
                Ok(ScoredMember { member, score })
            })
            .collect()
    }

    fn keys(&self) -> Vec<&[u8]> {
        vec![self.key.as_bytes()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zrange_with_scores_command() {
        let cmd = ZRangeWithScoresCommand::new("leaderboard", 0, -1);
        assert_eq!(cmd.command_name(), "ZRANGE");
        assert_eq!(
            cmd.to_raw().to_string(),
            "ZRANGE leaderboard 0 -1 WITHSCORES"
        );
    }

    #[test]
    fn test_zrange_with_scores_parsing() {
        let cmd = ZRangeWithScoresCommand::new("leaderboard", 0, -1);
        let response = RespValue::Array(vec![
            RespValue::from("alice"),
            RespValue::from("1.5"),
            RespValue::from("bob"),
            RespValue::from("inf"),
        ]);

        let members = cmd.parse_response(response).unwrap();
        assert_eq!(members.len(), 2);
        assert_eq!(members[0].member, "alice");
        assert!((members[0].score - 1.5).abs() < f64::EPSILON);
        assert!(members[1].score.is_infinite());
    }

    #[test]
    fn test_zrange_with_scores_rejects_odd_reply() {
        let cmd = ZRangeWithScoresCommand::new("leaderboard", 0, -1);
        let response = RespValue::Array(vec![RespValue::from("alice")]);
        assert!(matches!(
            cmd.parse_response(response),
            Err(RedisError::UnexpectedResponse(_))
        ));
    }
}
