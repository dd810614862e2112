//! Loading a single key for display
//!
//! The browser shows a selected key together with its type, its TTL and its
//! value. The value is fetched with the read command that matches the type.

use crate::client::RedisClient;
use redview_core::{
    error::RedisResult,
    types::{KeyTtl, KeyType, ScoredMember},
};
use tracing::debug;

/// Contents of a key, shaped by its type
#[derive(Debug, Clone, PartialEq)]
pub enum KeyValue {
    /// The key does not exist (or vanished while being read)
    Missing,
    /// String value
    String(String),
    /// List elements, head first
    List(Vec<String>),
    /// Set members in server order
    Set(Vec<String>),
    /// Sorted set members by ascending score
    SortedSet(Vec<ScoredMember>),
    /// Hash fields and their values
    Hash(Vec<(String, String)>),
    /// A type the browser cannot display
    Unsupported(KeyType),
}

/// Everything shown for a selected key
#[derive(Debug, Clone, PartialEq)]
pub struct KeyDetails {
    /// Key name
    pub key: String,
    /// Type reported by `TYPE`
    pub key_type: KeyType,
    /// Time to live reported by `TTL`
    pub ttl: KeyTtl,
    /// The value
    pub value: KeyValue,
}

/// Read the value of `key`, assuming it holds `key_type`
pub async fn fetch_value<C>(client: &C, key: &str, key_type: &KeyType) -> RedisResult<KeyValue>
where
    C: RedisClient + ?Sized,
{
    let value = match key_type {
        KeyType::None => KeyValue::Missing,
        KeyType::String => match client.get(key).await? {
            Some(value) => KeyValue::String(value),
            None => KeyValue::Missing,
        },
        KeyType::List => KeyValue::List(client.lrange(key, 0, -1).await?),
        KeyType::Set => KeyValue::Set(client.smembers(key).await?),
        KeyType::ZSet => KeyValue::SortedSet(client.zrange_with_scores(key, 0, -1).await?),
        KeyType::Hash => {
            let fields = client.hkeys(key).await?;
            let mut entries = Vec::with_capacity(fields.len());
            for field in fields {
                // A field deleted between HKEYS and HGET is skipped
                if let Some(value) = client.hget(key, &field).await? {
                    entries.push((field, value));
                }
            }
            KeyValue::Hash(entries)
        }
        other => KeyValue::Unsupported(other.clone()),
    };
    Ok(value)
}

/// Load type, TTL and value of `key`
pub async fn describe_key<C>(client: &C, key: &str) -> RedisResult<KeyDetails>
where
    C: RedisClient + ?Sized,
{
    let key_type = client.key_type(key).await?;
    let ttl = client.ttl(key).await?;
    debug!("Describing key {:?} of type {} ({:?})", key, key_type, ttl);

    let value = fetch_value(client, key, &key_type).await?;
    Ok(KeyDetails {
        key: key.to_string(),
        key_type,
        ttl,
        value,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::RawCommand;
    use async_trait::async_trait;
    use redview_core::{config::Topology, error::RedisError, value::RespValue};
    use std::collections::HashMap;
    use std::time::Duration;

    /// Answers by command name from a fixed table
    struct TableClient {
        replies: HashMap<String, RespValue>,
    }

    impl TableClient {
        fn new(replies: &[(&str, RespValue)]) -> Self {
            Self {
                replies: replies
                    .iter()
                    .map(|(k, v)| ((*k).to_string(), v.clone()))
                    .collect(),
            }
        }
    }

    #[async_trait]
    impl RedisClient for TableClient {
        async fn process(&self, command: RawCommand) -> RedisResult<RespValue> {
            let lookup = match command.name() {
                "HGET" => format!("HGET {}", command.args()[1]),
                name => name.to_string(),
            };
            self.replies
                .get(&lookup)
                .cloned()
                .ok_or_else(|| RedisError::Server(format!("ERR no reply for {lookup}")))
        }

        fn topology(&self) -> Topology {
            Topology::Single
        }
    }

    fn bulk(items: &[&str]) -> RespValue {
        RespValue::Array(items.iter().map(|s| RespValue::from(*s)).collect())
    }

    #[tokio::test]
    async fn test_describe_string_key() {
        let client = TableClient::new(&[
            ("TYPE", RespValue::SimpleString("string".to_string())),
            ("TTL", RespValue::Integer(30)),
            ("GET", RespValue::from("hello")),
        ]);

        let details = describe_key(&client, "greeting").await.unwrap();
        assert_eq!(details.key, "greeting");
        assert_eq!(details.key_type, KeyType::String);
        assert_eq!(details.ttl, KeyTtl::ExpiresIn(Duration::from_secs(30)));
        assert_eq!(details.value, KeyValue::String("hello".to_string()));
    }

    #[tokio::test]
    async fn test_describe_hash_skips_vanished_fields() {
        let client = TableClient::new(&[
            ("TYPE", RespValue::SimpleString("hash".to_string())),
            ("TTL", RespValue::Integer(-1)),
            ("HKEYS", bulk(&["name", "gone"])),
            ("HGET name", RespValue::from("ada")),
            ("HGET gone", RespValue::Null),
        ]);

        let details = describe_key(&client, "user:1").await.unwrap();
        assert_eq!(details.ttl, KeyTtl::Persistent);
        assert_eq!(
            details.value,
            KeyValue::Hash(vec![("name".to_string(), "ada".to_string())])
        );
    }

    #[tokio::test]
    async fn test_fetch_collections() {
        let client = TableClient::new(&[
            ("LRANGE", bulk(&["a", "b"])),
            ("SMEMBERS", bulk(&["x"])),
            ("ZRANGE", bulk(&["m", "2"])),
        ]);

        assert_eq!(
            fetch_value(&client, "l", &KeyType::List).await.unwrap(),
            KeyValue::List(vec!["a".to_string(), "b".to_string()])
        );
        assert_eq!(
            fetch_value(&client, "s", &KeyType::Set).await.unwrap(),
            KeyValue::Set(vec!["x".to_string()])
        );
        assert_eq!(
            fetch_value(&client, "z", &KeyType::ZSet).await.unwrap(),
            KeyValue::SortedSet(vec![ScoredMember {
                member: "m".to_string(),
                score: 2.0,
            }])
        );
    }

    #[tokio::test]
    async fn test_missing_and_unsupported() {
        let client = TableClient::new(&[
            ("TYPE", RespValue::SimpleString("none".to_string())),
            ("TTL", RespValue::Integer(-2)),
            ("GET", RespValue::Null),
        ]);

        let details = describe_key(&client, "nope").await.unwrap();
        assert_eq!(details.ttl, KeyTtl::Missing);
        assert_eq!(details.value, KeyValue::Missing);

        assert_eq!(
            fetch_value(&client, "k", &KeyType::String).await.unwrap(),
            KeyValue::Missing
        );
        assert_eq!(
            fetch_value(&client, "k", &KeyType::Stream).await.unwrap(),
            KeyValue::Unsupported(KeyType::Stream)
        );
    }
}
