//! High-level Redis clients
//!
//! [`RedisClient`] is the capability surface the rest of the crate depends
//! on. [`StandaloneClient`] and [`ClusterClient`] implement it for the two
//! deployment topologies. Neither touches the network until the first command
//! is issued.

use crate::cluster::{parse_cluster_slots, ClusterTopology, RedirectHandler};
use crate::commands::{
    Command, GetCommand, HGetCommand, HKeysCommand, InfoCommand, KeysCommand, LRangeCommand,
    RawCommand, SMembersCommand, ScanCommand, TtlCommand, TypeCommand, ZRangeWithScoresCommand,
};
use crate::pool::Pool;
use async_trait::async_trait;
use redview_core::{
    config::{ConnectionConfig, Topology},
    error::{RedisError, RedisResult},
    types::{KeyTtl, KeyType, NodeInfo, ScanBatch, ScoredMember},
    value::RespValue,
};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{OnceCell, RwLock};
use tracing::{debug, info};

/// The operations a key browser needs from Redis, independent of topology.
///
/// Implementors only provide [`process`](RedisClient::process); every typed
/// operation is built on it, so wrapping `process` wraps every command.
#[async_trait]
pub trait RedisClient: Send + Sync {
    /// Dispatch one command and return the raw reply
    async fn process(&self, command: RawCommand) -> RedisResult<RespValue>;

    /// Topology this client talks to
    fn topology(&self) -> Topology;

    /// Find all keys matching `pattern` in one blocking call (`KEYS`)
    async fn keys(&self, pattern: &str) -> RedisResult<Vec<String>> {
        execute(self, KeysCommand::new(pattern)).await
    }

    /// Run one step of a cursor traversal (`SCAN cursor MATCH pattern COUNT count`)
    async fn scan(&self, cursor: u64, pattern: &str, count: u64) -> RedisResult<ScanBatch> {
        execute(self, ScanCommand::new(cursor, pattern, count)).await
    }

    /// Data type stored at `key` (`TYPE`)
    async fn key_type(&self, key: &str) -> RedisResult<KeyType> {
        execute(self, TypeCommand::new(key)).await
    }

    /// Remaining time to live of `key` (`TTL`)
    async fn ttl(&self, key: &str) -> RedisResult<KeyTtl> {
        execute(self, TtlCommand::new(key)).await
    }

    /// Get the value of a string key
    async fn get(&self, key: &str) -> RedisResult<Option<String>> {
        execute(self, GetCommand::new(key)).await
    }

    /// Get a range of elements from a list
    async fn lrange(&self, key: &str, start: i64, stop: i64) -> RedisResult<Vec<String>> {
        execute(self, LRangeCommand::new(key, start, stop)).await
    }

    /// Get all members of a set
    async fn smembers(&self, key: &str) -> RedisResult<Vec<String>> {
        execute(self, SMembersCommand::new(key)).await
    }

    /// Get a range of sorted set members together with their scores
    async fn zrange_with_scores(
        &self,
        key: &str,
        start: i64,
        stop: i64,
    ) -> RedisResult<Vec<ScoredMember>> {
        execute(self, ZRangeWithScoresCommand::new(key, start, stop)).await
    }

    /// Get all field names of a hash
    async fn hkeys(&self, key: &str) -> RedisResult<Vec<String>> {
        execute(self, HKeysCommand::new(key)).await
    }

    /// Get the value of a hash field
    async fn hget(&self, key: &str, field: &str) -> RedisResult<Option<String>> {
        execute(self, HGetCommand::new(key, field)).await
    }

    /// Send an arbitrary command given as positional tokens
    async fn do_command(&self, tokens: Vec<String>) -> RedisResult<RespValue> {
        self.process(RawCommand::from_tokens(tokens)?).await
    }

    /// Server introspection (`INFO [section ...]`)
    async fn info(&self, sections: &[&str]) -> RedisResult<String> {
        execute(self, InfoCommand::new(sections.iter().copied())).await
    }
}

/// Run a typed command through any client and parse its reply
pub async fn execute<R, C>(client: &R, command: C) -> RedisResult<C::Output>
where
    R: RedisClient + ?Sized,
    C: Command + Send,
{
    let response = client.process(command.to_raw()).await?;
    command.parse_response(response)
}

#[async_trait]
impl<T: RedisClient + ?Sized> RedisClient for Box<T> {
    async fn process(&self, command: RawCommand) -> RedisResult<RespValue> {
        (**self).process(command).await
    }

    fn topology(&self) -> Topology {
        (**self).topology()
    }
}

#[async_trait]
impl<T: RedisClient + ?Sized> RedisClient for Arc<T> {
    async fn process(&self, command: RawCommand) -> RedisResult<RespValue> {
        (**self).process(command).await
    }

    fn topology(&self) -> Topology {
        (**self).topology()
    }
}

/// Client for a single Redis server
pub struct StandaloneClient {
    config: ConnectionConfig,
    pool: OnceCell<Pool>,
}

impl StandaloneClient {
    /// Create a client; the connection is opened by the first command
    pub fn new(config: ConnectionConfig) -> Self {
        Self {
            config,
            pool: OnceCell::new(),
        }
    }

    /// Get the configuration
    pub fn config(&self) -> &ConnectionConfig {
        &self.config
    }

    async fn pool(&self) -> RedisResult<&Pool> {
        self.pool
            .get_or_try_init(|| async {
                info!("Connecting to standalone Redis at {}", self.config.address());
                Pool::new(self.config.clone(), self.config.host.clone(), self.config.port).await
            })
            .await
    }
}

#[async_trait]
impl RedisClient for StandaloneClient {
    async fn process(&self, command: RawCommand) -> RedisResult<RespValue> {
        let pool = self.pool().await?;
        let (name, args) = command.into_parts();
        pool.execute_command(name, args).await
    }

    fn topology(&self) -> Topology {
        Topology::Single
    }
}

/// Client for a Redis Cluster.
///
/// The slot map is loaded from the seed node with `CLUSTER SLOTS` on first
/// use. Commands with a key go to the node owning the key's slot; keyless
/// commands (`SCAN`, `KEYS`, `INFO`) go to the seed node. `MOVED` and `ASK`
/// replies are followed up to `max_redirects` times.
pub struct ClusterClient {
    config: ConnectionConfig,
    /// Pools per node, keyed by `host:port`
    cluster_pools: RwLock<HashMap<String, Arc<Pool>>>,
    cluster_topology: ClusterTopology,
    redirect_handler: RedirectHandler,
    slots_loaded: OnceCell<()>,
}

impl ClusterClient {
    /// Create a client seeded at `config.host:config.port`
    pub fn new(config: ConnectionConfig) -> Self {
        let cluster_topology = ClusterTopology::new();
        let redirect_handler = RedirectHandler::new(cluster_topology.clone(), config.max_redirects);

        Self {
            config,
            cluster_pools: RwLock::new(HashMap::new()),
            cluster_topology,
            redirect_handler,
            slots_loaded: OnceCell::new(),
        }
    }

    /// Get the configuration
    pub fn config(&self) -> &ConnectionConfig {
        &self.config
    }

    /// Reload the slot map from the seed node
    pub async fn refresh_slots(&self) -> RedisResult<()> {
        let seed = self.node_pool(&self.config.host, self.config.port).await?;
        let reply = seed
            .execute_command("CLUSTER".to_string(), vec![RespValue::from("SLOTS")])
            .await?;

        let owners = parse_cluster_slots(reply, &self.config.host)?;
        if owners.is_empty() {
            return Err(RedisError::Cluster(
                "CLUSTER SLOTS returned no slot ranges".to_string(),
            ));
        }

        info!(
            "Loaded {} slot ranges from cluster seed {}",
            owners.len(),
            self.config.address()
        );
        self.cluster_topology.update_from_cluster_slots(owners).await;
        Ok(())
    }

    /// Masters known from the last slot map load
    pub async fn nodes(&self) -> RedisResult<Vec<NodeInfo>> {
        self.ensure_slot_map().await?;
        Ok(self.cluster_topology.get_all_nodes().await)
    }

    async fn ensure_slot_map(&self) -> RedisResult<()> {
        self.slots_loaded
            .get_or_try_init(|| self.refresh_slots())
            .await
            .map(|_| ())
    }

    async fn route(&self, command: &RawCommand) -> (String, u16) {
        if let Some(key) = command.routing_key() {
            if let Some(node) = self.cluster_topology.get_node_for_key(key).await {
                return node;
            }
        }
        (self.config.host.clone(), self.config.port)
    }

    async fn node_pool(&self, host: &str, port: u16) -> RedisResult<Arc<Pool>> {
        let node_key = format!("{}:{}", host, port);

        if let Some(pool) = self.cluster_pools.read().await.get(&node_key) {
            return Ok(Arc::clone(pool));
        }

        debug!("Opening pool for cluster node {}", node_key);
        let pool = Pool::new(self.config.clone(), host.to_string(), port).await?;

        let mut pools = self.cluster_pools.write().await;
        Ok(Arc::clone(
            pools.entry(node_key).or_insert_with(|| Arc::new(pool)),
        ))
    }
}

#[async_trait]
impl RedisClient for ClusterClient {
    async fn process(&self, command: RawCommand) -> RedisResult<RespValue> {
        self.ensure_slot_map().await?;

        let max_redirects = self.redirect_handler.max_redirects();
        let (mut host, mut port) = self.route(&command).await;
        let mut asking = false;
        let mut redirects = 0;

        loop {
            let pool = self.node_pool(&host, port).await?;
            let (name, args) = (command.name().to_string(), command.args().to_vec());
            let result = if asking {
                pool.execute_asking(name, args).await
            } else {
                pool.execute_command(name, args).await
            };

            match result {
                Err(ref e) if e.is_redirect() => {
                    if redirects >= max_redirects {
                        return Err(RedisError::MaxRetriesExceeded(max_redirects));
                    }
                    redirects += 1;
                    debug!(
                        "Handling redirect (attempt {}/{}): {:?}",
                        redirects, max_redirects, e
                    );

                    let target = self.redirect_handler.handle_redirect(e).await?;
                    host = target.host;
                    port = target.port;
                    asking = target.asking;
                }
                other => return other,
            }
        }
    }

    fn topology(&self) -> Topology {
        Topology::Cluster
    }
}
