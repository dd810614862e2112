//! Configuration types for Redis connections

use serde::Deserialize;
use std::time::Duration;

/// Default Redis port
pub const DEFAULT_PORT: u16 = 6379;

/// Write deadline applied to single-node connections
pub const DEFAULT_WRITE_TIMEOUT: Duration = Duration::from_secs(3);

/// Read deadline applied to single-node connections
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(2);

/// Deployment shape of the backing store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Topology {
    /// A single Redis server
    #[default]
    Single,
    /// A sharded Redis Cluster
    Cluster,
}

/// Describes how to reach a Redis deployment.
///
/// Supplied once at startup by whatever loads the application's settings and
/// never mutated afterwards. All fields can be deserialized; missing fields
/// fall back to `localhost:6379`, database 0, single node, debug off.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct DeploymentDescriptor {
    /// Topology of the deployment
    pub topology: Topology,
    /// Host name or IP address
    pub host: String,
    /// TCP port
    pub port: u16,
    /// Optional password for `AUTH`
    pub password: Option<String>,
    /// Database index (ignored for clusters)
    #[serde(alias = "db")]
    pub database: u8,
    /// Report every issued command to the observability sink
    pub debug: bool,
}

impl Default for DeploymentDescriptor {
    fn default() -> Self {
        Self {
            topology: Topology::Single,
            host: "localhost".to_string(),
            port: DEFAULT_PORT,
            password: None,
            database: 0,
            debug: false,
        }
    }
}

impl DeploymentDescriptor {
    /// Describe a single-node deployment at `host:port`
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            ..Default::default()
        }
    }

    /// Set the topology
    #[must_use]
    pub const fn with_topology(mut self, topology: Topology) -> Self {
        self.topology = topology;
        self
    }

    /// Set the password for authentication
    #[must_use]
    pub fn with_password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(password.into());
        self
    }

    /// Set the database number
    #[must_use]
    pub const fn with_database(mut self, database: u8) -> Self {
        self.database = database;
        self
    }

    /// Enable or disable command tracing
    #[must_use]
    pub const fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    /// `host:port` of the (seed) node
    #[must_use]
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Whether this describes a cluster
    #[must_use]
    pub const fn is_cluster(&self) -> bool {
        matches!(self.topology, Topology::Cluster)
    }
}

/// Strategy for connection pooling
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PoolStrategy {
    /// Single multiplexed connection shared across tasks
    Multiplexed,
    /// Connection pool with multiple connections
    Pool,
}

/// Configuration for connection pooling
#[derive(Debug, Clone)]
pub struct PoolConfig {
    /// Pooling strategy to use
    pub strategy: PoolStrategy,
    /// Maximum number of connections in pool (only for Pool strategy)
    pub max_size: usize,
    /// Minimum number of connections to maintain (only for Pool strategy)
    pub min_idle: usize,
    /// Timeout for acquiring a connection from pool
    pub connection_timeout: Duration,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            strategy: PoolStrategy::Multiplexed,
            max_size: 10,
            min_idle: 2,
            connection_timeout: Duration::from_secs(5),
        }
    }
}

/// Per-connection policy used by both client topologies
#[derive(Debug, Clone)]
pub struct ConnectionConfig {
    /// Host of the server (or cluster seed node)
    pub host: String,

    /// Port of the server (or cluster seed node)
    pub port: u16,

    /// Optional password for authentication
    pub password: Option<String>,

    /// Database number (only for standalone mode)
    pub database: u8,

    /// Connection timeout
    pub connect_timeout: Duration,

    /// Deadline for writing one command
    pub write_timeout: Duration,

    /// Deadline for reading one reply
    pub read_timeout: Duration,

    /// Enable TCP keepalive
    pub tcp_keepalive: Option<Duration>,

    /// Pool configuration
    pub pool: PoolConfig,

    /// Maximum number of redirects followed for one cluster command
    pub max_redirects: usize,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: DEFAULT_PORT,
            password: None,
            database: 0,
            connect_timeout: Duration::from_secs(5),
            write_timeout: DEFAULT_WRITE_TIMEOUT,
            read_timeout: DEFAULT_READ_TIMEOUT,
            tcp_keepalive: Some(Duration::from_secs(60)),
            pool: PoolConfig::default(),
            max_redirects: 3,
        }
    }
}

impl ConnectionConfig {
    /// Create a new configuration for `host:port`
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            ..Default::default()
        }
    }

    /// Derive the connection policy for a deployment.
    ///
    /// The database index only applies to single-node deployments; cluster
    /// nodes always serve database 0.
    #[must_use]
    pub fn from_descriptor(descriptor: &DeploymentDescriptor) -> Self {
        let database = match descriptor.topology {
            Topology::Single => descriptor.database,
            Topology::Cluster => 0,
        };

        Self {
            host: descriptor.host.clone(),
            port: descriptor.port,
            password: descriptor.password.clone(),
            database,
            ..Default::default()
        }
    }

    /// Set the password for authentication
    #[must_use]
    pub fn with_password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(password.into());
        self
    }

    /// Set the database number
    #[must_use]
    pub const fn with_database(mut self, database: u8) -> Self {
        self.database = database;
        self
    }

    /// Set the connection timeout
    #[must_use]
    pub const fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Set the write timeout
    #[must_use]
    pub const fn with_write_timeout(mut self, timeout: Duration) -> Self {
        self.write_timeout = timeout;
        self
    }

    /// Set the read timeout
    #[must_use]
    pub const fn with_read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = timeout;
        self
    }

    /// Set or disable TCP keepalive
    #[must_use]
    pub const fn with_tcp_keepalive(mut self, keepalive: Option<Duration>) -> Self {
        self.tcp_keepalive = keepalive;
        self
    }

    /// Set the pool configuration
    #[must_use]
    pub const fn with_pool_config(mut self, pool: PoolConfig) -> Self {
        self.pool = pool;
        self
    }

    /// Set the maximum number of redirects
    #[must_use]
    pub const fn with_max_redirects(mut self, max: usize) -> Self {
        self.max_redirects = max;
        self
    }

    /// `host:port` of the configured node
    #[must_use]
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
