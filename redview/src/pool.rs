//! Connection pooling implementations
//!
//! This module provides two strategies for managing Redis connections:
//! - Multiplexed: Single connection shared across multiple tasks
//! - Pool: Multiple connections managed in a pool
//!
//! A connection whose command failed at the transport level is discarded,
//! never reused: a late reply would otherwise be read as the answer to the
//! next command. The failed command itself is not retried.

use crate::connection::RedisConnection;
use redview_core::{
    config::{ConnectionConfig, PoolStrategy},
    error::{RedisError, RedisResult},
    value::RespValue,
};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot, Mutex, OwnedSemaphorePermit, Semaphore};
use tokio::time::timeout;
use tracing::{debug, warn};

/// A command waiting for the multiplexed connection
struct QueuedCommand {
    command: String,
    args: Vec<RespValue>,
    asking: bool,
    response_tx: oneshot::Sender<RedisResult<RespValue>>,
}

/// Run one command, preceded by `ASKING` on the same connection when asked to
async fn run_command(
    conn: &mut RedisConnection,
    command: &str,
    args: &[RespValue],
    asking: bool,
) -> RedisResult<RespValue> {
    if asking {
        conn.execute_command("ASKING", &[]).await?;
    }
    conn.execute_command(command, args).await
}

/// Multiplexed connection pool - uses a single connection with mpsc channel
pub struct MultiplexedPool {
    command_tx: mpsc::UnboundedSender<QueuedCommand>,
}

impl MultiplexedPool {
    /// Connect and start the task serving the shared connection
    pub async fn new(config: ConnectionConfig, host: String, port: u16) -> RedisResult<Self> {
        let conn = RedisConnection::connect(&host, port, config.clone()).await?;
        let (command_tx, mut command_rx) = mpsc::unbounded_channel::<QueuedCommand>();

        tokio::spawn(async move {
            let mut conn = Some(conn);

            while let Some(req) = command_rx.recv().await {
                let result = match conn.as_mut() {
                    Some(c) => run_command(c, &req.command, &req.args, req.asking).await,
                    None => match RedisConnection::connect(&host, port, config.clone()).await {
                        Ok(c) => {
                            debug!("Re-established connection to {}:{}", host, port);
                            run_command(conn.insert(c), &req.command, &req.args, req.asking).await
                        }
                        Err(e) => Err(e),
                    },
                };

                if matches!(result, Err(ref e) if e.is_transport()) {
                    warn!("Dropping connection to {}:{} after transport error", host, port);
                    conn = None;
                }

                // The caller may have stopped waiting
                let _ = req.response_tx.send(result);
            }

            debug!("Multiplexed connection handler stopped");
        });

        Ok(Self { command_tx })
    }

    /// Execute a command through the multiplexed connection
    pub async fn execute_command(
        &self,
        command: String,
        args: Vec<RespValue>,
        asking: bool,
    ) -> RedisResult<RespValue> {
        let (response_tx, response_rx) = oneshot::channel();

        self.command_tx
            .send(QueuedCommand {
                command,
                args,
                asking,
                response_tx,
            })
            .map_err(|_| RedisError::Connection("Multiplexed connection closed".to_string()))?;

        response_rx
            .await
            .map_err(|_| RedisError::Connection("Response channel closed".to_string()))?
    }
}

/// Traditional connection pool with multiple connections
pub struct ConnectionPool {
    connections: Mutex<Vec<RedisConnection>>,
    semaphore: Arc<Semaphore>,
    config: ConnectionConfig,
    host: String,
    port: u16,
}

impl ConnectionPool {
    /// Create a new connection pool with `min_idle` warm connections (at least one)
    pub async fn new(
        config: ConnectionConfig,
        host: String,
        port: u16,
        max_size: usize,
    ) -> RedisResult<Self> {
        let max_size = max_size.max(1);
        let initial_size = config.pool.min_idle.min(max_size).max(1);

        let mut connections = Vec::with_capacity(initial_size);
        for _ in 0..initial_size {
            connections.push(RedisConnection::connect(&host, port, config.clone()).await?);
        }

        Ok(Self {
            connections: Mutex::new(connections),
            semaphore: Arc::new(Semaphore::new(max_size)),
            config,
            host,
            port,
        })
    }

    async fn acquire(&self) -> RedisResult<(OwnedSemaphorePermit, RedisConnection)> {
        let permit = timeout(
            self.config.pool.connection_timeout,
            Arc::clone(&self.semaphore).acquire_owned(),
        )
        .await
        .map_err(|_| RedisError::Pool("Timed out waiting for a connection".to_string()))?
        .map_err(|_| RedisError::Pool("Pool is closed".to_string()))?;

        let idle = self.connections.lock().await.pop();
        let conn = match idle {
            Some(conn) => conn,
            None => RedisConnection::connect(&self.host, self.port, self.config.clone()).await?,
        };

        Ok((permit, conn))
    }

    /// Execute a command using a connection from the pool
    pub async fn execute_command(
        &self,
        command: String,
        args: Vec<RespValue>,
        asking: bool,
    ) -> RedisResult<RespValue> {
        let (_permit, mut conn) = self.acquire().await?;
        let result = run_command(&mut conn, &command, &args, asking).await;

        if matches!(result, Err(ref e) if e.is_transport()) {
            warn!(
                "Discarding pooled connection to {}:{} after transport error",
                self.host, self.port
            );
        } else {
            self.connections.lock().await.push(conn);
        }

        result
    }
}

/// Unified pool abstraction that can be either multiplexed or traditional pool
pub enum Pool {
    /// Multiplexed connection
    Multiplexed(MultiplexedPool),
    /// Traditional connection pool
    Pool(ConnectionPool),
}

impl Pool {
    /// Create a new pool based on the configuration
    pub async fn new(config: ConnectionConfig, host: String, port: u16) -> RedisResult<Self> {
        match config.pool.strategy {
            PoolStrategy::Multiplexed => {
                let pool = MultiplexedPool::new(config, host, port).await?;
                Ok(Self::Multiplexed(pool))
            }
            PoolStrategy::Pool => {
                let max_size = config.pool.max_size;
                let pool = ConnectionPool::new(config, host, port, max_size).await?;
                Ok(Self::Pool(pool))
            }
        }
    }

    /// Execute a command through the pool
    pub async fn execute_command(
        &self,
        command: String,
        args: Vec<RespValue>,
    ) -> RedisResult<RespValue> {
        match self {
            Self::Multiplexed(pool) => pool.execute_command(command, args, false).await,
            Self::Pool(pool) => pool.execute_command(command, args, false).await,
        }
    }

    /// Execute a command right after `ASKING`, both on the same connection
    pub async fn execute_asking(
        &self,
        command: String,
        args: Vec<RespValue>,
    ) -> RedisResult<RespValue> {
        match self {
            Self::Multiplexed(pool) => pool.execute_command(command, args, true).await,
            Self::Pool(pool) => pool.execute_command(command, args, true).await,
        }
    }
}
