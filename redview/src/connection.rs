//! Connection management
//!
//! A [`RedisConnection`] is one TCP stream to one server. It is opened with a
//! deadline, authenticated and pointed at the configured database, then runs
//! one command at a time with separate write and read deadlines.

use crate::protocol::{FrameScanner, RespDecoder, RespEncoder};
use bytes::{Buf, BytesMut};
use redview_core::{
    config::ConnectionConfig,
    error::{RedisError, RedisResult},
    value::RespValue,
};
use std::io::Cursor;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::timeout;
use tracing::{debug, trace};

const READ_BUFFER_CAPACITY: usize = 8 * 1024;

/// A connection to a Redis server
pub struct RedisConnection {
    stream: TcpStream,
    buffer: BytesMut,
    config: ConnectionConfig,
}

impl RedisConnection {
    /// Open a connection to `host:port` and run the handshake
    pub async fn connect(host: &str, port: u16, config: ConnectionConfig) -> RedisResult<Self> {
        let stream = open_stream(host, port, &config).await?;
        let mut conn = Self {
            stream,
            buffer: BytesMut::with_capacity(READ_BUFFER_CAPACITY),
            config,
        };
        conn.handshake().await?;
        Ok(conn)
    }

    /// `AUTH` when a password is configured, `SELECT` when the database is
    /// not 0. A rejected password surfaces as [`RedisError::Auth`].
    async fn handshake(&mut self) -> RedisResult<()> {
        if let Some(password) = self.config.password.clone() {
            debug!("Authenticating");
            let reply = self
                .execute_command("AUTH", &[RespValue::from(password)])
                .await
                .map_err(|e| match e {
                    RedisError::Server(msg) => RedisError::Auth(msg),
                    other => other,
                })?;
            if !is_ok(&reply) {
                return Err(RedisError::Auth(format!("Unexpected AUTH reply: {reply:?}")));
            }
        }

        if self.config.database != 0 {
            self.select_database(self.config.database).await?;
        }

        Ok(())
    }

    /// Switch this connection to database `db`
    pub async fn select_database(&mut self, db: u8) -> RedisResult<()> {
        debug!(db, "Selecting database");
        let reply = self
            .execute_command("SELECT", &[RespValue::from(i64::from(db))])
            .await?;
        if is_ok(&reply) {
            Ok(())
        } else {
            Err(RedisError::UnexpectedResponse(format!("{reply:?}")))
        }
    }

    /// Send one command and wait for its reply.
    ///
    /// Error replies become `RedisError::Server`, or `Moved`/`Ask` when they
    /// carry a cluster redirect. Any other failure leaves the connection in
    /// an unknown state and it should be dropped.
    pub async fn execute_command(
        &mut self,
        command: &str,
        args: &[RespValue],
    ) -> RedisResult<RespValue> {
        let request = RespEncoder::encode_command(command, args)?;
        trace!(command, args = args.len(), "Sending command");

        timeout(self.config.write_timeout, self.stream.write_all(&request))
            .await
            .map_err(|_| RedisError::Timeout)??;

        let reply = timeout(self.config.read_timeout, self.read_reply())
            .await
            .map_err(|_| RedisError::Timeout)??;

        match reply {
            RespValue::Error(msg) => {
                Err(RedisError::parse_redirect(&msg).unwrap_or(RedisError::Server(msg)))
            }
            reply => Ok(reply),
        }
    }

    /// Read until one whole reply is buffered, then decode it once
    async fn read_reply(&mut self) -> RedisResult<RespValue> {
        let mut scanner = FrameScanner::new();
        loop {
            if scanner.advance(&self.buffer)? {
                let mut cursor = Cursor::new(&self.buffer[..]);
                let value = RespDecoder::decode(&mut cursor)?.ok_or_else(|| {
                    RedisError::Protocol("Reply ended before its frame did".to_string())
                })?;
                let consumed = cursor.position() as usize;
                self.buffer.advance(consumed);
                return Ok(value);
            }

            if self.stream.read_buf(&mut self.buffer).await? == 0 {
                return Err(RedisError::Connection(
                    "Server closed the connection".to_string(),
                ));
            }
        }
    }
}

async fn open_stream(host: &str, port: u16, config: &ConnectionConfig) -> RedisResult<TcpStream> {
    let addr = format!("{}:{}", host, port);
    debug!(%addr, "Connecting");

    let stream = timeout(config.connect_timeout, TcpStream::connect(&addr))
        .await
        .map_err(|_| RedisError::Timeout)?
        .map_err(|e| RedisError::Connection(format!("Cannot connect to {}: {}", addr, e)))?;

    if let Some(idle) = config.tcp_keepalive {
        socket2::SockRef::from(&stream)
            .set_tcp_keepalive(&socket2::TcpKeepalive::new().with_time(idle))
            .map_err(|e| RedisError::Connection(format!("Cannot enable TCP keepalive: {}", e)))?;
    }

    Ok(stream)
}

fn is_ok(reply: &RespValue) -> bool {
    matches!(reply, RespValue::SimpleString(s) if s == "OK")
}
