//! Error types for Redis operations

use std::io;
use thiserror::Error;

/// Result type for Redis operations
pub type RedisResult<T> = Result<T, RedisError>;

/// Every failure a client can surface to its caller
#[derive(Error, Debug)]
pub enum RedisError {
    /// Socket read or write failed
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// Malformed RESP data
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// The server answered with an error reply
    #[error("Server error: {0}")]
    Server(String),

    /// The slot now lives on another node
    #[error("MOVED redirect: slot {slot} to {host}:{port}")]
    Moved {
        /// Hash slot
        slot: u16,
        /// Node host
        host: String,
        /// Node port
        port: u16,
    },

    /// The slot is migrating; retry once on another node after `ASKING`
    #[error("ASK redirect: slot {slot} to {host}:{port}")]
    Ask {
        /// Hash slot
        slot: u16,
        /// Node host
        host: String,
        /// Node port
        port: u16,
    },

    /// Could not establish or keep a connection
    #[error("Connection error: {0}")]
    Connection(String),

    /// A read or write did not complete within its deadline
    #[error("Operation timed out")]
    Timeout,

    /// A reply did not have the expected shape
    #[error("Type conversion error: {0}")]
    Type(String),

    /// Rejected configuration
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// Slot discovery or routing failed
    #[error("Cluster error: {0}")]
    Cluster(String),

    /// `AUTH` was rejected
    #[error("Authentication failed: {0}")]
    Auth(String),

    /// The connection pool could not serve a connection
    #[error("Pool error: {0}")]
    Pool(String),

    /// A command kept being redirected
    #[error("Maximum retry attempts ({0}) exceeded")]
    MaxRetriesExceeded(usize),

    /// A well-formed reply that makes no sense for the command
    #[error("Unexpected response: {0}")]
    UnexpectedResponse(String),
}

impl RedisError {
    /// Turn a `MOVED` or `ASK` error reply into the matching variant
    #[must_use]
    pub fn parse_redirect(msg: &str) -> Option<Self> {
        // "MOVED 9916 10.90.6.213:6002" / "ASK 9916 10.90.6.213:6002"
        let (is_ask, rest) = if let Some(rest) = msg.strip_prefix("MOVED ") {
            (false, rest)
        } else if let Some(rest) = msg.strip_prefix("ASK ") {
            (true, rest)
        } else {
            return None;
        };

        let mut parts = rest.split_whitespace();
        let slot = parts.next()?.parse::<u16>().ok()?;
        let (host, port) = parts.next()?.rsplit_once(':')?;
        let port = port.parse::<u16>().ok()?;
        if parts.next().is_some() {
            return None;
        }

        let host = host.to_string();
        Some(if is_ask {
            Self::Ask { slot, host, port }
        } else {
            Self::Moved { slot, host, port }
        })
    }

    /// `MOVED` or `ASK`
    #[must_use]
    pub const fn is_redirect(&self) -> bool {
        matches!(self, Self::Moved { .. } | Self::Ask { .. })
    }

    /// Check if this error came from the transport rather than the server
    #[must_use]
    pub const fn is_transport(&self) -> bool {
        matches!(self, Self::Io(_) | Self::Connection(_) | Self::Timeout)
    }

    /// Node a redirect points at
    #[must_use]
    pub fn redirect_target(&self) -> Option<(String, u16)> {
        match self {
            Self::Moved { host, port, .. } | Self::Ask { host, port, .. } => {
                Some((host.clone(), *port))
            }
            _ => None,
        }
    }

    /// Slot a redirect refers to
    #[must_use]
    pub const fn redirect_slot(&self) -> Option<u16> {
        match self {
            Self::Moved { slot, .. } | Self::Ask { slot, .. } => Some(*slot),
            _ => None,
        }
    }
}
