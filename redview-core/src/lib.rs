//! Core types, configuration and errors shared by the `redview` client layer
//!
//! This crate holds everything that does not touch the network: the
//! deployment descriptor and connection policy, the error taxonomy, RESP
//! values, and the small value types returned by the client capabilities.

#![warn(missing_docs)]

pub mod config;
pub mod error;
pub mod types;
pub mod value;

pub use config::{ConnectionConfig, DeploymentDescriptor, PoolConfig, PoolStrategy, Topology};
pub use error::{RedisError, RedisResult};
pub use types::{KeyTtl, KeyType, NodeInfo, ScanBatch, ScoredMember, SlotRange};
pub use value::RespValue;
