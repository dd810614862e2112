//! Topology-agnostic Redis access for key browsers
//!
//! `redview` lets an interactive key-browsing application talk to a single
//! Redis server or a Redis Cluster through one trait, [`RedisClient`], and
//! enumerate very large keyspaces with a bounded, cursor-based scan.
//!
//! # Features
//!
//! - One capability trait for standalone and cluster deployments
//! - Lazy connection: building a client never touches the network
//! - Transparent handling of MOVED and ASK redirects
//! - Optional per-command tracing into a user-visible output channel
//! - Bounded `SCAN` enumeration that returns partial keys on failure
//!
//! # Quick Start
//!
//! ```no_run
//! use redview::{create_client, output_channel, scan_keys_with_limit, DeploymentDescriptor, ScanLimit};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let (sink, _messages) = output_channel();
//!     let client = create_client(&DeploymentDescriptor::new("localhost", 6379), sink);
//!
//!     let keys = scan_keys_with_limit(client.as_ref(), "user:*", ScanLimit::Steps(10)).await?;
//!     println!("Found {} keys", keys.len());
//!
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::missing_const_for_fn)]
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::significant_drop_tightening)]
#![allow(clippy::doc_markdown)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::return_self_not_must_use)]

pub mod client;
pub mod cluster;
pub mod commands;
pub mod connection;
pub mod execute;
pub mod factory;
pub mod hook;
pub mod inspect;
pub mod output;
pub mod pool;
pub mod protocol;
pub mod scan;

pub use client::{ClusterClient, RedisClient, StandaloneClient};
pub use commands::RawCommand;
pub use execute::execute_command_line;
pub use factory::create_client;
pub use hook::{CommandHook, DebugHook, HookedClient};
pub use inspect::{describe_key, fetch_value, KeyDetails, KeyValue};
pub use output::{output_channel, OutputMessage, OutputReceiver, OutputSink, Severity};
pub use scan::{scan_all_keys, scan_keys_with_limit, ScanError, ScanLimit, SCAN_BATCH_HINT};

pub use redview_core::{
    config::{ConnectionConfig, DeploymentDescriptor, PoolConfig, PoolStrategy, Topology},
    error::{RedisError, RedisResult},
    types::{KeyTtl, KeyType, NodeInfo, ScanBatch, ScoredMember, SlotRange},
    value::RespValue,
};
