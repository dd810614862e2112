//! Redis Cluster support
//!
//! This module provides functionality for Redis Cluster operations including:
//! - Slot calculation using CRC16
//! - Slot map discovery from `CLUSTER SLOTS`
//! - MOVED and ASK redirect handling

use crc16::{State, XMODEM};
use redview_core::{
    error::{RedisError, RedisResult},
    types::{NodeInfo, SlotRange},
    value::RespValue,
};
use std::sync::Arc;
use tokio::sync::RwLock;

/// Total number of hash slots in Redis Cluster
pub const CLUSTER_SLOTS: u16 = 16384;

/// Hash slot of `key`: CRC16/XMODEM of the key (or of its `{hash tag}`)
/// modulo 16384.
pub fn calculate_slot(key: &[u8]) -> u16 {
    State::<XMODEM>::calculate(hash_tag(key)) % CLUSTER_SLOTS
}

/// The part of `key` that is hashed.
///
/// Keys sharing a non-empty `{tag}` land in the same slot, so
/// `{user1000}.following` and `{user1000}.followers` are co-located.
fn hash_tag(key: &[u8]) -> &[u8] {
    let Some(open) = key.iter().position(|&b| b == b'{') else {
        return key;
    };
    let rest = &key[open + 1..];
    match rest.iter().position(|&b| b == b'}') {
        Some(close) if close > 0 => &rest[..close],
        _ => key,
    }
}

/// One master entry of a `CLUSTER SLOTS` reply
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlotOwner {
    /// Slots served by the master
    pub range: SlotRange,
    /// Master host
    pub host: String,
    /// Master port
    pub port: u16,
}

/// Parse a `CLUSTER SLOTS` reply.
///
/// Each entry is `[start, end, [host, port, id?], replica...]`; replicas are
/// ignored. An empty host means "the node that answered", which is replaced by
/// `answering_host`.
pub fn parse_cluster_slots(reply: RespValue, answering_host: &str) -> RedisResult<Vec<SlotOwner>> {
    reply
        .into_array()?
        .into_iter()
        .map(|entry| parse_slot_entry(entry, answering_host))
        .collect()
}

fn parse_slot_entry(entry: RespValue, answering_host: &str) -> RedisResult<SlotOwner> {
    let mut fields = entry.into_array()?.into_iter();
    let (Some(start), Some(end), Some(master)) = (fields.next(), fields.next(), fields.next())
    else {
        return Err(RedisError::Cluster(
            "CLUSTER SLOTS entry needs start, end and master".to_string(),
        ));
    };

    let master = master.into_array()?;
    let [host, port, ..] = master.as_slice() else {
        return Err(RedisError::Cluster(format!(
            "Malformed CLUSTER SLOTS node: {master:?}"
        )));
    };

    let host = match host.as_string()? {
        h if h.is_empty() => answering_host.to_string(),
        h => h,
    };
    let port = u16::try_from(port.as_int()?)
        .map_err(|e| RedisError::Cluster(format!("Invalid node port: {e}")))?;

    Ok(SlotOwner {
        range: SlotRange::new(slot_number(&start)?, slot_number(&end)?),
        host,
        port,
    })
}

fn slot_number(value: &RespValue) -> RedisResult<u16> {
    let slot = value.as_int()?;
    u16::try_from(slot)
        .ok()
        .filter(|s| *s < CLUSTER_SLOTS)
        .ok_or_else(|| RedisError::Cluster(format!("Slot out of range: {slot}")))
}

/// Slot ownership: one entry per slot pointing into `nodes`
#[derive(Default)]
struct SlotTable {
    owners: Vec<Option<usize>>,
    nodes: Vec<NodeInfo>,
}

impl SlotTable {
    fn node_index(&mut self, host: &str, port: u16) -> usize {
        if let Some(idx) = self
            .nodes
            .iter()
            .position(|n| n.host == host && n.port == port)
        {
            return idx;
        }
        self.nodes.push(NodeInfo::new(
            format!("{}:{}", host, port),
            host.to_string(),
            port,
        ));
        self.nodes.len() - 1
    }

    fn assign(&mut self, range: SlotRange, node: usize) {
        if self.owners.is_empty() {
            self.owners = vec![None; usize::from(CLUSTER_SLOTS)];
        }
        let end = range.end.min(CLUSTER_SLOTS - 1);
        for owner in self
            .owners
            .iter_mut()
            .take(usize::from(end) + 1)
            .skip(usize::from(range.start))
        {
            *owner = Some(node);
        }
    }

    fn owner(&self, slot: u16) -> Option<(String, u16)> {
        let idx = (*self.owners.get(usize::from(slot))?)?;
        let node = &self.nodes[idx];
        Some((node.host.clone(), node.port))
    }
}

/// Shared view of which master serves which slot.
///
/// Node slot ranges reflect the last full `CLUSTER SLOTS` load; single-slot
/// moves learned from `MOVED` only update the routing table.
#[derive(Clone, Default)]
pub struct ClusterTopology {
    table: Arc<RwLock<SlotTable>>,
}

impl ClusterTopology {
    /// Create an empty topology
    pub fn new() -> Self {
        Self::default()
    }

    /// Node serving `slot`, if known
    pub async fn get_node_for_slot(&self, slot: u16) -> Option<(String, u16)> {
        self.table.read().await.owner(slot)
    }

    /// Node serving `key`, if known
    pub async fn get_node_for_key(&self, key: &[u8]) -> Option<(String, u16)> {
        self.get_node_for_slot(calculate_slot(key)).await
    }

    /// Record that `slot` moved to `host:port`
    pub async fn update_slot_mapping(&self, slot: u16, host: String, port: u16) {
        let mut table = self.table.write().await;
        let node = table.node_index(&host, port);
        table.assign(SlotRange::new(slot, slot), node);
    }

    /// Forget every slot assignment and node
    pub async fn clear_slots(&self) {
        *self.table.write().await = SlotTable::default();
    }

    /// Replace the whole topology with a parsed `CLUSTER SLOTS` reply
    pub async fn update_from_cluster_slots(&self, owners: Vec<SlotOwner>) {
        let mut table = SlotTable::default();
        for owner in owners {
            let node = table.node_index(&owner.host, owner.port);
            table.nodes[node].slots.push(owner.range);
            table.assign(owner.range, node);
        }
        *self.table.write().await = table;
    }

    /// Get all known nodes
    pub async fn get_all_nodes(&self) -> Vec<NodeInfo> {
        self.table.read().await.nodes.clone()
    }

    /// Get the number of slots currently mapped
    pub async fn mapped_slots_count(&self) -> usize {
        self.table
            .read()
            .await
            .owners
            .iter()
            .filter(|o| o.is_some())
            .count()
    }
}

/// Where to send the next attempt of a redirected command
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RedirectTarget {
    /// Target host
    pub host: String,
    /// Target port
    pub port: u16,
    /// `ASK` redirect: the target must receive `ASKING` first
    pub asking: bool,
}

/// Helper to handle MOVED and ASK redirects
#[derive(Clone)]
pub struct RedirectHandler {
    topology: ClusterTopology,
    max_redirects: usize,
}

impl RedirectHandler {
    /// Create a new redirect handler
    pub fn new(topology: ClusterTopology, max_redirects: usize) -> Self {
        Self {
            topology,
            max_redirects,
        }
    }

    /// Handle a redirect error. `MOVED` is permanent and updates the slot
    /// map; `ASK` only affects the next attempt.
    pub async fn handle_redirect(&self, error: &RedisError) -> RedisResult<RedirectTarget> {
        match error {
            RedisError::Moved { slot, host, port } => {
                self.topology
                    .update_slot_mapping(*slot, host.clone(), *port)
                    .await;
                Ok(RedirectTarget {
                    host: host.clone(),
                    port: *port,
                    asking: false,
                })
            }
            RedisError::Ask { host, port, .. } => Ok(RedirectTarget {
                host: host.clone(),
                port: *port,
                asking: true,
            }),
            _ => Err(RedisError::Cluster(format!(
                "Not a redirect error: {:?}",
                error
            ))),
        }
    }

    /// Get max redirects allowed
    pub fn max_redirects(&self) -> usize {
        self.max_redirects
    }
}
