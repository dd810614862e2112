//! Bounded cursor-based key enumeration
//!
//! [`scan_keys_with_limit`] walks the keyspace with `SCAN` until the server
//! hands back cursor `0` or the step limit runs out, whichever comes first.
//! Unlike `KEYS`, no single round trip blocks the server for the whole
//! keyspace, and the limit caps the total work for very large databases.

use crate::client::RedisClient;
use redview_core::error::RedisError;
use thiserror::Error;
use tracing::debug;

/// `COUNT` hint sent with every `SCAN` step
pub const SCAN_BATCH_HINT: u64 = 100;

/// How many `SCAN` round trips an enumeration may perform
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScanLimit {
    /// Keep going until the cursor returns to `0`
    Unbounded,
    /// Stop after at most this many steps
    Steps(usize),
}

impl ScanLimit {
    /// Whether another step may run after `performed` steps
    #[must_use]
    pub const fn allows(self, performed: usize) -> bool {
        match self {
            Self::Unbounded => true,
            Self::Steps(max) => performed < max,
        }
    }
}

/// Raw integer form used by settings files: `-1` is unbounded, any other
/// negative value allows no steps at all.
impl From<i64> for ScanLimit {
    fn from(raw: i64) -> Self {
        match raw {
            -1 => Self::Unbounded,
            n if n < 0 => Self::Steps(0),
            n => Self::Steps(usize::try_from(n).unwrap_or(usize::MAX)),
        }
    }
}

impl From<usize> for ScanLimit {
    fn from(steps: usize) -> Self {
        Self::Steps(steps)
    }
}

/// A `SCAN` step failed; carries the keys collected by the earlier steps
#[derive(Debug, Error)]
#[error("key scan failed at step {step}: {source}")]
pub struct ScanError {
    step: usize,
    partial: Vec<String>,
    #[source]
    source: RedisError,
}

impl ScanError {
    /// 1-based number of the step that failed
    pub fn step(&self) -> usize {
        self.step
    }

    /// Keys accumulated before the failure
    pub fn partial_keys(&self) -> &[String] {
        &self.partial
    }

    /// The error produced by the failing step
    pub fn redis_error(&self) -> &RedisError {
        &self.source
    }

    /// Split into the underlying error and the partial keys
    pub fn into_parts(self) -> (RedisError, Vec<String>) {
        (self.source, self.partial)
    }
}

impl From<ScanError> for RedisError {
    fn from(err: ScanError) -> Self {
        err.source
    }
}

/// Collect the keys matching `pattern` using at most `limit` `SCAN` steps.
///
/// Keys are returned in arrival order; a key the server reports twice appears
/// twice. Hitting the limit before the cursor returns to `0` is not an error.
/// The first failing step ends the enumeration.
pub async fn scan_keys_with_limit<C>(
    client: &C,
    pattern: &str,
    limit: ScanLimit,
) -> Result<Vec<String>, ScanError>
where
    C: RedisClient + ?Sized,
{
    let mut cursor = 0u64;
    let mut steps = 0usize;
    let mut keys = Vec::new();

    while limit.allows(steps) {
        steps += 1;

        let batch = match client.scan(cursor, pattern, SCAN_BATCH_HINT).await {
            Ok(batch) => batch,
            Err(source) => {
                debug!(
                    "SCAN step {} for {:?} failed after {} keys: {}",
                    steps,
                    pattern,
                    keys.len(),
                    source
                );
                return Err(ScanError {
                    step: steps,
                    partial: keys,
                    source,
                });
            }
        };

        debug!(
            "SCAN step {} for {:?}: {} keys, next cursor {}",
            steps,
            pattern,
            batch.keys.len(),
            batch.cursor
        );
        keys.extend(batch.keys);

        if batch.cursor == 0 {
            return Ok(keys);
        }
        cursor = batch.cursor;
    }

    debug!(
        "SCAN for {:?} stopped at the {:?} limit with {} keys",
        pattern,
        limit,
        keys.len()
    );
    Ok(keys)
}

/// Collect every key matching `pattern`
pub async fn scan_all_keys<C>(client: &C, pattern: &str) -> Result<Vec<String>, ScanError>
where
    C: RedisClient + ?Sized,
{
    scan_keys_with_limit(client, pattern, ScanLimit::Unbounded).await
}
