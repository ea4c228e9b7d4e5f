//! Wire-level transaction identifier.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};
use uuid::Uuid;

/// Identifier minted for each correlated helper command and echoed back in
/// the matching response.
///
/// Backed by UUID v7, so ids sort by issue order and carry their own birth
/// timestamp. When a response arrives for an id that is no longer pending,
/// [`age_ms`](Self::age_ms) tells a late reply apart from protocol drift.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TransactionId(Uuid);

impl TransactionId {
    /// Mint a fresh identifier.
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    /// Milliseconds elapsed since this id was minted.
    ///
    /// Read from the timestamp embedded in the v7 id. Returns `None` when
    /// the id carries no timestamp, which only happens for ids the helper
    /// invented rather than echoed back.
    pub fn age_ms(&self) -> Option<u64> {
        let (secs, nanos) = self.0.get_timestamp()?.to_unix();
        let minted_ms = secs.checked_mul(1000)? + u64::from(nanos) / 1_000_000;
        let now_ms = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .ok()?
            .as_millis() as u64;
        Some(now_ms.saturating_sub(minted_ms))
    }
}

impl fmt::Display for TransactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
