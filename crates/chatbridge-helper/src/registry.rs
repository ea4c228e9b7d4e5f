//! Transaction Registry - tracks pending helper transactions.
//!
//! Maps transaction ids to waiting callers. Each pending entry owns a
//! single-use oneshot sender; removing the entry and consuming the sender is
//! the compare-and-set that makes resolve, reject, timeout and cancel a race
//! with exactly one winner. Terminal entries are never retained.

use crate::error::HelperError;
use chatbridge_types::TransactionId;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::oneshot;
use tracing::{debug, warn};

/// Expected result shape of a transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionKind {
    /// Helper returns a typed JSON payload
    Generic,
    /// Command completes with no typed payload
    Ack,
}

/// Terminal outcome delivered to the waiting caller. Immutable once produced.
#[derive(Debug)]
pub enum TransactionOutcome {
    /// Helper answered with a success payload
    Resolved(serde_json::Value),
    /// Helper answered with an error, or the caller cancelled
    Rejected(HelperError),
    /// The transaction aged past its timeout unanswered
    TimedOut,
}

/// A pending transaction waiting for its response.
struct PendingTransaction {
    /// Single-writer completion slot
    slot: oneshot::Sender<TransactionOutcome>,
    /// Expected result shape
    kind: TransactionKind,
    /// When the transaction was registered
    created_at: Instant,
    /// Action name (for logging)
    action: String,
    /// Timeout for this transaction
    timeout: Duration,
}

/// Registry counters.
#[derive(Debug, Default)]
pub struct RegistryStats {
    pub total_registered: AtomicU64,
    pub total_resolved: AtomicU64,
    pub total_rejected: AtomicU64,
    pub total_timed_out: AtomicU64,
    pub total_cancelled: AtomicU64,
    /// Inbound messages referencing no pending entry (protocol drift signal)
    pub total_unknown: AtomicU64,
}

/// Point-in-time view of the counters, for the status endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct RegistryStatsSnapshot {
    pub pending: usize,
    pub registered: u64,
    pub resolved: u64,
    pub rejected: u64,
    pub timed_out: u64,
    pub cancelled: u64,
    pub unknown: u64,
}

/// Process-wide table of pending transactions.
///
/// Flow:
/// 1. The dispatcher calls `register()` and gets a transaction id plus a
///    oneshot receiver.
/// 2. The command goes out carrying the id.
/// 3. The inbound router later calls `resolve()` or `reject()` with the id
///    echoed by the helper.
/// 4. The sweep converts overdue entries to `TimedOut`.
///
/// All four paths converge on removing the entry: at most one succeeds.
pub struct TransactionRegistry {
    /// Map of transaction id to pending transaction
    pending: DashMap<TransactionId, PendingTransaction>,
    /// Default timeout
    default_timeout: Duration,
    /// Counters
    stats: Arc<RegistryStats>,
}

impl TransactionRegistry {
    /// Create a new registry with the given default timeout.
    pub fn new(default_timeout: Duration) -> Self {
        Self {
            pending: DashMap::new(),
            default_timeout,
            stats: Arc::new(RegistryStats::default()),
        }
    }

    /// Register a pending transaction and get a receiver for its outcome.
    ///
    /// # Panics
    ///
    /// Panics if the freshly generated id collides with a pending entry.
    /// With 128-bit ids this indicates a defect in the id scheme, not a
    /// runtime condition to recover from.
    pub fn register(
        &self,
        action: &str,
        kind: TransactionKind,
        timeout: Option<Duration>,
    ) -> (TransactionId, oneshot::Receiver<TransactionOutcome>) {
        let id = TransactionId::new();
        let (tx, rx) = oneshot::channel();

        let transaction = PendingTransaction {
            slot: tx,
            kind,
            created_at: Instant::now(),
            action: action.to_string(),
            timeout: timeout.unwrap_or(self.default_timeout),
        };

        match self.pending.entry(id) {
            Entry::Occupied(_) => {
                panic!("duplicate transaction id {id}: identifier scheme is broken");
            }
            Entry::Vacant(vacant) => {
                vacant.insert(transaction);
            }
        }
        self.stats.total_registered.fetch_add(1, Ordering::Relaxed);

        debug!(
            transaction_id = %id,
            action = action,
            "Registered pending transaction"
        );

        (id, rx)
    }

    /// Resolve a pending transaction with a success payload.
    ///
    /// Returns true if a pending entry was found and the caller was resumed.
    /// An unknown or already-terminal id is a logged no-op.
    pub fn resolve(&self, id: TransactionId, payload: serde_json::Value) -> bool {
        self.finish(id, TransactionOutcome::Resolved(payload), &self.stats.total_resolved)
    }

    /// Reject a pending transaction with a helper-reported error.
    ///
    /// Same lookup/guard discipline as [`resolve`](Self::resolve).
    pub fn reject(&self, id: TransactionId, error: HelperError) -> bool {
        self.finish(id, TransactionOutcome::Rejected(error), &self.stats.total_rejected)
    }

    /// Cancel a pending transaction (caller abandoned interest).
    ///
    /// Delivers `Rejected(Cancelled)` if a waiter is still attached; if the
    /// receiver is already gone the slot is simply discarded. Returns true
    /// if an entry was removed.
    pub fn cancel(&self, id: TransactionId) -> bool {
        if let Some((_, transaction)) = self.pending.remove(&id) {
            self.stats.total_cancelled.fetch_add(1, Ordering::Relaxed);
            debug!(
                transaction_id = %id,
                action = transaction.action,
                "Cancelled pending transaction"
            );
            // Waiter may already be gone; either way the entry is removed.
            let _ = transaction
                .slot
                .send(TransactionOutcome::Rejected(HelperError::Cancelled));
            true
        } else {
            false
        }
    }

    /// Force overdue pending transactions to `TimedOut`.
    ///
    /// Delivers a timeout outcome to each affected waiter and removes the
    /// entry. Returns the number of transactions timed out.
    pub fn remove_expired(&self) -> usize {
        let now = Instant::now();

        // Scan first, then remove per id: a concurrent resolve between the
        // scan and the remove simply wins the race and the remove is a no-op.
        let expired: Vec<TransactionId> = self
            .pending
            .iter()
            .filter(|entry| now.duration_since(entry.created_at) > entry.timeout)
            .map(|entry| *entry.key())
            .collect();

        let mut removed = 0;
        for id in expired {
            if let Some((_, transaction)) = self.pending.remove(&id) {
                warn!(
                    transaction_id = %id,
                    action = transaction.action,
                    elapsed_ms = transaction.created_at.elapsed().as_millis(),
                    timeout_ms = transaction.timeout.as_millis(),
                    "Timing out unanswered transaction"
                );
                self.stats.total_timed_out.fetch_add(1, Ordering::Relaxed);
                removed += 1;
                let _ = transaction.slot.send(TransactionOutcome::TimedOut);
            }
        }

        removed
    }

    /// Get number of currently pending transactions
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Check if a transaction id is pending
    pub fn is_pending(&self, id: &TransactionId) -> bool {
        self.pending.contains_key(id)
    }

    /// Get counters
    pub fn stats(&self) -> &RegistryStats {
        &self.stats
    }

    /// Snapshot the counters for the status endpoint.
    pub fn snapshot(&self) -> RegistryStatsSnapshot {
        RegistryStatsSnapshot {
            pending: self.pending.len(),
            registered: self.stats.total_registered.load(Ordering::Relaxed),
            resolved: self.stats.total_resolved.load(Ordering::Relaxed),
            rejected: self.stats.total_rejected.load(Ordering::Relaxed),
            timed_out: self.stats.total_timed_out.load(Ordering::Relaxed),
            cancelled: self.stats.total_cancelled.load(Ordering::Relaxed),
            unknown: self.stats.total_unknown.load(Ordering::Relaxed),
        }
    }

    /// Expected result shape of a pending transaction, if still pending.
    pub fn kind_of(&self, id: &TransactionId) -> Option<TransactionKind> {
        self.pending.get(id).map(|entry| entry.kind)
    }

    fn finish(&self, id: TransactionId, outcome: TransactionOutcome, counter: &AtomicU64) -> bool {
        if let Some((_, transaction)) = self.pending.remove(&id) {
            let elapsed = transaction.created_at.elapsed();
            match transaction.slot.send(outcome) {
                Ok(()) => {
                    counter.fetch_add(1, Ordering::Relaxed);
                    debug!(
                        transaction_id = %id,
                        action = transaction.action,
                        elapsed_ms = elapsed.as_millis(),
                        "Completed pending transaction"
                    );
                    true
                }
                Err(_) => {
                    // Receiver was dropped (caller gave up waiting)
                    self.stats.total_cancelled.fetch_add(1, Ordering::Relaxed);
                    debug!(
                        transaction_id = %id,
                        action = transaction.action,
                        "Pending transaction waiter already gone"
                    );
                    false
                }
            }
        } else {
            self.stats.total_unknown.fetch_add(1, Ordering::Relaxed);
            // id age distinguishes a reply that outlived its sweep from an
            // id the helper made up
            warn!(
                transaction_id = %id,
                id_age_ms = ?id.age_ms(),
                "Response for unknown or already-terminal transaction id"
            );
            false
        }
    }
}

/// Background task that sweeps overdue transactions on an interval.
pub async fn sweep_task(registry: Arc<TransactionRegistry>, interval: Duration) {
    let mut sweep_interval = tokio::time::interval(interval);
    sweep_interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    loop {
        sweep_interval.tick().await;
        let removed = registry.remove_expired();
        if removed > 0 {
            debug!(removed = removed, "Swept timed-out transactions");
        }
    }
}
