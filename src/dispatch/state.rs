//! Dispatch accounting
//!
//! Counts dispatched tasks by outcome. Tasks are never queued or bounded;
//! the counters only observe them.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::Notify;

// ─────────────────────────────────────────────────────────────────
// Outcome
// ─────────────────────────────────────────────────────────────────

/// How a dispatched task ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// The callable ran and its last return value was not an error
    Completed,
    /// The callable ran and reported an error as its last return value
    Failed,
    /// The call was refused before the callable ran
    Rejected,
    /// The callable panicked; the panic was contained
    Faulted,
}

/// Point-in-time copy of the dispatch counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchSnapshot {
    pub dispatched: u64,
    pub in_flight: u64,
    pub completed: u64,
    pub failed: u64,
    pub rejected: u64,
    pub faulted: u64,
}

impl DispatchSnapshot {
    /// Tasks that have ended, by any outcome
    pub fn finished(&self) -> u64 {
        self.completed + self.failed + self.rejected + self.faulted
    }
}

// ─────────────────────────────────────────────────────────────────
// Dispatch Stats
// ─────────────────────────────────────────────────────────────────

/// Shared counters for a dispatcher and all its clones
#[derive(Debug, Default)]
pub struct DispatchStats {
    dispatched: AtomicU64,
    in_flight: AtomicU64,
    completed: AtomicU64,
    failed: AtomicU64,
    rejected: AtomicU64,
    faulted: AtomicU64,

    /// Woken whenever `in_flight` drops to zero
    idle: Notify,
}

impl DispatchStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a task being handed to the runtime
    pub(crate) fn begin(&self) {
        self.dispatched.fetch_add(1, Ordering::Relaxed);
        self.in_flight.fetch_add(1, Ordering::AcqRel);
    }

    /// Record a task ending with `outcome`
    pub(crate) fn finish(&self, outcome: DispatchOutcome) {
        let counter = match outcome {
            DispatchOutcome::Completed => &self.completed,
            DispatchOutcome::Failed => &self.failed,
            DispatchOutcome::Rejected => &self.rejected,
            DispatchOutcome::Faulted => &self.faulted,
        };
        counter.fetch_add(1, Ordering::Relaxed);

        if self.in_flight.fetch_sub(1, Ordering::AcqRel) == 1 {
            self.idle.notify_waiters();
        }
    }

    /// Current number of tasks that have not ended
    pub fn in_flight(&self) -> u64 {
        self.in_flight.load(Ordering::Acquire)
    }

    pub fn snapshot(&self) -> DispatchSnapshot {
        DispatchSnapshot {
            dispatched: self.dispatched.load(Ordering::Relaxed),
            in_flight: self.in_flight.load(Ordering::Acquire),
            completed: self.completed.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            rejected: self.rejected.load(Ordering::Relaxed),
            faulted: self.faulted.load(Ordering::Relaxed),
        }
    }

    /// Wait until no task is in flight
    pub async fn wait_idle(&self) {
        loop {
            let notified = self.idle.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            if self.in_flight() == 0 {
                return;
            }
            notified.await;
        }
    }
}

/// Ends one tracked task when dropped, including during unwinding
#[derive(Debug)]
pub(crate) struct TaskGuard {
    stats: Arc<DispatchStats>,
    outcome: DispatchOutcome,
}

impl TaskGuard {
    /// Record a task being handed to the runtime
    ///
    /// The guard records [`DispatchOutcome::Faulted`] unless another outcome
    /// is set before it drops.
    pub(crate) fn begin(stats: Arc<DispatchStats>) -> Self {
        stats.begin();
        Self {
            stats,
            outcome: DispatchOutcome::Faulted,
        }
    }

    pub(crate) fn set(&mut self, outcome: DispatchOutcome) {
        self.outcome = outcome;
    }
}

impl Drop for TaskGuard {
    fn drop(&mut self) {
        self.stats.finish(self.outcome);
    }
}
