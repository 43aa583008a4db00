//! Connection admission gate.
//!
//! Bounds the number of live WebSocket sessions. Admission hands out an
//! [`AdmissionPermit`]; the slot is given back when the permit is dropped, so
//! every exit path of a session releases exactly once.

use std::sync::{
    Arc,
    atomic::{AtomicUsize, Ordering},
};

/// Live-connection counter with a fixed ceiling.
///
/// Invariant: `0 <= live() <= max()`.
#[derive(Debug)]
pub struct AdmissionGate {
    live: AtomicUsize,
    max: usize,
}

impl AdmissionGate {
    /// Create a gate admitting at most `max` concurrent connections.
    pub fn new(max: usize) -> Arc<Self> {
        Arc::new(Self {
            live: AtomicUsize::new(0),
            max,
        })
    }

    /// Try to take a connection slot.
    ///
    /// Returns `None` with no side effect when the ceiling is reached.
    pub fn try_admit(self: &Arc<Self>) -> Option<AdmissionPermit> {
        self.live
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |live| {
                (live < self.max).then_some(live + 1)
            })
            .ok()
            .map(|_| AdmissionPermit {
                gate: Arc::clone(self),
            })
    }

    /// Number of slots currently held.
    pub fn live(&self) -> usize {
        self.live.load(Ordering::Acquire)
    }

    /// Configured ceiling.
    pub fn max(&self) -> usize {
        self.max
    }

    fn release(&self) {
        self.live.fetch_sub(1, Ordering::AcqRel);
    }
}

/// A held connection slot. Dropping it releases the slot.
#[derive(Debug)]
#[must_use = "dropping the permit releases the connection slot immediately"]
pub struct AdmissionPermit {
    gate: Arc<AdmissionGate>,
}

impl Drop for AdmissionPermit {
    fn drop(&mut self) {
        self.gate.release();
        tracing::trace!(live = self.gate.live(), "connection slot released");
    }
}
