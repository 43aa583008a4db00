//! Session identity and outbound queue types shared by the hub and the
//! WebSocket handler.

use std::{
    fmt,
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
};

use tokio::sync::mpsc;

use crate::domain::ChatMessage;

/// Default capacity of a session's outbound queue.
pub const DEFAULT_OUTBOUND_CAPACITY: usize = 256;

/// Item carried by an outbound queue. Shared between all recipients of one
/// broadcast.
pub type Outbound = Arc<ChatMessage>;

/// Sending half of a session's outbound queue. Only the hub holds it.
pub type OutboundSender = mpsc::Sender<Outbound>;

/// Receiving half of a session's outbound queue, drained by the writer loop.
/// Yields `None` once the hub has dropped the session.
pub type OutboundReceiver = mpsc::Receiver<Outbound>;

/// Identity of one client session within a hub.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SessionId(u64);

impl SessionId {
    pub fn new(value: u64) -> Self {
        Self(value)
    }

    pub fn value(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "session-{}", self.0)
    }
}

/// Monotonic source of session identifiers.
#[derive(Debug, Default)]
pub(crate) struct SessionIdGenerator(AtomicU64);

impl SessionIdGenerator {
    pub(crate) fn next(&self) -> SessionId {
        SessionId(self.0.fetch_add(1, Ordering::Relaxed) + 1)
    }
}
