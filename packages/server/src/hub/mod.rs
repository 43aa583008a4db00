//! Real-time chat hub: admission, session registry and broadcast.

pub mod admission;
pub mod broadcast;
pub mod session;

pub use admission::{AdmissionGate, AdmissionPermit};
pub use broadcast::{Hub, HubClosed};
pub use session::{
    DEFAULT_OUTBOUND_CAPACITY, Outbound, OutboundReceiver, OutboundSender, SessionId,
};
