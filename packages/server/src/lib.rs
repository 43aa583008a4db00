//! Real-time chat hub.
//!
//! Accepts many simultaneous WebSocket clients, authenticates every inbound
//! message, persists it and fans it out to all connected clients. Slow
//! clients are disconnected instead of stalling the broadcast, the number of
//! live connections is capped, and stale history is pruned in the
//! background.

pub mod common;
pub mod config;
pub mod domain;
pub mod hub;
pub mod infrastructure;
pub mod ui;
pub mod usecase;

// Re-export entry points
pub use config::ServerConfig;
pub use ui::{ServerError, run as run_server};
