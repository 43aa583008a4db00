//! HTTP and WebSocket surface of the chat hub.

pub mod error;
pub mod extractor;
mod handler;
mod runner;
mod signal;
pub mod state;

pub use handler::websocket::TOO_MANY_CONNECTIONS;
pub use runner::{ServerError, router, run, serve};
pub use state::{AppState, HubSettings};
