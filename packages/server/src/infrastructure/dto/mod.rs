//! Wire formats for the HTTP and WebSocket surfaces.

pub mod http;
pub mod message;
pub mod websocket;

pub use message::ChatMessageDto;
