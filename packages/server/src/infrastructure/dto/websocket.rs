//! WebSocket frame DTOs for the chat hub.

use serde::{Deserialize, Serialize};

use super::ChatMessageDto;
use crate::domain::ChatMessage;

/// Frame sent by a client. Every frame carries its own credential.
///
/// Missing fields read as empty strings, so `{"text":"hi"}` is answered with
/// an invalid-token error rather than ignored.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InboundFrame {
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub token: String,
}

/// Error reported to the client that caused it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorFrame {
    pub error: String,
}

/// Frame sent by the server
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OutboundFrame {
    Message(ChatMessageDto),
    Error(ErrorFrame),
}

impl OutboundFrame {
    pub fn error(message: impl Into<String>) -> Self {
        Self::Error(ErrorFrame {
            error: message.into(),
        })
    }
}

impl From<&ChatMessage> for OutboundFrame {
    fn from(message: &ChatMessage) -> Self {
        Self::Message(ChatMessageDto::from(message))
    }
}
