//! Chat message as it appears on the wire.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::ChatMessage;

/// Persisted chat message, shared by HTTP responses and WebSocket broadcasts
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessageDto {
    pub id: i64,
    pub user_id: i64,
    pub author: String,
    pub text: String,
    pub created_at: DateTime<Utc>, // RFC 3339
}

impl From<&ChatMessage> for ChatMessageDto {
    fn from(message: &ChatMessage) -> Self {
        Self {
            id: message.id.value(),
            user_id: message.author.user_id.value(),
            author: message.author.username.as_str().to_string(),
            text: message.text.as_str().to_string(),
            created_at: message.created_at,
        }
    }
}
