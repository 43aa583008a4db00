//! Core domain models for the chat hub.

use chrono::{DateTime, Utc};

use super::value_object::{Author, MessageId, MessageText};

/// A chat message that has been validated but not yet persisted.
///
/// It has no identifier and no creation time; both are assigned by the
/// repository when the message is saved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewChatMessage {
    /// Verified author of the message
    pub author: Author,
    /// Message body
    pub text: MessageText,
}

impl NewChatMessage {
    /// Create a new unpersisted chat message
    pub fn new(author: Author, text: MessageText) -> Self {
        Self { author, text }
    }
}

/// A persisted chat message.
///
/// Read-only once created: the only lifecycle event after this point is
/// deletion by the retention sweeper.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatMessage {
    /// Identifier assigned by the repository
    pub id: MessageId,
    /// Verified author of the message
    pub author: Author,
    /// Message body
    pub text: MessageText,
    /// Time the repository stored the message
    pub created_at: DateTime<Utc>,
}

impl ChatMessage {
    /// Attach the repository-assigned identity to a new message
    pub fn persisted(message: NewChatMessage, id: MessageId, created_at: DateTime<Utc>) -> Self {
        Self {
            id,
            author: message.author,
            text: message.text,
            created_at,
        }
    }

    /// Whether the message was created strictly before `cutoff`
    pub fn is_older_than(&self, cutoff: DateTime<Utc>) -> bool {
        self.created_at < cutoff
    }
}
