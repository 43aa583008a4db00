//! Domain layer for the chat hub.
//!
//! This module contains business rules and the ports the hub depends on,
//! independent of transport and storage concerns.

pub mod clock;
pub mod credential;
pub mod entity;
pub mod error;
pub mod repository;
pub mod value_object;

pub use clock::{Clock, SystemClock};
pub use credential::CredentialVerifier;
pub use entity::{ChatMessage, NewChatMessage};
pub use error::{AuthError, RepositoryError, ValueObjectError};
pub use repository::ChatMessageRepository;
pub use value_object::{Author, MessageId, MessageText, UserId, Username};

#[cfg(test)]
pub use credential::MockCredentialVerifier;
#[cfg(test)]
pub use repository::MockChatMessageRepository;
