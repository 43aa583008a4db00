//! Credential verification port.

use super::{Author, AuthError};

/// Turns an opaque token into a verified author identity.
#[cfg_attr(test, mockall::automock)]
pub trait CredentialVerifier: Send + Sync {
    fn verify(&self, token: &str) -> Result<Author, AuthError>;
}
