//! HS256 JWT credential verifier.
//!
//! Tokens are issued elsewhere; this side only checks the signature and
//! expiry, then reads `user_id` and `username` from the claims.

use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode};
use serde::{Deserialize, Serialize};

use crate::domain::{AuthError, Author, CredentialVerifier, UserId, Username};

/// Claims carried by an access token
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JwtClaims {
    pub user_id: i64,
    pub username: String,
    /// Expiry, seconds since the Unix epoch
    pub exp: i64,
}

/// Verifies tokens signed with a shared secret
pub struct JwtCredentialVerifier {
    key: DecodingKey,
    validation: Validation,
}

impl JwtCredentialVerifier {
    pub fn new(secret: &[u8]) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_required_spec_claims(&["exp"]);
        validation.validate_exp = true;
        Self {
            key: DecodingKey::from_secret(secret),
            validation,
        }
    }
}

impl CredentialVerifier for JwtCredentialVerifier {
    fn verify(&self, token: &str) -> Result<Author, AuthError> {
        if token.is_empty() {
            return Err(AuthError::InvalidToken);
        }
        let data = decode::<JwtClaims>(token, &self.key, &self.validation).map_err(|e| {
            tracing::debug!("token rejected: {}", e);
            AuthError::InvalidToken
        })?;
        let username =
            Username::new(data.claims.username).map_err(|_| AuthError::InvalidToken)?;
        Ok(Author::new(UserId::new(data.claims.user_id), username))
    }
}
