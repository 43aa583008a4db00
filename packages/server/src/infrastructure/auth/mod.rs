//! Credential verifier implementations.

pub mod jwt;

pub use jwt::{JwtClaims, JwtCredentialVerifier};
