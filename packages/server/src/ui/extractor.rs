//! Out-of-band authentication for the HTTP surface.

use std::sync::Arc;

use axum::{
    extract::FromRequestParts,
    http::{HeaderMap, header, request::Parts},
};

use super::{error::ApiError, state::AppState};
use crate::domain::Author;

const ACCESS_TOKEN_COOKIE: &str = "access_token";

/// Author verified from the `Authorization: Bearer` header or the
/// `access_token` cookie.
#[derive(Debug, Clone)]
pub struct AuthenticatedAuthor(pub Author);

impl FromRequestParts<Arc<AppState>> for AuthenticatedAuthor {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let token = extract_token(&parts.headers).ok_or(ApiError::Unauthorized("missing token"))?;
        state
            .verifier
            .verify(&token)
            .map(AuthenticatedAuthor)
            .map_err(|_| ApiError::Unauthorized("invalid token"))
    }
}

fn extract_token(headers: &HeaderMap) -> Option<String> {
    let bearer = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty());
    if let Some(token) = bearer {
        return Some(token.to_string());
    }

    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, value)| *name == ACCESS_TOKEN_COOKIE && !value.is_empty())
        .map(|(_, value)| value.to_string())
}
