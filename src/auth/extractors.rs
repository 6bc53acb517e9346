//! Bearer token authentication and the axum extractor built on it.

use axum::{
    extract::FromRequestParts,
    http::{HeaderMap, header::AUTHORIZATION, request::Parts},
};

use super::errors::AuthError;
use super::types::AuthenticatedUser;
use crate::jwt::{AccessClaims, JwtConfig};

/// Validate the `Authorization: Bearer <token>` header of a request.
///
/// The header must split on single spaces into exactly two parts, the first
/// being literally `Bearer`. Anything else is a malformed request, never a
/// token error.
pub fn authenticate_request(
    headers: &HeaderMap,
    jwt: &JwtConfig,
    now: u64,
) -> Result<AccessClaims, AuthError> {
    let header = headers
        .get(AUTHORIZATION)
        .ok_or(AuthError::MissingCredentials)?
        .to_str()
        .map_err(|_| AuthError::MalformedRequest)?;

    if header.is_empty() {
        return Err(AuthError::MissingCredentials);
    }

    let parts: Vec<&str> = header.split(' ').collect();
    let [scheme, token] = parts.as_slice() else {
        return Err(AuthError::MalformedRequest);
    };
    if *scheme != "Bearer" {
        return Err(AuthError::MalformedRequest);
    }

    jwt.validate_access_token(token, now)
        .map_err(AuthError::Token)
}

/// The user authenticated by [`require_auth`](super::require_auth).
///
/// Only usable on routes behind the gate; without it every request is
/// rejected as unauthenticated.
pub struct Auth(pub AuthenticatedUser);

impl<S> FromRequestParts<S> for Auth
where
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        match parts.extensions.get::<AuthenticatedUser>() {
            Some(user) => Ok(Auth(user.clone())),
            None => {
                tracing::warn!("Auth extractor used on a route without the auth gate");
                Err(AuthError::MissingCredentials)
            }
        }
    }
}
