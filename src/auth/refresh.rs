//! Refresh token rotation.
//!
//! A valid refresh cookie buys a brand-new access/refresh pair and a new
//! cookie. The superseded refresh token is not recorded anywhere and stays
//! valid until its own expiry.

use axum::http::HeaderMap;

use super::cookie::{SessionCookie, get_cookie};
use super::errors::AuthError;
use super::session::TokenPair;
use super::state::{HasAuthBackend, UserLookup, bounded_lookup};
use super::types::Identity;
use crate::jwt::now_secs;

/// Result of a successful rotation.
#[derive(Debug, Clone)]
pub struct RefreshOutcome {
    pub identity: Identity,
    pub pair: TokenPair,
    pub cookie: SessionCookie,
}

/// Rotate the session carried by the request's refresh cookie.
pub async fn refresh_session<S>(headers: &HeaderMap, state: &S) -> Result<RefreshOutcome, AuthError>
where
    S: HasAuthBackend,
{
    refresh_session_at(headers, state, now_secs()).await
}

pub async fn refresh_session_at<S>(
    headers: &HeaderMap,
    state: &S,
    now: u64,
) -> Result<RefreshOutcome, AuthError>
where
    S: HasAuthBackend,
{
    let sessions = state.sessions();

    let token = get_cookie(headers, &sessions.cookie_config().name)
        .ok_or(AuthError::MissingCredentials)?;
    if token.is_empty() {
        tracing::warn!("Refresh cookie is empty");
        return Err(AuthError::MalformedRequest);
    }

    let claims = sessions
        .jwt()
        .validate_refresh_token(token, now)
        .map_err(|e| {
            tracing::warn!(error = %e, "Refresh token rejected");
            AuthError::Token(e)
        })?;

    let Some(user_id) = claims.user_id() else {
        tracing::warn!(subject = %claims.sub, "Refresh token subject is not a user ID");
        return Err(AuthError::UnknownSubject(claims.sub));
    };

    let identity = bounded_lookup(
        state.lookup_timeout(),
        state.users().lookup_user_by_id(user_id),
    )
    .await?
    .ok_or_else(|| {
        tracing::warn!(user_id, "Refresh token subject not found");
        AuthError::UnknownSubject(claims.sub.clone())
    })?;

    let pair = sessions
        .issue_pair_at(&identity, now)
        .map_err(AuthError::Signing)?;
    let cookie = sessions.refresh_cookie_at(&pair.refresh_token, now);

    tracing::debug!(user_id, "Rotated refresh token");

    Ok(RefreshOutcome {
        identity,
        pair,
        cookie,
    })
}
