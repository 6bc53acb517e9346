//! Session endpoints.
//!
//! - GET/POST `/authenticate` - Log in with email and password
//! - POST `/register` - Create an account and log in
//! - GET/POST `/refresh` - Rotate the refresh cookie into a new token pair
//! - GET/POST `/logout` - Expire the refresh cookie
//!
//! Login and register answer with the bare access token string; the refresh
//! token only ever travels in the `Set-Cookie` header.

use std::sync::Arc;
use std::time::Duration;

use axum::{
    Json, Router,
    extract::{State, rejection::JsonRejection},
    http::{HeaderMap, StatusCode, header::SET_COOKIE},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::Deserialize;
use tracing::{debug, error, info, warn};

use super::error::ApiError;
use crate::auth::{
    AuthError, Identity, PasswordError, PasswordVerifier, SessionIssuer, UNKNOWN_USER_HASH,
    UserLookup, bounded_lookup, refresh_session,
};
use crate::db::Database;
use crate::impl_has_auth_backend;

const INVALID_FIELDS: &str = "please fill in all required fields";

#[derive(Clone)]
pub struct SessionsState {
    pub db: Database,
    pub sessions: Arc<SessionIssuer>,
    pub passwords: Arc<dyn PasswordVerifier>,
    pub lookup_timeout: Duration,
}

impl_has_auth_backend!(SessionsState);

pub fn router(state: SessionsState) -> Router {
    Router::new()
        .route("/authenticate", get(authenticate).post(authenticate))
        .route("/register", post(register))
        .route("/refresh", get(refresh).post(refresh))
        .route("/logout", get(logout).post(logout))
        .with_state(state)
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct LoginRequest {
    email: String,
    password: String,
}

impl LoginRequest {
    fn validate(&self) -> Result<(), ApiError> {
        if !valid_email(&self.email, 255) || !valid_password(&self.password) {
            return Err(ApiError::bad_request(INVALID_FIELDS));
        }
        Ok(())
    }
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct RegisterRequest {
    first_name: String,
    last_name: String,
    email: String,
    password: String,
}

impl RegisterRequest {
    fn validate(&self) -> Result<(), ApiError> {
        let name_ok = |name: &str| {
            let name = name.trim();
            !name.is_empty() && name.chars().count() <= 50
        };

        if !name_ok(&self.first_name)
            || !name_ok(&self.last_name)
            || !valid_email(&self.email, 50)
            || !valid_password(&self.password)
        {
            return Err(ApiError::bad_request(INVALID_FIELDS));
        }
        Ok(())
    }
}

fn valid_email(email: &str, max_len: usize) -> bool {
    match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.is_empty()
                && email.len() <= max_len
                && !email.chars().any(char::is_whitespace)
        }
        None => false,
    }
}

fn valid_password(password: &str) -> bool {
    (3..=50).contains(&password.chars().count())
}

/// Unreadable, incomplete or over-specified bodies all get the same answer.
fn invalid_body(rejection: JsonRejection) -> ApiError {
    debug!(error = %rejection.body_text(), "Rejected request body");
    ApiError::bad_request(INVALID_FIELDS)
}

/// Run a password check off the async runtime.
async fn verify_password(
    passwords: Arc<dyn PasswordVerifier>,
    stored_hash: String,
    plaintext: String,
) -> Result<Result<bool, PasswordError>, ApiError> {
    tokio::task::spawn_blocking(move || passwords.verify(&stored_hash, &plaintext))
        .await
        .map_err(|e| {
            error!(error = %e, "Password verification task failed");
            ApiError::internal("Internal error")
        })
}

/// Issue a pair for a verified identity and package the HTTP response.
fn session_response(
    state: &SessionsState,
    identity: &Identity,
    status: StatusCode,
) -> Result<Response, ApiError> {
    let pair = state
        .sessions
        .issue_pair(identity)
        .map_err(AuthError::Signing)?;
    let cookie = state.sessions.refresh_cookie(&pair.refresh_token);

    Ok((status, [(SET_COOKIE, cookie.to_string())], Json(pair.access_token)).into_response())
}

/// Log in with email and password.
async fn authenticate(
    State(state): State<SessionsState>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(payload) = payload.map_err(invalid_body)?;
    payload.validate()?;

    let found = bounded_lookup(
        state.lookup_timeout,
        state.db.lookup_user_by_email(&payload.email),
    )
    .await?;

    let Some((identity, stored_hash)) = found else {
        // Pay for a hash check anyway so response time does not reveal the miss.
        let _ = verify_password(
            state.passwords.clone(),
            UNKNOWN_USER_HASH.to_string(),
            payload.password,
        )
        .await?;
        warn!("Login attempt for unknown email");
        return Err(AuthError::InvalidCredentials.into());
    };

    let verified = verify_password(state.passwords.clone(), stored_hash, payload.password).await?;

    match verified {
        Ok(true) => {}
        Ok(false) => {
            warn!(user_id = identity.id, "Login attempt with wrong password");
            return Err(AuthError::InvalidCredentials.into());
        }
        Err(e) => {
            error!(user_id = identity.id, error = %e, "Stored password hash is unusable");
            return Err(AuthError::InvalidCredentials.into());
        }
    }

    info!(user_id = identity.id, "User logged in");
    session_response(&state, &identity, StatusCode::ACCEPTED)
}

/// Create an account and log it in.
async fn register(
    State(state): State<SessionsState>,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(payload) = payload.map_err(invalid_body)?;
    payload.validate()?;

    let passwords = state.passwords.clone();
    let plaintext = payload.password;
    let password_hash = tokio::task::spawn_blocking(move || passwords.hash(&plaintext))
        .await
        .map_err(|e| {
            error!(error = %e, "Password hashing task failed");
            ApiError::internal("Internal error")
        })?
        .map_err(|e| {
            error!(error = %e, "Failed to hash password");
            ApiError::internal("Internal error")
        })?;

    let first_name = payload.first_name.trim();
    let last_name = payload.last_name.trim();

    let id = match state
        .db
        .users()
        .create(first_name, last_name, &payload.email, &password_hash)
        .await
    {
        Ok(id) => id,
        Err(sqlx::Error::Database(e)) if e.is_unique_violation() => {
            return Err(ApiError::conflict("Email is already registered"));
        }
        Err(e) => return Err(ApiError::db_error("Failed to create user", e)),
    };

    info!(user_id = id, "User registered");
    session_response(
        &state,
        &Identity::new(id, first_name, last_name),
        StatusCode::CREATED,
    )
}

/// Exchange the refresh cookie for a new pair. The new refresh token replaces
/// the cookie; the body carries only the access token.
async fn refresh(
    State(state): State<SessionsState>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, ApiError> {
    let outcome = refresh_session(&headers, &state).await?;
    info!(user_id = outcome.identity.id, "Session refreshed");

    Ok((
        StatusCode::OK,
        [(SET_COOKIE, outcome.cookie.to_string())],
        Json(outcome.pair),
    ))
}

/// Expire the refresh cookie. Access tokens already handed out stay valid
/// until they expire on their own.
async fn logout(State(state): State<SessionsState>) -> impl IntoResponse {
    (
        StatusCode::ACCEPTED,
        [(SET_COOKIE, state.sessions.expired_cookie().to_string())],
    )
}
