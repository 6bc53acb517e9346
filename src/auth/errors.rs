//! Authentication error types.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;

use crate::jwt::JwtError;

/// Why a request could not be authenticated or a session could not be issued.
///
/// The variants are for logs. Clients only ever see a generic 401 or 500.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("no credentials presented")]
    MissingCredentials,
    #[error("malformed credentials")]
    MalformedRequest,
    #[error("rejected token: {0}")]
    Token(JwtError),
    #[error("no user matches token subject {0:?}")]
    UnknownSubject(String),
    #[error("invalid credentials")]
    InvalidCredentials,
    #[error("user lookup failed: {0}")]
    Lookup(String),
    #[error("failed to sign session tokens: {0}")]
    Signing(JwtError),
}

impl AuthError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AuthError::MissingCredentials
            | AuthError::MalformedRequest
            | AuthError::Token(_)
            | AuthError::UnknownSubject(_)
            | AuthError::InvalidCredentials => StatusCode::UNAUTHORIZED,
            AuthError::Lookup(_) | AuthError::Signing(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn message(&self) -> &'static str {
        match self {
            AuthError::InvalidCredentials => "invalid credentials",
            AuthError::Lookup(_) | AuthError::Signing(_) => "internal error",
            _ => "unauthorized",
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        #[derive(Serialize)]
        struct ErrorResponse {
            error: &'static str,
        }

        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = %self, "Session handling failed");
        }

        (
            status,
            Json(ErrorResponse {
                error: self.message(),
            }),
        )
            .into_response()
    }
}
