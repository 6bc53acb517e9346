//! Middleware guarding protected routes.

use axum::{
    extract::{Request, State},
    http::{HeaderValue, header::VARY},
    middleware::Next,
    response::{IntoResponse, Response},
};

use super::extractors::authenticate_request;
use super::state::HasAuthBackend;
use super::types::AuthenticatedUser;
use crate::jwt::now_secs;

/// Require a valid access token before running the wrapped handler.
///
/// On success the [`AuthenticatedUser`] is placed in request extensions. On
/// failure the handler never runs and the client gets a bare 401; the reason
/// is only logged. Either way the response varies on `Authorization`.
///
/// ```ignore
/// Router::new()
///     .route("/movies", get(catalog))
///     .route_layer(middleware::from_fn_with_state(state.clone(), require_auth::<MoviesState>))
/// ```
pub async fn require_auth<S>(State(state): State<S>, mut request: Request, next: Next) -> Response
where
    S: HasAuthBackend + Clone,
{
    let mut response =
        match authenticate_request(request.headers(), state.sessions().jwt(), now_secs()) {
            Ok(claims) => {
                request
                    .extensions_mut()
                    .insert(AuthenticatedUser { claims });
                next.run(request).await
            }
            Err(e) => {
                tracing::debug!(
                    error = %e,
                    path = %request.uri().path(),
                    "Rejected unauthenticated request"
                );
                e.into_response()
            }
        };

    response
        .headers_mut()
        .append(VARY, HeaderValue::from_static("Authorization"));
    response
}
