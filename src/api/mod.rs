mod error;
mod movies;
mod sessions;

use std::sync::Arc;
use std::time::Duration;

use axum::{Json, Router, routing::get};
use serde::Serialize;

use crate::auth::{PasswordVerifier, SessionIssuer};
use crate::db::Database;

pub use error::ApiError;
pub use movies::MoviesState;
pub use sessions::SessionsState;

/// Create the API router.
pub fn create_api_router(
    db: Database,
    sessions: Arc<SessionIssuer>,
    passwords: Arc<dyn PasswordVerifier>,
    lookup_timeout: Duration,
) -> Router {
    let sessions_state = SessionsState {
        db: db.clone(),
        sessions: sessions.clone(),
        passwords,
        lookup_timeout,
    };

    let movies_state = MoviesState {
        db,
        sessions,
        lookup_timeout,
    };

    Router::new()
        .route("/", get(status))
        .merge(sessions::router(sessions_state))
        .merge(movies::router(movies_state))
}

#[derive(Serialize)]
struct Status {
    status: &'static str,
    message: &'static str,
    version: &'static str,
}

async fn status() -> Json<Status> {
    Json(Status {
        status: "active",
        message: "Filmstrip up and running",
        version: env!("CARGO_PKG_VERSION"),
    })
}
