//! Catalog endpoints.
//!
//! Public:
//! - GET `/movies` - All movies
//! - GET `/movies/{id}` - One movie with its genres
//! - GET `/genres` - All genres
//!
//! Behind the auth gate:
//! - GET `/admin/movies` - Catalog for management
//! - GET `/admin/movies/{id}` - Movie plus every genre, own genres checked
//! - PUT `/admin/movies` - Add a movie

use std::sync::Arc;
use std::time::Duration;

use axum::{
    Json, Router,
    extract::{Path, State, rejection::JsonRejection},
    http::StatusCode,
    middleware,
    response::IntoResponse,
    routing::get,
};
use chrono::NaiveDate;
use serde::Serialize;
use tracing::info;

use super::error::{ApiError, ResultExt};
use crate::auth::{Auth, SessionIssuer, require_auth};
use crate::db::{Database, Genre, Movie, NewMovie};
use crate::impl_has_auth_backend;

#[derive(Clone)]
pub struct MoviesState {
    pub db: Database,
    pub sessions: Arc<SessionIssuer>,
    pub lookup_timeout: Duration,
}

impl_has_auth_backend!(MoviesState);

pub fn router(state: MoviesState) -> Router {
    let admin = Router::new()
        .route("/admin/movies", get(admin_catalog).put(insert_movie))
        .route("/admin/movies/{id}", get(edit_movie))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            require_auth::<MoviesState>,
        ));

    Router::new()
        .route("/movies", get(list_movies))
        .route("/movies/{id}", get(get_movie))
        .route("/genres", get(list_genres))
        .merge(admin)
        .with_state(state)
}

async fn list_movies(State(state): State<MoviesState>) -> Result<Json<Vec<Movie>>, ApiError> {
    let movies = state.db.movies().list().await.db_err("Failed to list movies")?;
    Ok(Json(movies))
}

async fn get_movie(
    State(state): State<MoviesState>,
    Path(id): Path<i64>,
) -> Result<Json<Movie>, ApiError> {
    state
        .db
        .movies()
        .get_by_id(id)
        .await
        .db_err("Failed to get movie")?
        .map(Json)
        .ok_or_else(|| ApiError::not_found("Movie not found"))
}

async fn list_genres(State(state): State<MoviesState>) -> Result<Json<Vec<Genre>>, ApiError> {
    let genres = state
        .db
        .movies()
        .genres()
        .await
        .db_err("Failed to list genres")?;
    Ok(Json(genres))
}

async fn admin_catalog(
    State(state): State<MoviesState>,
    Auth(user): Auth,
) -> Result<Json<Vec<Movie>>, ApiError> {
    tracing::debug!(user_id = ?user.user_id(), "Admin catalog requested");
    list_movies(State(state)).await
}

#[derive(Serialize)]
struct EditView {
    movie: Movie,
    genres: Vec<Genre>,
}

async fn edit_movie(
    State(state): State<MoviesState>,
    Path(id): Path<i64>,
) -> Result<Json<EditView>, ApiError> {
    let (movie, genres) = state
        .db
        .movies()
        .edit_view(id)
        .await
        .db_err("Failed to load movie for editing")?
        .ok_or_else(|| ApiError::not_found("Movie not found"))?;
    Ok(Json(EditView { movie, genres }))
}

#[derive(Serialize)]
struct InsertResponse {
    id: i64,
    message: &'static str,
}

fn validate_movie(movie: &NewMovie) -> Result<(), ApiError> {
    if movie.title.trim().is_empty() || movie.mpaa_rating.trim().is_empty() {
        return Err(ApiError::bad_request("please fill in all required fields"));
    }
    if NaiveDate::parse_from_str(&movie.release_date, "%Y-%m-%d").is_err() {
        return Err(ApiError::bad_request("release_date must be YYYY-MM-DD"));
    }
    if movie.runtime <= 0 {
        return Err(ApiError::bad_request("runtime must be positive"));
    }
    Ok(())
}

async fn insert_movie(
    State(state): State<MoviesState>,
    Auth(user): Auth,
    payload: Result<Json<NewMovie>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(movie) = payload.map_err(|e| ApiError::bad_request(e.body_text()))?;
    validate_movie(&movie)?;

    let known: Vec<i64> = state
        .db
        .movies()
        .genres()
        .await
        .db_err("Failed to list genres")?
        .into_iter()
        .map(|g| g.id)
        .collect();
    if let Some(unknown) = movie.genres_array.iter().find(|id| !known.contains(id)) {
        return Err(ApiError::bad_request(format!("Unknown genre {}", unknown)));
    }

    let id = state
        .db
        .movies()
        .insert(&movie)
        .await
        .db_err("Failed to insert movie")?;

    info!(user_id = ?user.user_id(), movie_id = id, "Movie added");
    Ok((
        StatusCode::CREATED,
        Json(InsertResponse {
            id,
            message: "Movie added",
        }),
    ))
}
