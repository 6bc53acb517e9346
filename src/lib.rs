pub mod api;
pub mod auth;
pub mod cli;
pub mod db;
pub mod jwt;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use api::create_api_router;
use auth::{Argon2Passwords, CookieConfig, SessionIssuer};
use axum::Router;
use axum::http::{HeaderName, HeaderValue, Method, header};
use db::Database;
use jwt::JwtConfig;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use url::Url;

pub struct ServerConfig {
    /// Database connection (cloneable, uses connection pool internally)
    pub db: Database,
    /// JWT secret for signing tokens
    pub jwt_secret: Vec<u8>,
    /// Issuer claim of access tokens
    pub issuer: String,
    /// Audience claim of access tokens
    pub audience: String,
    pub access_ttl: Duration,
    pub refresh_ttl: Duration,
    /// Refresh cookie name, domain and path
    pub cookie: CookieConfig,
    /// Deadline for a single user lookup
    pub lookup_timeout: Duration,
    /// Browser origin allowed by CORS
    pub frontend_url: Url,
}

/// CORS policy for the single browser frontend. Credentials are not allowed;
/// the refresh cookie is first-party.
fn cors_layer(frontend_url: &Url) -> CorsLayer {
    let origin = frontend_url.origin().ascii_serialization();
    let layer = CorsLayer::new()
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([
            header::ACCEPT,
            header::AUTHORIZATION,
            header::CONTENT_TYPE,
            HeaderName::from_static("x-csrf-token"),
        ])
        .expose_headers([header::LINK])
        .max_age(Duration::from_secs(300));

    match HeaderValue::from_str(&origin) {
        Ok(origin) => layer.allow_origin(origin),
        Err(e) => {
            tracing::warn!(origin = %origin, error = %e, "Frontend origin is not a valid header value");
            layer
        }
    }
}

/// Create the application router with the given configuration.
pub fn create_app(config: &ServerConfig) -> Router {
    let jwt = JwtConfig::new(&config.jwt_secret, &config.issuer, &config.audience)
        .with_ttls(config.access_ttl, config.refresh_ttl);
    let sessions = Arc::new(SessionIssuer::new(jwt, config.cookie.clone()));

    create_api_router(
        config.db.clone(),
        sessions,
        Arc::new(Argon2Passwords),
        config.lookup_timeout,
    )
    .layer(cors_layer(&config.frontend_url))
}

/// Run the server on the given listener. This function blocks until the server exits.
pub async fn run_server(config: ServerConfig, listener: TcpListener) -> Result<(), std::io::Error> {
    let app = create_app(&config);
    let make_service = app.into_make_service_with_connect_info::<SocketAddr>();
    axum::serve(listener, make_service).await
}
