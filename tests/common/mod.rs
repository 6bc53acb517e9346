#![allow(dead_code)]

use std::time::Duration;

use axum::{
    Router,
    body::Body,
    http::{Request, Response, header},
};
use filmstrip::{ServerConfig, auth::CookieConfig, create_app, db::Database, jwt::JwtConfig};
use tower::ServiceExt;
use url::Url;

pub const TEST_SECRET: &[u8] = b"integration-test-secret-0123456789abcdef";
pub const ISSUER: &str = "filmstrip";
pub const AUDIENCE: &str = "filmstrip-web";
pub const FRONTEND: &str = "http://localhost:3000";
pub const COOKIE_NAME: &str = "__Host-refresh_token";

pub struct TestApp {
    pub app: Router,
    pub db: Database,
    /// Same secret and claims as the app, for minting tokens directly.
    pub jwt: JwtConfig,
}

/// App on a fresh in-memory database with default lifetimes.
pub async fn create_test_app() -> TestApp {
    let db = Database::open(":memory:")
        .await
        .expect("Failed to open test database");

    let config = ServerConfig {
        db: db.clone(),
        jwt_secret: TEST_SECRET.to_vec(),
        issuer: ISSUER.to_string(),
        audience: AUDIENCE.to_string(),
        access_ttl: Duration::from_secs(15 * 60),
        refresh_ttl: Duration::from_secs(168 * 60 * 60),
        cookie: CookieConfig::default(),
        lookup_timeout: Duration::from_secs(3),
        frontend_url: Url::parse(FRONTEND).expect("Invalid URL"),
    };

    TestApp {
        app: create_app(&config),
        db,
        jwt: JwtConfig::new(TEST_SECRET, ISSUER, AUDIENCE),
    }
}

pub fn json_request(method: &str, uri: &str, body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

pub fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

pub fn get_with_bearer(uri: &str, token: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .header(header::AUTHORIZATION, format!("Bearer {}", token))
        .body(Body::empty())
        .unwrap()
}

pub fn with_cookie(method: &str, uri: &str, cookie: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::COOKIE, cookie)
        .body(Body::empty())
        .unwrap()
}

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap()
}

/// Extract Set-Cookie headers from response
pub fn set_cookies(response: &Response<Body>) -> Vec<String> {
    response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .map(|s| s.to_string())
        .collect()
}

/// `name=value` part of a Set-Cookie header, ready to send back as a Cookie.
pub fn cookie_pair(set_cookie: &str) -> String {
    set_cookie
        .split(';')
        .next()
        .unwrap_or_default()
        .to_string()
}

/// Value of the refresh cookie in a response.
pub fn refresh_cookie_value(response: &Response<Body>) -> String {
    let cookies = set_cookies(response);
    let cookie = cookies
        .iter()
        .find(|c| c.starts_with(&format!("{}=", COOKIE_NAME)))
        .expect("response should set the refresh cookie");
    cookie_pair(cookie)
        .split_once('=')
        .map(|(_, value)| value.to_string())
        .unwrap_or_default()
}

/// Register through the API. Returns (access token, refresh cookie pair).
pub async fn register(app: &Router, email: &str, password: &str) -> (String, String) {
    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/register",
            serde_json::json!({
                "first_name": "Admin",
                "last_name": "User",
                "email": email,
                "password": password,
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), 201);

    let cookie = format!("{}={}", COOKIE_NAME, refresh_cookie_value(&response));
    let access = body_json(response)
        .await
        .as_str()
        .expect("register should answer with the access token string")
        .to_string();
    (access, cookie)
}
