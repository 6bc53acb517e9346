//! Refresh cookie parsing and construction.

use std::fmt;

use axum::http::{HeaderMap, header};

/// Default cookie name for the refresh token. The `__Host-` prefix makes
/// browsers require `Secure`, `Path=/` and no `Domain`.
pub const REFRESH_COOKIE_NAME: &str = "__Host-refresh_token";

/// Where the refresh cookie lives. Part of the startup configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CookieConfig {
    pub name: String,
    pub domain: Option<String>,
    pub path: String,
}

impl Default for CookieConfig {
    fn default() -> Self {
        Self {
            name: REFRESH_COOKIE_NAME.to_string(),
            domain: None,
            path: "/".to_string(),
        }
    }
}

/// A `Set-Cookie` for the refresh token. Always `HttpOnly`, `Secure` and
/// `SameSite=Strict`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionCookie {
    pub name: String,
    pub value: String,
    pub domain: Option<String>,
    pub path: String,
    /// Seconds until expiry; zero or negative expires the cookie immediately
    pub max_age: i64,
    /// Absolute expiry (Unix seconds)
    pub expires: u64,
}

impl SessionCookie {
    pub fn is_expired(&self) -> bool {
        self.max_age <= 0
    }
}

impl fmt::Display for SessionCookie {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}; Path={}", self.name, self.value, self.path)?;
        if let Some(domain) = &self.domain {
            write!(f, "; Domain={}", domain)?;
        }
        write!(
            f,
            "; Expires={}; Max-Age={}; HttpOnly; Secure; SameSite=Strict",
            http_date(self.expires),
            self.max_age.max(0)
        )
    }
}

/// Format Unix seconds as an IMF-fixdate, e.g. `Thu, 01 Jan 1970 00:00:00 GMT`.
fn http_date(secs: u64) -> String {
    let secs = i64::try_from(secs).unwrap_or(i64::MAX);
    chrono::DateTime::from_timestamp(secs, 0)
        .unwrap_or_default()
        .format("%a, %d %b %Y %H:%M:%S GMT")
        .to_string()
}

/// Extract a cookie value from the Cookie headers. A request may carry
/// several Cookie headers; the first cookie with a matching name wins.
pub fn get_cookie<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|cookie_header| cookie_header.split(';'))
        .filter_map(|part| part.trim().split_once('='))
        .find(|(key, _)| key.trim() == name)
        .map(|(_, value)| value.trim())
}
