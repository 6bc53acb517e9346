//! Session issuance: token pairs and the refresh cookie that carries half of
//! each pair.

use serde::Serialize;

use super::cookie::{CookieConfig, SessionCookie};
use super::types::Identity;
use crate::jwt::{JwtConfig, JwtError, TokenType, now_secs};

/// An access token and its refresh token, minted at the same instant.
///
/// Serializes as `{"access_token": ...}` only. The refresh token leaves the
/// server in the cookie and nowhere else.
#[derive(Debug, Clone, Serialize)]
pub struct TokenPair {
    pub access_token: String,
    #[serde(skip_serializing)]
    pub refresh_token: String,
}

/// Mints token pairs and refresh cookies from the process-wide configuration.
pub struct SessionIssuer {
    jwt: JwtConfig,
    cookie: CookieConfig,
}

impl SessionIssuer {
    pub fn new(jwt: JwtConfig, cookie: CookieConfig) -> Self {
        Self { jwt, cookie }
    }

    pub fn jwt(&self) -> &JwtConfig {
        &self.jwt
    }

    pub fn cookie_config(&self) -> &CookieConfig {
        &self.cookie
    }

    /// Issue a fresh pair for a verified identity.
    pub fn issue_pair(&self, identity: &Identity) -> Result<TokenPair, JwtError> {
        self.issue_pair_at(identity, now_secs())
    }

    /// Issue a pair with both tokens stamped with the same `now`.
    pub fn issue_pair_at(&self, identity: &Identity, now: u64) -> Result<TokenPair, JwtError> {
        let access = self.jwt.issue(TokenType::Access, identity, now)?;
        let refresh = self.jwt.issue(TokenType::Refresh, identity, now)?;

        Ok(TokenPair {
            access_token: access,
            refresh_token: refresh,
        })
    }

    /// Cookie carrying a refresh token, living as long as the token does.
    pub fn refresh_cookie(&self, refresh_token: &str) -> SessionCookie {
        self.refresh_cookie_at(refresh_token, now_secs())
    }

    pub fn refresh_cookie_at(&self, refresh_token: &str, now: u64) -> SessionCookie {
        let ttl = self.jwt.refresh_ttl().as_secs();
        SessionCookie {
            name: self.cookie.name.clone(),
            value: refresh_token.to_string(),
            domain: self.cookie.domain.clone(),
            path: self.cookie.path.clone(),
            max_age: i64::try_from(ttl).unwrap_or(i64::MAX),
            expires: now.saturating_add(ttl),
        }
    }

    /// Cookie that makes the browser drop the refresh cookie (logout).
    pub fn expired_cookie(&self) -> SessionCookie {
        SessionCookie {
            name: self.cookie.name.clone(),
            value: String::new(),
            domain: self.cookie.domain.clone(),
            path: self.cookie.path.clone(),
            max_age: -1,
            expires: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    const T: u64 = 1_700_000_000;

    fn issuer() -> SessionIssuer {
        let jwt = JwtConfig::new(b"session-test-secret-0123456789abcdef", "filmstrip", "web")
            .with_ttls(Duration::from_secs(15 * 60), Duration::from_secs(168 * 3600));
        let cookie = CookieConfig {
            name: "refresh".to_string(),
            domain: Some("example.com".to_string()),
            path: "/".to_string(),
        };
        SessionIssuer::new(jwt, cookie)
    }

    #[test]
    fn test_issue_pair_decodes_to_identity() {
        let issuer = issuer();
        let identity = Identity::new(42, "Ada", "Lovelace");

        let pair = issuer.issue_pair_at(&identity, T).unwrap();

        let access = issuer.jwt().validate_access_token(&pair.access_token, T).unwrap();
        let refresh = issuer
            .jwt()
            .validate_refresh_token(&pair.refresh_token, T)
            .unwrap();

        assert_eq!(access.sub, "42");
        assert_eq!(access.name, "Ada Lovelace");
        assert_eq!(refresh.sub, "42");
        assert_eq!(access.iat, refresh.iat);
        assert_ne!(pair.access_token, pair.refresh_token);
    }

    #[test]
    fn test_issue_pair_uses_wall_clock() {
        let issuer = issuer();
        let pair = issuer.issue_pair(&Identity::new(1, "Admin", "User")).unwrap();

        let claims = issuer
            .jwt()
            .validate_access_token(&pair.access_token, now_secs())
            .unwrap();
        assert_eq!(claims.user_id(), Some(1));
    }

    #[test]
    fn test_token_pair_json_omits_refresh_token() {
        let pair = TokenPair {
            access_token: "access".to_string(),
            refresh_token: "refresh".to_string(),
        };

        let json = serde_json::to_value(&pair).unwrap();
        assert_eq!(json, serde_json::json!({ "access_token": "access" }));
    }

    #[test]
    fn test_refresh_cookie_attributes() {
        let cookie = issuer().refresh_cookie_at("tok", T);

        assert_eq!(cookie.name, "refresh");
        assert_eq!(cookie.value, "tok");
        assert_eq!(cookie.domain.as_deref(), Some("example.com"));
        assert_eq!(cookie.path, "/");
        assert_eq!(cookie.max_age, 168 * 3600);
        assert_eq!(cookie.expires, T + 168 * 3600);

        let header = cookie.to_string();
        assert!(header.contains("HttpOnly"));
        assert!(header.contains("Secure"));
        assert!(header.contains("SameSite=Strict"));
    }

    #[test]
    fn test_refresh_cookie_with_huge_ttl_saturates() {
        let huge = Duration::from_secs(u64::MAX);
        let jwt = JwtConfig::new(b"session-test-secret-0123456789abcdef", "filmstrip", "web")
            .with_ttls(huge, huge);
        let issuer = SessionIssuer::new(jwt, CookieConfig::default());

        let cookie = issuer.refresh_cookie_at("tok", T);

        assert_eq!(cookie.max_age, i64::MAX);
        assert_eq!(cookie.expires, u64::MAX);
        assert!(cookie.to_string().starts_with("__Host-refresh_token=tok; Path=/;"));
    }

    #[test]
    fn test_expired_cookie() {
        let cookie = issuer().expired_cookie();

        assert_eq!(cookie.name, "refresh");
        assert!(cookie.value.is_empty());
        assert!(cookie.is_expired());
        assert_eq!(cookie.expires, 0);
        assert!(cookie.to_string().contains("Expires=Thu, 01 Jan 1970 00:00:00 GMT"));
    }
}
