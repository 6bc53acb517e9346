//! JWT token generation and validation.
//!
//! Two token kinds share one HMAC secret:
//! - Access tokens: short-lived (15 min default), carry the display name and
//!   are bound to the configured issuer and audience
//! - Refresh tokens: long-lived (7 days default), carry only subject and
//!   timestamps, travel exclusively in the refresh cookie
//!
//! Nothing is stored server-side. Validity is the signature plus the embedded
//! timestamps, checked against an explicit `now` so callers control the clock.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use jsonwebtoken::{
    Algorithm, DecodingKey, EncodingKey, Header, Validation, errors::ErrorKind,
};
use serde::{Deserialize, Serialize, de::DeserializeOwned};

use crate::auth::Identity;

/// Token type for distinguishing access vs refresh tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenType {
    /// Short-lived access token, sent per request in the Authorization header
    Access,
    /// Long-lived refresh token, only ever sent in the refresh cookie
    Refresh,
}

/// JWT claims for access tokens.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessClaims {
    /// Subject (user ID as a decimal string)
    pub sub: String,
    /// Display name ("first last")
    pub name: String,
    /// Issuer
    pub iss: String,
    /// Audience
    pub aud: String,
    /// Token type
    #[serde(rename = "typ")]
    pub token_type: TokenType,
    /// Issued at (Unix timestamp)
    pub iat: u64,
    /// Expiration time (Unix timestamp)
    pub exp: u64,
}

/// JWT claims for refresh tokens.
///
/// Unknown fields are rejected, so a token carrying issuer, audience or name
/// (an access token) never decodes as a refresh token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RefreshClaims {
    /// Subject (user ID as a decimal string)
    pub sub: String,
    /// Issued at (Unix timestamp)
    pub iat: u64,
    /// Expiration time (Unix timestamp)
    pub exp: u64,
}

impl AccessClaims {
    /// User ID encoded in the subject, if it is numeric.
    pub fn user_id(&self) -> Option<i64> {
        self.sub.parse().ok()
    }
}

impl RefreshClaims {
    /// User ID encoded in the subject, if it is numeric.
    pub fn user_id(&self) -> Option<i64> {
        self.sub.parse().ok()
    }
}

/// Claim sets that [`JwtConfig::decode`] knows how to validate.
pub trait TokenClaims: DeserializeOwned {
    fn expires_at(&self) -> u64;

    /// Kind-specific checks run after signature and expiry.
    fn check_binding(&self, _config: &JwtConfig) -> Result<(), JwtError> {
        Ok(())
    }
}

impl TokenClaims for AccessClaims {
    fn expires_at(&self) -> u64 {
        self.exp
    }

    fn check_binding(&self, config: &JwtConfig) -> Result<(), JwtError> {
        if self.token_type != TokenType::Access {
            return Err(JwtError::Malformed);
        }
        if self.iss != config.issuer {
            return Err(JwtError::IssuerMismatch);
        }
        if self.aud != config.audience {
            return Err(JwtError::AudienceMismatch);
        }
        Ok(())
    }
}

impl TokenClaims for RefreshClaims {
    fn expires_at(&self) -> u64 {
        self.exp
    }
}

/// Access token duration: 15 minutes
pub const ACCESS_TOKEN_DURATION: Duration = Duration::from_secs(15 * 60);

/// Refresh token duration: 7 days
pub const REFRESH_TOKEN_DURATION: Duration = Duration::from_secs(7 * 24 * 60 * 60);

/// The only algorithms a presented token may declare.
const HMAC_ALGORITHMS: [Algorithm; 3] = [Algorithm::HS256, Algorithm::HS384, Algorithm::HS512];

/// Current Unix time in seconds.
pub fn now_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

/// Signing configuration. Built once at startup and shared read-only.
#[derive(Clone)]
pub struct JwtConfig {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    issuer: String,
    audience: String,
    access_ttl: Duration,
    refresh_ttl: Duration,
}

impl JwtConfig {
    /// Create a configuration with the default token lifetimes.
    pub fn new(secret: &[u8], issuer: impl Into<String>, audience: impl Into<String>) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            issuer: issuer.into(),
            audience: audience.into(),
            access_ttl: ACCESS_TOKEN_DURATION,
            refresh_ttl: REFRESH_TOKEN_DURATION,
        }
    }

    pub fn with_ttls(mut self, access_ttl: Duration, refresh_ttl: Duration) -> Self {
        self.access_ttl = access_ttl;
        self.refresh_ttl = refresh_ttl;
        self
    }

    pub fn refresh_ttl(&self) -> Duration {
        self.refresh_ttl
    }

    /// Issue a token of the given kind for an identity.
    pub fn issue(&self, kind: TokenType, identity: &Identity, now: u64) -> Result<String, JwtError> {
        match kind {
            TokenType::Access => self.issue_access_token(identity, now),
            TokenType::Refresh => self.issue_refresh_token(identity, now),
        }
    }

    /// Generate an access token.
    ///
    /// The claims carry no nonce: two access tokens issued in the same second
    /// for the same identity are identical.
    pub fn issue_access_token(&self, identity: &Identity, now: u64) -> Result<String, JwtError> {
        let exp = now.saturating_add(self.access_ttl.as_secs());

        let claims = AccessClaims {
            sub: identity.id.to_string(),
            name: identity.display_name(),
            iss: self.issuer.clone(),
            aud: self.audience.clone(),
            token_type: TokenType::Access,
            iat: now,
            exp,
        };

        self.sign(&claims)
    }

    /// Generate a refresh token carrying only subject, issued-at and expiry.
    pub fn issue_refresh_token(&self, identity: &Identity, now: u64) -> Result<String, JwtError> {
        let exp = now.saturating_add(self.refresh_ttl.as_secs());

        let claims = RefreshClaims {
            sub: identity.id.to_string(),
            iat: now,
            exp,
        };

        self.sign(&claims)
    }

    fn sign<C: Serialize>(&self, claims: &C) -> Result<String, JwtError> {
        jsonwebtoken::encode(&Header::new(Algorithm::HS256), claims, &self.encoding_key)
            .map_err(JwtError::Signing)
    }

    /// Verify and decode a token.
    ///
    /// Order of checks: header algorithm, signature and shape, expiry, then
    /// the kind-specific binding (issuer and audience for access tokens).
    pub fn decode<C: TokenClaims>(&self, token: &str, now: u64) -> Result<C, JwtError> {
        ensure_hmac_header(token)?;

        let mut validation = Validation::new(Algorithm::HS256);
        validation.algorithms = HMAC_ALGORITHMS.to_vec();
        validation.leeway = 0;
        // Expiry is checked below against the caller's clock.
        validation.validate_exp = false;
        validation.validate_aud = false;
        validation.set_required_spec_claims(&["exp", "sub"]);

        let token_data = jsonwebtoken::decode::<C>(token, &self.decoding_key, &validation)
            .map_err(|e| match e.kind() {
                ErrorKind::InvalidSignature => JwtError::InvalidSignature,
                ErrorKind::InvalidAlgorithm => JwtError::WrongAlgorithm(e.to_string()),
                _ => JwtError::Malformed,
            })?;

        let claims = token_data.claims;
        if now >= claims.expires_at() {
            return Err(JwtError::Expired);
        }
        claims.check_binding(self)?;

        Ok(claims)
    }

    /// Validate and decode an access token.
    pub fn validate_access_token(&self, token: &str, now: u64) -> Result<AccessClaims, JwtError> {
        self.decode(token, now)
    }

    /// Validate and decode a refresh token.
    pub fn validate_refresh_token(
        &self,
        token: &str,
        now: u64,
    ) -> Result<RefreshClaims, JwtError> {
        self.decode(token, now)
    }
}

/// Reject any token whose header declares a non-HMAC algorithm, before the
/// signature is looked at. Covers `none` and names the JWT library would
/// otherwise report as a parse error.
fn ensure_hmac_header(token: &str) -> Result<(), JwtError> {
    #[derive(Deserialize)]
    struct RawHeader {
        alg: String,
    }

    let (encoded, _) = token.split_once('.').ok_or(JwtError::Malformed)?;
    let bytes = URL_SAFE_NO_PAD
        .decode(encoded)
        .map_err(|_| JwtError::Malformed)?;
    let header: RawHeader = serde_json::from_slice(&bytes).map_err(|_| JwtError::Malformed)?;

    match header.alg.as_str() {
        "HS256" | "HS384" | "HS512" => Ok(()),
        other => Err(JwtError::WrongAlgorithm(other.to_string())),
    }
}

/// Errors that can occur during JWT operations.
#[derive(Debug, thiserror::Error)]
pub enum JwtError {
    #[error("malformed token")]
    Malformed,
    #[error("invalid token signature")]
    InvalidSignature,
    #[error("unsupported signing algorithm: {0}")]
    WrongAlgorithm(String),
    #[error("token expired")]
    Expired,
    #[error("token issuer mismatch")]
    IssuerMismatch,
    #[error("token audience mismatch")]
    AudienceMismatch,
    #[error("failed to sign token: {0}")]
    Signing(#[source] jsonwebtoken::errors::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &[u8] = b"test-secret-key-for-testing-0123456789";
    const T: u64 = 1_700_000_000;

    fn config() -> JwtConfig {
        JwtConfig::new(SECRET, "filmstrip", "filmstrip-web")
    }

    fn admin() -> Identity {
        Identity::new(1, "Admin", "User")
    }

    /// Replace the header segment of a token, keeping payload and signature.
    fn with_header(token: &str, header_json: &str) -> String {
        let (_, rest) = token.split_once('.').unwrap();
        format!("{}.{}", URL_SAFE_NO_PAD.encode(header_json), rest)
    }

    #[test]
    fn test_generate_and_validate_access_token() {
        let config = config();

        let token = config.issue_access_token(&admin(), T).unwrap();

        let claims = config.validate_access_token(&token, T).unwrap();
        assert_eq!(claims.iat, T);
        assert_eq!(claims.exp, T + ACCESS_TOKEN_DURATION.as_secs());
        assert_eq!(claims.sub, "1");
        assert_eq!(claims.user_id(), Some(1));
        assert_eq!(claims.name, "Admin User");
        assert_eq!(claims.iss, "filmstrip");
        assert_eq!(claims.aud, "filmstrip-web");
        assert_eq!(claims.token_type, TokenType::Access);
    }

    #[test]
    fn test_generate_and_validate_refresh_token() {
        let config = config();

        let token = config.issue_refresh_token(&admin(), T).unwrap();

        let claims = config.validate_refresh_token(&token, T).unwrap();
        assert_eq!(
            claims,
            RefreshClaims {
                sub: "1".to_string(),
                iat: T,
                exp: T + 7 * 24 * 60 * 60,
            }
        );
    }

    #[test]
    fn test_issue_dispatches_on_kind() {
        let config = config();

        let access = config.issue(TokenType::Access, &admin(), T).unwrap();
        let refresh = config.issue(TokenType::Refresh, &admin(), T).unwrap();

        assert!(config.validate_access_token(&access, T).is_ok());
        assert!(config.validate_refresh_token(&refresh, T).is_ok());
    }

    #[test]
    fn test_access_token_expiry_boundary() {
        let config = config();
        let token = config.issue_access_token(&admin(), T).unwrap();

        let claims = config
            .validate_access_token(&token, T + 14 * 60 + 59)
            .unwrap();
        assert_eq!(claims.sub, "1");

        let err = config
            .validate_access_token(&token, T + 15 * 60 + 1)
            .unwrap_err();
        assert!(matches!(err, JwtError::Expired));
    }

    #[test]
    fn test_refresh_token_expiry_boundary() {
        let config = config().with_ttls(ACCESS_TOKEN_DURATION, Duration::from_secs(168 * 3600));
        let token = config.issue_refresh_token(&admin(), T).unwrap();

        assert!(
            config
                .validate_refresh_token(&token, T + 167 * 3600 + 59 * 60)
                .is_ok()
        );

        let err = config
            .validate_refresh_token(&token, T + 168 * 3600 + 60)
            .unwrap_err();
        assert!(matches!(err, JwtError::Expired));
    }

    #[test]
    fn test_huge_ttl_saturates_expiry() {
        let huge = Duration::from_secs(u64::MAX);
        let config = config().with_ttls(huge, huge);

        let access = config.issue_access_token(&admin(), T).unwrap();
        let refresh = config.issue_refresh_token(&admin(), T).unwrap();

        assert_eq!(config.validate_access_token(&access, T).unwrap().exp, u64::MAX);
        assert_eq!(config.validate_refresh_token(&refresh, T).unwrap().exp, u64::MAX);
    }

    #[test]
    fn test_expired_reported_before_issuer_mismatch() {
        let issuing = config();
        let other_issuer = JwtConfig::new(SECRET, "someone-else", "filmstrip-web");
        let token = issuing.issue_access_token(&admin(), T).unwrap();

        let err = other_issuer.validate_access_token(&token, T).unwrap_err();
        assert!(matches!(err, JwtError::IssuerMismatch));

        let err = other_issuer
            .validate_access_token(&token, T + 3600)
            .unwrap_err();
        assert!(matches!(err, JwtError::Expired));
    }

    #[test]
    fn test_audience_mismatch() {
        let token = config().issue_access_token(&admin(), T).unwrap();
        let other_audience = JwtConfig::new(SECRET, "filmstrip", "mobile");

        let err = other_audience.validate_access_token(&token, T).unwrap_err();
        assert!(matches!(err, JwtError::AudienceMismatch));
    }

    #[test]
    fn test_wrong_secret() {
        let config1 = JwtConfig::new(b"secret-1", "filmstrip", "filmstrip-web");
        let config2 = JwtConfig::new(b"secret-2", "filmstrip", "filmstrip-web");

        let access = config1.issue_access_token(&admin(), T).unwrap();
        let refresh = config1.issue_refresh_token(&admin(), T).unwrap();

        assert!(matches!(
            config2.validate_access_token(&access, T),
            Err(JwtError::InvalidSignature)
        ));
        assert!(matches!(
            config2.validate_refresh_token(&refresh, T),
            Err(JwtError::InvalidSignature)
        ));
    }

    #[test]
    fn test_non_hmac_algorithm_rejected() {
        let config = config();
        let token = config.issue_access_token(&admin(), T).unwrap();

        for alg in ["RS256", "ES256", "PS512", "EdDSA", "none"] {
            let forged = with_header(&token, &format!(r#"{{"alg":"{}","typ":"JWT"}}"#, alg));
            match config.validate_access_token(&forged, T) {
                Err(JwtError::WrongAlgorithm(found)) => assert_eq!(found, alg),
                other => panic!("expected WrongAlgorithm for {}, got {:?}", alg, other),
            }
        }
    }

    #[test]
    fn test_other_hmac_variants_accepted() {
        let config = config();
        let claims = RefreshClaims {
            sub: "7".to_string(),
            iat: T,
            exp: T + 60,
        };
        let token = jsonwebtoken::encode(
            &Header::new(Algorithm::HS512),
            &claims,
            &EncodingKey::from_secret(SECRET),
        )
        .unwrap();

        assert_eq!(config.validate_refresh_token(&token, T).unwrap(), claims);
    }

    #[test]
    fn test_wrong_token_type_rejected() {
        let config = config();

        let access = config.issue_access_token(&admin(), T).unwrap();
        let refresh = config.issue_refresh_token(&admin(), T).unwrap();

        assert!(matches!(
            config.validate_refresh_token(&access, T),
            Err(JwtError::Malformed)
        ));
        assert!(matches!(
            config.validate_access_token(&refresh, T),
            Err(JwtError::Malformed)
        ));
    }

    #[test]
    fn test_access_claims_with_refresh_marker_rejected() {
        let config = config();
        let claims = AccessClaims {
            sub: "1".to_string(),
            name: "Admin User".to_string(),
            iss: "filmstrip".to_string(),
            aud: "filmstrip-web".to_string(),
            token_type: TokenType::Refresh,
            iat: T,
            exp: T + 60,
        };
        let token = jsonwebtoken::encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(SECRET),
        )
        .unwrap();

        assert!(matches!(
            config.validate_access_token(&token, T),
            Err(JwtError::Malformed)
        ));
    }

    #[test]
    fn test_invalid_token() {
        let config = config();

        for garbage in ["invalid-token", "a.b.c", "", "..."] {
            assert!(matches!(
                config.validate_access_token(garbage, T),
                Err(JwtError::Malformed)
            ));
        }
    }

    #[test]
    fn test_access_tokens_in_same_second_are_identical() {
        let config = config();

        let first = config.issue_access_token(&admin(), T).unwrap();
        let second = config.issue_access_token(&admin(), T).unwrap();
        assert_eq!(first, second);

        let later = config.issue_access_token(&admin(), T + 1).unwrap();
        assert_ne!(first, later);
    }
}
