//! Stateless JWT sessions.
//!
//! Dual-token system: short-lived access tokens (15 min, sent as a bearer
//! header) and long-lived refresh tokens (7 days, HTTP-only cookie). Every
//! refresh rotates both. Nothing about a session is stored server-side.

mod cookie;
mod errors;
mod extractors;
mod gate;
mod password;
mod refresh;
mod session;
mod state;
mod types;

pub use cookie::{CookieConfig, REFRESH_COOKIE_NAME, SessionCookie, get_cookie};
pub use errors::AuthError;
pub use extractors::{Auth, authenticate_request};
pub use gate::require_auth;
pub use password::{Argon2Passwords, PasswordError, PasswordVerifier, UNKNOWN_USER_HASH};
pub use refresh::{RefreshOutcome, refresh_session, refresh_session_at};
pub use session::{SessionIssuer, TokenPair};
pub use state::{HasAuthBackend, UserLookup, bounded_lookup};
pub use types::{AuthenticatedUser, Identity};
