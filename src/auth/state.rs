//! Authentication state traits and macro.

use std::future::Future;
use std::time::Duration;

use super::errors::AuthError;
use super::session::SessionIssuer;
use super::types::Identity;

/// User repository as seen by the authentication core.
pub trait UserLookup: Send + Sync {
    fn lookup_user_by_id(
        &self,
        id: i64,
    ) -> impl Future<Output = Result<Option<Identity>, sqlx::Error>> + Send;

    /// Identity plus the stored password hash.
    fn lookup_user_by_email(
        &self,
        email: &str,
    ) -> impl Future<Output = Result<Option<(Identity, String)>, sqlx::Error>> + Send;
}

/// Trait for state types that provide session issuance and user lookup.
pub trait HasAuthBackend: Send + Sync {
    type Users: UserLookup;

    fn sessions(&self) -> &SessionIssuer;
    fn users(&self) -> &Self::Users;
    fn lookup_timeout(&self) -> Duration;
}

/// Run a repository lookup under a deadline.
pub async fn bounded_lookup<T, F>(timeout: Duration, lookup: F) -> Result<T, AuthError>
where
    F: Future<Output = Result<T, sqlx::Error>>,
{
    match tokio::time::timeout(timeout, lookup).await {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(e)) => Err(AuthError::Lookup(e.to_string())),
        Err(_) => Err(AuthError::Lookup(format!("timed out after {:?}", timeout))),
    }
}

/// Macro to implement `HasAuthBackend` for state structs with the standard fields.
///
/// The struct must have these fields:
/// - `sessions: Arc<SessionIssuer>`
/// - `db: Database`
/// - `lookup_timeout: Duration`
///
/// # Example
/// ```ignore
/// use crate::impl_has_auth_backend;
///
/// #[derive(Clone)]
/// pub struct MyState {
///     pub db: Database,
///     pub sessions: Arc<SessionIssuer>,
///     pub lookup_timeout: Duration,
/// }
///
/// impl_has_auth_backend!(MyState);
/// ```
#[macro_export]
macro_rules! impl_has_auth_backend {
    ($state_type:ty) => {
        impl $crate::auth::HasAuthBackend for $state_type {
            type Users = $crate::db::Database;

            fn sessions(&self) -> &$crate::auth::SessionIssuer {
                &self.sessions
            }
            fn users(&self) -> &$crate::db::Database {
                &self.db
            }
            fn lookup_timeout(&self) -> ::std::time::Duration {
                self.lookup_timeout
            }
        }
    };
}
