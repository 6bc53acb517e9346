//! Password hashing and verification using argon2id.

use argon2::Argon2;
use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier as _, SaltString};

/// Well-formed argon2id hash with default parameters that no password
/// matches. Verified against on login misses so unknown emails cost the same
/// as wrong passwords.
pub const UNKNOWN_USER_HASH: &str =
    "$argon2id$v=19$m=19456,t=2,p=1$c29tZXNhbHRzb21lc2FsdA$AAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAA";

#[derive(Debug, thiserror::Error)]
#[error("password hashing failed: {0}")]
pub struct PasswordError(argon2::password_hash::Error);

/// Checks a plaintext password against a stored hash.
pub trait PasswordVerifier: Send + Sync {
    /// `Ok(false)` on mismatch; `Err` only when the stored hash is unusable.
    fn verify(&self, stored_hash: &str, plaintext: &str) -> Result<bool, PasswordError>;

    fn hash(&self, plaintext: &str) -> Result<String, PasswordError>;
}

/// Argon2id with default parameters and a random salt per hash.
#[derive(Debug, Clone, Copy, Default)]
pub struct Argon2Passwords;

impl PasswordVerifier for Argon2Passwords {
    fn verify(&self, stored_hash: &str, plaintext: &str) -> Result<bool, PasswordError> {
        let parsed_hash = PasswordHash::new(stored_hash).map_err(PasswordError)?;
        Ok(Argon2::default()
            .verify_password(plaintext.as_bytes(), &parsed_hash)
            .is_ok())
    }

    fn hash(&self, plaintext: &str) -> Result<String, PasswordError> {
        let salt = SaltString::generate(&mut OsRng);
        let hash = Argon2::default()
            .hash_password(plaintext.as_bytes(), &salt)
            .map_err(PasswordError)?;
        Ok(hash.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_and_verify() {
        let passwords = Argon2Passwords;
        let hash = passwords.hash("secret").unwrap();

        assert!(passwords.verify(&hash, "secret").unwrap());
        assert!(!passwords.verify(&hash, "wrongpassword").unwrap());
    }

    #[test]
    fn same_password_different_salts() {
        let passwords = Argon2Passwords;
        assert_ne!(passwords.hash("password").unwrap(), passwords.hash("password").unwrap());
    }

    #[test]
    fn unusable_stored_hash_is_an_error() {
        assert!(Argon2Passwords.verify("not-a-phc-string", "secret").is_err());
    }

    #[test]
    fn unknown_user_hash_is_verified_not_rejected() {
        assert!(PasswordHash::new(UNKNOWN_USER_HASH).is_ok());
        assert!(!Argon2Passwords.verify(UNKNOWN_USER_HASH, "secret").unwrap());
        assert!(!Argon2Passwords.verify(UNKNOWN_USER_HASH, "").unwrap());
    }
}
