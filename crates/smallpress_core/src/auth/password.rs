//! Password hashing and verification.
//!
//! # Responsibility
//! - Produce salted Argon2id hashes in PHC string format.
//! - Verify candidate passwords against stored hashes.
//!
//! # Invariants
//! - Every hash carries its own random salt; equal passwords hash
//!   differently.
//! - Verification failures and malformed stored hashes are distinguishable.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type PasswordResult<T> = Result<T, PasswordError>;

#[derive(Debug)]
pub enum PasswordError {
    /// Hashing a new password failed.
    Hash(String),
    /// The stored hash is not a parseable PHC string.
    MalformedHash(String),
}

impl Display for PasswordError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Hash(message) => write!(f, "password hashing failed: {message}"),
            Self::MalformedHash(message) => {
                write!(f, "stored password hash is malformed: {message}")
            }
        }
    }
}

impl Error for PasswordError {}

/// Hashes a raw password with a fresh random salt.
pub fn hash_password(raw: &str) -> PasswordResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(raw.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|err| PasswordError::Hash(err.to_string()))
}

/// Verifies a candidate password against a stored PHC hash string.
///
/// Returns `Ok(false)` for a wrong password; a hash that cannot be parsed
/// is corrupt persisted state and surfaces as an error instead.
pub fn verify_password(raw: &str, stored_hash: &str) -> PasswordResult<bool> {
    let parsed = PasswordHash::new(stored_hash)
        .map_err(|err| PasswordError::MalformedHash(err.to_string()))?;
    Ok(Argon2::default()
        .verify_password(raw.as_bytes(), &parsed)
        .is_ok())
}

#[cfg(test)]
mod tests {
    use super::{hash_password, verify_password, PasswordError};

    #[test]
    fn hash_then_verify_roundtrip() {
        let hash = hash_password("admin").unwrap();
        assert!(verify_password("admin", &hash).unwrap());
        assert!(!verify_password("not-admin", &hash).unwrap());
    }

    #[test]
    fn equal_passwords_hash_differently() {
        let first = hash_password("hunter2").unwrap();
        let second = hash_password("hunter2").unwrap();
        assert_ne!(first, second);
        assert!(verify_password("hunter2", &first).unwrap());
        assert!(verify_password("hunter2", &second).unwrap());
    }

    #[test]
    fn malformed_stored_hash_is_an_error_not_a_mismatch() {
        let err = verify_password("admin", "5e884898da28047151d0e56f8dc629").unwrap_err();
        assert!(matches!(err, PasswordError::MalformedHash(_)));
    }
}
