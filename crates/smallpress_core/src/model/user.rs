//! Account domain model.
//!
//! # Invariants
//! - `username` is unique across the store.
//! - `password_hash` is a PHC-format string, never a raw password.

/// A stored administrator account.
///
/// Accounts are created once at schema initialization (the seeded default
/// admin) or by an out-of-scope provisioning path, and are immutable
/// afterwards except for password rotation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    /// Surrogate key assigned by the store.
    pub id: i64,
    /// Unique login name.
    pub username: String,
    /// Salted Argon2id hash in PHC string format.
    pub password_hash: String,
}
