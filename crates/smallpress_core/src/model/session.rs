//! Session domain model.
//!
//! # Responsibility
//! - Define the bearer-credential records handed to the caller layer.
//!
//! # Invariants
//! - `token` is an opaque high-entropy hex string and the row's identity.
//! - A session must never be observable past its `expires_at`.

use serde::{Deserialize, Serialize};

/// A freshly minted session, returned by `create_session`.
///
/// The caller sets `token` as its credential (for example a cookie) with an
/// expiry matching `expires_at`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    /// Opaque bearer token, 256 bits hex-encoded.
    pub token: String,
    /// Owning account.
    pub user_id: i64,
    /// Absolute expiry in epoch milliseconds.
    pub expires_at: i64,
}

/// A resolved session joined with its account identity.
///
/// Returned by `get_session` for live tokens only; expired rows are evicted
/// on read and reported as absent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthSession {
    pub token: String,
    pub user_id: i64,
    pub username: String,
    pub expires_at: i64,
}

impl AuthSession {
    /// Whether this session has passed its expiry at `now_ms`.
    pub fn is_expired(&self, now_ms: i64) -> bool {
        self.expires_at < now_ms
    }
}

#[cfg(test)]
mod tests {
    use super::AuthSession;

    fn session(expires_at: i64) -> AuthSession {
        AuthSession {
            token: "ab".repeat(32),
            user_id: 1,
            username: "admin".to_string(),
            expires_at,
        }
    }

    #[test]
    fn expiry_is_strictly_past_the_deadline() {
        let s = session(1_000);
        assert!(!s.is_expired(999));
        assert!(!s.is_expired(1_000));
        assert!(s.is_expired(1_001));
    }
}
