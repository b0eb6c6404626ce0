//! Authentication use-case service.
//!
//! # Responsibility
//! - Turn credentials into sessions and sessions back into identities.
//! - Delegate persistence to the account/session repositories.
//!
//! # Invariants
//! - Unknown usernames and wrong passwords are indistinguishable to the
//!   caller: both read as "no sign-in".
//! - Service APIs never bypass repository eviction/validation contracts.

use crate::auth::password::verify_password;
use crate::model::session::AuthSession;
use crate::repo::session_repo::{SessionRepository, DEFAULT_SESSION_TTL_MINUTES};
use crate::repo::user_repo::UserRepository;
use crate::repo::{RepoError, RepoResult};
use log::info;

/// A successful sign-in, carrying everything the caller layer needs to set
/// its credential (cookie value and expiry) and greet the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignIn {
    pub user_id: i64,
    pub username: String,
    pub token: String,
    pub expires_at: i64,
}

/// Use-case service wrapper for authentication flows.
pub struct AuthService<U: UserRepository, S: SessionRepository> {
    users: U,
    sessions: S,
}

impl<U: UserRepository, S: SessionRepository> AuthService<U, S> {
    /// Creates a service using the provided repository implementations.
    pub fn new(users: U, sessions: S) -> Self {
        Self { users, sessions }
    }

    /// Authenticates credentials and mints a session on success.
    ///
    /// # Contract
    /// - Returns `Ok(None)` for unknown usernames and wrong passwords.
    /// - A stored hash that cannot be parsed is corrupt persisted state and
    ///   surfaces as an error, not a failed login.
    pub fn sign_in(&self, username: &str, password: &str) -> RepoResult<Option<SignIn>> {
        let Some(user) = self.users.find_by_username(username)? else {
            return Ok(None);
        };

        let verified = verify_password(password, &user.password_hash).map_err(|err| {
            RepoError::InvalidData(format!("user {} has an unusable hash: {err}", user.id))
        })?;
        if !verified {
            return Ok(None);
        }

        let session = self
            .sessions
            .create_session(user.id, DEFAULT_SESSION_TTL_MINUTES)?;
        info!("event=sign_in module=service status=ok user_id={}", user.id);
        Ok(Some(SignIn {
            user_id: user.id,
            username: user.username,
            token: session.token,
            expires_at: session.expires_at,
        }))
    }

    /// Resolves the session behind a bearer token, if still live.
    pub fn current_session(&self, token: &str) -> RepoResult<Option<AuthSession>> {
        self.sessions.get_session(token)
    }

    /// Ends a session. Absent or empty tokens are a no-op.
    pub fn sign_out(&self, token: &str) -> RepoResult<()> {
        self.sessions.invalidate_session(token)
    }
}
