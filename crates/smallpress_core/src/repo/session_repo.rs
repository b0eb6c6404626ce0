//! Session repository contracts and store implementations.
//!
//! # Responsibility
//! - Mint, resolve and invalidate opaque bearer sessions.
//! - Evict expired rows lazily at read time; there is no background sweep.
//!
//! # Invariants
//! - A session past `expires_at` is never returned to a caller; detecting
//!   one deletes the row before reporting "not found".
//! - Token uniqueness is the table's primary key; collisions surface as
//!   `Conflict` instead of overwriting a live session.

use crate::auth::token::generate_token;
use crate::db::retry::{self, mysql_is_transient, sqlite_is_transient, RetryPolicy};
use crate::db::now_epoch_ms;
use crate::model::session::{AuthSession, Session};
use crate::repo::RepoResult;
use log::info;
use mysql::prelude::Queryable;
use mysql::Pool;
use rusqlite::{params, Connection};

/// Default session lifetime: 12 hours.
pub const DEFAULT_SESSION_TTL_MINUTES: i64 = 12 * 60;

const SESSION_SELECT_SQL: &str = "SELECT sessions.token, sessions.expires_at, \
     users.id AS user_id, users.username \
     FROM sessions JOIN users ON users.id = sessions.user_id \
     WHERE sessions.token = ?";

/// Repository interface for session lifecycle operations.
pub trait SessionRepository {
    /// Mints a session for `user_id` expiring `ttl_minutes` from now.
    ///
    /// Returns the token and absolute expiry so the caller can set its own
    /// credential (for example a cookie) with a matching lifetime.
    fn create_session(&self, user_id: i64, ttl_minutes: i64) -> RepoResult<Session>;

    /// Resolves a live session, joined with its account identity.
    ///
    /// Empty, unknown and expired tokens all read as `None`; expired rows
    /// are deleted on the way out.
    fn get_session(&self, token: &str) -> RepoResult<Option<AuthSession>>;

    /// Deletes the session if present. Absent or empty tokens are a no-op,
    /// so sign-out never fails on an already-dead session.
    fn invalidate_session(&self, token: &str) -> RepoResult<()>;
}

fn expires_at_from_now(ttl_minutes: i64) -> i64 {
    now_epoch_ms() + ttl_minutes * 60 * 1000
}

/// SQLite-backed session repository.
pub struct SqliteSessionRepository<'conn> {
    conn: &'conn Connection,
    retry: RetryPolicy,
}

impl<'conn> SqliteSessionRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self::with_retry_policy(conn, RetryPolicy::default())
    }

    pub fn with_retry_policy(conn: &'conn Connection, retry: RetryPolicy) -> Self {
        Self { conn, retry }
    }
}

impl SessionRepository for SqliteSessionRepository<'_> {
    fn create_session(&self, user_id: i64, ttl_minutes: i64) -> RepoResult<Session> {
        let token = generate_token();
        let expires_at = expires_at_from_now(ttl_minutes);
        retry::run(&self.retry, sqlite_is_transient, || {
            self.conn.execute(
                "INSERT INTO sessions (token, user_id, expires_at) VALUES (?1, ?2, ?3);",
                params![token, user_id, expires_at],
            )
        })?;
        Ok(Session {
            token,
            user_id,
            expires_at,
        })
    }

    fn get_session(&self, token: &str) -> RepoResult<Option<AuthSession>> {
        if token.is_empty() {
            return Ok(None);
        }

        let session = retry::run(&self.retry, sqlite_is_transient, || {
            let mut stmt = self.conn.prepare(SESSION_SELECT_SQL)?;
            let mut rows = stmt.query([token])?;
            match rows.next()? {
                Some(row) => Ok(Some(AuthSession {
                    token: row.get("token")?,
                    user_id: row.get("user_id")?,
                    username: row.get("username")?,
                    expires_at: row.get("expires_at")?,
                })),
                None => Ok(None),
            }
        })?;

        match session {
            Some(session) if session.is_expired(now_epoch_ms()) => {
                retry::run(&self.retry, sqlite_is_transient, || {
                    self.conn
                        .execute("DELETE FROM sessions WHERE token = ?1;", [token])
                })?;
                info!("event=session_evicted module=repo status=ok reason=expired");
                Ok(None)
            }
            other => Ok(other),
        }
    }

    fn invalidate_session(&self, token: &str) -> RepoResult<()> {
        if token.is_empty() {
            return Ok(());
        }
        retry::run(&self.retry, sqlite_is_transient, || {
            self.conn
                .execute("DELETE FROM sessions WHERE token = ?1;", [token])
        })?;
        Ok(())
    }
}

/// MySQL-backed session repository.
pub struct MysqlSessionRepository<'pool> {
    pool: &'pool Pool,
    retry: RetryPolicy,
}

impl<'pool> MysqlSessionRepository<'pool> {
    pub fn new(pool: &'pool Pool) -> Self {
        Self::with_retry_policy(pool, RetryPolicy::default())
    }

    pub fn with_retry_policy(pool: &'pool Pool, retry: RetryPolicy) -> Self {
        Self { pool, retry }
    }
}

impl SessionRepository for MysqlSessionRepository<'_> {
    fn create_session(&self, user_id: i64, ttl_minutes: i64) -> RepoResult<Session> {
        let token = generate_token();
        let expires_at = expires_at_from_now(ttl_minutes);
        retry::run(&self.retry, mysql_is_transient, || {
            let mut conn = self.pool.get_conn()?;
            conn.exec_drop(
                "INSERT INTO sessions (token, user_id, expires_at) VALUES (?, ?, ?)",
                (token.as_str(), user_id, expires_at),
            )
        })?;
        Ok(Session {
            token,
            user_id,
            expires_at,
        })
    }

    fn get_session(&self, token: &str) -> RepoResult<Option<AuthSession>> {
        if token.is_empty() {
            return Ok(None);
        }

        let row = retry::run(&self.retry, mysql_is_transient, || {
            let mut conn = self.pool.get_conn()?;
            conn.exec_first::<(String, i64, i64, String), _, _>(
                "SELECT sessions.token, sessions.expires_at, users.id, users.username \
                 FROM sessions JOIN users ON users.id = sessions.user_id \
                 WHERE sessions.token = ?",
                (token,),
            )
        })?;

        let session = row.map(|(token, expires_at, user_id, username)| AuthSession {
            token,
            user_id,
            username,
            expires_at,
        });

        match session {
            Some(session) if session.is_expired(now_epoch_ms()) => {
                retry::run(&self.retry, mysql_is_transient, || {
                    let mut conn = self.pool.get_conn()?;
                    conn.exec_drop("DELETE FROM sessions WHERE token = ?", (token,))
                })?;
                info!("event=session_evicted module=repo status=ok reason=expired");
                Ok(None)
            }
            other => Ok(other),
        }
    }

    fn invalidate_session(&self, token: &str) -> RepoResult<()> {
        if token.is_empty() {
            return Ok(());
        }
        retry::run(&self.retry, mysql_is_transient, || {
            let mut conn = self.pool.get_conn()?;
            conn.exec_drop("DELETE FROM sessions WHERE token = ?", (token,))
        })?;
        Ok(())
    }
}
