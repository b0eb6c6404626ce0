//! Account repository contracts and store implementations.
//!
//! # Responsibility
//! - Resolve accounts by login name for the authentication flow.
//!
//! # Invariants
//! - Account rows are read-only here; creation happens at schema
//!   initialization or through out-of-scope provisioning.

use crate::db::retry::{self, mysql_is_transient, sqlite_is_transient, RetryPolicy};
use crate::model::user::User;
use crate::repo::RepoResult;
use mysql::prelude::Queryable;
use mysql::Pool;
use rusqlite::Connection;

/// Repository interface for account lookups.
pub trait UserRepository {
    /// Finds an account by its unique login name.
    fn find_by_username(&self, username: &str) -> RepoResult<Option<User>>;
}

/// SQLite-backed account repository.
pub struct SqliteUserRepository<'conn> {
    conn: &'conn Connection,
    retry: RetryPolicy,
}

impl<'conn> SqliteUserRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self::with_retry_policy(conn, RetryPolicy::default())
    }

    pub fn with_retry_policy(conn: &'conn Connection, retry: RetryPolicy) -> Self {
        Self { conn, retry }
    }
}

impl UserRepository for SqliteUserRepository<'_> {
    fn find_by_username(&self, username: &str) -> RepoResult<Option<User>> {
        let user = retry::run(&self.retry, sqlite_is_transient, || {
            let mut stmt = self.conn.prepare(
                "SELECT id, username, password_hash FROM users WHERE username = ?1;",
            )?;
            let mut rows = stmt.query([username])?;
            match rows.next()? {
                Some(row) => Ok(Some(User {
                    id: row.get("id")?,
                    username: row.get("username")?,
                    password_hash: row.get("password_hash")?,
                })),
                None => Ok(None),
            }
        })?;
        Ok(user)
    }
}

/// MySQL-backed account repository.
pub struct MysqlUserRepository<'pool> {
    pool: &'pool Pool,
    retry: RetryPolicy,
}

impl<'pool> MysqlUserRepository<'pool> {
    pub fn new(pool: &'pool Pool) -> Self {
        Self::with_retry_policy(pool, RetryPolicy::default())
    }

    pub fn with_retry_policy(pool: &'pool Pool, retry: RetryPolicy) -> Self {
        Self { pool, retry }
    }
}

impl UserRepository for MysqlUserRepository<'_> {
    fn find_by_username(&self, username: &str) -> RepoResult<Option<User>> {
        let row = retry::run(&self.retry, mysql_is_transient, || {
            let mut conn = self.pool.get_conn()?;
            conn.exec_first::<(i64, String, String), _, _>(
                "SELECT id, username, password_hash FROM users WHERE username = ?",
                (username,),
            )
        })?;
        Ok(row.map(|(id, username, password_hash)| User {
            id,
            username,
            password_hash,
        }))
    }
}
