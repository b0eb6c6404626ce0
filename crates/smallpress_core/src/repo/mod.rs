//! Repository layer abstractions and persistence implementations.
//!
//! # Responsibility
//! - Define use-case oriented data access contracts for accounts, sessions
//!   and posts.
//! - Isolate SQL details (both store dialects) from service orchestration.
//!
//! # Invariants
//! - Repository writes must validate drafts before SQL mutations.
//! - Every statement runs through the retry wrapper with the driver's
//!   transience predicate.
//! - Unique-constraint violations surface as `Conflict`, never retried.

use crate::db::DbError;
use crate::model::post::PostValidationError;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod post_repo;
pub mod session_repo;
pub mod user_repo;

pub type RepoResult<T> = Result<T, RepoError>;

/// Generic repository error for persistence and query operations.
#[derive(Debug)]
pub enum RepoError {
    Validation(PostValidationError),
    Db(DbError),
    /// Update target does not exist.
    NotFound(i64),
    /// A unique constraint (slug, username, token) rejected the write.
    Conflict(String),
    /// Persisted state violates model invariants.
    InvalidData(String),
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::Db(err) => write!(f, "{err}"),
            Self::NotFound(id) => write!(f, "row not found: {id}"),
            Self::Conflict(message) => write!(f, "conflicting write: {message}"),
            Self::InvalidData(message) => write!(f, "invalid persisted data: {message}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Db(err) => Some(err),
            Self::NotFound(_) => None,
            Self::Conflict(_) => None,
            Self::InvalidData(_) => None,
        }
    }
}

impl From<PostValidationError> for RepoError {
    fn from(value: PostValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        if let rusqlite::Error::SqliteFailure(failure, message) = &value {
            if failure.code == rusqlite::ErrorCode::ConstraintViolation {
                return Self::Conflict(
                    message
                        .clone()
                        .unwrap_or_else(|| "unique constraint violated".to_string()),
                );
            }
        }
        Self::Db(DbError::Sqlite(value))
    }
}

impl From<mysql::Error> for RepoError {
    fn from(value: mysql::Error) -> Self {
        // ER_DUP_ENTRY: the unique-key twin of SQLite's constraint failure.
        if let mysql::Error::MySqlError(server) = &value {
            if server.code == 1062 {
                return Self::Conflict(server.message.clone());
            }
        }
        Self::Db(DbError::Mysql(value))
    }
}
