//! Storage bootstrap, schema initialization and retry plumbing.
//!
//! # Responsibility
//! - Open and configure store handles (embedded SQLite or networked MySQL).
//! - Apply schema migrations and seed the default admin exactly once.
//! - Provide the retry wrapper shared by every repository operation.
//!
//! # Invariants
//! - Embedded migration version is tracked via `PRAGMA user_version`.
//! - Core code must not read/write application data before initialization
//!   succeeds.
//! - Schema initialization is safe under concurrent process startup.

use crate::auth::password::PasswordError;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::time::{SystemTime, UNIX_EPOCH};

mod init_lock;
pub mod migrations;
pub mod mysql;
mod open;
pub mod retry;

pub use open::{open_db, open_db_in_memory};

/// Default administrator credentials seeded on first initialization.
pub const DEFAULT_ADMIN_USERNAME: &str = "admin";
pub const DEFAULT_ADMIN_PASSWORD: &str = "admin";

pub type DbResult<T> = Result<T, DbError>;

#[derive(Debug)]
pub enum DbError {
    Sqlite(rusqlite::Error),
    Mysql(::mysql::Error),
    UnsupportedSchemaVersion {
        db_version: u32,
        latest_supported: u32,
    },
    /// Filesystem failure around the init marker or the data directory.
    Io(std::io::Error),
    /// Seeding the default admin could not hash its password.
    Credential(PasswordError),
}

impl Display for DbError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sqlite(err) => write!(f, "{err}"),
            Self::Mysql(err) => write!(f, "{err}"),
            Self::UnsupportedSchemaVersion {
                db_version,
                latest_supported,
            } => write!(
                f,
                "database schema version {db_version} is newer than supported {latest_supported}"
            ),
            Self::Io(err) => write!(f, "store bootstrap i/o failure: {err}"),
            Self::Credential(err) => write!(f, "default admin seeding failed: {err}"),
        }
    }
}

impl Error for DbError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Sqlite(err) => Some(err),
            Self::Mysql(err) => Some(err),
            Self::UnsupportedSchemaVersion { .. } => None,
            Self::Io(err) => Some(err),
            Self::Credential(err) => Some(err),
        }
    }
}

impl From<rusqlite::Error> for DbError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Sqlite(value)
    }
}

impl From<::mysql::Error> for DbError {
    fn from(value: ::mysql::Error) -> Self {
        Self::Mysql(value)
    }
}

impl From<std::io::Error> for DbError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<PasswordError> for DbError {
    fn from(value: PasswordError) -> Self {
        Self::Credential(value)
    }
}

/// A fully initialized store handle, selected by configuration.
///
/// Constructed once at process start and handed to repositories at
/// composition time; the core keeps no ambient global handle.
pub enum Store {
    Embedded(rusqlite::Connection),
    Network(::mysql::Pool),
}

impl Store {
    /// Opens and initializes the store described by `config`.
    pub fn open(config: &crate::config::StoreConfig) -> DbResult<Self> {
        match config {
            crate::config::StoreConfig::Embedded { path } => Ok(Self::Embedded(open_db(path)?)),
            crate::config::StoreConfig::Network(network) => {
                Ok(Self::Network(mysql::connect(network)?))
            }
        }
    }
}

/// Current wall-clock time in Unix epoch milliseconds.
///
/// All persisted timestamps (`created_at`, `updated_at`, `expires_at`) are
/// computed here rather than delegated to store-side time functions, so both
/// store variants agree on the clock.
pub fn now_epoch_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_millis() as i64)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::now_epoch_ms;

    #[test]
    fn clock_is_monotonic_enough_for_timestamps() {
        let first = now_epoch_ms();
        let second = now_epoch_ms();
        assert!(first > 1_600_000_000_000, "clock reads before 2020: {first}");
        assert!(second >= first);
    }
}
