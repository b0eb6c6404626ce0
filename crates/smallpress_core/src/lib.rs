//! Core persistence and session layer for smallpress.
//! This crate is the single source of truth for business invariants.

pub mod auth;
pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;

pub use auth::password::{hash_password, verify_password, PasswordError, PasswordResult};
pub use auth::token::generate_token;
pub use config::{ConfigError, ConfigResult, NetworkConfig, StoreConfig, TlsMode};
pub use db::retry::{mysql_is_transient, sqlite_is_transient, RetryPolicy};
pub use db::{open_db, open_db_in_memory, DbError, DbResult, Store};
pub use logging::{default_log_level, init_logging, logging_status};
pub use model::post::{Post, PostDraft, PostValidationError};
pub use model::session::{AuthSession, Session};
pub use model::user::User;
pub use repo::post_repo::{MysqlPostRepository, PostRepository, SqlitePostRepository};
pub use repo::session_repo::{
    MysqlSessionRepository, SessionRepository, SqliteSessionRepository,
    DEFAULT_SESSION_TTL_MINUTES,
};
pub use repo::user_repo::{MysqlUserRepository, SqliteUserRepository, UserRepository};
pub use repo::{RepoError, RepoResult};
pub use service::auth_service::{AuthService, SignIn};
pub use service::post_service::{PostService, PublishRequest, ReviseRequest};

/// Minimal health-check API for early integration.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::{core_version, ping};

    #[test]
    fn ping_returns_pong() {
        assert_eq!(ping(), "pong");
    }

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
