//! Connection bootstrap utilities for the networked store.
//!
//! # Responsibility
//! - Build a MySQL connection pool from typed configuration.
//! - Run schema initialization (DDL + admin seed) under the server-side
//!   advisory lock.
//!
//! # Invariants
//! - Returned pools have the schema fully initialized and the default admin
//!   present.
//! - Initialization is mutually exclusive across processes via `GET_LOCK`;
//!   the server releases the lock automatically if the holder dies.

use super::{DbResult, DEFAULT_ADMIN_PASSWORD, DEFAULT_ADMIN_USERNAME};
use crate::auth::password::hash_password;
use crate::config::{NetworkConfig, TlsMode};
use log::{error, info, warn};
use mysql::prelude::Queryable;
use mysql::{OptsBuilder, Pool, PoolConstraints, PoolOpts, PooledConn, SslOpts};
use std::time::Instant;

const INIT_LOCK_NAME: &str = "smallpress.schema_init";
/// Per-attempt server-side wait; acquisition loops until granted.
const INIT_LOCK_WAIT_SECS: i32 = 5;

const CREATE_USERS_SQL: &str = "CREATE TABLE IF NOT EXISTS users (
    id BIGINT NOT NULL AUTO_INCREMENT PRIMARY KEY,
    username VARCHAR(191) NOT NULL UNIQUE,
    password_hash VARCHAR(255) NOT NULL
)";

const CREATE_SESSIONS_SQL: &str = "CREATE TABLE IF NOT EXISTS sessions (
    token VARCHAR(128) NOT NULL PRIMARY KEY,
    user_id BIGINT NOT NULL,
    expires_at BIGINT NOT NULL,
    CONSTRAINT fk_sessions_user FOREIGN KEY (user_id)
        REFERENCES users (id) ON DELETE CASCADE
)";

const CREATE_POSTS_SQL: &str = "CREATE TABLE IF NOT EXISTS posts (
    id BIGINT NOT NULL AUTO_INCREMENT PRIMARY KEY,
    title TEXT NOT NULL,
    slug VARCHAR(191) NOT NULL UNIQUE,
    image_path VARCHAR(1024) NULL,
    content MEDIUMTEXT NOT NULL,
    created_at BIGINT NOT NULL,
    updated_at BIGINT NOT NULL
)";

/// Connects a pool to the configured server and runs schema initialization.
///
/// # Side effects
/// - Emits `db_open` logging events with duration and status.
pub fn connect(config: &NetworkConfig) -> DbResult<Pool> {
    let started_at = Instant::now();
    info!(
        "event=db_open module=db status=start mode=network host={} database={}",
        config.host, config.database
    );

    let opts = OptsBuilder::new()
        .ip_or_hostname(Some(config.host.clone()))
        .tcp_port(config.port)
        .user(Some(config.user.clone()))
        .pass(Some(config.password.clone()))
        .db_name(Some(config.database.clone()))
        .ssl_opts(ssl_opts(config))
        .pool_opts(PoolOpts::new().with_constraints(
            PoolConstraints::new(1, config.pool_size as usize)
                .expect("pool_size must be at least 1"),
        ));

    let pool = match Pool::new(opts) {
        Ok(pool) => pool,
        Err(err) => {
            error!(
                "event=db_open module=db status=error mode=network duration_ms={} error_code=db_open_failed error={}",
                started_at.elapsed().as_millis(),
                err
            );
            return Err(err.into());
        }
    };

    match ensure_initialized(&pool) {
        Ok(()) => {
            info!(
                "event=db_open module=db status=ok mode=network duration_ms={}",
                started_at.elapsed().as_millis()
            );
            Ok(pool)
        }
        Err(err) => {
            error!(
                "event=db_open module=db status=error mode=network duration_ms={} error_code=db_bootstrap_failed error={}",
                started_at.elapsed().as_millis(),
                err
            );
            Err(err)
        }
    }
}

fn ssl_opts(config: &NetworkConfig) -> Option<SslOpts> {
    match config.tls {
        TlsMode::Disabled => None,
        TlsMode::Required => Some(
            SslOpts::default()
                .with_danger_accept_invalid_certs(true)
                .with_danger_skip_domain_validation(true),
        ),
        TlsMode::VerifyCa => {
            let mut opts = SslOpts::default();
            if let Some(ca) = &config.ca_cert_path {
                opts = opts.with_root_cert_path(Some(ca.clone()));
            }
            Some(opts)
        }
    }
}

/// Idempotent schema initialization, serialized by the advisory lock.
fn ensure_initialized(pool: &Pool) -> DbResult<()> {
    let mut conn = pool.get_conn()?;
    acquire_init_lock(&mut conn)?;
    let outcome = initialize_schema(&mut conn);
    let released = release_init_lock(&mut conn);
    outcome?;
    released
}

fn acquire_init_lock(conn: &mut PooledConn) -> DbResult<()> {
    loop {
        let granted: Option<Option<i64>> =
            conn.exec_first("SELECT GET_LOCK(?, ?)", (INIT_LOCK_NAME, INIT_LOCK_WAIT_SECS))?;
        match granted.flatten() {
            Some(1) => return Ok(()),
            // 0 means the per-attempt wait elapsed; keep waiting. The
            // server parks this connection, so there is no spin to pace.
            Some(_) | None => {
                warn!("event=init_lock module=db status=waiting lock={INIT_LOCK_NAME}");
            }
        }
    }
}

fn release_init_lock(conn: &mut PooledConn) -> DbResult<()> {
    let _released: Option<Option<i64>> =
        conn.exec_first("SELECT RELEASE_LOCK(?)", (INIT_LOCK_NAME,))?;
    Ok(())
}

fn initialize_schema(conn: &mut PooledConn) -> DbResult<()> {
    conn.query_drop(CREATE_USERS_SQL)?;
    conn.query_drop(CREATE_SESSIONS_SQL)?;
    conn.query_drop(CREATE_POSTS_SQL)?;
    seed_default_admin(conn)?;
    Ok(())
}

/// Seeds the default administrator account exactly once.
///
/// Mirrors the embedded variant: existence check first to skip the slow
/// hash, `INSERT IGNORE` so a racing peer never turns seeding into an
/// error.
fn seed_default_admin(conn: &mut PooledConn) -> DbResult<()> {
    let already_seeded: Option<i64> = conn.exec_first(
        "SELECT EXISTS(SELECT 1 FROM users WHERE username = ?)",
        (DEFAULT_ADMIN_USERNAME,),
    )?;
    if already_seeded == Some(1) {
        return Ok(());
    }

    let password_hash = hash_password(DEFAULT_ADMIN_PASSWORD)?;
    conn.exec_drop(
        "INSERT IGNORE INTO users (username, password_hash) VALUES (?, ?)",
        (DEFAULT_ADMIN_USERNAME, password_hash),
    )?;
    info!("event=seed_admin module=db status=ok username={DEFAULT_ADMIN_USERNAME}");
    Ok(())
}
