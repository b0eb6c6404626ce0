//! Connection bootstrap utilities for the embedded store.
//!
//! # Responsibility
//! - Open file or in-memory SQLite connections.
//! - Configure connection pragmas required by core behavior.
//! - Run schema initialization (migrations + admin seed) before returning a
//!   usable connection.
//!
//! # Invariants
//! - Returned connections have `foreign_keys=ON` and WAL journaling.
//! - Returned connections have migrations fully applied and the default
//!   admin present.
//! - First-run initialization is mutually exclusive across processes via
//!   the init marker.

use super::init_lock::InitLock;
use super::migrations::apply_migrations;
use super::{DbResult, DEFAULT_ADMIN_PASSWORD, DEFAULT_ADMIN_USERNAME};
use crate::auth::password::hash_password;
use log::{error, info};
use rusqlite::{params, Connection};
use std::path::Path;
use std::time::{Duration, Instant};

/// Opens a SQLite database file and runs full schema initialization.
///
/// Safe to invoke concurrently from multiple processes on the same path:
/// DDL and admin seeding are serialized by an exclusive marker file next to
/// the database, and both are no-ops once applied.
///
/// # Side effects
/// - Creates the parent data directory when missing.
/// - Emits `db_open` logging events with duration and status.
pub fn open_db(path: impl AsRef<Path>) -> DbResult<Connection> {
    let started_at = Instant::now();
    info!("event=db_open module=db status=start mode=file");

    let path = path.as_ref();
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let mut conn = match Connection::open(path) {
        Ok(conn) => conn,
        Err(err) => {
            error!(
                "event=db_open module=db status=error mode=file duration_ms={} error_code=db_open_failed error={}",
                started_at.elapsed().as_millis(),
                err
            );
            return Err(err.into());
        }
    };

    match bootstrap_file_connection(&mut conn, path) {
        Ok(()) => {
            info!(
                "event=db_open module=db status=ok mode=file duration_ms={}",
                started_at.elapsed().as_millis()
            );
            Ok(conn)
        }
        Err(err) => {
            error!(
                "event=db_open module=db status=error mode=file duration_ms={} error_code=db_bootstrap_failed error={}",
                started_at.elapsed().as_millis(),
                err
            );
            Err(err)
        }
    }
}

/// Opens an in-memory SQLite database and runs full schema initialization.
///
/// In-memory databases are private to their connection, so the
/// cross-process init marker is skipped.
///
/// # Side effects
/// - Emits `db_open` logging events with duration and status.
pub fn open_db_in_memory() -> DbResult<Connection> {
    let started_at = Instant::now();
    info!("event=db_open module=db status=start mode=memory");

    let mut conn = match Connection::open_in_memory() {
        Ok(conn) => conn,
        Err(err) => {
            error!(
                "event=db_open module=db status=error mode=memory duration_ms={} error_code=db_open_failed error={}",
                started_at.elapsed().as_millis(),
                err
            );
            return Err(err.into());
        }
    };

    match bootstrap_connection(&mut conn) {
        Ok(()) => {
            info!(
                "event=db_open module=db status=ok mode=memory duration_ms={}",
                started_at.elapsed().as_millis()
            );
            Ok(conn)
        }
        Err(err) => {
            error!(
                "event=db_open module=db status=error mode=memory duration_ms={} error_code=db_bootstrap_failed error={}",
                started_at.elapsed().as_millis(),
                err
            );
            Err(err)
        }
    }
}

fn bootstrap_file_connection(conn: &mut Connection, path: &Path) -> DbResult<()> {
    configure_pragmas(conn)?;
    // Guard held for the whole migrate+seed window, released by Drop on
    // every exit path.
    let _lock = InitLock::acquire(path)?;
    apply_migrations(conn)?;
    seed_default_admin(conn)?;
    Ok(())
}

fn bootstrap_connection(conn: &mut Connection) -> DbResult<()> {
    configure_pragmas(conn)?;
    apply_migrations(conn)?;
    seed_default_admin(conn)?;
    Ok(())
}

fn configure_pragmas(conn: &Connection) -> DbResult<()> {
    // Busy handling first: peers racing through first open contend on the
    // journal-mode switch itself.
    conn.busy_timeout(Duration::from_secs(5))?;
    conn.execute_batch(
        "PRAGMA journal_mode = WAL;
         PRAGMA foreign_keys = ON;
         PRAGMA synchronous = NORMAL;",
    )?;
    Ok(())
}

/// Seeds the default administrator account exactly once.
///
/// The existence check runs first so repeated opens skip the (deliberately
/// slow) password hash; `INSERT OR IGNORE` keeps the write idempotent even
/// if a peer seeded between check and insert.
fn seed_default_admin(conn: &Connection) -> DbResult<()> {
    let already_seeded: i64 = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM users WHERE username = ?1);",
        [DEFAULT_ADMIN_USERNAME],
        |row| row.get(0),
    )?;
    if already_seeded == 1 {
        return Ok(());
    }

    let password_hash = hash_password(DEFAULT_ADMIN_PASSWORD)?;
    conn.execute(
        "INSERT OR IGNORE INTO users (username, password_hash) VALUES (?1, ?2);",
        params![DEFAULT_ADMIN_USERNAME, password_hash],
    )?;
    info!("event=seed_admin module=db status=ok username={DEFAULT_ADMIN_USERNAME}");
    Ok(())
}
