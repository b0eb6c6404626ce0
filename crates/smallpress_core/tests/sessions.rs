use smallpress_core::db::{open_db, open_db_in_memory};
use smallpress_core::{
    SessionRepository, SqliteSessionRepository, SqliteUserRepository, UserRepository,
    DEFAULT_SESSION_TTL_MINUTES,
};
use rusqlite::Connection;
use std::collections::HashSet;
use std::sync::{Arc, Barrier};
use std::thread;

fn admin_id(conn: &Connection) -> i64 {
    let users = SqliteUserRepository::new(conn);
    users.find_by_username("admin").unwrap().unwrap().id
}

#[test]
fn create_then_get_returns_the_creator_identity() {
    let conn = open_db_in_memory().unwrap();
    let sessions = SqliteSessionRepository::new(&conn);
    let user_id = admin_id(&conn);

    let minted = sessions
        .create_session(user_id, DEFAULT_SESSION_TTL_MINUTES)
        .unwrap();
    assert_eq!(minted.user_id, user_id);
    assert_eq!(minted.token.len(), 64);

    let resolved = sessions.get_session(&minted.token).unwrap().unwrap();
    assert_eq!(resolved.token, minted.token);
    assert_eq!(resolved.user_id, user_id);
    assert_eq!(resolved.username, "admin");
    assert_eq!(resolved.expires_at, minted.expires_at);
}

#[test]
fn unknown_and_empty_tokens_read_as_absent() {
    let conn = open_db_in_memory().unwrap();
    let sessions = SqliteSessionRepository::new(&conn);

    assert_eq!(sessions.get_session("").unwrap(), None);
    assert_eq!(sessions.get_session(&"f".repeat(64)).unwrap(), None);
}

#[test]
fn expired_sessions_are_evicted_on_read() {
    let conn = open_db_in_memory().unwrap();
    let sessions = SqliteSessionRepository::new(&conn);
    let user_id = admin_id(&conn);

    // A negative TTL dates the session in the past without sleeping.
    let minted = sessions.create_session(user_id, -1).unwrap();

    assert_eq!(sessions.get_session(&minted.token).unwrap(), None);

    // The read must have deleted the row, not just hidden it.
    let still_there: i64 = conn
        .query_row(
            "SELECT EXISTS(SELECT 1 FROM sessions WHERE token = ?1);",
            [minted.token.as_str()],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(still_there, 0);
}

#[test]
fn invalidate_deletes_and_tolerates_repeats() {
    let conn = open_db_in_memory().unwrap();
    let sessions = SqliteSessionRepository::new(&conn);
    let user_id = admin_id(&conn);

    let minted = sessions
        .create_session(user_id, DEFAULT_SESSION_TTL_MINUTES)
        .unwrap();
    assert!(sessions.get_session(&minted.token).unwrap().is_some());

    sessions.invalidate_session(&minted.token).unwrap();
    assert_eq!(sessions.get_session(&minted.token).unwrap(), None);

    // Repeats, unknown tokens and empty tokens are all quiet no-ops.
    sessions.invalidate_session(&minted.token).unwrap();
    sessions.invalidate_session("never-existed").unwrap();
    sessions.invalidate_session("").unwrap();
}

#[test]
fn concurrent_creations_mint_distinct_tokens() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("smallpress.db");
    // Initialize once up front so worker threads only contend on inserts.
    drop(open_db(&path).unwrap());

    let worker_count = 8;
    let barrier = Arc::new(Barrier::new(worker_count));
    let handles: Vec<_> = (0..worker_count)
        .map(|_| {
            let path = path.clone();
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                let conn = open_db(&path).unwrap();
                let sessions = SqliteSessionRepository::new(&conn);
                let user_id = admin_id(&conn);
                barrier.wait();
                sessions
                    .create_session(user_id, DEFAULT_SESSION_TTL_MINUTES)
                    .unwrap()
                    .token
            })
        })
        .collect();

    let tokens: HashSet<String> = handles
        .into_iter()
        .map(|handle| handle.join().unwrap())
        .collect();
    assert_eq!(tokens.len(), worker_count);
}
