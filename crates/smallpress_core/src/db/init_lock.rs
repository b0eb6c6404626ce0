//! Cross-process mutual exclusion for schema initialization.
//!
//! # Responsibility
//! - Serialize first-run DDL and admin seeding across OS processes that
//!   open the same embedded database file.
//!
//! # Invariants
//! - The marker is acquired via atomic `create_new`; there is never more
//!   than one holder.
//! - The marker is released on every exit path, including failure, via the
//!   guard's `Drop`.
//! - Waiters sleep between attempts; they never busy-spin.

use log::warn;
use rand::Rng;
use std::fs::{self, OpenOptions};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;

const POLL_INTERVAL_MS: u64 = 50;
const POLL_JITTER_MS: u64 = 25;

/// A marker left behind by a holder that crashed before cleanup is taken
/// over after this age, so late starters are not stalled forever.
const STALE_AFTER: Duration = Duration::from_secs(30);

/// RAII guard over the on-disk init marker.
///
/// Holding the guard means this process owns schema initialization for the
/// database file the marker belongs to.
pub(crate) struct InitLock {
    marker: PathBuf,
}

impl InitLock {
    /// Blocks until the marker for `db_path` is acquired.
    ///
    /// Waiters poll with bounded sleep and a small jitter so concurrently
    /// starting processes do not retry in lockstep.
    pub(crate) fn acquire(db_path: &Path) -> std::io::Result<Self> {
        let marker = marker_path(db_path);
        loop {
            match OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&marker)
            {
                Ok(_) => return Ok(Self { marker }),
                Err(err) if err.kind() == ErrorKind::AlreadyExists => {
                    if marker_is_stale(&marker) {
                        warn!(
                            "event=init_lock module=db status=stale_takeover marker={}",
                            marker.display()
                        );
                        remove_marker(&marker)?;
                        continue;
                    }
                    let jitter = rand::rng().random_range(0..=POLL_JITTER_MS);
                    thread::sleep(Duration::from_millis(POLL_INTERVAL_MS + jitter));
                }
                Err(err) => return Err(err),
            }
        }
    }
}

impl Drop for InitLock {
    fn drop(&mut self) {
        // Release must succeed silently even when the marker was already
        // taken over by a peer that judged this holder stale.
        let _ = fs::remove_file(&self.marker);
    }
}

fn marker_path(db_path: &Path) -> PathBuf {
    let mut name = db_path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_else(|| "store".into());
    name.push(".init-lock");
    db_path.with_file_name(name)
}

fn marker_is_stale(marker: &Path) -> bool {
    let Ok(metadata) = fs::metadata(marker) else {
        return false;
    };
    let Ok(modified) = metadata.modified() else {
        return false;
    };
    modified
        .elapsed()
        .map(|age| age >= STALE_AFTER)
        .unwrap_or(false)
}

fn remove_marker(marker: &Path) -> std::io::Result<()> {
    match fs::remove_file(marker) {
        Ok(()) => Ok(()),
        // A peer waiter removed it first; the create_new race decides next.
        Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
        Err(err) => Err(err),
    }
}

#[cfg(test)]
mod tests {
    use super::{marker_path, InitLock};
    use std::path::Path;
    use std::sync::{Arc, Barrier};
    use std::thread;

    #[test]
    fn marker_path_is_a_sibling_of_the_database() {
        let marker = marker_path(Path::new("/data/blog/press.db"));
        assert_eq!(marker, Path::new("/data/blog/press.db.init-lock"));
    }

    #[test]
    fn acquire_creates_and_drop_removes_the_marker() {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("press.db");
        let marker = marker_path(&db_path);

        let lock = InitLock::acquire(&db_path).unwrap();
        assert!(marker.exists());
        drop(lock);
        assert!(!marker.exists());
    }

    #[test]
    fn contending_acquirers_serialize() {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("press.db");
        let barrier = Arc::new(Barrier::new(2));

        let handles: Vec<_> = (0..2)
            .map(|_| {
                let db_path = db_path.clone();
                let barrier = Arc::clone(&barrier);
                thread::spawn(move || {
                    barrier.wait();
                    let lock = InitLock::acquire(&db_path).unwrap();
                    drop(lock);
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }
        assert!(!marker_path(&db_path).exists());
    }
}
