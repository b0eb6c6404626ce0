//! Post repository contracts and store implementations.
//!
//! # Responsibility
//! - Provide CRUD APIs over published articles.
//! - Allocate unique, human-readable slugs from titles.
//!
//! # Invariants
//! - Write paths must validate drafts before SQL mutations.
//! - Listing is newest-first by `created_at`, with `id` breaking ties so a
//!   fresh insert always lists first.
//! - Slug probing is check-then-insert; a lost race is surfaced by the
//!   table's uniqueness constraint as `Conflict`, never silent duplication.

use crate::db::now_epoch_ms;
use crate::db::retry::{self, mysql_is_transient, sqlite_is_transient, RetryPolicy};
use crate::model::post::{Post, PostDraft};
use crate::repo::{RepoError, RepoResult};
use mysql::prelude::Queryable;
use mysql::Pool;
use once_cell::sync::Lazy;
use regex::Regex;
use rusqlite::{params, Connection, Row};

static NON_ALPHANUMERIC_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new("[^a-z0-9]+").expect("valid slug regex"));

const POST_SELECT_SQL: &str =
    "SELECT id, title, slug, image_path, content, created_at, updated_at FROM posts";

/// Repository interface for post CRUD and slug allocation.
pub trait PostRepository {
    /// Lists all posts, newest first.
    fn list_posts(&self) -> RepoResult<Vec<Post>>;
    /// Gets one post by its unique slug.
    fn get_post_by_slug(&self, slug: &str) -> RepoResult<Option<Post>>;
    /// Gets one post by its surrogate key.
    fn get_post_by_id(&self, id: i64) -> RepoResult<Option<Post>>;
    /// Inserts (draft without `id`) or updates (draft with `id`) a post and
    /// returns the stored row.
    ///
    /// Inserts assign `created_at == updated_at`; updates refresh
    /// `updated_at` only.
    fn save_post(&self, draft: &PostDraft) -> RepoResult<Post>;
    /// Removes the row. Deleting an absent id is a no-op; cleanup of any
    /// stored image belongs to the caller, using a previously read
    /// `image_path`.
    fn delete_post(&self, id: i64) -> RepoResult<()>;
    /// Derives a unique slug from `title`, probing the store and appending
    /// `-2`, `-3`, … on collision.
    fn generate_slug(&self, title: &str) -> RepoResult<String>;
}

/// Collapses a title to its slug base: lowercase, alphanumeric runs kept,
/// everything else folded into single hyphens.
fn slug_base(title: &str) -> String {
    let lowered = title.trim().to_lowercase();
    NON_ALPHANUMERIC_RE
        .replace_all(&lowered, "-")
        .trim_matches('-')
        .to_string()
}

/// Fallback for titles with no alphanumeric content at all.
fn fallback_slug() -> String {
    format!("post-{}", now_epoch_ms())
}

fn checked(post: Post) -> RepoResult<Post> {
    if let Err(err) = post.validate() {
        return Err(RepoError::InvalidData(format!(
            "post {} fails validation: {err}",
            post.id
        )));
    }
    Ok(post)
}

/// SQLite-backed post repository.
pub struct SqlitePostRepository<'conn> {
    conn: &'conn Connection,
    retry: RetryPolicy,
}

impl<'conn> SqlitePostRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self::with_retry_policy(conn, RetryPolicy::default())
    }

    pub fn with_retry_policy(conn: &'conn Connection, retry: RetryPolicy) -> Self {
        Self { conn, retry }
    }

    fn slug_taken(&self, candidate: &str) -> RepoResult<bool> {
        let taken: i64 = retry::run(&self.retry, sqlite_is_transient, || {
            self.conn.query_row(
                "SELECT EXISTS(SELECT 1 FROM posts WHERE slug = ?1);",
                [candidate],
                |row| row.get(0),
            )
        })?;
        Ok(taken == 1)
    }
}

fn parse_post_row(row: &Row<'_>) -> rusqlite::Result<Post> {
    Ok(Post {
        id: row.get("id")?,
        title: row.get("title")?,
        slug: row.get("slug")?,
        image_path: row.get("image_path")?,
        content: row.get("content")?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}

impl PostRepository for SqlitePostRepository<'_> {
    fn list_posts(&self) -> RepoResult<Vec<Post>> {
        let posts = retry::run(&self.retry, sqlite_is_transient, || {
            let mut stmt = self
                .conn
                .prepare(&format!("{POST_SELECT_SQL} ORDER BY created_at DESC, id DESC;"))?;
            let mut rows = stmt.query([])?;
            let mut posts = Vec::new();
            while let Some(row) = rows.next()? {
                posts.push(parse_post_row(row)?);
            }
            Ok(posts)
        })?;
        posts.into_iter().map(checked).collect()
    }

    fn get_post_by_slug(&self, slug: &str) -> RepoResult<Option<Post>> {
        let post = retry::run(&self.retry, sqlite_is_transient, || {
            let mut stmt = self.conn.prepare(&format!("{POST_SELECT_SQL} WHERE slug = ?1;"))?;
            let mut rows = stmt.query([slug])?;
            match rows.next()? {
                Some(row) => Ok(Some(parse_post_row(row)?)),
                None => Ok(None),
            }
        })?;
        post.map(checked).transpose()
    }

    fn get_post_by_id(&self, id: i64) -> RepoResult<Option<Post>> {
        let post = retry::run(&self.retry, sqlite_is_transient, || {
            let mut stmt = self.conn.prepare(&format!("{POST_SELECT_SQL} WHERE id = ?1;"))?;
            let mut rows = stmt.query([id])?;
            match rows.next()? {
                Some(row) => Ok(Some(parse_post_row(row)?)),
                None => Ok(None),
            }
        })?;
        post.map(checked).transpose()
    }

    fn save_post(&self, draft: &PostDraft) -> RepoResult<Post> {
        draft.validate()?;
        let now = now_epoch_ms();

        let id = match draft.id {
            Some(id) => {
                let changed = retry::run(&self.retry, sqlite_is_transient, || {
                    self.conn.execute(
                        "UPDATE posts
                         SET title = ?1, slug = ?2, image_path = ?3, content = ?4,
                             updated_at = ?5
                         WHERE id = ?6;",
                        params![draft.title, draft.slug, draft.image_path, draft.content, now, id],
                    )
                })?;
                if changed == 0 {
                    return Err(RepoError::NotFound(id));
                }
                id
            }
            None => retry::run(&self.retry, sqlite_is_transient, || {
                self.conn.execute(
                    "INSERT INTO posts (title, slug, image_path, content, created_at, updated_at)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6);",
                    params![draft.title, draft.slug, draft.image_path, draft.content, now, now],
                )?;
                Ok(self.conn.last_insert_rowid())
            })?,
        };

        self.get_post_by_id(id)?
            .ok_or_else(|| RepoError::InvalidData(format!("post {id} missing after save")))
    }

    fn delete_post(&self, id: i64) -> RepoResult<()> {
        retry::run(&self.retry, sqlite_is_transient, || {
            self.conn.execute("DELETE FROM posts WHERE id = ?1;", [id])
        })?;
        Ok(())
    }

    fn generate_slug(&self, title: &str) -> RepoResult<String> {
        let base = slug_base(title);
        if base.is_empty() {
            return Ok(fallback_slug());
        }

        let mut candidate = base.clone();
        let mut suffix = 1u32;
        while self.slug_taken(&candidate)? {
            suffix += 1;
            candidate = format!("{base}-{suffix}");
        }
        Ok(candidate)
    }
}

/// MySQL-backed post repository.
pub struct MysqlPostRepository<'pool> {
    pool: &'pool Pool,
    retry: RetryPolicy,
}

impl<'pool> MysqlPostRepository<'pool> {
    pub fn new(pool: &'pool Pool) -> Self {
        Self::with_retry_policy(pool, RetryPolicy::default())
    }

    pub fn with_retry_policy(pool: &'pool Pool, retry: RetryPolicy) -> Self {
        Self { pool, retry }
    }

    fn slug_taken(&self, candidate: &str) -> RepoResult<bool> {
        let taken: Option<i64> = retry::run(&self.retry, mysql_is_transient, || {
            let mut conn = self.pool.get_conn()?;
            conn.exec_first(
                "SELECT EXISTS(SELECT 1 FROM posts WHERE slug = ?)",
                (candidate,),
            )
        })?;
        Ok(taken == Some(1))
    }
}

type MysqlPostRow = (i64, String, String, Option<String>, String, i64, i64);

fn from_mysql_row(row: MysqlPostRow) -> Post {
    let (id, title, slug, image_path, content, created_at, updated_at) = row;
    Post {
        id,
        title,
        slug,
        image_path,
        content,
        created_at,
        updated_at,
    }
}

impl PostRepository for MysqlPostRepository<'_> {
    fn list_posts(&self) -> RepoResult<Vec<Post>> {
        let rows = retry::run(&self.retry, mysql_is_transient, || {
            let mut conn = self.pool.get_conn()?;
            conn.exec::<MysqlPostRow, _, _>(
                format!("{POST_SELECT_SQL} ORDER BY created_at DESC, id DESC"),
                (),
            )
        })?;
        rows.into_iter().map(|row| checked(from_mysql_row(row))).collect()
    }

    fn get_post_by_slug(&self, slug: &str) -> RepoResult<Option<Post>> {
        let row = retry::run(&self.retry, mysql_is_transient, || {
            let mut conn = self.pool.get_conn()?;
            conn.exec_first::<MysqlPostRow, _, _>(
                format!("{POST_SELECT_SQL} WHERE slug = ?"),
                (slug,),
            )
        })?;
        row.map(|row| checked(from_mysql_row(row))).transpose()
    }

    fn get_post_by_id(&self, id: i64) -> RepoResult<Option<Post>> {
        let row = retry::run(&self.retry, mysql_is_transient, || {
            let mut conn = self.pool.get_conn()?;
            conn.exec_first::<MysqlPostRow, _, _>(
                format!("{POST_SELECT_SQL} WHERE id = ?"),
                (id,),
            )
        })?;
        row.map(|row| checked(from_mysql_row(row))).transpose()
    }

    fn save_post(&self, draft: &PostDraft) -> RepoResult<Post> {
        draft.validate()?;
        let now = now_epoch_ms();

        let id = match draft.id {
            Some(id) => {
                let changed = retry::run(&self.retry, mysql_is_transient, || {
                    let mut conn = self.pool.get_conn()?;
                    conn.exec_drop(
                        "UPDATE posts
                         SET title = ?, slug = ?, image_path = ?, content = ?, updated_at = ?
                         WHERE id = ?",
                        (
                            draft.title.as_str(),
                            draft.slug.as_str(),
                            draft.image_path.as_deref(),
                            draft.content.as_str(),
                            now,
                            id,
                        ),
                    )?;
                    Ok(conn.affected_rows())
                })?;
                if changed == 0 {
                    return Err(RepoError::NotFound(id));
                }
                id
            }
            None => retry::run(&self.retry, mysql_is_transient, || {
                let mut conn = self.pool.get_conn()?;
                conn.exec_drop(
                    "INSERT INTO posts (title, slug, image_path, content, created_at, updated_at)
                     VALUES (?, ?, ?, ?, ?, ?)",
                    (
                        draft.title.as_str(),
                        draft.slug.as_str(),
                        draft.image_path.as_deref(),
                        draft.content.as_str(),
                        now,
                        now,
                    ),
                )?;
                Ok(conn.last_insert_id() as i64)
            })?,
        };

        self.get_post_by_id(id)?
            .ok_or_else(|| RepoError::InvalidData(format!("post {id} missing after save")))
    }

    fn delete_post(&self, id: i64) -> RepoResult<()> {
        retry::run(&self.retry, mysql_is_transient, || {
            let mut conn = self.pool.get_conn()?;
            conn.exec_drop("DELETE FROM posts WHERE id = ?", (id,))
        })?;
        Ok(())
    }

    fn generate_slug(&self, title: &str) -> RepoResult<String> {
        let base = slug_base(title);
        if base.is_empty() {
            return Ok(fallback_slug());
        }

        let mut candidate = base.clone();
        let mut suffix = 1u32;
        while self.slug_taken(&candidate)? {
            suffix += 1;
            candidate = format!("{base}-{suffix}");
        }
        Ok(candidate)
    }
}

#[cfg(test)]
mod tests {
    use super::slug_base;

    #[test]
    fn slug_base_collapses_punctuation_runs() {
        assert_eq!(slug_base("Hola, Mundo!"), "hola-mundo");
        assert_eq!(slug_base("  Spaces   everywhere  "), "spaces-everywhere");
        assert_eq!(slug_base("Rust 2026: What's Next?"), "rust-2026-what-s-next");
    }

    #[test]
    fn slug_base_is_empty_for_non_alphanumeric_titles() {
        assert_eq!(slug_base("!!!"), "");
        assert_eq!(slug_base("¡¿?!"), "");
    }
}
