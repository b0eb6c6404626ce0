//! Post use-case service.
//!
//! # Responsibility
//! - Provide publish/revise/remove entry points for admin callers.
//! - Delegate persistence and slug allocation to the post repository.
//!
//! # Invariants
//! - Publishing always allocates a fresh unique slug from the title.
//! - Revision keeps the caller-supplied slug; changing it is an explicit
//!   editorial decision, not a side effect.

use crate::model::post::{Post, PostDraft};
use crate::repo::post_repo::PostRepository;
use crate::repo::RepoResult;

/// Input for publishing a new article.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishRequest {
    pub title: String,
    /// Pre-computed upload path; file handling is the caller's concern.
    pub image_path: Option<String>,
    pub content: String,
}

/// Input for revising an existing article in place.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReviseRequest {
    pub id: i64,
    pub title: String,
    pub slug: String,
    pub image_path: Option<String>,
    pub content: String,
}

/// Use-case service wrapper for post CRUD operations.
pub struct PostService<P: PostRepository> {
    posts: P,
}

impl<P: PostRepository> PostService<P> {
    /// Creates a service using the provided repository implementation.
    pub fn new(posts: P) -> Self {
        Self { posts }
    }

    /// Publishes a new article under a freshly allocated slug.
    ///
    /// A concurrent publisher can still win the slug between probe and
    /// insert; the resulting `Conflict` is surfaced for the caller to
    /// retry or report.
    pub fn publish(&self, request: &PublishRequest) -> RepoResult<Post> {
        let slug = self.posts.generate_slug(&request.title)?;
        self.posts.save_post(&PostDraft {
            id: None,
            title: request.title.clone(),
            slug,
            image_path: request.image_path.clone(),
            content: request.content.clone(),
        })
    }

    /// Revises an article in place, refreshing `updated_at` only.
    pub fn revise(&self, request: &ReviseRequest) -> RepoResult<Post> {
        self.posts.save_post(&PostDraft {
            id: Some(request.id),
            title: request.title.clone(),
            slug: request.slug.clone(),
            image_path: request.image_path.clone(),
            content: request.content.clone(),
        })
    }

    /// Removes an article. The caller cleans up any stored image using the
    /// `image_path` it read beforehand.
    pub fn remove(&self, id: i64) -> RepoResult<()> {
        self.posts.delete_post(id)
    }

    /// Lists all articles, newest first.
    pub fn list(&self) -> RepoResult<Vec<Post>> {
        self.posts.list_posts()
    }

    /// Resolves an article by slug, as public routes do.
    pub fn find_by_slug(&self, slug: &str) -> RepoResult<Option<Post>> {
        self.posts.get_post_by_slug(slug)
    }

    /// Resolves an article by id, as admin edit routes do.
    pub fn find_by_id(&self, id: i64) -> RepoResult<Option<Post>> {
        self.posts.get_post_by_id(id)
    }
}
