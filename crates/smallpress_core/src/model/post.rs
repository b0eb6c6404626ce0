//! Post domain model and write-path validation.
//!
//! # Responsibility
//! - Define the published article record and its draft input shape.
//! - Enforce title/slug invariants before any SQL mutation.
//!
//! # Invariants
//! - `slug` is globally unique and URL-safe (`[a-z0-9-]` only).
//! - `created_at` is assigned once at insert and never rewritten.

use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// A published article as stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Post {
    /// Surrogate key assigned by the store.
    pub id: i64,
    /// Human-readable headline. Never empty.
    pub title: String,
    /// Unique URL-safe identifier derived from the title.
    pub slug: String,
    /// Path to an uploaded cover image, managed by the caller.
    pub image_path: Option<String>,
    /// Rendered HTML body.
    pub content: String,
    /// Insert time in epoch milliseconds.
    pub created_at: i64,
    /// Last mutation time in epoch milliseconds.
    pub updated_at: i64,
}

/// Input shape for `save_post`.
///
/// With `id` set the draft updates an existing row in place; without it a
/// new row is inserted and both timestamps start equal.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PostDraft {
    /// Target row for updates; `None` inserts.
    pub id: Option<i64>,
    pub title: String,
    pub slug: String,
    pub image_path: Option<String>,
    pub content: String,
}

/// Validation failure for post write paths.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PostValidationError {
    EmptyTitle,
    EmptySlug,
    /// Slug contains characters outside `[a-z0-9-]`.
    InvalidSlug(String),
}

impl Display for PostValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyTitle => write!(f, "post title must not be empty"),
            Self::EmptySlug => write!(f, "post slug must not be empty"),
            Self::InvalidSlug(slug) => {
                write!(f, "post slug `{slug}` must contain only [a-z0-9-]")
            }
        }
    }
}

impl Error for PostValidationError {}

impl PostDraft {
    /// Checks write invariants before persistence.
    pub fn validate(&self) -> Result<(), PostValidationError> {
        validate_title_and_slug(&self.title, &self.slug)
    }
}

impl Post {
    /// Checks that a persisted row still satisfies model invariants.
    ///
    /// Read paths reject invalid stored state instead of masking it.
    pub fn validate(&self) -> Result<(), PostValidationError> {
        validate_title_and_slug(&self.title, &self.slug)
    }
}

fn validate_title_and_slug(title: &str, slug: &str) -> Result<(), PostValidationError> {
    if title.trim().is_empty() {
        return Err(PostValidationError::EmptyTitle);
    }
    if slug.is_empty() {
        return Err(PostValidationError::EmptySlug);
    }
    if !slug
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
    {
        return Err(PostValidationError::InvalidSlug(slug.to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{PostDraft, PostValidationError};

    fn draft(title: &str, slug: &str) -> PostDraft {
        PostDraft {
            id: None,
            title: title.to_string(),
            slug: slug.to_string(),
            image_path: None,
            content: "<p>body</p>".to_string(),
        }
    }

    #[test]
    fn accepts_well_formed_draft() {
        assert_eq!(draft("Hola, Mundo!", "hola-mundo").validate(), Ok(()));
    }

    #[test]
    fn rejects_blank_title() {
        assert_eq!(
            draft("   ", "hola-mundo").validate(),
            Err(PostValidationError::EmptyTitle)
        );
    }

    #[test]
    fn rejects_empty_slug() {
        assert_eq!(
            draft("Hola", "").validate(),
            Err(PostValidationError::EmptySlug)
        );
    }

    #[test]
    fn rejects_slug_with_uppercase_or_spaces() {
        assert!(matches!(
            draft("Hola", "Hola Mundo").validate(),
            Err(PostValidationError::InvalidSlug(_))
        ));
    }
}
