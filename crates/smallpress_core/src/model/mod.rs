//! Domain models for the publishing core.
//!
//! # Responsibility
//! - Define canonical data structures shared by repositories and services.
//! - Provide validation helpers enforced on every write path.
//!
//! # Invariants
//! - Models carry no storage details; SQL stays inside the repo layer.
//! - Timestamps are Unix epoch milliseconds throughout.

pub mod post;
pub mod session;
pub mod user;
