//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate repository calls into use-case level APIs.
//! - Keep UI/routing layers decoupled from storage details.

pub mod auth_service;
pub mod post_service;
