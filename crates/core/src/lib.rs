//! Chef Core - Shared types library.
//!
//! This crate provides common types used across all Chef API components:
//! - `api` - The HTTP backend (composition root, services, routes)
//! - `cli` - Command-line tools for migrations and account management
//!
//! # Architecture
//!
//! The core crate contains only types - no I/O, no database access,
//! no HTTP clients. Database and OpenAPI support are opt-in through the
//! `postgres` and `openapi` features.
//!
//! # Modules
//!
//! - [`types`] - Newtype IDs, emails, roles and order statuses

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
