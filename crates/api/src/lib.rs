//! Chef API library.
//!
//! The composition root of the Chef grocery backend: configuration,
//! persistence, the request-scoped service registry, authentication, the
//! middleware pipeline and the generated OpenAPI document. The binary in
//! `main.rs` only initializes logging and calls [`startup::serve`].

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod app;
pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod openapi;
pub mod routes;
pub mod services;
pub mod startup;
pub mod state;

#[cfg(test)]
#[allow(clippy::unwrap_used)]
pub(crate) mod test_support;
