//! Database operations for the Chef API `PostgreSQL` schema.
//!
//! # Tables
//!
//! One table per catalog, location, store and order entity (see
//! `migrations/`), plus:
//!
//! - `account` - Password and federated accounts
//! - `tower_sessions.session` - Cookie session storage
//!
//! # Migrations
//!
//! Migrations are embedded from `crates/api/migrations/` and applied on
//! startup, or manually via:
//! ```bash
//! cargo run -p chef-cli -- migrate
//! ```

pub mod accounts;
pub mod entities;

use std::collections::HashSet;
use std::future::Future;
use std::time::Duration;

use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::migrate::{Migrate, MigrateError, Migrator};
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

pub use accounts::{AccountRepository, ExternalLogin, NewAccount};
pub use entities::EntityRepository;

/// Migrations compiled into the binary.
pub static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Requested entity was not found.
    #[error("not found")]
    NotFound,

    /// Constraint violation (unique key or missing referenced row).
    #[error("constraint violation: {0}")]
    Conflict(String),
}

impl RepositoryError {
    /// Classify a write error, turning constraint violations into `Conflict`.
    pub(crate) fn from_write(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(ref db_err) = err {
            if db_err.is_unique_violation() {
                let what = db_err.constraint().unwrap_or("unique key");
                return Self::Conflict(format!("duplicate value violates {what}"));
            }
            if db_err.is_foreign_key_violation() {
                let what = db_err.constraint().unwrap_or("foreign key");
                return Self::Conflict(format!("referenced row is missing or still in use ({what})"));
            }
        }
        Self::Database(err)
    }
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Arguments
///
/// * `database_url` - `PostgreSQL` connection string (wrapped in `SecretString`)
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}

/// Persistence context handed to every request-scoped service.
///
/// Wraps the shared pool; cloning is cheap. Each [`ServiceScope`] owns one.
///
/// [`ServiceScope`]: crate::services::ServiceScope
#[derive(Clone)]
pub struct DataContext {
    pool: PgPool,
}

impl DataContext {
    /// Create a context over a pool.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// The underlying pool.
    #[must_use]
    pub const fn pool(&self) -> &PgPool {
        &self.pool
    }
}

impl std::fmt::Debug for DataContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DataContext")
            .field("pool_size", &self.pool.size())
            .finish_non_exhaustive()
    }
}

/// A migration known to the binary but not yet applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingMigration {
    pub version: i64,
    pub description: String,
}

/// Anything that can report and apply schema migrations.
///
/// Startup depends on this rather than on the pool so tests can supply a
/// migrator that fails on demand.
pub trait SchemaMigrator: Send + Sync {
    /// Migrations not yet recorded as applied.
    fn pending(&self) -> impl Future<Output = Result<Vec<PendingMigration>, MigrateError>> + Send;

    /// Apply every pending migration.
    fn apply(&self) -> impl Future<Output = Result<(), MigrateError>> + Send;
}

impl SchemaMigrator for DataContext {
    async fn pending(&self) -> Result<Vec<PendingMigration>, MigrateError> {
        let mut conn = self.pool.acquire().await?;
        conn.ensure_migrations_table().await?;
        let applied: HashSet<i64> = conn
            .list_applied_migrations()
            .await?
            .into_iter()
            .map(|migration| migration.version)
            .collect();

        Ok(MIGRATOR
            .iter()
            .filter(|migration| !migration.migration_type.is_down_migration())
            .filter(|migration| !applied.contains(&migration.version))
            .map(|migration| PendingMigration {
                version: migration.version,
                description: migration.description.to_string(),
            })
            .collect())
    }

    async fn apply(&self) -> Result<(), MigrateError> {
        MIGRATOR.run(&self.pool).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_embedded_migrations_are_ordered() {
        let versions: Vec<i64> = MIGRATOR.iter().map(|m| m.version).collect();
        assert!(!versions.is_empty());
        assert!(versions.windows(2).all(|pair| pair[0] < pair[1]));
    }

    #[test]
    fn test_repository_error_display() {
        assert_eq!(RepositoryError::NotFound.to_string(), "not found");
        assert_eq!(
            RepositoryError::Conflict("dup".to_string()).to_string(),
            "constraint violation: dup"
        );
    }
}
