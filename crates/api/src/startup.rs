//! Startup sequence.
//!
//! Migrations are applied before the application is built and before the
//! listener is bound. Any failure here is fatal: the binary logs it and exits
//! non-zero without ever serving a request.

use thiserror::Error;

use crate::app::build_app;
use crate::config::{ApiConfig, ConfigError};
use crate::db::{self, DataContext, PendingMigration, SchemaMigrator};
use crate::middleware::postgres_store;
use crate::state::{AppState, StateError};

/// A fatal startup failure.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error("configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("database: {0}")]
    Database(#[from] sqlx::Error),

    #[error("migration: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("application state: {0}")]
    State(#[from] StateError),

    #[error("server: {0}")]
    Io(#[from] std::io::Error),
}

/// Migrations applied during startup.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MigrationReport {
    pub applied: Vec<PendingMigration>,
}

impl MigrationReport {
    /// Whether the schema was already current.
    #[must_use]
    pub fn is_up_to_date(&self) -> bool {
        self.applied.is_empty()
    }
}

/// Apply every pending migration.
///
/// # Errors
///
/// Returns `StartupError::Migration` if the pending list cannot be read or a
/// migration fails.
pub async fn apply_migrations<M: SchemaMigrator>(
    migrator: &M,
) -> Result<MigrationReport, StartupError> {
    let pending = migrator.pending().await?;
    if pending.is_empty() {
        tracing::info!("Database schema is up to date");
        return Ok(MigrationReport::default());
    }

    for migration in &pending {
        tracing::info!(
            version = migration.version,
            description = %migration.description,
            "Applying migration"
        );
    }
    migrator.apply().await?;
    tracing::info!(count = pending.len(), "Migrations applied");

    Ok(MigrationReport { applied: pending })
}

/// Connect, migrate, build and serve until a shutdown signal arrives.
///
/// # Errors
///
/// Returns the first fatal error; nothing is served if it happens before
/// the listener is bound.
pub async fn serve(config: ApiConfig) -> Result<(), StartupError> {
    let pool = db::create_pool(&config.database_url).await?;
    tracing::info!("Database pool created");

    apply_migrations(&DataContext::new(pool.clone())).await?;

    let addr = config.socket_addr();
    let state = AppState::new(config, pool.clone())?;
    tracing::debug!(registry = ?state.registry(), "Service registry built");

    let app = build_app(state, postgres_store(&pool));

    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("chef-api listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("Shutdown signal received, starting graceful shutdown");
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use sqlx::migrate::MigrateError;

    use super::*;

    struct FakeMigrator {
        pending: Vec<PendingMigration>,
        fail_on_apply: bool,
        applied: AtomicUsize,
    }

    impl FakeMigrator {
        fn new(versions: &[i64], fail_on_apply: bool) -> Self {
            Self {
                pending: versions
                    .iter()
                    .map(|&version| PendingMigration {
                        version,
                        description: format!("migration {version}"),
                    })
                    .collect(),
                fail_on_apply,
                applied: AtomicUsize::new(0),
            }
        }
    }

    impl SchemaMigrator for FakeMigrator {
        async fn pending(&self) -> Result<Vec<PendingMigration>, MigrateError> {
            Ok(self.pending.clone())
        }

        async fn apply(&self) -> Result<(), MigrateError> {
            self.applied.fetch_add(1, Ordering::SeqCst);
            if self.fail_on_apply {
                Err(MigrateError::VersionMissing(
                    self.pending.first().map_or(0, |m| m.version),
                ))
            } else {
                Ok(())
            }
        }
    }

    #[tokio::test]
    async fn test_pending_migrations_are_applied() {
        let migrator = FakeMigrator::new(&[1, 2], false);
        let report = apply_migrations(&migrator).await.unwrap();

        assert_eq!(migrator.applied.load(Ordering::SeqCst), 1);
        assert_eq!(
            report.applied.iter().map(|m| m.version).collect::<Vec<_>>(),
            vec![1, 2]
        );
    }

    #[tokio::test]
    async fn test_up_to_date_schema_skips_apply() {
        let migrator = FakeMigrator::new(&[], false);
        let report = apply_migrations(&migrator).await.unwrap();

        assert!(report.is_up_to_date());
        assert_eq!(migrator.applied.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_failing_migration_stops_startup() {
        let migrator = FakeMigrator::new(&[7], true);
        let err = apply_migrations(&migrator).await.unwrap_err();

        assert!(matches!(err, StartupError::Migration(_)));
    }
}
