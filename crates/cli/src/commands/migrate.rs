//! Database migration commands.
//!
//! Migrations are embedded in the `chef-api` binary and also applied by the
//! server on startup; these commands exist to inspect or apply them ahead of
//! a deploy.

use chef_api::db::SchemaMigrator;
use chef_api::startup::apply_migrations;

use super::{CliError, connect};

/// Log the migrations not yet applied.
pub async fn status() -> Result<(), CliError> {
    let (_, db) = connect().await?;
    let pending = db.pending().await?;

    if pending.is_empty() {
        tracing::info!("Database schema is up to date");
    }
    for migration in pending {
        tracing::info!("pending: {} {}", migration.version, migration.description);
    }
    Ok(())
}

/// Apply every pending migration.
pub async fn run() -> Result<(), CliError> {
    let (_, db) = connect().await?;
    let report = apply_migrations(&db).await?;
    tracing::info!("Migrations complete! {} applied", report.applied.len());
    Ok(())
}
