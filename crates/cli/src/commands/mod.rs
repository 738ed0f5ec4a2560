//! CLI command implementations.

pub mod account;
pub mod migrate;
pub mod token;

use chef_api::config::{ApiConfig, ConfigError};
use chef_api::db::{self, DataContext, RepositoryError};
use chef_api::services::auth::AuthError;
use thiserror::Error;

/// Errors that can occur while running a command.
#[derive(Debug, Error)]
pub enum CliError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Database connection error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("{0}")]
    Startup(#[from] chef_api::startup::StartupError),

    #[error("{0}")]
    Repository(#[from] RepositoryError),

    #[error("{0}")]
    Auth(#[from] AuthError),

    #[error("Invalid role: {0}. Valid roles: admin, user")]
    InvalidRole(String),

    #[error("No account with id {0}")]
    AccountNotFound(i32),
}

/// Load configuration and connect to the database.
async fn connect() -> Result<(ApiConfig, DataContext), CliError> {
    let config = ApiConfig::from_env()?;
    tracing::info!("Connecting to database...");
    let pool = db::create_pool(&config.database_url).await?;
    Ok((config, DataContext::new(pool)))
}
