//! Chef API server.
//!
//! Serves the catalog, store, order and account API on port 5000.
//!
//! # Startup
//!
//! 1. Load configuration from the environment (and `.env`)
//! 2. Initialize Sentry and tracing
//! 3. Connect to `PostgreSQL` and apply pending migrations
//! 4. Build the service registry, routes and middleware pipeline
//! 5. Serve until Ctrl+C or SIGTERM
//!
//! A failure in steps 1-4 exits with status 1 before the listener is bound.

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::process::ExitCode;

use chef_api::config::ApiConfig;
use chef_api::startup::{self, StartupError};
use sentry::integrations::tracing as sentry_tracing;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize Sentry error tracking and return guard that must be kept alive.
fn init_sentry(config: &ApiConfig) -> Option<sentry::ClientInitGuard> {
    let dsn = config.sentry_dsn.as_ref()?;

    let guard = sentry::init((
        dsn.as_str(),
        sentry::ClientOptions {
            release: sentry::release_name!(),
            environment: config
                .sentry_environment
                .clone()
                .map(std::borrow::Cow::Owned),
            sample_rate: config.sentry_sample_rate,
            traces_sample_rate: config.sentry_traces_sample_rate,
            attach_stacktrace: true,
            ..Default::default()
        },
    ));

    tracing::info!("Sentry initialized");
    Some(guard)
}

/// Filter tracing events to Sentry event types.
fn sentry_event_filter(metadata: &tracing::Metadata<'_>) -> sentry_tracing::EventFilter {
    match *metadata.level() {
        tracing::Level::ERROR | tracing::Level::WARN => sentry_tracing::EventFilter::Event,
        tracing::Level::INFO | tracing::Level::DEBUG => sentry_tracing::EventFilter::Breadcrumb,
        tracing::Level::TRACE => sentry_tracing::EventFilter::Ignore,
    }
}

fn init_tracing() {
    // Defaults to info level for our crate if RUST_LOG is not set
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "chef_api=info,tower_http=debug".into());

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .with(sentry_tracing::layer().event_filter(sentry_event_filter))
        .init();
}

async fn run() -> Result<(), StartupError> {
    let config = ApiConfig::from_env()?;

    // Sentry must be initialized before the tracing subscriber
    let _sentry_guard = init_sentry(&config);
    init_tracing();
    tracing::info!(environment = ?config.environment, "Configuration loaded");

    startup::serve(config).await
}

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            // The subscriber may not be installed yet if configuration failed.
            tracing::error!(error = %e, "Startup failed");
            #[allow(clippy::print_stderr)]
            {
                eprintln!("chef-api: {e}");
            }
            ExitCode::FAILURE
        }
    }
}
