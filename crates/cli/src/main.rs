//! Chef CLI - Database migrations and account tools.
//!
//! # Usage
//!
//! ```bash
//! # List migrations that have not been applied yet
//! chef-cli migrate status
//!
//! # Apply pending migrations
//! chef-cli migrate run
//!
//! # Create a verified admin account
//! chef-cli account create -e admin@example.com -f Ada -l Lovelace -r admin
//!
//! # Issue a bearer token for an account
//! chef-cli token issue --account-id 1
//! ```
//!
//! All commands read the same environment as the server (`CHEF_DATABASE_URL`,
//! `APPSETTINGS_SECRET`, …), including a `.env` file.

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::process::ExitCode;

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "chef-cli")]
#[command(author, version, about = "Chef API CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Database migrations
    Migrate {
        #[command(subcommand)]
        action: MigrateAction,
    },
    /// Manage accounts
    Account {
        #[command(subcommand)]
        action: AccountAction,
    },
    /// Bearer tokens
    Token {
        #[command(subcommand)]
        action: TokenAction,
    },
}

#[derive(Subcommand)]
enum MigrateAction {
    /// List pending migrations
    Status,
    /// Apply pending migrations
    Run,
}

#[derive(Subcommand)]
enum AccountAction {
    /// Create a verified password account
    Create {
        /// Email address
        #[arg(short, long)]
        email: String,

        /// First name
        #[arg(short, long)]
        first_name: String,

        /// Last name
        #[arg(short, long)]
        last_name: String,

        /// Role (`admin` or `user`)
        #[arg(short, long, default_value = "user")]
        role: String,

        /// Password; read from `CHEF_ACCOUNT_PASSWORD` when omitted
        #[arg(short, long, env = "CHEF_ACCOUNT_PASSWORD", hide_env_values = true)]
        password: String,
    },
}

#[derive(Subcommand)]
enum TokenAction {
    /// Issue a bearer token for an existing account
    Issue {
        /// Account id
        #[arg(short, long)]
        account_id: i32,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("Command failed: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<(), commands::CliError> {
    match cli.command {
        Commands::Migrate { action } => match action {
            MigrateAction::Status => commands::migrate::status().await?,
            MigrateAction::Run => commands::migrate::run().await?,
        },
        Commands::Account { action } => match action {
            AccountAction::Create {
                email,
                first_name,
                last_name,
                role,
                password,
            } => {
                commands::account::create(&email, &first_name, &last_name, &role, &password)
                    .await?;
            }
        },
        Commands::Token { action } => match action {
            TokenAction::Issue { account_id } => commands::token::issue(account_id).await?,
        },
    }
    Ok(())
}
