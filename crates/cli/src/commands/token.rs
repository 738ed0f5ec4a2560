//! Bearer token commands.

use chef_api::db::AccountRepository;
use chef_api::services::auth::JwtIssuer;
use chef_core::AccountId;

use super::{CliError, connect};

/// Issue a token for an account and print it to stdout.
pub async fn issue(account_id: i32) -> Result<(), CliError> {
    let (config, db) = connect().await?;
    let account = AccountRepository::new(db)
        .get_by_id(AccountId::new(account_id))
        .await?
        .ok_or(CliError::AccountNotFound(account_id))?;

    let issuer = JwtIssuer::new(&config.app.jwt_secret, config.app.jwt_ttl_minutes);
    let issued = issuer.issue(account.id, account.role)?;

    tracing::info!(
        "Token for {} ({}) expires at {}",
        account.email,
        account.role,
        issued.expires_at
    );
    #[allow(clippy::print_stdout)]
    {
        println!("{}", issued.token);
    }
    Ok(())
}
