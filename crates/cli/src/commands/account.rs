//! Account management commands.

use chef_api::db::AccountRepository;
use chef_api::db::accounts::NewAccount;
use chef_api::services::auth::AuthError;
use chef_api::services::auth::password::{hash_password, validate_password};
use chef_core::{Email, Role};

use super::{CliError, connect};

/// Create a verified password account.
///
/// Accounts created here skip email verification, which makes this the way
/// to bootstrap the first admin.
pub async fn create(
    email: &str,
    first_name: &str,
    last_name: &str,
    role: &str,
    password: &str,
) -> Result<i32, CliError> {
    let role: Role = role
        .parse()
        .map_err(|_| CliError::InvalidRole(role.to_owned()))?;
    let email = Email::parse(email).map_err(AuthError::from)?;
    validate_password(password)?;
    let password_hash = hash_password(password)?;

    let (_, db) = connect().await?;
    let accounts = AccountRepository::new(db);

    tracing::info!("Creating account: {} ({})", email, role);
    let account = accounts
        .create(&NewAccount {
            email: &email,
            password_hash: Some(&password_hash),
            first_name: first_name.trim(),
            last_name: last_name.trim(),
            role,
            login: None,
            is_verified: true,
            verification_token: None,
        })
        .await?;

    tracing::info!(
        "Account created successfully! ID: {}, Email: {}, Role: {}",
        account.id,
        account.email,
        account.role
    );
    Ok(account.id.as_i32())
}
