//! Account service.
//!
//! Password registration with email verification, password authentication
//! issuing bearer tokens, and upsert of federated sign-ins.

use std::sync::Arc;

use chef_core::{AccountId, Email, Role};

use crate::db::accounts::{ExternalLogin, NewAccount};
use crate::db::{AccountRepository, RepositoryError};
use crate::models::Page;
use crate::models::account::{Account, ExternalProfile, TokenResponse};

use super::auth::password::{hash_password, validate_password, verify_password};
use super::auth::{AuthError, JwtIssuer};
use super::email::{EmailService, generate_verification_token};
use super::registry::{ResolveError, ScopedService, ServiceKind, ServiceScope};

/// Fields required to register a password account.
#[derive(Debug, Clone, Copy)]
pub struct Registration<'a> {
    pub email: &'a str,
    pub password: &'a str,
    pub first_name: &'a str,
    pub last_name: &'a str,
}

/// Account service.
pub struct AccountService {
    accounts: AccountRepository,
    jwt: JwtIssuer,
    email: Arc<EmailService>,
}

impl AccountService {
    /// Create an account service from its parts.
    #[must_use]
    pub const fn new(accounts: AccountRepository, jwt: JwtIssuer, email: Arc<EmailService>) -> Self {
        Self {
            accounts,
            jwt,
            email,
        }
    }

    /// Register a new password account and send its verification email.
    ///
    /// Delivery failures are logged; the account is created regardless.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidEmail` if the email format is invalid.
    /// Returns `AuthError::WeakPassword` if the password doesn't meet requirements.
    /// Returns `AuthError::AccountAlreadyExists` if the email is already registered.
    pub async fn register(&self, registration: Registration<'_>) -> Result<Account, AuthError> {
        let email = Email::parse(registration.email)?;
        validate_password(registration.password)?;
        let password_hash = hash_password(registration.password)?;
        let token = generate_verification_token();

        let account = self
            .accounts
            .create(&NewAccount {
                email: &email,
                password_hash: Some(&password_hash),
                first_name: registration.first_name.trim(),
                last_name: registration.last_name.trim(),
                role: Role::User,
                login: None,
                is_verified: false,
                verification_token: Some(&token),
            })
            .await
            .map_err(|e| match e {
                RepositoryError::Conflict(_) => AuthError::AccountAlreadyExists,
                other => AuthError::Repository(other),
            })?;

        if let Err(e) = self
            .email
            .send_verification(account.email.as_str(), &account.first_name, &token)
            .await
        {
            tracing::warn!(account_id = %account.id, error = %e, "Failed to send verification email");
        }

        tracing::info!(account_id = %account.id, "Account registered");
        Ok(account)
    }

    /// Consume a verification token.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidVerificationToken` if no account holds it.
    pub async fn verify_email(&self, token: &str) -> Result<Account, AuthError> {
        let account = self
            .accounts
            .verify(token.trim())
            .await?
            .ok_or(AuthError::InvalidVerificationToken)?;

        if let Err(e) = self
            .email
            .send_welcome(account.email.as_str(), &account.first_name)
            .await
        {
            tracing::warn!(account_id = %account.id, error = %e, "Failed to send welcome email");
        }

        Ok(account)
    }

    /// Check a password and issue a bearer token.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidCredentials` if the email/password is wrong
    /// or the account has no password.
    /// Returns `AuthError::EmailNotVerified` if the password is right but the
    /// email was never confirmed.
    pub async fn authenticate(&self, email: &str, password: &str) -> Result<TokenResponse, AuthError> {
        let email = Email::parse(email)?;
        let account = self
            .accounts
            .get_by_email(&email)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        let hash = account
            .password_hash
            .as_deref()
            .ok_or(AuthError::InvalidCredentials)?;
        verify_password(password, hash)?;

        if !account.is_verified {
            return Err(AuthError::EmailNotVerified);
        }
        self.token_for(account)
    }

    /// Issue a bearer token for an already loaded account.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Token` if signing fails.
    pub fn token_for(&self, account: Account) -> Result<TokenResponse, AuthError> {
        let issued = self.jwt.issue(account.id, account.role)?;
        Ok(TokenResponse {
            account: account.into(),
            token: issued.token,
            expires_at: issued.expires_at,
        })
    }

    /// Find or create the account behind a federated profile.
    ///
    /// Lookup order: provider subject, then email (linking the provider to
    /// the existing account), then a new verified account. Linking an
    /// unverified account clears its password, since the provider has now
    /// proven who owns the address.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::MissingProfileEmail` when a new account would be
    /// needed but the provider shared no email.
    pub async fn sign_in_external(&self, profile: &ExternalProfile) -> Result<Account, AuthError> {
        let login = ExternalLogin {
            provider: profile.provider,
            subject: &profile.subject,
        };
        if let Some(account) = self.accounts.get_by_login(login).await? {
            return Ok(account);
        }

        let email = Email::parse(
            profile
                .email
                .as_deref()
                .ok_or(AuthError::MissingProfileEmail)?,
        )?;

        if let Some(existing) = self.accounts.get_by_email(&email).await? {
            if existing.is_verified {
                tracing::info!(account_id = %existing.id, provider = profile.provider, "Linking provider to existing account");
            } else {
                tracing::warn!(account_id = %existing.id, provider = profile.provider, "Federated sign-in took over an unverified account");
            }
            return Ok(self.accounts.link_provider(existing.id, login).await?);
        }

        let account = self
            .accounts
            .create(&NewAccount {
                email: &email,
                password_hash: None,
                first_name: &profile.first_name,
                last_name: &profile.last_name,
                role: Role::User,
                login: Some(login),
                is_verified: true,
                verification_token: None,
            })
            .await?;

        tracing::info!(account_id = %account.id, provider = profile.provider, "Account created from federated sign-in");
        Ok(account)
    }

    /// List one page of accounts.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Repository` if the query fails.
    pub async fn list(&self, page: Page) -> Result<Vec<Account>, AuthError> {
        Ok(self.accounts.list(page).await?)
    }

    /// Get an account.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Repository(NotFound)` if it does not exist.
    pub async fn get(&self, id: AccountId) -> Result<Account, AuthError> {
        self.accounts
            .get_by_id(id)
            .await?
            .ok_or(AuthError::Repository(RepositoryError::NotFound))
    }

    /// Update names, and the role when `role` is given.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Repository(NotFound)` if it does not exist.
    pub async fn update(
        &self,
        id: AccountId,
        first_name: &str,
        last_name: &str,
        role: Option<Role>,
    ) -> Result<Account, AuthError> {
        let role = match role {
            Some(role) => role,
            None => self.get(id).await?.role,
        };
        Ok(self
            .accounts
            .update_profile(id, first_name.trim(), last_name.trim(), role)
            .await?)
    }

    /// Delete an account.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Repository` if it does not exist or is referenced.
    pub async fn delete(&self, id: AccountId) -> Result<(), AuthError> {
        Ok(self.accounts.delete(id).await?)
    }
}

impl ScopedService for AccountService {
    const KIND: ServiceKind = ServiceKind::Account;

    fn create(scope: &ServiceScope) -> Result<Self, ResolveError> {
        let email = scope.resolve::<EmailService>()?;
        Ok(Self::new(
            AccountRepository::new(scope.db().clone()),
            scope.state().jwt().clone(),
            email,
        ))
    }
}
