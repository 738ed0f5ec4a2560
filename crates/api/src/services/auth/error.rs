//! Authentication error types.

use thiserror::Error;

use crate::db::RepositoryError;

/// Errors that can occur during authentication operations.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Invalid email format.
    #[error("invalid email: {0}")]
    InvalidEmail(#[from] chef_core::EmailError),

    /// Invalid credentials (wrong password or unknown account).
    #[error("invalid credentials")]
    InvalidCredentials,

    /// Correct password, but the email address was never confirmed.
    #[error("email not verified")]
    EmailNotVerified,

    /// Account already exists.
    #[error("account already exists")]
    AccountAlreadyExists,

    /// Password too weak or invalid.
    #[error("password validation failed: {0}")]
    WeakPassword(String),

    /// Email verification token unknown or already consumed.
    #[error("invalid verification token")]
    InvalidVerificationToken,

    /// OAuth `state` missing from the session or not matching the callback.
    #[error("invalid oauth state")]
    InvalidOAuthState,

    /// The provider profile carries no email address.
    #[error("provider profile has no email")]
    MissingProfileEmail,

    /// The federated provider has no client id configured.
    #[error("{0} sign-in is not configured")]
    ProviderNotConfigured(&'static str),

    /// The federated provider rejected a request or returned garbage.
    #[error("identity provider error: {0}")]
    Provider(String),

    /// Repository/database error.
    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),

    /// Password hashing error.
    #[error("password hashing error")]
    PasswordHash,

    /// Bearer token could not be signed.
    #[error("token error: {0}")]
    Token(#[from] jsonwebtoken::errors::Error),
}

impl From<reqwest::Error> for AuthError {
    fn from(err: reqwest::Error) -> Self {
        Self::Provider(err.to_string())
    }
}
