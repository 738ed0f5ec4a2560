//! Account domain types.
//!
//! Accounts are not declared with `define_entity!`: the row carries a
//! password hash and verification token that must never be serialized, so
//! the stored row and the public view are separate types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use chef_core::{AccountId, Email, Role};

/// An account as stored (domain type).
#[derive(Debug, Clone)]
pub struct Account {
    /// Unique account ID.
    pub id: AccountId,
    /// Normalized email address.
    pub email: Email,
    /// Argon2id hash; `None` for federated-only accounts.
    pub password_hash: Option<String>,
    pub first_name: String,
    pub last_name: String,
    pub role: Role,
    /// Federated provider that created or first linked the account.
    pub provider: Option<String>,
    /// Whether the email has been verified.
    pub is_verified: bool,
    /// Outstanding email verification token.
    pub verification_token: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Public view of an account.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AccountView {
    pub id: AccountId,
    pub email: Email,
    pub first_name: String,
    pub last_name: String,
    pub role: Role,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,
    pub is_verified: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Account> for AccountView {
    fn from(account: Account) -> Self {
        Self {
            id: account.id,
            email: account.email,
            first_name: account.first_name,
            last_name: account.last_name,
            role: account.role,
            provider: account.provider,
            is_verified: account.is_verified,
            created_at: account.created_at,
            updated_at: account.updated_at,
        }
    }
}

/// Request body of `POST /api/accounts/register`.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
}

/// Request body of `POST /api/accounts/authenticate`.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct AuthenticateRequest {
    pub email: String,
    pub password: String,
}

/// Query of `GET /api/accounts/verify-email`, the link sent by email.
#[derive(Debug, Clone, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct VerifyEmailQuery {
    /// Token from the verification email.
    pub token: String,
}

/// Request body of `PUT /api/accounts/{id}`.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct UpdateAccountRequest {
    pub first_name: String,
    pub last_name: String,
    /// Only admins may change roles; ignored otherwise.
    #[serde(default)]
    pub role: Option<Role>,
}

/// A freshly issued bearer token.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct TokenResponse {
    pub account: AccountView,
    /// HS256 JWT to send as `Authorization: Bearer <token>`.
    pub token: String,
    /// Expiry as a Unix timestamp.
    pub expires_at: i64,
}

/// Profile returned by a federated provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExternalProfile {
    /// Provider name, e.g. `google`.
    pub provider: &'static str,
    /// Stable subject id at the provider.
    pub subject: String,
    pub email: Option<String>,
    pub first_name: String,
    pub last_name: String,
}
