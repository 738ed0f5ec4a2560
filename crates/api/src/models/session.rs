//! Session-related types.
//!
//! Types stored in the cookie session by the federated sign-in flow.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use chef_core::{AccountId, Email, Role};

/// Session-stored account identity.
///
/// Minimal data stored in the session to identify the signed-in account.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CurrentAccount {
    /// Account's database ID.
    pub id: AccountId,
    /// Account's email address.
    pub email: Email,
    pub role: Role,
    /// Provider used to sign in (`facebook` or `google`).
    pub provider: String,
}

/// Session keys for authentication data.
pub mod keys {
    /// Key for storing the current signed-in account.
    pub const CURRENT_ACCOUNT: &str = "current_account";

    /// Key prefix for per-provider OAuth state (CSRF protection).
    pub const OAUTH_STATE_PREFIX: &str = "oauth_state_";
}
