//! Federated sign-in (Facebook, Google) into the cookie session, and the
//! identity endpoints.
//!
//! # Flow
//!
//! 1. `GET /auth/{provider}/login` stores a random `state` in the session and
//!    redirects to the provider
//! 2. The provider redirects back to `/signin-{provider}`; the state is
//!    checked, the code exchanged and the profile fetched
//! 3. The account is found or created and written to the session
//! 4. The caller lands on `/auth/session`, which returns a bearer token
//!
//! Failures before the code exchange redirect to `/auth/session?error=<code>`.
//! A provider rejecting the code exchange is a JSON 502.

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use serde::{Deserialize, Serialize};
use tower_sessions::Session;
use utoipa::{IntoParams, ToSchema};

use chef_core::{AccountId, Role};

use crate::db::RepositoryError;
use crate::error::{AppError, Result};
use crate::middleware::{
    CurrentIdentity, SessionAccount, clear_current_account, set_current_account,
};
use crate::models::account::TokenResponse;
use crate::models::session::{CurrentAccount, keys};
use crate::services::auth::federated::generate_state;
use crate::services::auth::{AuthError, Identity, Provider};
use crate::services::{AccountService, Scoped};
use crate::state::AppState;

use super::Endpoint;

const TAG: &str = "Authentication";

/// Where a finished (or failed) federated sign-in lands.
pub const SIGN_IN_COMPLETE: &str = "/auth/session";

fn state_key(provider: Provider) -> String {
    format!("{}{}", keys::OAUTH_STATE_PREFIX, provider.slug())
}

fn sign_in_failed(code: &str) -> Response {
    Redirect::to(&format!("{SIGN_IN_COMPLETE}?error={}", urlencoding::encode(code)))
        .into_response()
}

fn session_error(e: &tower_sessions::session::Error) -> AppError {
    AppError::Internal(format!("session: {e}"))
}

/// Query parameters of a provider callback.
#[derive(Debug, Deserialize)]
pub struct CallbackQuery {
    pub code: Option<String>,
    pub state: Option<String>,
    /// Set by the provider when the user declined.
    pub error: Option<String>,
    pub error_description: Option<String>,
}

/// Query of `GET /auth/session`.
#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct SessionQuery {
    /// Failure code of a federated sign-in that just redirected here.
    pub error: Option<String>,
}

/// Bearer identity of the caller.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct IdentityResponse {
    pub authenticated: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub account_id: Option<AccountId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<Role>,
    /// Token expiry as a Unix timestamp.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<i64>,
}

impl From<&Identity> for IdentityResponse {
    fn from(identity: &Identity) -> Self {
        let claims = identity.claims();
        Self {
            authenticated: claims.is_some(),
            account_id: claims.map(|c| c.id),
            role: claims.map(|c| c.role),
            expires_at: claims.map(|c| c.exp),
        }
    }
}

/// `GET /auth/{provider}/login`
pub async fn login(
    State(state): State<AppState>,
    session: Session,
    Path(slug): Path<String>,
) -> Result<Response> {
    let provider = Provider::from_slug(&slug)
        .ok_or_else(|| AppError::NotFound(format!("Unknown sign-in provider '{slug}'")))?;

    let oauth_state = generate_state();
    let url = state.federated().authorization_url(provider, &oauth_state)?;

    session
        .insert(&state_key(provider), &oauth_state)
        .await
        .map_err(|e| session_error(&e))?;

    tracing::debug!(provider = provider.slug(), "Redirecting to provider");
    Ok(Redirect::to(&url).into_response())
}

/// `GET /signin-facebook`
pub async fn facebook_callback(
    state: State<AppState>,
    session: Session,
    accounts: Scoped<AccountService>,
    query: Query<CallbackQuery>,
) -> Result<Response> {
    complete_sign_in(Provider::Facebook, state, session, accounts, query).await
}

/// `GET /signin-google`
pub async fn google_callback(
    state: State<AppState>,
    session: Session,
    accounts: Scoped<AccountService>,
    query: Query<CallbackQuery>,
) -> Result<Response> {
    complete_sign_in(Provider::Google, state, session, accounts, query).await
}

async fn complete_sign_in(
    provider: Provider,
    State(state): State<AppState>,
    session: Session,
    accounts: Scoped<AccountService>,
    Query(query): Query<CallbackQuery>,
) -> Result<Response> {
    if let Some(error) = query.error {
        tracing::warn!(
            provider = provider.slug(),
            error = %error,
            description = query.error_description.as_deref().unwrap_or_default(),
            "Provider denied sign-in"
        );
        return Ok(sign_in_failed("provider_denied"));
    }

    let Some(code) = query.code else {
        tracing::warn!(provider = provider.slug(), "Callback missing code");
        return Ok(sign_in_failed("missing_code"));
    };

    let key = state_key(provider);
    let stored: Option<String> = session.remove(&key).await.map_err(|e| session_error(&e))?;
    if stored.is_none() || stored != query.state {
        tracing::warn!(provider = provider.slug(), "OAuth state mismatch");
        return Ok(sign_in_failed("invalid_state"));
    }

    let access_token = state.federated().exchange_code(provider, &code).await?;
    let profile = state
        .federated()
        .fetch_profile(provider, &access_token)
        .await?;

    let account = match accounts.sign_in_external(&profile).await {
        Ok(account) => account,
        Err(AuthError::MissingProfileEmail) => return Ok(sign_in_failed("missing_email")),
        Err(e) => return Err(e.into()),
    };

    set_current_account(
        &session,
        &CurrentAccount {
            id: account.id,
            email: account.email.clone(),
            role: account.role,
            provider: provider.slug().to_string(),
        },
    )
    .await
    .map_err(|e| session_error(&e))?;

    tracing::info!(account_id = %account.id, provider = provider.slug(), "Federated sign-in");
    Ok(Redirect::to(SIGN_IN_COMPLETE).into_response())
}

/// `GET /auth/session`
///
/// Exchanges the cookie session for a bearer token so that browser sign-ins
/// can call the rest of the API.
pub async fn current_session(
    session: Session,
    signed_in: Result<SessionAccount>,
    accounts: Scoped<AccountService>,
    Query(query): Query<SessionQuery>,
) -> Result<Json<TokenResponse>> {
    if let Some(error) = query.error {
        return Err(AppError::Unauthorized(format!("Sign-in failed: {error}")));
    }
    let SessionAccount(current) = signed_in?;

    let account = match accounts.get(current.id).await {
        Ok(account) => account,
        Err(AuthError::Repository(RepositoryError::NotFound)) => {
            clear_current_account(&session)
                .await
                .map_err(|e| session_error(&e))?;
            return Err(AppError::Unauthorized("Account no longer exists".to_string()));
        }
        Err(e) => return Err(e.into()),
    };

    Ok(Json(accounts.token_for(account)?))
}

/// `POST /auth/logout`
pub async fn logout(session: Session) -> Result<StatusCode> {
    clear_current_account(&session)
        .await
        .map_err(|e| session_error(&e))?;
    Ok(StatusCode::NO_CONTENT)
}

/// `GET /api/identity`
pub async fn identity(CurrentIdentity(identity): CurrentIdentity) -> Json<IdentityResponse> {
    Json(IdentityResponse::from(&identity))
}

pub fn endpoints() -> Vec<Endpoint> {
    vec![
        Endpoint::get("/auth/{provider}/login", login)
            .tag(TAG)
            .summary("Start Facebook or Google sign-in")
            .status(StatusCode::SEE_OTHER),
        Endpoint::get(Provider::Facebook.callback_path(), facebook_callback)
            .tag(TAG)
            .summary("Facebook sign-in callback")
            .status(StatusCode::SEE_OTHER),
        Endpoint::get(Provider::Google.callback_path(), google_callback)
            .tag(TAG)
            .summary("Google sign-in callback")
            .status(StatusCode::SEE_OTHER),
        Endpoint::get(SIGN_IN_COMPLETE, current_session)
            .tag(TAG)
            .summary("Exchange the cookie session for a bearer token")
            .query::<SessionQuery>()
            .returns::<TokenResponse>(),
        Endpoint::post("/auth/logout", logout)
            .tag(TAG)
            .summary("Clear the cookie session")
            .status(StatusCode::NO_CONTENT),
        Endpoint::get("/api/identity", identity)
            .tag(TAG)
            .summary("Identity carried by the bearer token")
            .returns::<IdentityResponse>(),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::auth::Claims;

    #[test]
    fn test_anonymous_identity_response() {
        let response = IdentityResponse::from(&Identity::Anonymous);
        assert!(!response.authenticated);
        assert!(response.account_id.is_none());
    }

    #[test]
    fn test_anonymous_identity_omits_absent_fields() {
        let json = serde_json::to_value(IdentityResponse::from(&Identity::Anonymous)).unwrap();
        assert_eq!(json, serde_json::json!({ "authenticated": false }));
    }

    #[test]
    fn test_account_identity_response() {
        let response = IdentityResponse::from(&Identity::Account(Claims {
            id: AccountId::new(3),
            role: Role::Admin,
            exp: 1_900_000_000,
            iat: 1_800_000_000,
        }));
        assert!(response.authenticated);
        assert_eq!(response.account_id, Some(AccountId::new(3)));
        assert_eq!(response.role, Some(Role::Admin));
        assert_eq!(response.expires_at, Some(1_900_000_000));
    }

    #[test]
    fn test_state_key_per_provider() {
        assert_eq!(state_key(Provider::Google), "oauth_state_google");
        assert_ne!(state_key(Provider::Google), state_key(Provider::Facebook));
    }

    #[test]
    fn test_failure_redirect() {
        let response = sign_in_failed("missing_code");
        assert_eq!(
            response.headers().get("location").unwrap(),
            "/auth/session?error=missing_code"
        );
    }
}
