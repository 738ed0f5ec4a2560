//! Account endpoints: registration, email verification, password sign-in
//! and account management.

use axum::{
    Json,
    extract::{Path, Query},
    http::StatusCode,
};

use chef_core::{AccountId, Role};

use crate::error::{AppError, Result};
use crate::middleware::{RequireAdmin, RequireAuth};
use crate::models::account::{
    AccountView, AuthenticateRequest, RegisterRequest, TokenResponse, UpdateAccountRequest,
    VerifyEmailQuery,
};
use crate::models::{Access, Page};
use crate::services::account::Registration;
use crate::services::auth::Claims;
use crate::services::{AccountService, Scoped};

use super::Endpoint;

const TAG: &str = "Accounts";

/// Only the account itself or an admin may act on an account.
fn ensure_self_or_admin(claims: &Claims, id: AccountId) -> Result<()> {
    if claims.id == id || claims.role == Role::Admin {
        Ok(())
    } else {
        Err(AppError::Forbidden(
            "You may only access your own account".to_string(),
        ))
    }
}

/// `POST /api/accounts/register`
pub async fn register(
    accounts: Scoped<AccountService>,
    Json(request): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<AccountView>)> {
    let account = accounts
        .register(Registration {
            email: &request.email,
            password: &request.password,
            first_name: &request.first_name,
            last_name: &request.last_name,
        })
        .await?;
    Ok((StatusCode::CREATED, Json(account.into())))
}

/// `GET /api/accounts/verify-email?token=…`
pub async fn verify_email(
    accounts: Scoped<AccountService>,
    Query(query): Query<VerifyEmailQuery>,
) -> Result<Json<AccountView>> {
    let account = accounts.verify_email(&query.token).await?;
    Ok(Json(account.into()))
}

/// `POST /api/accounts/authenticate`
pub async fn authenticate(
    accounts: Scoped<AccountService>,
    Json(request): Json<AuthenticateRequest>,
) -> Result<Json<TokenResponse>> {
    let token = accounts
        .authenticate(&request.email, &request.password)
        .await?;
    tracing::info!(account_id = %token.account.id, "Password sign-in");
    Ok(Json(token))
}

/// `GET /api/accounts`
pub async fn list(
    _admin: RequireAdmin,
    accounts: Scoped<AccountService>,
    Query(page): Query<Page>,
) -> Result<Json<Vec<AccountView>>> {
    let page = accounts.list(page).await?;
    Ok(Json(page.into_iter().map(AccountView::from).collect()))
}

/// `GET /api/accounts/{id}`
pub async fn show(
    RequireAuth(claims): RequireAuth,
    accounts: Scoped<AccountService>,
    Path(id): Path<i32>,
) -> Result<Json<AccountView>> {
    let id = AccountId::new(id);
    ensure_self_or_admin(&claims, id)?;
    Ok(Json(accounts.get(id).await?.into()))
}

/// `PUT /api/accounts/{id}`
///
/// The role can only be changed by an admin; a non-admin sending one is
/// rejected rather than silently ignored.
pub async fn update(
    RequireAuth(claims): RequireAuth,
    accounts: Scoped<AccountService>,
    Path(id): Path<i32>,
    Json(request): Json<UpdateAccountRequest>,
) -> Result<Json<AccountView>> {
    let id = AccountId::new(id);
    ensure_self_or_admin(&claims, id)?;
    if request.role.is_some() && claims.role != Role::Admin {
        return Err(AppError::Forbidden(
            "Administrator role required to change roles".to_string(),
        ));
    }

    let account = accounts
        .update(id, &request.first_name, &request.last_name, request.role)
        .await?;
    Ok(Json(account.into()))
}

/// `DELETE /api/accounts/{id}`
pub async fn remove(
    RequireAdmin(claims): RequireAdmin,
    accounts: Scoped<AccountService>,
    Path(id): Path<i32>,
) -> Result<StatusCode> {
    let id = AccountId::new(id);
    accounts.delete(id).await?;
    tracing::info!(account_id = %id, admin_id = %claims.id, "Account deleted");
    Ok(StatusCode::NO_CONTENT)
}

pub fn endpoints() -> Vec<Endpoint> {
    vec![
        Endpoint::post("/api/accounts/register", register)
            .tag(TAG)
            .summary("Register a password account")
            .status(StatusCode::CREATED)
            .accepts::<RegisterRequest>()
            .returns::<AccountView>(),
        Endpoint::get("/api/accounts/verify-email", verify_email)
            .tag(TAG)
            .summary("Confirm an email address")
            .query::<VerifyEmailQuery>()
            .returns::<AccountView>(),
        Endpoint::post("/api/accounts/authenticate", authenticate)
            .tag(TAG)
            .summary("Exchange email and password for a bearer token")
            .accepts::<AuthenticateRequest>()
            .returns::<TokenResponse>(),
        Endpoint::get("/api/accounts", list)
            .tag(TAG)
            .summary("List accounts")
            .access(Access::Admin)
            .query::<Page>()
            .returns_list::<AccountView>(),
        Endpoint::get("/api/accounts/{id}", show)
            .tag(TAG)
            .summary("Get an account")
            .access(Access::Authenticated)
            .returns::<AccountView>(),
        Endpoint::put("/api/accounts/{id}", update)
            .tag(TAG)
            .summary("Update an account")
            .access(Access::Authenticated)
            .accepts::<UpdateAccountRequest>()
            .returns::<AccountView>(),
        Endpoint::delete("/api/accounts/{id}", remove)
            .tag(TAG)
            .summary("Delete an account")
            .access(Access::Admin)
            .status(StatusCode::NO_CONTENT),
    ]
}
