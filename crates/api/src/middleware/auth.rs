//! Authentication extractors and the per-endpoint access guard.
//!
//! Bearer identity is established by [`identity_middleware`] for every
//! request and never rejects. Endpoints that need a caller declare an
//! [`Access`] level; [`access_guard`] enforces it after routing. The cookie
//! session identity from federated sign-in is read with [`SessionAccount`].

use axum::{
    extract::{FromRequestParts, Request, State},
    http::request::Parts,
    middleware::Next,
    response::{IntoResponse, Response},
};
use tower_sessions::Session;

use crate::error::{AppError, clear_sentry_user, set_sentry_user};
use crate::models::Access;
use crate::models::session::{CurrentAccount, keys};
use crate::services::auth::{Claims, Identity};
use crate::state::AppState;

/// Resolve the bearer identity and store it as a request extension.
pub async fn identity_middleware(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let (mut parts, body) = request.into_parts();
    let identity = state.identity().resolve(&parts);

    match identity.account_id() {
        Some(id) => set_sentry_user(&id, None),
        None => clear_sentry_user(),
    }

    parts.extensions.insert(identity);
    next.run(Request::from_parts(parts, body)).await
}

fn identity_of(parts: &Parts) -> Identity {
    parts
        .extensions
        .get::<Identity>()
        .cloned()
        .unwrap_or_default()
}

/// Check an identity against an access level.
///
/// # Errors
///
/// `Unauthorized` for anonymous callers, `Forbidden` for non-admins on
/// admin endpoints.
pub fn check_access(access: Access, identity: &Identity) -> Result<(), AppError> {
    match (access, identity) {
        (Access::Public, _) => Ok(()),
        (_, Identity::Anonymous) => Err(AppError::Unauthorized(
            "A valid bearer token is required".to_string(),
        )),
        (Access::Authenticated, Identity::Account(_)) => Ok(()),
        (Access::Admin, identity) if identity.is_admin() => Ok(()),
        (Access::Admin, Identity::Account(_)) => {
            Err(AppError::Forbidden("Administrator role required".to_string()))
        }
    }
}

/// Per-endpoint guard, installed as a route layer with the endpoint's level.
pub async fn access_guard(State(access): State<Access>, request: Request, next: Next) -> Response {
    let identity = request
        .extensions()
        .get::<Identity>()
        .cloned()
        .unwrap_or_default();

    match check_access(access, &identity) {
        Ok(()) => next.run(request).await,
        Err(rejection) => rejection.into_response(),
    }
}

/// The caller's identity; anonymous if no valid token was sent.
pub struct CurrentIdentity(pub Identity);

impl<S> FromRequestParts<S> for CurrentIdentity
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self(identity_of(parts)))
    }
}

/// Extractor that requires a valid bearer token.
///
/// # Example
///
/// ```rust,ignore
/// async fn protected_handler(RequireAuth(claims): RequireAuth) -> impl IntoResponse {
///     format!("Hello, account {}!", claims.id)
/// }
/// ```
pub struct RequireAuth(pub Claims);

impl<S> FromRequestParts<S> for RequireAuth
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let identity = identity_of(parts);
        check_access(Access::Authenticated, &identity)?;
        identity
            .claims()
            .cloned()
            .map(Self)
            .ok_or_else(|| AppError::Unauthorized("A valid bearer token is required".to_string()))
    }
}

/// Extractor that requires a bearer token with the admin role.
pub struct RequireAdmin(pub Claims);

impl<S> FromRequestParts<S> for RequireAdmin
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let identity = identity_of(parts);
        check_access(Access::Admin, &identity)?;
        identity
            .claims()
            .cloned()
            .map(Self)
            .ok_or_else(|| AppError::Unauthorized("A valid bearer token is required".to_string()))
    }
}

/// Extractor for the cookie-session account written by federated sign-in.
pub struct SessionAccount(pub CurrentAccount);

impl<S> FromRequestParts<S> for SessionAccount
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let session = parts
            .extensions
            .get::<Session>()
            .ok_or_else(|| AppError::Internal("session layer not installed".to_string()))?;

        session
            .get::<CurrentAccount>(keys::CURRENT_ACCOUNT)
            .await
            .map_err(|e| AppError::Internal(format!("session: {e}")))?
            .map(Self)
            .ok_or_else(|| AppError::Unauthorized("Not signed in".to_string()))
    }
}

/// Store the signed-in account in the session.
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn set_current_account(
    session: &Session,
    account: &CurrentAccount,
) -> Result<(), tower_sessions::session::Error> {
    // Rotate the session id on privilege change.
    session.cycle_id().await?;
    session.insert(keys::CURRENT_ACCOUNT, account).await
}

/// Clear the session (logout).
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn clear_current_account(session: &Session) -> Result<(), tower_sessions::session::Error> {
    session.flush().await
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;
    use chef_core::{AccountId, Role};

    fn account(role: Role) -> Identity {
        Identity::Account(Claims {
            id: AccountId::new(1),
            role,
            exp: i64::MAX,
            iat: 0,
        })
    }

    fn status(result: Result<(), AppError>) -> Option<StatusCode> {
        result.err().map(|e| e.status())
    }

    #[test]
    fn test_public_admits_everyone() {
        assert!(check_access(Access::Public, &Identity::Anonymous).is_ok());
        assert!(check_access(Access::Public, &account(Role::User)).is_ok());
    }

    #[test]
    fn test_authenticated_rejects_anonymous() {
        assert_eq!(
            status(check_access(Access::Authenticated, &Identity::Anonymous)),
            Some(StatusCode::UNAUTHORIZED)
        );
        assert!(check_access(Access::Authenticated, &account(Role::User)).is_ok());
    }

    #[test]
    fn test_admin_requires_role() {
        assert_eq!(
            status(check_access(Access::Admin, &Identity::Anonymous)),
            Some(StatusCode::UNAUTHORIZED)
        );
        assert_eq!(
            status(check_access(Access::Admin, &account(Role::User))),
            Some(StatusCode::FORBIDDEN)
        );
        assert!(check_access(Access::Admin, &account(Role::Admin)).is_ok());
    }

    fn parts_with(session: Session) -> Parts {
        let (mut parts, ()) = axum::http::Request::new(()).into_parts();
        parts.extensions.insert(session);
        parts
    }

    fn memory_session() -> Session {
        Session::new(
            None,
            std::sync::Arc::new(tower_sessions::MemoryStore::default()),
            None,
        )
    }

    #[tokio::test]
    async fn test_session_account_reads_signed_in_account() {
        let session = memory_session();
        let current = CurrentAccount {
            id: AccountId::new(12),
            email: chef_core::Email::parse("cook@example.com").unwrap(),
            role: Role::User,
            provider: "google".to_string(),
        };
        session.insert(keys::CURRENT_ACCOUNT, &current).await.unwrap();

        let mut parts = parts_with(session);
        let SessionAccount(found) = SessionAccount::from_request_parts(&mut parts, &())
            .await
            .unwrap();
        assert_eq!(found.id, AccountId::new(12));
        assert_eq!(found.provider, "google");
    }

    #[tokio::test]
    async fn test_session_account_requires_sign_in() {
        let mut parts = parts_with(memory_session());
        let err = SessionAccount::from_request_parts(&mut parts, &())
            .await
            .err()
            .unwrap();
        assert_eq!(err.status(), StatusCode::UNAUTHORIZED);
    }
}
