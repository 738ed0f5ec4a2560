//! Application state shared across handlers.

use std::sync::Arc;

use sqlx::PgPool;

use crate::config::ApiConfig;
use crate::services::auth::{FederatedClient, IdentityResolver, JwtIssuer, JwtResolver};
use crate::services::{EmailService, RegistryError, ServiceRegistry, default_registry};

/// Error creating the application state.
#[derive(Debug, thiserror::Error)]
pub enum StateError {
    #[error("service registry: {0}")]
    Registry(#[from] RegistryError),
    #[error("smtp transport: {0}")]
    Smtp(#[from] lettre::transport::smtp::Error),
}

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to
/// shared resources like database connections and configuration.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: ApiConfig,
    pool: PgPool,
    registry: Arc<ServiceRegistry>,
    jwt: JwtIssuer,
    identity: Arc<dyn IdentityResolver>,
    federated: FederatedClient,
    email: EmailService,
}

impl AppState {
    /// Create a new application state with the default service registry.
    ///
    /// # Arguments
    ///
    /// * `config` - API configuration
    /// * `pool` - `PostgreSQL` connection pool
    ///
    /// # Errors
    ///
    /// Returns an error if the registry is misconfigured or SMTP cannot be set up.
    pub fn new(config: ApiConfig, pool: PgPool) -> Result<Self, StateError> {
        let registry = default_registry()?;
        let jwt = JwtIssuer::new(&config.app.jwt_secret, config.app.jwt_ttl_minutes);
        let identity = Arc::new(JwtResolver::new(jwt.clone()));
        Self::with_parts(config, pool, registry, jwt, identity)
    }

    /// Create a state with an explicit registry, token issuer and identity
    /// resolver.
    ///
    /// # Errors
    ///
    /// Returns an error if SMTP cannot be set up.
    pub fn with_parts(
        config: ApiConfig,
        pool: PgPool,
        registry: ServiceRegistry,
        jwt: JwtIssuer,
        identity: Arc<dyn IdentityResolver>,
    ) -> Result<Self, StateError> {
        let federated = FederatedClient::new(&config.authentication, &config.base_url);
        let email = EmailService::new(&config)?;

        Ok(Self {
            inner: Arc::new(AppStateInner {
                config,
                pool,
                registry: Arc::new(registry),
                jwt,
                identity,
                federated,
                email,
            }),
        })
    }

    /// Get a reference to the API configuration.
    #[must_use]
    pub fn config(&self) -> &ApiConfig {
        &self.inner.config
    }

    /// Get a reference to the database connection pool.
    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.inner.pool
    }

    /// The frozen service registry.
    #[must_use]
    pub fn registry(&self) -> &Arc<ServiceRegistry> {
        &self.inner.registry
    }

    /// Bearer token issuer.
    #[must_use]
    pub fn jwt(&self) -> &JwtIssuer {
        &self.inner.jwt
    }

    /// Resolver applied to every request by the identity middleware.
    #[must_use]
    pub fn identity(&self) -> &dyn IdentityResolver {
        self.inner.identity.as_ref()
    }

    /// Facebook / Google OAuth client.
    #[must_use]
    pub fn federated(&self) -> &FederatedClient {
        &self.inner.federated
    }

    /// Shared email sender.
    #[must_use]
    pub fn email(&self) -> &EmailService {
        &self.inner.email
    }
}

#[cfg(test)]
mod tests {
    use axum::http::{Request, header::AUTHORIZATION};
    use chef_core::{AccountId, Role};
    use secrecy::SecretString;

    use super::*;
    use crate::services::auth::Identity;
    use crate::test_support::{config_with, lazy_pool};

    fn bearer_parts(token: &str) -> axum::http::request::Parts {
        Request::builder()
            .header(AUTHORIZATION, format!("Bearer {token}"))
            .body(())
            .unwrap()
            .into_parts()
            .0
    }

    #[tokio::test]
    async fn test_issued_tokens_resolve() {
        let state = AppState::new(config_with(&[]), lazy_pool()).unwrap();
        let token = state.jwt().issue(AccountId::new(5), Role::User).unwrap().token;

        let identity = state.identity().resolve(&bearer_parts(&token));
        assert!(matches!(identity, Identity::Account(claims) if claims.id == AccountId::new(5)));
    }

    #[tokio::test]
    async fn test_explicit_issuer_is_the_one_served() {
        let secret = SecretString::from("Zt5!hW2#cQ8$jR3&nV6*pX1^gB9@mK4%");
        let issuer = JwtIssuer::new(&secret, 5);
        let resolver = Arc::new(JwtResolver::new(issuer.clone()));
        let state = AppState::with_parts(
            config_with(&[]),
            lazy_pool(),
            default_registry().unwrap(),
            issuer,
            resolver,
        )
        .unwrap();

        let token = state.jwt().issue(AccountId::new(9), Role::Admin).unwrap().token;
        let identity = state.identity().resolve(&bearer_parts(&token));
        assert!(matches!(identity, Identity::Account(claims) if claims.role == Role::Admin));
    }
}
