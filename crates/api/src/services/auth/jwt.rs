//! Bearer token issuing and resolution.
//!
//! Tokens are HS256 JWTs carrying the account id and role. Resolution is a
//! contract: request parts in, [`Identity`] out. A missing, malformed,
//! expired or forged token resolves to [`Identity::Anonymous`] and the
//! request continues; rejecting is left to per-endpoint access guards.

use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use chrono::Utc;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use chef_core::{AccountId, Role};

use super::AuthError;

/// Claims carried by a bearer token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Account id.
    pub id: AccountId,
    pub role: Role,
    /// Expiry, seconds since the Unix epoch.
    pub exp: i64,
    /// Issued at, seconds since the Unix epoch.
    pub iat: i64,
}

/// Who is calling, as established by the bearer token.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Identity {
    /// No usable token.
    #[default]
    Anonymous,
    /// A valid, unexpired token.
    Account(Claims),
}

impl Identity {
    /// Claims of an authenticated caller.
    #[must_use]
    pub const fn claims(&self) -> Option<&Claims> {
        match self {
            Self::Anonymous => None,
            Self::Account(claims) => Some(claims),
        }
    }

    /// Account id of an authenticated caller.
    #[must_use]
    pub fn account_id(&self) -> Option<AccountId> {
        self.claims().map(|claims| claims.id)
    }

    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.claims().is_some_and(|claims| claims.role == Role::Admin)
    }
}

/// A signed token and its expiry.
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    pub expires_at: i64,
}

/// Signs and verifies bearer tokens with the configured secret.
#[derive(Clone)]
pub struct JwtIssuer {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl_seconds: i64,
}

impl JwtIssuer {
    /// Create an issuer from the signing secret and token lifetime.
    #[must_use]
    pub fn new(secret: &SecretString, ttl_minutes: i64) -> Self {
        let bytes = secret.expose_secret().as_bytes();
        Self {
            encoding: EncodingKey::from_secret(bytes),
            decoding: DecodingKey::from_secret(bytes),
            ttl_seconds: ttl_minutes.saturating_mul(60),
        }
    }

    /// Issue a token for an account.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Token` if signing fails.
    pub fn issue(&self, id: AccountId, role: Role) -> Result<IssuedToken, AuthError> {
        let iat = Utc::now().timestamp();
        let claims = Claims {
            id,
            role,
            exp: iat.saturating_add(self.ttl_seconds),
            iat,
        };
        let token = jsonwebtoken::encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)?;
        Ok(IssuedToken {
            token,
            expires_at: claims.exp,
        })
    }

    /// Verify a token's signature and expiry.
    ///
    /// # Errors
    ///
    /// Returns the `jsonwebtoken` error for any invalid token.
    pub fn verify(&self, token: &str) -> Result<Claims, jsonwebtoken::errors::Error> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp"]);
        jsonwebtoken::decode::<Claims>(token, &self.decoding, &validation).map(|data| data.claims)
    }
}

impl std::fmt::Debug for JwtIssuer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtIssuer")
            .field("ttl_seconds", &self.ttl_seconds)
            .finish_non_exhaustive()
    }
}

/// Maps an incoming request to an identity. Never fails.
pub trait IdentityResolver: Send + Sync + 'static {
    fn resolve(&self, parts: &Parts) -> Identity;
}

/// Resolves `Authorization: Bearer <jwt>` (or a bare `<jwt>`) headers.
#[derive(Debug, Clone)]
pub struct JwtResolver {
    issuer: JwtIssuer,
}

impl JwtResolver {
    #[must_use]
    pub const fn new(issuer: JwtIssuer) -> Self {
        Self { issuer }
    }
}

impl IdentityResolver for JwtResolver {
    fn resolve(&self, parts: &Parts) -> Identity {
        let Some(token) = bearer_token(parts) else {
            return Identity::Anonymous;
        };

        match self.issuer.verify(token) {
            Ok(claims) => Identity::Account(claims),
            Err(e) => {
                tracing::debug!(error = %e, "Ignoring invalid bearer token");
                Identity::Anonymous
            }
        }
    }
}

/// Token text of the `Authorization` header, with or without a `Bearer` prefix.
fn bearer_token(parts: &Parts) -> Option<&str> {
    let value = parts.headers.get(AUTHORIZATION)?.to_str().ok()?.trim();
    let token = match value.split_once(' ') {
        Some((scheme, rest)) if scheme.eq_ignore_ascii_case("bearer") => rest.trim(),
        Some(_) => return None,
        None => value,
    };
    (!token.is_empty()).then_some(token)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    fn issuer() -> JwtIssuer {
        JwtIssuer::new(
            &SecretString::from("k3Y!q9#Lm2$vX7&pR4*tW8^zB1@nC6%d"),
            60,
        )
    }

    fn parts_with(header: Option<&str>) -> Parts {
        let mut builder = Request::builder().uri("/api/identity");
        if let Some(value) = header {
            builder = builder.header(AUTHORIZATION, value);
        }
        builder.body(()).unwrap().into_parts().0
    }

    #[test]
    fn test_issue_and_verify() {
        let issuer = issuer();
        let issued = issuer.issue(AccountId::new(7), Role::Admin).unwrap();
        let claims = issuer.verify(&issued.token).unwrap();

        assert_eq!(claims.id, AccountId::new(7));
        assert_eq!(claims.role, Role::Admin);
        assert_eq!(claims.exp, issued.expires_at);
        assert_eq!(claims.exp - claims.iat, 3600);
    }

    #[test]
    fn test_resolver_accepts_bearer_and_bare_tokens() {
        let issuer = issuer();
        let token = issuer.issue(AccountId::new(3), Role::User).unwrap().token;
        let resolver = JwtResolver::new(issuer);

        let identity = resolver.resolve(&parts_with(Some(&format!("Bearer {token}"))));
        assert_eq!(identity.account_id(), Some(AccountId::new(3)));
        assert!(!identity.is_admin());

        let identity = resolver.resolve(&parts_with(Some(&format!("bearer {token}"))));
        assert_eq!(identity.account_id(), Some(AccountId::new(3)));

        let identity = resolver.resolve(&parts_with(Some(&token)));
        assert_eq!(identity.account_id(), Some(AccountId::new(3)));
    }

    #[test]
    fn test_resolver_never_rejects() {
        let resolver = JwtResolver::new(issuer());

        assert_eq!(resolver.resolve(&parts_with(None)), Identity::Anonymous);
        assert_eq!(
            resolver.resolve(&parts_with(Some("Bearer not.a.jwt"))),
            Identity::Anonymous
        );
        assert_eq!(
            resolver.resolve(&parts_with(Some("Basic dXNlcjpwYXNz"))),
            Identity::Anonymous
        );
        assert_eq!(resolver.resolve(&parts_with(Some("Bearer "))), Identity::Anonymous);
    }

    #[test]
    fn test_token_signed_with_other_secret_is_anonymous() {
        let foreign = JwtIssuer::new(&SecretString::from("a-completely-different-key-Zq81!x"), 60);
        let token = foreign.issue(AccountId::new(1), Role::Admin).unwrap().token;

        let resolver = JwtResolver::new(issuer());
        assert_eq!(
            resolver.resolve(&parts_with(Some(&format!("Bearer {token}")))),
            Identity::Anonymous
        );
    }

    #[test]
    fn test_expired_token_is_anonymous() {
        let expired = JwtIssuer::new(
            &SecretString::from("k3Y!q9#Lm2$vX7&pR4*tW8^zB1@nC6%d"),
            -5,
        );
        let token = expired.issue(AccountId::new(1), Role::User).unwrap().token;

        let resolver = JwtResolver::new(issuer());
        assert_eq!(resolver.resolve(&parts_with(Some(&token))), Identity::Anonymous);
    }
}
