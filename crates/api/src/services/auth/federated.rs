//! Facebook and Google OAuth 2.0 sign-in.
//!
//! # OAuth Flow
//!
//! 1. Generate the provider's authorization URL with `authorization_url()`
//! 2. Redirect the caller to the provider's consent page
//! 3. The provider redirects back to `/signin-{provider}` with a code
//! 4. Exchange the code for an access token with `exchange_code()`
//! 5. Fetch the caller's profile with `fetch_profile()`
//!
//! Credentials are checked lazily: a provider without a client id fails at
//! step 1, never at startup.

use std::fmt;
use std::sync::Arc;

use secrecy::ExposeSecret;
use serde::Deserialize;

use crate::config::{AuthenticationConfig, OAuthCredentials};
use crate::models::account::ExternalProfile;

use super::AuthError;

/// A federated identity provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Provider {
    Facebook,
    Google,
}

impl Provider {
    /// Lower-case name used in paths and stored on accounts.
    #[must_use]
    pub const fn slug(self) -> &'static str {
        match self {
            Self::Facebook => "facebook",
            Self::Google => "google",
        }
    }

    /// Human readable name.
    #[must_use]
    pub const fn display_name(self) -> &'static str {
        match self {
            Self::Facebook => "Facebook",
            Self::Google => "Google",
        }
    }

    /// Path the provider redirects back to.
    #[must_use]
    pub const fn callback_path(self) -> &'static str {
        match self {
            Self::Facebook => "/signin-facebook",
            Self::Google => "/signin-google",
        }
    }

    /// Parse a path segment.
    #[must_use]
    pub fn from_slug(slug: &str) -> Option<Self> {
        match slug.to_ascii_lowercase().as_str() {
            "facebook" => Some(Self::Facebook),
            "google" => Some(Self::Google),
            _ => None,
        }
    }

    const fn authorize_endpoint(self) -> &'static str {
        match self {
            Self::Facebook => "https://www.facebook.com/v18.0/dialog/oauth",
            Self::Google => "https://accounts.google.com/o/oauth2/v2/auth",
        }
    }

    const fn token_endpoint(self) -> &'static str {
        match self {
            Self::Facebook => "https://graph.facebook.com/v18.0/oauth/access_token",
            Self::Google => "https://oauth2.googleapis.com/token",
        }
    }

    const fn profile_endpoint(self) -> &'static str {
        match self {
            Self::Facebook => {
                "https://graph.facebook.com/v18.0/me?fields=id,name,email,first_name,last_name"
            }
            Self::Google => "https://www.googleapis.com/oauth2/v3/userinfo",
        }
    }

    const fn scope(self) -> &'static str {
        match self {
            Self::Facebook => "email public_profile",
            Self::Google => "openid profile email",
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

#[derive(Debug, Deserialize)]
struct FacebookProfile {
    id: String,
    email: Option<String>,
    name: Option<String>,
    first_name: Option<String>,
    last_name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GoogleProfile {
    sub: String,
    email: Option<String>,
    email_verified: Option<bool>,
    given_name: Option<String>,
    family_name: Option<String>,
}

impl From<FacebookProfile> for ExternalProfile {
    fn from(profile: FacebookProfile) -> Self {
        let (first, last) = split_name(profile.first_name, profile.last_name, profile.name);
        Self {
            provider: Provider::Facebook.slug(),
            subject: profile.id,
            email: profile.email,
            first_name: first,
            last_name: last,
        }
    }
}

impl From<GoogleProfile> for ExternalProfile {
    fn from(profile: GoogleProfile) -> Self {
        // Google marks addresses it has not confirmed; those cannot link accounts.
        let email = profile.email.filter(|_| profile.email_verified.unwrap_or(false));
        Self {
            provider: Provider::Google.slug(),
            subject: profile.sub,
            email,
            first_name: profile.given_name.unwrap_or_default(),
            last_name: profile.family_name.unwrap_or_default(),
        }
    }
}

fn split_name(
    first: Option<String>,
    last: Option<String>,
    full: Option<String>,
) -> (String, String) {
    if first.is_some() || last.is_some() {
        return (first.unwrap_or_default(), last.unwrap_or_default());
    }
    let full = full.unwrap_or_default();
    match full.trim().split_once(' ') {
        Some((first, last)) => (first.to_string(), last.trim().to_string()),
        None => (full.trim().to_string(), String::new()),
    }
}

/// Client for both federated providers.
#[derive(Clone)]
pub struct FederatedClient {
    inner: Arc<FederatedClientInner>,
}

struct FederatedClientInner {
    client: reqwest::Client,
    base_url: String,
    facebook: OAuthCredentials,
    google: OAuthCredentials,
}

impl FederatedClient {
    /// Create a client from the `Authentication` configuration section.
    #[must_use]
    pub fn new(config: &AuthenticationConfig, base_url: &str) -> Self {
        Self {
            inner: Arc::new(FederatedClientInner {
                client: reqwest::Client::new(),
                base_url: base_url.trim_end_matches('/').to_string(),
                facebook: config.facebook.clone(),
                google: config.google.clone(),
            }),
        }
    }

    fn credentials(&self, provider: Provider) -> Result<&OAuthCredentials, AuthError> {
        let credentials = match provider {
            Provider::Facebook => &self.inner.facebook,
            Provider::Google => &self.inner.google,
        };
        if credentials.is_configured() {
            Ok(credentials)
        } else {
            Err(AuthError::ProviderNotConfigured(provider.display_name()))
        }
    }

    /// Whether a provider has a client id.
    #[must_use]
    pub fn is_configured(&self, provider: Provider) -> bool {
        self.credentials(provider).is_ok()
    }

    /// Absolute callback URL registered with the provider.
    #[must_use]
    pub fn redirect_uri(&self, provider: Provider) -> String {
        format!("{}{}", self.inner.base_url, provider.callback_path())
    }

    /// Generate the URL that starts sign-in with a provider.
    ///
    /// # Arguments
    ///
    /// * `provider` - Which provider to send the caller to
    /// * `state` - A random string stored in the session to prevent CSRF attacks
    ///
    /// # Errors
    ///
    /// Returns `AuthError::ProviderNotConfigured` if the provider has no client id.
    pub fn authorization_url(&self, provider: Provider, state: &str) -> Result<String, AuthError> {
        let credentials = self.credentials(provider)?;
        Ok(format!(
            "{}?\
            client_id={}&\
            response_type=code&\
            redirect_uri={}&\
            scope={}&\
            state={}",
            provider.authorize_endpoint(),
            urlencoding::encode(&credentials.client_id),
            urlencoding::encode(&self.redirect_uri(provider)),
            urlencoding::encode(provider.scope()),
            urlencoding::encode(state)
        ))
    }

    /// Exchange an authorization code for an access token.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Provider` if the provider rejects the code.
    pub async fn exchange_code(&self, provider: Provider, code: &str) -> Result<String, AuthError> {
        let credentials = self.credentials(provider)?;
        let redirect_uri = self.redirect_uri(provider);

        let params = [
            ("grant_type", "authorization_code"),
            ("client_id", credentials.client_id.as_str()),
            ("client_secret", credentials.client_secret.expose_secret()),
            ("code", code),
            ("redirect_uri", redirect_uri.as_str()),
        ];

        let response = self
            .inner
            .client
            .post(provider.token_endpoint())
            .form(&params)
            .send()
            .await?;

        if !response.status().is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(AuthError::Provider(format!(
                "{provider} token exchange failed: {text}"
            )));
        }

        let token: TokenResponse = response.json().await?;
        Ok(token.access_token)
    }

    /// Fetch the signed-in caller's profile.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Provider` if the provider rejects the token.
    pub async fn fetch_profile(
        &self,
        provider: Provider,
        access_token: &str,
    ) -> Result<ExternalProfile, AuthError> {
        let response = self
            .inner
            .client
            .get(provider.profile_endpoint())
            .bearer_auth(access_token)
            .send()
            .await?;

        if !response.status().is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(AuthError::Provider(format!(
                "{provider} profile request failed: {text}"
            )));
        }

        let profile = match provider {
            Provider::Facebook => response.json::<FacebookProfile>().await?.into(),
            Provider::Google => response.json::<GoogleProfile>().await?.into(),
        };
        Ok(profile)
    }
}

impl fmt::Debug for FederatedClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FederatedClient")
            .field("base_url", &self.inner.base_url)
            .field("facebook", &self.inner.facebook)
            .field("google", &self.inner.google)
            .finish_non_exhaustive()
    }
}

/// Generate a random OAuth `state` value.
#[must_use]
pub fn generate_state() -> String {
    use rand::{Rng, distr::Alphanumeric};
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(32)
        .map(char::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::SecretString;

    fn client(google_id: &str) -> FederatedClient {
        let config = AuthenticationConfig {
            facebook: OAuthCredentials {
                client_id: String::new(),
                client_secret: SecretString::from(String::new()),
            },
            google: OAuthCredentials {
                client_id: google_id.to_string(),
                client_secret: SecretString::from("google-secret".to_string()),
            },
        };
        FederatedClient::new(&config, "https://api.chef.test/")
    }

    #[test]
    fn test_provider_slugs_round_trip() {
        for provider in [Provider::Facebook, Provider::Google] {
            assert_eq!(Provider::from_slug(provider.slug()), Some(provider));
        }
        assert_eq!(Provider::from_slug("Google"), Some(Provider::Google));
        assert_eq!(Provider::from_slug("twitter"), None);
    }

    #[test]
    fn test_authorization_url() {
        let url = client("google-client").authorization_url(Provider::Google, "xyz").unwrap();

        assert!(url.starts_with("https://accounts.google.com/o/oauth2/v2/auth?"));
        assert!(url.contains("client_id=google-client"));
        assert!(url.contains("response_type=code"));
        assert!(url.contains("redirect_uri=https%3A%2F%2Fapi.chef.test%2Fsignin-google"));
        assert!(url.contains("scope=openid%20profile%20email"));
        assert!(url.contains("state=xyz"));
    }

    #[test]
    fn test_unconfigured_provider_fails_at_redirect() {
        let client = client("");
        assert!(!client.is_configured(Provider::Google));
        assert!(matches!(
            client.authorization_url(Provider::Facebook, "s"),
            Err(AuthError::ProviderNotConfigured("Facebook"))
        ));
    }

    #[test]
    fn test_facebook_profile_falls_back_to_full_name() {
        let profile: ExternalProfile = FacebookProfile {
            id: "10".to_string(),
            email: Some("cook@example.com".to_string()),
            name: Some("Ada Lovelace King".to_string()),
            first_name: None,
            last_name: None,
        }
        .into();

        assert_eq!(profile.provider, "facebook");
        assert_eq!(profile.first_name, "Ada");
        assert_eq!(profile.last_name, "Lovelace King");
    }

    #[test]
    fn test_google_unverified_email_is_dropped() {
        let profile: ExternalProfile = GoogleProfile {
            sub: "g-1".to_string(),
            email: Some("cook@example.com".to_string()),
            email_verified: Some(false),
            given_name: Some("Ada".to_string()),
            family_name: None,
        }
        .into();

        assert_eq!(profile.subject, "g-1");
        assert!(profile.email.is_none());
    }

    #[test]
    fn test_generate_state() {
        let a = generate_state();
        let b = generate_state();
        assert_eq!(a.len(), 32);
        assert_ne!(a, b);
    }
}
