//! API configuration loaded from environment variables.
//!
//! The configuration is read once at startup into an immutable [`ApiConfig`]
//! and handed to every component that needs it. Keys mirror the hierarchical
//! settings of the deployment (`AppSettings:Secret` becomes
//! `APPSETTINGS_SECRET`, `Authentication:Google:ClientId` becomes
//! `AUTHENTICATION_GOOGLE_CLIENTID`).
//!
//! # Environment Variables
//!
//! ## Required
//! - `CHEF_DATABASE_URL` - `PostgreSQL` connection string (falls back to `DATABASE_URL`)
//! - `APPSETTINGS_SECRET` - JWT signing secret (min 32 chars, high entropy)
//!
//! ## Optional
//! - `CHEF_HOST` - Bind address (default: 127.0.0.1)
//! - `CHEF_PORT` - Listen port (default: 5000)
//! - `CHEF_BASE_URL` - Public URL, used for OAuth callbacks (default: `http://localhost:5000`)
//! - `CHEF_ENVIRONMENT` - `development` or `production` (default: production)
//! - `APPSETTINGS_JWT_TTL_MINUTES` - Bearer token lifetime (default: 60)
//! - `APPSETTINGS_EMAIL_FROM` - Sender of account emails (default: `no-reply@chef.local`)
//! - `AUTHENTICATION_FACEBOOK_APPID` / `AUTHENTICATION_FACEBOOK_APPSECRET`
//! - `AUTHENTICATION_GOOGLE_CLIENTID` / `AUTHENTICATION_GOOGLE_CLIENTSECRET`
//! - `ALLOWEDHOSTS` - `;`-separated host allow list (empty or `*` disables filtering)
//! - `SMTP_HOST`, `SMTP_PORT`, `SMTP_USERNAME`, `SMTP_PASSWORD` - all or none
//! - `SENTRY_DSN`, `SENTRY_ENVIRONMENT`, `SENTRY_SAMPLE_RATE`, `SENTRY_TRACES_SAMPLE_RATE`
//!
//! Federated provider credentials are deliberately not validated here: a
//! missing or wrong client id only breaks that provider's sign-in redirect.

use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};

use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;

const MIN_JWT_SECRET_LENGTH: usize = 32;
const MIN_ENTROPY_BITS_PER_CHAR: f64 = 3.3;

/// Blocklist of common placeholder patterns (case-insensitive)
const PLACEHOLDER_PATTERNS: &[&str] = &[
    "your-",
    "changeme",
    "replace",
    "placeholder",
    "example",
    "secret",
    "password",
    "xxx",
    "todo",
    "fixme",
    "insert",
    "enter-",
    "put-your",
    "add-your",
];

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
    #[error("Insecure secret in {0}: {1}")]
    InsecureSecret(String, String),
}

/// Hosting environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Environment {
    /// Local development: developer exception page and error details.
    Development,
    /// Anything else.
    #[default]
    Production,
}

impl Environment {
    /// Whether error details may be shown to clients.
    #[must_use]
    pub const fn is_development(self) -> bool {
        matches!(self, Self::Development)
    }

    fn parse(value: &str) -> Result<Self, ConfigError> {
        match value.to_ascii_lowercase().as_str() {
            "development" | "dev" => Ok(Self::Development),
            "production" | "prod" | "staging" => Ok(Self::Production),
            other => Err(ConfigError::InvalidEnvVar(
                "CHEF_ENVIRONMENT".to_string(),
                format!("unknown environment '{other}'"),
            )),
        }
    }
}

/// Chef API configuration.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// `PostgreSQL` database connection URL (contains password)
    pub database_url: SecretString,
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Public base URL of the API
    pub base_url: String,
    /// Hosting environment
    pub environment: Environment,
    /// Application settings (JWT, mail sender)
    pub app: AppSettings,
    /// Federated identity providers
    pub authentication: AuthenticationConfig,
    /// Hosts accepted by host filtering; empty means any host
    pub allowed_hosts: Vec<String>,
    /// SMTP delivery (optional - emails are logged when absent)
    pub email: Option<EmailConfig>,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment (e.g., "development", "staging", "production")
    pub sentry_environment: Option<String>,
    /// Sentry error sample rate (0.0 to 1.0)
    pub sentry_sample_rate: f32,
    /// Sentry traces sample rate for performance monitoring (0.0 to 1.0)
    pub sentry_traces_sample_rate: f32,
}

/// Strongly typed `AppSettings` section.
#[derive(Clone)]
pub struct AppSettings {
    /// HMAC secret for signing bearer tokens
    pub jwt_secret: SecretString,
    /// Bearer token lifetime in minutes
    pub jwt_ttl_minutes: i64,
    /// Sender address of account emails
    pub email_from: String,
}

impl std::fmt::Debug for AppSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppSettings")
            .field("jwt_secret", &"[REDACTED]")
            .field("jwt_ttl_minutes", &self.jwt_ttl_minutes)
            .field("email_from", &self.email_from)
            .finish()
    }
}

/// OAuth client credentials of one federated provider.
///
/// Implements `Debug` manually to redact the client secret.
#[derive(Clone)]
pub struct OAuthCredentials {
    /// OAuth client (app) ID
    pub client_id: String,
    /// OAuth client (app) secret
    pub client_secret: SecretString,
}

impl OAuthCredentials {
    /// Whether the provider has a client id at all.
    #[must_use]
    pub fn is_configured(&self) -> bool {
        !self.client_id.trim().is_empty()
    }
}

impl std::fmt::Debug for OAuthCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OAuthCredentials")
            .field("client_id", &self.client_id)
            .field("client_secret", &"[REDACTED]")
            .finish()
    }
}

/// The `Authentication` section.
#[derive(Debug, Clone)]
pub struct AuthenticationConfig {
    /// Facebook `AppId` / `AppSecret`
    pub facebook: OAuthCredentials,
    /// Google `ClientId` / `ClientSecret`
    pub google: OAuthCredentials,
}

/// SMTP configuration for account emails.
#[derive(Clone)]
pub struct EmailConfig {
    /// SMTP server hostname
    pub smtp_host: String,
    /// SMTP server port
    pub smtp_port: u16,
    /// SMTP authentication username
    pub smtp_username: String,
    /// SMTP authentication password
    pub smtp_password: SecretString,
}

impl std::fmt::Debug for EmailConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EmailConfig")
            .field("smtp_host", &self.smtp_host)
            .field("smtp_port", &self.smtp_port)
            .field("smtp_username", &self.smtp_username)
            .field("smtp_password", &"[REDACTED]")
            .finish()
    }
}

/// Source of raw configuration values.
///
/// Production reads the process environment; tests pass a map so they never
/// touch global state.
trait Lookup {
    fn get(&self, key: &str) -> Option<String>;
}

struct ProcessEnv;

impl Lookup for ProcessEnv {
    fn get(&self, key: &str) -> Option<String> {
        std::env::var(key).ok()
    }
}

impl Lookup for HashMap<String, String> {
    fn get(&self, key: &str) -> Option<String> {
        HashMap::get(self, key).cloned()
    }
}

impl ApiConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing, invalid, or
    /// if the JWT secret fails validation (placeholder detection, entropy check).
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();
        Self::load(&ProcessEnv)
    }

    /// Load configuration from an explicit key/value map.
    ///
    /// # Errors
    ///
    /// Same as [`ApiConfig::from_env`].
    pub fn from_map(values: &HashMap<String, String>) -> Result<Self, ConfigError> {
        Self::load(values)
    }

    fn load(env: &impl Lookup) -> Result<Self, ConfigError> {
        let database_url = get_database_url(env, "CHEF_DATABASE_URL")?;
        let host = get_env_or_default(env, "CHEF_HOST", "127.0.0.1")
            .parse::<IpAddr>()
            .map_err(|e| ConfigError::InvalidEnvVar("CHEF_HOST".to_string(), e.to_string()))?;
        let port = get_env_or_default(env, "CHEF_PORT", "5000")
            .parse::<u16>()
            .map_err(|e| ConfigError::InvalidEnvVar("CHEF_PORT".to_string(), e.to_string()))?;
        let base_url = get_env_or_default(env, "CHEF_BASE_URL", "http://localhost:5000")
            .trim_end_matches('/')
            .to_string();
        url::Url::parse(&base_url)
            .map_err(|e| ConfigError::InvalidEnvVar("CHEF_BASE_URL".to_string(), e.to_string()))?;
        let environment =
            Environment::parse(&get_env_or_default(env, "CHEF_ENVIRONMENT", "production"))?;

        let app = AppSettings::load(env)?;
        let authentication = AuthenticationConfig::load(env);
        let allowed_hosts = parse_allowed_hosts(get_optional_env(env, "ALLOWEDHOSTS").as_deref());
        let email = EmailConfig::load(env)?;

        let sentry_dsn = get_optional_env(env, "SENTRY_DSN");
        let sentry_environment = get_optional_env(env, "SENTRY_ENVIRONMENT");
        let sentry_sample_rate = parse_rate(env, "SENTRY_SAMPLE_RATE", 1.0)?;
        let sentry_traces_sample_rate = parse_rate(env, "SENTRY_TRACES_SAMPLE_RATE", 0.0)?;

        Ok(Self {
            database_url,
            host,
            port,
            base_url,
            environment,
            app,
            authentication,
            allowed_hosts,
            email,
            sentry_dsn,
            sentry_environment,
            sentry_sample_rate,
            sentry_traces_sample_rate,
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

impl AppSettings {
    fn load(env: &impl Lookup) -> Result<Self, ConfigError> {
        let jwt_secret = get_validated_secret(env, "APPSETTINGS_SECRET")?;
        validate_secret_length(&jwt_secret, "APPSETTINGS_SECRET")?;

        let jwt_ttl_minutes = get_env_or_default(env, "APPSETTINGS_JWT_TTL_MINUTES", "60")
            .parse::<i64>()
            .ok()
            .filter(|minutes| *minutes > 0)
            .ok_or_else(|| {
                ConfigError::InvalidEnvVar(
                    "APPSETTINGS_JWT_TTL_MINUTES".to_string(),
                    "must be a positive number of minutes".to_string(),
                )
            })?;

        Ok(Self {
            jwt_secret,
            jwt_ttl_minutes,
            email_from: get_env_or_default(env, "APPSETTINGS_EMAIL_FROM", "no-reply@chef.local"),
        })
    }
}

impl AuthenticationConfig {
    fn load(env: &impl Lookup) -> Self {
        Self {
            facebook: OAuthCredentials {
                client_id: get_env_or_default(env, "AUTHENTICATION_FACEBOOK_APPID", ""),
                client_secret: SecretString::from(get_env_or_default(
                    env,
                    "AUTHENTICATION_FACEBOOK_APPSECRET",
                    "",
                )),
            },
            google: OAuthCredentials {
                client_id: get_env_or_default(env, "AUTHENTICATION_GOOGLE_CLIENTID", ""),
                client_secret: SecretString::from(get_env_or_default(
                    env,
                    "AUTHENTICATION_GOOGLE_CLIENTSECRET",
                    "",
                )),
            },
        }
    }
}

impl EmailConfig {
    fn load(env: &impl Lookup) -> Result<Option<Self>, ConfigError> {
        let Some(smtp_host) = get_optional_env(env, "SMTP_HOST") else {
            return Ok(None);
        };

        let smtp_port = get_env_or_default(env, "SMTP_PORT", "587")
            .parse::<u16>()
            .map_err(|e| ConfigError::InvalidEnvVar("SMTP_PORT".to_string(), e.to_string()))?;

        Ok(Some(Self {
            smtp_host,
            smtp_port,
            smtp_username: get_required_env(env, "SMTP_USERNAME")?,
            smtp_password: SecretString::from(get_required_env(env, "SMTP_PASSWORD")?),
        }))
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get a required environment variable.
fn get_required_env(env: &impl Lookup, key: &str) -> Result<String, ConfigError> {
    env.get(key)
        .ok_or_else(|| ConfigError::MissingEnvVar(key.to_string()))
}

/// Get database URL with fallback to generic `DATABASE_URL`.
fn get_database_url(env: &impl Lookup, primary_key: &str) -> Result<SecretString, ConfigError> {
    env.get(primary_key)
        .or_else(|| env.get("DATABASE_URL"))
        .map(SecretString::from)
        .ok_or_else(|| ConfigError::MissingEnvVar(primary_key.to_string()))
}

/// Get an optional environment variable; blank values count as absent.
fn get_optional_env(env: &impl Lookup, key: &str) -> Option<String> {
    env.get(key).filter(|value| !value.trim().is_empty())
}

/// Get an environment variable with a default value.
fn get_env_or_default(env: &impl Lookup, key: &str, default: &str) -> String {
    env.get(key).unwrap_or_else(|| default.to_string())
}

fn parse_rate(env: &impl Lookup, key: &str, default: f32) -> Result<f32, ConfigError> {
    let Some(raw) = get_optional_env(env, key) else {
        return Ok(default);
    };
    raw.parse::<f32>()
        .ok()
        .filter(|rate| (0.0..=1.0).contains(rate))
        .ok_or_else(|| {
            ConfigError::InvalidEnvVar(key.to_string(), "must be between 0.0 and 1.0".to_string())
        })
}

/// Split a `;`-separated host list. `*` anywhere means "allow any host".
fn parse_allowed_hosts(raw: Option<&str>) -> Vec<String> {
    let hosts: Vec<String> = raw
        .unwrap_or_default()
        .split(';')
        .map(str::trim)
        .filter(|host| !host.is_empty())
        .map(str::to_ascii_lowercase)
        .collect();

    if hosts.iter().any(|host| host == "*") {
        return Vec::new();
    }
    hosts
}

/// Validate that the JWT secret meets minimum length requirements.
fn validate_secret_length(secret: &SecretString, var_name: &str) -> Result<(), ConfigError> {
    let value = secret.expose_secret();
    if value.len() < MIN_JWT_SECRET_LENGTH {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "must be at least {} characters (got {})",
                MIN_JWT_SECRET_LENGTH,
                value.len()
            ),
        ));
    }
    Ok(())
}

/// Calculate Shannon entropy in bits per character.
fn shannon_entropy(s: &str) -> f64 {
    if s.is_empty() {
        return 0.0;
    }

    let mut freq: HashMap<char, usize> = HashMap::new();
    for c in s.chars() {
        *freq.entry(c).or_insert(0) += 1;
    }

    #[allow(clippy::cast_precision_loss)] // String length will never exceed f64 precision
    let len = s.chars().count() as f64;
    freq.values()
        .map(|&count| {
            #[allow(clippy::cast_precision_loss)] // Character count will never exceed f64 precision
            let p = count as f64 / len;
            -p * p.log2()
        })
        .sum()
}

/// Validate that a secret is not a placeholder and has sufficient entropy.
fn validate_secret_strength(secret: &str, var_name: &str) -> Result<(), ConfigError> {
    let lower = secret.to_lowercase();

    if let Some(pattern) = PLACEHOLDER_PATTERNS.iter().find(|p| lower.contains(*p)) {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!("appears to be a placeholder (contains '{pattern}')"),
        ));
    }

    let entropy = shannon_entropy(secret);
    if entropy < MIN_ENTROPY_BITS_PER_CHAR {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "entropy too low ({entropy:.2} bits/char, need >= {MIN_ENTROPY_BITS_PER_CHAR:.1}). Use a randomly generated secret."
            ),
        ));
    }

    Ok(())
}

/// Load and validate a secret from environment.
fn get_validated_secret(env: &impl Lookup, key: &str) -> Result<SecretString, ConfigError> {
    let value = get_required_env(env, key)?;
    validate_secret_strength(&value, key)?;
    Ok(SecretString::from(value))
}
