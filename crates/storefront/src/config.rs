//! Storefront configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `NEXTAUTH_SECRET` - Session token signing secret (min 32 chars, high entropy)
//! - `DATABASE_URL` - `PostgreSQL` connection string (or `STOREFRONT_DATABASE_URL`)
//! - `STRAPI_URL` - Base URL of the Strapi CMS (or `NEXT_PUBLIC_BACKEND_BASE_URL`)
//! - `STRAPI_API_TOKEN` - Strapi API token (or `NEXT_PUBLIC_STRAPI_API_TOKEN`)
//!
//! ## Optional
//! - `RANGOLI_HOST` - Bind address (default: 127.0.0.1)
//! - `RANGOLI_PORT` - Listen port (default: 3000)
//! - `RANGOLI_BASE_URL` - Public URL (default: <http://localhost:3000>;
//!   an https scheme turns on the `Secure` cookie attribute)
//! - `GOOGLE_CLIENT_ID` - Google Identity Services client ID for audience
//!   checks on credential logins (or `NEXT_PUBLIC_GOOGLE_CLIENT_ID`)
//! - `APP_ENV` - `development` exposes internal error messages in responses
//! - `SENTRY_DSN` - Sentry error tracking DSN

use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};

use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;

const MIN_SIGNING_SECRET_LENGTH: usize = 32;
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

/// Storefront application configuration.
#[derive(Debug, Clone)]
pub struct StorefrontConfig {
    /// `PostgreSQL` database connection URL (contains password)
    pub database_url: SecretString,
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Public base URL for the storefront
    pub base_url: String,
    /// Session token signing secret
    pub auth_secret: SecretString,
    /// Strapi CMS configuration
    pub strapi: StrapiConfig,
    /// Google Identity Services client ID (audience check for credential logins)
    pub google_client_id: Option<String>,
    /// Whether internal error messages may be exposed in responses
    pub expose_errors: bool,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
}

/// Strapi CMS configuration.
///
/// Implements `Debug` manually to redact the API token.
#[derive(Clone)]
pub struct StrapiConfig {
    /// Base URL of the Strapi instance (e.g., <https://cms.rangolistore.dev>)
    pub base_url: String,
    /// API token sent as a bearer credential on every request
    pub api_token: SecretString,
}

impl std::fmt::Debug for StrapiConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StrapiConfig")
            .field("base_url", &self.base_url)
            .field("api_token", &"[REDACTED]")
            .finish()
    }
}

impl StorefrontConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing, invalid, or
    /// if the signing secret fails validation (placeholder detection, entropy
    /// check).
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let database_url = get_env_with_fallback_secret("STOREFRONT_DATABASE_URL", "DATABASE_URL")?;
        let host = get_env_or_default("RANGOLI_HOST", "127.0.0.1")
            .parse::<IpAddr>()
            .map_err(|e| ConfigError::InvalidEnvVar("RANGOLI_HOST".to_string(), e.to_string()))?;
        let port = get_env_or_default("RANGOLI_PORT", "3000")
            .parse::<u16>()
            .map_err(|e| ConfigError::InvalidEnvVar("RANGOLI_PORT".to_string(), e.to_string()))?;
        let base_url = get_env_or_default("RANGOLI_BASE_URL", "http://localhost:3000");

        let auth_secret = get_validated_secret("NEXTAUTH_SECRET")?;
        validate_signing_secret(&auth_secret, "NEXTAUTH_SECRET")?;

        let strapi = StrapiConfig::from_env()?;
        let google_client_id =
            get_optional_env("GOOGLE_CLIENT_ID").or_else(|| get_optional_env("NEXT_PUBLIC_GOOGLE_CLIENT_ID"));
        let expose_errors = get_optional_env("APP_ENV").as_deref() == Some("development");
        let sentry_dsn = get_optional_env("SENTRY_DSN");

        Ok(Self {
            database_url,
            host,
            port,
            base_url,
            auth_secret,
            strapi,
            google_client_id,
            expose_errors,
            sentry_dsn,
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    /// Whether session cookies should carry the `Secure` attribute.
    #[must_use]
    pub fn cookie_secure(&self) -> bool {
        self.base_url.starts_with("https://")
    }
}

impl StrapiConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let base_url = get_env_with_fallback("STRAPI_URL", "NEXT_PUBLIC_BACKEND_BASE_URL")?;
        url::Url::parse(&base_url)
            .map_err(|e| ConfigError::InvalidEnvVar("STRAPI_URL".to_string(), e.to_string()))?;
        let api_token = get_env_with_fallback_secret("STRAPI_API_TOKEN", "NEXT_PUBLIC_STRAPI_API_TOKEN")?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_token,
        })
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get a required environment variable.
fn get_required_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}

/// Get a required environment variable, trying a fallback key first.
///
/// The fallback keys mirror the names the storefront client deploys with, so a
/// shared environment file works for both processes.
fn get_env_with_fallback(primary_key: &str, fallback_key: &str) -> Result<String, ConfigError> {
    if let Ok(value) = std::env::var(primary_key) {
        return Ok(value);
    }
    if let Ok(value) = std::env::var(fallback_key) {
        return Ok(value);
    }
    Err(ConfigError::MissingEnvVar(primary_key.to_string()))
}

/// Get a required secret environment variable, trying a fallback key first.
fn get_env_with_fallback_secret(
    primary_key: &str,
    fallback_key: &str,
) -> Result<SecretString, ConfigError> {
    get_env_with_fallback(primary_key, fallback_key).map(SecretString::from)
}

/// Get an optional environment variable.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Validate that a signing secret meets minimum length requirements.
fn validate_signing_secret(secret: &SecretString, var_name: &str) -> Result<(), ConfigError> {
    let value = secret.expose_secret();
    if value.len() < MIN_SIGNING_SECRET_LENGTH {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "must be at least {} characters (got {})",
                MIN_SIGNING_SECRET_LENGTH,
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
    let len = s.len() as f64;
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

    // Check blocklist
    for pattern in PLACEHOLDER_PATTERNS {
        if lower.contains(pattern) {
            return Err(ConfigError::InsecureSecret(
                var_name.to_string(),
                format!("appears to be a placeholder (contains '{pattern}')"),
            ));
        }
    }

    // Check entropy (real secrets like API keys have high entropy)
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
fn get_validated_secret(key: &str) -> Result<SecretString, ConfigError> {
    let value = get_required_env(key)?;
    validate_secret_strength(&value, key)?;
    Ok(SecretString::from(value))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_shannon_entropy_empty() {
        assert!((shannon_entropy("") - 0.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_shannon_entropy_single_char() {
        // All same character = 0 entropy
        assert!((shannon_entropy("aaaaaaa") - 0.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_shannon_entropy_two_chars() {
        // "ab" has entropy of 1 bit per char (50% a, 50% b)
        let entropy = shannon_entropy("ab");
        assert!((entropy - 1.0).abs() < 0.01);
    }

    #[test]
    fn test_shannon_entropy_high() {
        // Random-looking string should have high entropy
        let entropy = shannon_entropy("aB3$xY9!mK2@nL5#");
        assert!(entropy > 3.3);
    }

    #[test]
    fn test_validate_secret_strength_placeholder() {
        let result = validate_secret_strength("your-signing-key-here", "TEST_VAR");
        assert!(result.is_err());
        let err = result.unwrap_err();
        assert!(matches!(err, ConfigError::InsecureSecret(_, _)));
    }

    #[test]
    fn test_validate_secret_strength_changeme() {
        let result = validate_secret_strength("changeme123", "TEST_VAR");
        assert!(result.is_err());
    }

    #[test]
    fn test_validate_secret_strength_low_entropy() {
        let result = validate_secret_strength("aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa", "TEST_VAR");
        assert!(result.is_err());
        let err = result.unwrap_err();
        assert!(matches!(err, ConfigError::InsecureSecret(_, _)));
    }

    #[test]
    fn test_validate_secret_strength_valid() {
        // High-entropy random string
        let result = validate_secret_strength("aB3$xY9!mK2@nL5#pQ7&rT0*uW4^zC6", "TEST_VAR");
        assert!(result.is_ok());
    }

    #[test]
    fn test_validate_signing_secret_too_short() {
        let secret = SecretString::from("short");
        let result = validate_signing_secret(&secret, "TEST_SECRET");
        assert!(result.is_err());
    }

    #[test]
    fn test_validate_signing_secret_valid_length() {
        let secret = SecretString::from("a".repeat(32));
        let result = validate_signing_secret(&secret, "TEST_SECRET");
        assert!(result.is_ok());
    }

    fn test_config() -> StorefrontConfig {
        StorefrontConfig {
            database_url: SecretString::from("postgres://localhost/test"),
            host: "127.0.0.1".parse().unwrap(),
            port: 3000,
            base_url: "http://localhost:3000".to_string(),
            auth_secret: SecretString::from("x".repeat(32)),
            strapi: StrapiConfig {
                base_url: "http://localhost:1337".to_string(),
                api_token: SecretString::from("token"),
            },
            google_client_id: None,
            expose_errors: false,
            sentry_dsn: None,
        }
    }

    #[test]
    fn test_socket_addr() {
        let config = test_config();
        let addr = config.socket_addr();
        assert_eq!(addr.ip().to_string(), "127.0.0.1");
        assert_eq!(addr.port(), 3000);
    }

    #[test]
    fn test_cookie_secure_follows_base_url_scheme() {
        let mut config = test_config();
        assert!(!config.cookie_secure());
        config.base_url = "https://rangolistore.dev".to_string();
        assert!(config.cookie_secure());
    }

    #[test]
    fn test_strapi_config_debug_redacts_token() {
        let config = StrapiConfig {
            base_url: "http://localhost:1337".to_string(),
            api_token: SecretString::from("super_secret_api_token"),
        };

        let debug_output = format!("{config:?}");

        assert!(debug_output.contains("http://localhost:1337"));
        assert!(debug_output.contains("[REDACTED]"));
        assert!(!debug_output.contains("super_secret_api_token"));
    }
}
