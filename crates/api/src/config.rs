//! API configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `JWT_SECRET_KEY` - Token signing secret (min 32 chars, high entropy)
//!
//! ## Optional
//! - `DATABASE_URL` - `SQLite` connection string (default: `sqlite://data.db`)
//! - `STOREKEEP_HOST` - Bind address (default: 127.0.0.1)
//! - `STOREKEEP_PORT` - Listen port (default: 5000)
//! - `JWT_EXPIRES_MINUTES` - Access token lifetime (default: 15)
//! - `OPERATION_TIMEOUT_SECS` - Upper bound for one service operation (default: 5)
//! - `BLOCKLIST_PURGE_INTERVAL_SECS` - How often expired revocations are purged (default: 3600)
//! - `MAILGUN_DOMAIN`, `MAILGUN_API_KEY`, `MAILGUN_SENDER` - Welcome emails (all or none)
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name

use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

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

/// API server configuration.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// `SQLite` database connection URL
    pub database_url: SecretString,
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Access token settings
    pub jwt: JwtConfig,
    /// Upper bound on the duration of a single service operation
    pub operation_timeout: Duration,
    /// Interval between blocklist purges
    pub purge_interval: Duration,
    /// Mailgun credentials for welcome emails (disabled when absent)
    pub mailgun: Option<MailgunConfig>,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment name
    pub sentry_environment: Option<String>,
}

/// Access token signing configuration.
#[derive(Debug, Clone)]
pub struct JwtConfig {
    /// HMAC signing secret
    pub secret: SecretString,
    /// Lifetime of issued access tokens
    pub expires_in: Duration,
}

/// Mailgun notifier configuration.
///
/// Implements `Debug` manually to redact the API key.
#[derive(Clone)]
pub struct MailgunConfig {
    /// Sending domain (e.g., mg.example.org)
    pub domain: String,
    /// Private API key
    pub api_key: SecretString,
    /// `From:` header for outgoing mail
    pub sender: String,
}

impl std::fmt::Debug for MailgunConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MailgunConfig")
            .field("domain", &self.domain)
            .field("api_key", &"[REDACTED]")
            .field("sender", &self.sender)
            .finish()
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
    /// if the signing secret fails validation (placeholder detection, entropy check).
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary variable source.
    ///
    /// # Errors
    ///
    /// Same as [`ApiConfig::from_env`].
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let vars = Vars(&lookup);

        let database_url = SecretString::from(vars.or_default("DATABASE_URL", "sqlite://data.db"));
        let host = vars.parsed::<IpAddr>("STOREKEEP_HOST", "127.0.0.1")?;
        let port = vars.parsed::<u16>("STOREKEEP_PORT", "5000")?;

        let secret = vars.validated_secret("JWT_SECRET_KEY")?;
        validate_secret_length(&secret, "JWT_SECRET_KEY")?;
        let expires_minutes = vars.parsed::<u64>("JWT_EXPIRES_MINUTES", "15")?;
        if expires_minutes == 0 {
            return Err(ConfigError::InvalidEnvVar(
                "JWT_EXPIRES_MINUTES".to_string(),
                "must be greater than zero".to_string(),
            ));
        }
        let expires_secs = expires_minutes.checked_mul(60).ok_or_else(|| {
            ConfigError::InvalidEnvVar(
                "JWT_EXPIRES_MINUTES".to_string(),
                "too large".to_string(),
            )
        })?;

        let operation_timeout = vars.parsed::<u64>("OPERATION_TIMEOUT_SECS", "5")?;
        let purge_interval = vars.parsed::<u64>("BLOCKLIST_PURGE_INTERVAL_SECS", "3600")?;

        Ok(Self {
            database_url,
            host,
            port,
            jwt: JwtConfig {
                secret,
                expires_in: Duration::from_secs(expires_secs),
            },
            operation_timeout: Duration::from_secs(operation_timeout.max(1)),
            purge_interval: Duration::from_secs(purge_interval.max(1)),
            mailgun: MailgunConfig::from_vars(&vars)?,
            sentry_dsn: vars.optional("SENTRY_DSN"),
            sentry_environment: vars.optional("SENTRY_ENVIRONMENT"),
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

impl MailgunConfig {
    /// Mailgun is all-or-nothing: either every variable is set or none is.
    fn from_vars<F>(vars: &Vars<'_, F>) -> Result<Option<Self>, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let domain = vars.optional("MAILGUN_DOMAIN");
        let api_key = vars.optional("MAILGUN_API_KEY");
        let sender = vars.optional("MAILGUN_SENDER");

        match (domain, api_key, sender) {
            (None, None, None) => Ok(None),
            (Some(domain), Some(api_key), sender) => {
                let sender = sender.unwrap_or_else(|| format!("Storekeep <mailgun@{domain}>"));
                Ok(Some(Self {
                    domain,
                    api_key: SecretString::from(api_key),
                    sender,
                }))
            }
            (None, _, _) => Err(ConfigError::MissingEnvVar("MAILGUN_DOMAIN".to_string())),
            (Some(_), None, _) => Err(ConfigError::MissingEnvVar("MAILGUN_API_KEY".to_string())),
        }
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Variable source with the lookup helpers used during loading.
struct Vars<'a, F>(&'a F);

impl<F> Vars<'_, F>
where
    F: Fn(&str) -> Option<String>,
{
    /// Get an optional variable, treating empty values as unset.
    fn optional(&self, key: &str) -> Option<String> {
        (self.0)(key).filter(|v| !v.trim().is_empty())
    }

    /// Get a required variable.
    fn required(&self, key: &str) -> Result<String, ConfigError> {
        self.optional(key)
            .ok_or_else(|| ConfigError::MissingEnvVar(key.to_string()))
    }

    /// Get a variable with a default value.
    fn or_default(&self, key: &str, default: &str) -> String {
        self.optional(key).unwrap_or_else(|| default.to_string())
    }

    /// Get a variable with a default value and parse it.
    fn parsed<T>(&self, key: &str, default: &str) -> Result<T, ConfigError>
    where
        T: std::str::FromStr,
        T::Err: std::fmt::Display,
    {
        self.or_default(key, default)
            .parse::<T>()
            .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
    }

    /// Load and validate a secret.
    fn validated_secret(&self, key: &str) -> Result<SecretString, ConfigError> {
        let value = self.required(key)?;
        validate_secret_strength(&value, key)?;
        Ok(SecretString::from(value))
    }
}

/// Validate that a signing secret meets minimum length requirements.
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

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const GOOD_SECRET: &str = "aB3$xY9!mK2@nL5#pQ7&rT0*uW4^zC6%";

    fn load(pairs: &[(&str, &str)]) -> Result<ApiConfig, ConfigError> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        ApiConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults_applied() {
        let config = load(&[("JWT_SECRET_KEY", GOOD_SECRET)]).unwrap();

        assert_eq!(config.database_url.expose_secret(), "sqlite://data.db");
        assert_eq!(config.socket_addr().to_string(), "127.0.0.1:5000");
        assert_eq!(config.jwt.expires_in, Duration::from_secs(15 * 60));
        assert_eq!(config.operation_timeout, Duration::from_secs(5));
        assert_eq!(config.purge_interval, Duration::from_secs(3600));
        assert!(config.mailgun.is_none());
        assert!(config.sentry_dsn.is_none());
    }

    #[test]
    fn test_missing_jwt_secret() {
        let err = load(&[]).unwrap_err();
        assert!(matches!(err, ConfigError::MissingEnvVar(ref k) if k == "JWT_SECRET_KEY"));
    }

    #[test]
    fn test_short_jwt_secret_rejected() {
        let err = load(&[("JWT_SECRET_KEY", "aB3$xY9!mK2@")]).unwrap_err();
        assert!(matches!(err, ConfigError::InsecureSecret(_, _)));
    }

    #[test]
    fn test_zero_expiry_rejected() {
        let err = load(&[
            ("JWT_SECRET_KEY", GOOD_SECRET),
            ("JWT_EXPIRES_MINUTES", "0"),
        ])
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEnvVar(_, _)));
    }

    #[test]
    fn test_overflowing_expiry_rejected() {
        let err = load(&[
            ("JWT_SECRET_KEY", GOOD_SECRET),
            ("JWT_EXPIRES_MINUTES", u64::MAX.to_string().as_str()),
        ])
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEnvVar(ref k, _) if k == "JWT_EXPIRES_MINUTES"));
    }

    #[test]
    fn test_invalid_port() {
        let err = load(&[("JWT_SECRET_KEY", GOOD_SECRET), ("STOREKEEP_PORT", "http")]).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEnvVar(ref k, _) if k == "STOREKEEP_PORT"));
    }

    #[test]
    fn test_mailgun_all_or_none() {
        let err = load(&[
            ("JWT_SECRET_KEY", GOOD_SECRET),
            ("MAILGUN_DOMAIN", "mg.shop.test"),
        ])
        .unwrap_err();
        assert!(matches!(err, ConfigError::MissingEnvVar(ref k) if k == "MAILGUN_API_KEY"));

        let config = load(&[
            ("JWT_SECRET_KEY", GOOD_SECRET),
            ("MAILGUN_DOMAIN", "mg.shop.test"),
            ("MAILGUN_API_KEY", "key-0123"),
        ])
        .unwrap();
        let mailgun = config.mailgun.unwrap();
        assert_eq!(mailgun.sender, "Storekeep <mailgun@mg.shop.test>");
    }

    #[test]
    fn test_mailgun_debug_redacts_key() {
        let config = MailgunConfig {
            domain: "mg.shop.test".to_string(),
            api_key: SecretString::from("key-super-private"),
            sender: "ops@shop.test".to_string(),
        };
        let debug_output = format!("{config:?}");

        assert!(debug_output.contains("mg.shop.test"));
        assert!(debug_output.contains("[REDACTED]"));
        assert!(!debug_output.contains("key-super-private"));
    }

    #[test]
    fn test_shannon_entropy() {
        assert!((shannon_entropy("") - 0.0).abs() < f64::EPSILON);
        assert!((shannon_entropy("aaaaaaa") - 0.0).abs() < f64::EPSILON);
        assert!((shannon_entropy("ab") - 1.0).abs() < 0.01);
        assert!(shannon_entropy(GOOD_SECRET) > MIN_ENTROPY_BITS_PER_CHAR);
    }

    #[test]
    fn test_placeholder_secret_rejected() {
        let err = validate_secret_strength("changeme-please-0123456789abcdef", "T").unwrap_err();
        assert!(matches!(err, ConfigError::InsecureSecret(_, _)));
    }

    #[test]
    fn test_low_entropy_secret_rejected() {
        assert!(validate_secret_strength(&"ab".repeat(20), "T").is_err());
    }
}
