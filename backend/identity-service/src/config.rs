//! Configuration management for the identity service
//!
//! Loads settings from:
//! 1. Environment variables
//! 2. .env file (local development)
//!
//! Settings are read once at process start and handed to each component by
//! value; nothing reads the environment after construction.

use anyhow::{anyhow, Context, Result};
use crypto_core::TokenConfig;
use serde::{Deserialize, Serialize};
use std::env;
use std::fmt;
use std::str::FromStr;
use tracing::info;

/// HS256 needs at least 256 bits of key material
pub const MIN_JWT_SECRET_BYTES: usize = 32;

/// Application settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    pub database: DatabaseSettings,
    pub jwt: JwtSettings,
    pub hasher: HasherSettings,
    pub reset: ResetSettings,
    pub email: EmailSettings,
}

impl Settings {
    /// Load settings from environment variables
    pub fn from_env() -> Result<Self> {
        // Load .env file in development
        if cfg!(debug_assertions) && dotenvy::dotenv().is_ok() {
            info!("Loaded .env file for development");
        }

        Ok(Settings {
            database: DatabaseSettings::from_env()?,
            jwt: JwtSettings::from_env()?,
            hasher: HasherSettings::from_env()?,
            reset: ResetSettings::from_env()?,
            email: EmailSettings::from_env()?,
        })
    }
}

fn parse_or<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("Invalid {}", key)),
        Err(_) => Ok(default),
    }
}

/// Database connection settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseSettings {
    pub url: String,
    pub max_connections: u32,
    pub acquire_timeout_secs: u64,
}

impl DatabaseSettings {
    fn from_env() -> Result<Self> {
        Ok(Self {
            url: env::var("DATABASE_URL").context("DATABASE_URL must be set")?,
            max_connections: parse_or("DATABASE_MAX_CONNECTIONS", 20)?,
            acquire_timeout_secs: parse_or("DATABASE_ACQUIRE_TIMEOUT", 10)?,
        })
    }
}

/// JWT signing settings (HS256)
#[derive(Clone, Serialize, Deserialize)]
pub struct JwtSettings {
    pub secret: String,
    pub issuer: String,
    pub access_ttl_secs: i64,
    pub refresh_ttl_secs: i64,
}

impl JwtSettings {
    fn from_env() -> Result<Self> {
        let secret = env::var("JWT_SECRET").context("JWT_SECRET must be set")?;
        if secret.len() < MIN_JWT_SECRET_BYTES {
            return Err(anyhow!(
                "JWT_SECRET must be at least {} bytes",
                MIN_JWT_SECRET_BYTES
            ));
        }

        let settings = Self {
            secret,
            issuer: env::var("JWT_ISSUER").unwrap_or_else(|_| "ridehail-identity".to_string()),
            access_ttl_secs: parse_or("JWT_ACCESS_TTL_SECONDS", 86_400)?,
            refresh_ttl_secs: parse_or("JWT_REFRESH_TTL_SECONDS", 604_800)?,
        };

        if settings.access_ttl_secs <= 0 || settings.refresh_ttl_secs <= 0 {
            return Err(anyhow!("JWT token lifetimes must be positive"));
        }

        Ok(settings)
    }

    pub fn token_config(&self) -> TokenConfig {
        TokenConfig {
            secret: self.secret.clone(),
            issuer: self.issuer.clone(),
            access_ttl: chrono::Duration::seconds(self.access_ttl_secs),
            refresh_ttl: chrono::Duration::seconds(self.refresh_ttl_secs),
        }
    }
}

impl fmt::Debug for JwtSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JwtSettings")
            .field("secret", &"[redacted]")
            .field("issuer", &self.issuer)
            .field("access_ttl_secs", &self.access_ttl_secs)
            .field("refresh_ttl_secs", &self.refresh_ttl_secs)
            .finish()
    }
}

/// Argon2id cost parameters
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct HasherSettings {
    pub memory_kib: u32,
    pub iterations: u32,
    pub parallelism: u32,
}

impl Default for HasherSettings {
    fn default() -> Self {
        Self {
            memory_kib: argon2::Params::DEFAULT_M_COST,
            iterations: argon2::Params::DEFAULT_T_COST,
            parallelism: argon2::Params::DEFAULT_P_COST,
        }
    }
}

impl HasherSettings {
    fn from_env() -> Result<Self> {
        let defaults = Self::default();
        Ok(Self {
            memory_kib: parse_or("ARGON2_MEMORY_KIB", defaults.memory_kib)?,
            iterations: parse_or("ARGON2_ITERATIONS", defaults.iterations)?,
            parallelism: parse_or("ARGON2_PARALLELISM", defaults.parallelism)?,
        })
    }
}

/// Password reset settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResetSettings {
    pub code_ttl_secs: i64,
    /// The reset code is appended as the last path segment
    pub link_base_url: String,
}

impl Default for ResetSettings {
    fn default() -> Self {
        Self {
            code_ttl_secs: 900,
            link_base_url: "http://localhost:3000/reset-password".to_string(),
        }
    }
}

impl ResetSettings {
    fn from_env() -> Result<Self> {
        let defaults = Self::default();
        let settings = Self {
            code_ttl_secs: parse_or("PASSWORD_RESET_TTL_SECONDS", defaults.code_ttl_secs)?,
            link_base_url: env::var("PASSWORD_RESET_BASE_URL")
                .unwrap_or(defaults.link_base_url),
        };
        if settings.code_ttl_secs <= 0 {
            return Err(anyhow!("PASSWORD_RESET_TTL_SECONDS must be positive"));
        }
        Ok(settings)
    }

    pub fn code_ttl(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.code_ttl_secs)
    }
}

/// Email service configuration
#[derive(Clone, Serialize, Deserialize)]
pub struct EmailSettings {
    /// Empty host disables delivery (messages are logged and dropped)
    pub smtp_host: String,
    pub smtp_port: u16,
    pub smtp_username: Option<String>,
    pub smtp_password: Option<String>,
    pub smtp_from: String,
    pub use_starttls: bool,
}

impl Default for EmailSettings {
    fn default() -> Self {
        Self {
            smtp_host: String::new(),
            smtp_port: 1025,
            smtp_username: None,
            smtp_password: None,
            smtp_from: "noreply@ridehail.dev".to_string(),
            use_starttls: false,
        }
    }
}

impl EmailSettings {
    fn from_env() -> Result<Self> {
        Ok(Self {
            smtp_host: env::var("SMTP_HOST").unwrap_or_default(),
            smtp_port: parse_or("SMTP_PORT", 1025)?,
            smtp_username: env::var("SMTP_USERNAME").ok(),
            smtp_password: env::var("SMTP_PASSWORD").ok(),
            smtp_from: env::var("SMTP_FROM").unwrap_or_else(|_| "noreply@ridehail.dev".to_string()),
            use_starttls: env::var("SMTP_USE_STARTTLS")
                .map(|v| v.eq_ignore_ascii_case("true") || v == "1")
                .unwrap_or(false),
        })
    }
}

impl fmt::Debug for EmailSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EmailSettings")
            .field("smtp_host", &self.smtp_host)
            .field("smtp_port", &self.smtp_port)
            .field("smtp_username", &self.smtp_username)
            .field("smtp_password", &self.smtp_password.as_ref().map(|_| "[redacted]"))
            .field("smtp_from", &self.smtp_from)
            .field("use_starttls", &self.use_starttls)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    const VARS: &[&str] = &[
        "DATABASE_URL",
        "JWT_SECRET",
        "JWT_ISSUER",
        "JWT_ACCESS_TTL_SECONDS",
        "JWT_REFRESH_TTL_SECONDS",
        "ARGON2_MEMORY_KIB",
        "PASSWORD_RESET_TTL_SECONDS",
        "PASSWORD_RESET_BASE_URL",
        "SMTP_HOST",
        "SMTP_PORT",
    ];

    fn clear_env() {
        for key in VARS {
            env::remove_var(key);
        }
    }

    fn set_required() {
        env::set_var("DATABASE_URL", "postgres://localhost/identity_test");
        env::set_var("JWT_SECRET", "0123456789abcdef0123456789abcdef");
    }

    #[test]
    #[serial]
    fn test_defaults() {
        clear_env();
        set_required();

        let settings = Settings::from_env().expect("settings");
        assert_eq!(settings.jwt.issuer, "ridehail-identity");
        assert_eq!(settings.jwt.access_ttl_secs, 86_400);
        assert_eq!(settings.jwt.refresh_ttl_secs, 604_800);
        assert_eq!(settings.reset.code_ttl_secs, 900);
        assert_eq!(settings.hasher, HasherSettings::default());
        assert!(settings.email.smtp_host.is_empty());

        let config = settings.jwt.token_config();
        assert_eq!(config.access_ttl, chrono::Duration::hours(24));
        assert_eq!(config.refresh_ttl, chrono::Duration::days(7));

        clear_env();
    }

    #[test]
    #[serial]
    fn test_short_secret_rejected() {
        clear_env();
        set_required();
        env::set_var("JWT_SECRET", "too-short");

        let err = Settings::from_env().unwrap_err();
        assert!(err.to_string().contains("at least 32 bytes"));

        clear_env();
    }

    #[test]
    #[serial]
    fn test_missing_secret_rejected() {
        clear_env();
        env::set_var("DATABASE_URL", "postgres://localhost/identity_test");

        let err = Settings::from_env().unwrap_err();
        assert!(err.to_string().contains("JWT_SECRET must be set"));
    }

    #[test]
    #[serial]
    fn test_overrides_and_invalid_numbers() {
        clear_env();
        set_required();
        env::set_var("PASSWORD_RESET_TTL_SECONDS", "600");
        env::set_var("ARGON2_MEMORY_KIB", "4096");

        let settings = Settings::from_env().expect("settings");
        assert_eq!(settings.reset.code_ttl(), chrono::Duration::minutes(10));
        assert_eq!(settings.hasher.memory_kib, 4096);

        env::set_var("SMTP_PORT", "not-a-port");
        let err = Settings::from_env().unwrap_err();
        assert!(err.to_string().contains("Invalid SMTP_PORT"));

        clear_env();
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let jwt = JwtSettings {
            secret: "0123456789abcdef0123456789abcdef".to_string(),
            issuer: "ridehail-identity".to_string(),
            access_ttl_secs: 60,
            refresh_ttl_secs: 120,
        };
        assert!(!format!("{:?}", jwt).contains("0123456789"));
    }
}
