//! Authentication configuration.
//!
//! Loaded once at startup and handed by value to [`AuthManager`](super::AuthManager);
//! nothing reads it from the environment afterwards.

use super::{
    lockout::{
        DEFAULT_LOCK_THRESHOLD, DEFAULT_LOCK_WINDOW_SECS, DEFAULT_UNLOCK_AFTER_SECS, LockoutPolicy,
    },
    password::{DEFAULT_HASH_COST, DEFAULT_HASH_MEMORY_KIB},
    reset::{DEFAULT_RESET_TOKEN_LEN, DEFAULT_RESET_TOKEN_TTL_SECS},
    tokens::{DEFAULT_MAX_REFRESH_AGE_SECS, DEFAULT_TOKEN_TTL_SECS},
};
use chrono::Duration;

/// Minimum JWT secret length (128-bit security)
pub const MIN_JWT_SECRET_LEN: usize = 32;

/// Configuration error types
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {var}\nHint: {hint}")]
    MissingRequired { var: String, hint: String },

    #[error("Invalid configuration for {var}: {reason}")]
    Invalid { var: String, reason: String },
}

/// Authentication settings
#[derive(Clone)]
pub struct AuthConfig {
    /// JWT signing secret
    pub jwt_secret: String,
    /// Argon2 time cost
    pub hash_cost: u32,
    /// Argon2 memory cost in KiB
    pub hash_memory_kib: u32,
    /// Failed-login lockout parameters
    pub lockout: LockoutPolicy,
    /// Session token lifetime
    pub token_ttl: Duration,
    /// Longest a login may be extended by refresh; `None` for unlimited
    pub max_refresh_age: Option<Duration>,
    /// Reset token lifetime
    pub reset_token_ttl: Duration,
    /// Reset token length in characters
    pub reset_token_len: usize,
}

impl AuthConfig {
    /// Defaults around the given secret.
    pub fn new(jwt_secret: impl Into<String>) -> Self {
        Self {
            jwt_secret: jwt_secret.into(),
            hash_cost: DEFAULT_HASH_COST,
            hash_memory_kib: DEFAULT_HASH_MEMORY_KIB,
            lockout: LockoutPolicy::default(),
            token_ttl: Duration::seconds(DEFAULT_TOKEN_TTL_SECS),
            max_refresh_age: Some(Duration::seconds(DEFAULT_MAX_REFRESH_AGE_SECS)),
            reset_token_ttl: Duration::seconds(DEFAULT_RESET_TOKEN_TTL_SECS),
            reset_token_len: DEFAULT_RESET_TOKEN_LEN,
        }
    }

    /// Load configuration from environment variables
    ///
    /// - `JWT_SECRET` (required, at least 32 characters)
    /// - `PASSWORD_HASH_COST` (default: 10)
    /// - `PASSWORD_HASH_MEMORY_KIB` (default: 19456)
    /// - `LOCKOUT_THRESHOLD` (default: 5)
    /// - `LOCKOUT_WINDOW_SECS` (default: 120)
    /// - `LOCKOUT_UNLOCK_SECS` (default: 900, 0 = only a reset or an admin unlocks)
    /// - `TOKEN_TTL_SECS` (default: 86400)
    /// - `TOKEN_MAX_REFRESH_AGE_SECS` (default: 604800, 0 = unlimited)
    /// - `RESET_TOKEN_TTL_SECS` (default: 3600)
    ///
    /// # Errors
    ///
    /// Returns error if `JWT_SECRET` is missing or any value fails [`AuthConfig::validate`]
    pub fn from_env() -> Result<Self, ConfigError> {
        let jwt_secret = std::env::var("JWT_SECRET").map_err(|_| ConfigError::MissingRequired {
            var: "JWT_SECRET".to_string(),
            hint: "Generate with: openssl rand -hex 32".to_string(),
        })?;

        let unlock_secs: i64 = parse_env_or("LOCKOUT_UNLOCK_SECS", DEFAULT_UNLOCK_AFTER_SECS);
        let max_refresh_secs: i64 =
            parse_env_or("TOKEN_MAX_REFRESH_AGE_SECS", DEFAULT_MAX_REFRESH_AGE_SECS);

        let config = Self {
            jwt_secret,
            hash_cost: parse_env_or("PASSWORD_HASH_COST", DEFAULT_HASH_COST),
            hash_memory_kib: parse_env_or("PASSWORD_HASH_MEMORY_KIB", DEFAULT_HASH_MEMORY_KIB),
            lockout: LockoutPolicy {
                threshold: parse_env_or("LOCKOUT_THRESHOLD", DEFAULT_LOCK_THRESHOLD),
                window: Duration::seconds(parse_env_or(
                    "LOCKOUT_WINDOW_SECS",
                    DEFAULT_LOCK_WINDOW_SECS,
                )),
                unlock_after: (unlock_secs > 0).then(|| Duration::seconds(unlock_secs)),
            },
            token_ttl: Duration::seconds(parse_env_or("TOKEN_TTL_SECS", DEFAULT_TOKEN_TTL_SECS)),
            max_refresh_age: (max_refresh_secs > 0).then(|| Duration::seconds(max_refresh_secs)),
            reset_token_ttl: Duration::seconds(parse_env_or(
                "RESET_TOKEN_TTL_SECS",
                DEFAULT_RESET_TOKEN_TTL_SECS,
            )),
            reset_token_len: DEFAULT_RESET_TOKEN_LEN,
        };

        config.validate()?;
        Ok(config)
    }

    /// Validate configuration after loading
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.jwt_secret.len() < MIN_JWT_SECRET_LEN {
            return Err(invalid(
                "JWT_SECRET",
                format!("Must be at least {MIN_JWT_SECRET_LEN} characters (128-bit security)"),
            ));
        }

        if self.hash_cost == 0 {
            return Err(invalid("PASSWORD_HASH_COST", "Must be greater than 0"));
        }

        if self.hash_memory_kib < 8 {
            return Err(invalid("PASSWORD_HASH_MEMORY_KIB", "Must be at least 8"));
        }

        if self.lockout.threshold == 0 {
            return Err(invalid("LOCKOUT_THRESHOLD", "Must be greater than 0"));
        }

        if self.lockout.window <= Duration::zero() {
            return Err(invalid("LOCKOUT_WINDOW_SECS", "Must be greater than 0"));
        }

        if self.token_ttl <= Duration::zero() {
            return Err(invalid("TOKEN_TTL_SECS", "Must be greater than 0"));
        }

        if self.reset_token_ttl <= Duration::zero() {
            return Err(invalid("RESET_TOKEN_TTL_SECS", "Must be greater than 0"));
        }

        Ok(())
    }
}

impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthConfig")
            .field("jwt_secret", &"<redacted>")
            .field("hash_cost", &self.hash_cost)
            .field("hash_memory_kib", &self.hash_memory_kib)
            .field("lockout", &self.lockout)
            .field("token_ttl", &self.token_ttl)
            .field("max_refresh_age", &self.max_refresh_age)
            .field("reset_token_ttl", &self.reset_token_ttl)
            .finish()
    }
}

fn invalid(var: &str, reason: impl Into<String>) -> ConfigError {
    ConfigError::Invalid {
        var: var.to_string(),
        reason: reason.into(),
    }
}

/// Helper to parse environment variable with default fallback
pub fn parse_env_or<T>(key: &str, default: T) -> T
where
    T: std::str::FromStr,
{
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
