//! Server configuration management.
//!
//! Consolidates all environment variable reads and provides validated configuration.

use booking_auth::{AuthConfig, DatabaseConfig};
use std::net::SocketAddr;

pub use booking_auth::auth::ConfigError;

/// Default listen address
pub const DEFAULT_BIND: &str = "127.0.0.1:8080";

/// Complete server configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Server bind address
    pub bind: SocketAddr,
    /// Prometheus scrape address; metrics are off when unset
    pub metrics_bind: Option<SocketAddr>,
    /// Database configuration; `None` runs on the in-memory store
    pub database: Option<DatabaseConfig>,
    /// Authentication policy and secrets
    pub auth: AuthConfig,
}

impl ServerConfig {
    /// Load configuration from environment variables
    ///
    /// # Arguments
    ///
    /// * `bind_override` - Optional bind address override (from CLI args)
    /// * `database_url_override` - Optional database URL override (from CLI args)
    /// * `in_memory` - Ignore `DATABASE_URL` and keep users in process memory
    ///
    /// # Errors
    ///
    /// Returns error if required variables are missing or invalid
    pub fn from_env(
        bind_override: Option<SocketAddr>,
        database_url_override: Option<String>,
        in_memory: bool,
    ) -> Result<Self, ConfigError> {
        let bind = match bind_override {
            Some(bind) => bind,
            None => parse_addr("SERVER_BIND", std::env::var("SERVER_BIND").ok())?
                .unwrap_or_else(default_bind),
        };

        let metrics_bind = parse_addr("METRICS_BIND", std::env::var("METRICS_BIND").ok())?;

        let database = if in_memory {
            None
        } else {
            match database_url_override {
                Some(database_url) => Some(DatabaseConfig::with_url(database_url)),
                None if std::env::var("DATABASE_URL").is_ok() => Some(DatabaseConfig::from_env()?),
                None => None,
            }
        };

        let auth = AuthConfig::from_env()?;

        let config = ServerConfig {
            bind,
            metrics_bind,
            database,
            auth,
        };
        config.validate()?;

        Ok(config)
    }

    /// Validate configuration after loading
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.auth.validate()?;

        if let Some(database) = &self.database {
            if database.database_url.is_empty() {
                return Err(ConfigError::Invalid {
                    var: "DATABASE_URL".to_string(),
                    reason: "Must not be empty".to_string(),
                });
            }

            if database.max_connections == 0 {
                return Err(ConfigError::Invalid {
                    var: "DB_MAX_CONNECTIONS".to_string(),
                    reason: "Must be greater than 0".to_string(),
                });
            }

            if database.min_connections > database.max_connections {
                return Err(ConfigError::Invalid {
                    var: "DB_MIN_CONNECTIONS".to_string(),
                    reason: format!(
                        "Cannot exceed max connections ({})",
                        database.max_connections
                    ),
                });
            }
        }

        if self.metrics_bind == Some(self.bind) {
            return Err(ConfigError::Invalid {
                var: "METRICS_BIND".to_string(),
                reason: "Must differ from SERVER_BIND".to_string(),
            });
        }

        Ok(())
    }
}

fn default_bind() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 8080))
}

fn parse_addr(var: &str, value: Option<String>) -> Result<Option<SocketAddr>, ConfigError> {
    value
        .map(|v| {
            v.parse().map_err(|_| ConfigError::Invalid {
                var: var.to_string(),
                reason: format!("Not a socket address: {v}"),
            })
        })
        .transpose()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    const SECRET: &str = "server_test_secret_at_least_32_chars!";

    fn config() -> ServerConfig {
        ServerConfig {
            bind: DEFAULT_BIND.parse().unwrap(),
            metrics_bind: None,
            database: Some(DatabaseConfig {
                database_url: "postgres://localhost/booking_test".to_string(),
                max_connections: 10,
                min_connections: 1,
                connection_timeout_secs: 5,
                idle_timeout_secs: 300,
                max_lifetime_secs: 1800,
            }),
            auth: AuthConfig::new(SECRET),
        }
    }

    #[test]
    fn test_config_error_display() {
        let err = ConfigError::MissingRequired {
            var: "JWT_SECRET".to_string(),
            hint: "Use openssl".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("JWT_SECRET"));
        assert!(msg.contains("Use openssl"));
    }

    #[test]
    fn test_default_bind_matches_constant() {
        assert_eq!(default_bind(), DEFAULT_BIND.parse::<SocketAddr>().unwrap());
    }

    #[test]
    fn test_valid_config() {
        assert!(config().validate().is_ok());
    }

    #[test]
    fn test_config_validation_pool_sizes() {
        let mut config = config();
        if let Some(db) = config.database.as_mut() {
            db.min_connections = 20;
        }

        let err = config.validate().unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { ref var, .. } if var == "DB_MIN_CONNECTIONS"));
    }

    #[test]
    fn test_config_validation_weak_secret() {
        let mut config = config();
        config.auth.jwt_secret = "short".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_validation_metrics_port_clash() {
        let mut config = config();
        config.metrics_bind = Some(config.bind);
        assert!(config.validate().is_err());
    }

    #[test]
    #[serial]
    fn test_from_env_without_database_url() {
        // SAFETY: env mutation is serialized across tests
        unsafe {
            std::env::set_var("JWT_SECRET", SECRET);
            std::env::remove_var("DATABASE_URL");
            std::env::set_var("SERVER_BIND", "0.0.0.0:9000");
        }

        let config = ServerConfig::from_env(None, None, false).unwrap();
        assert!(config.database.is_none());
        assert_eq!(config.bind, "0.0.0.0:9000".parse().unwrap());

        let config = ServerConfig::from_env(
            Some("127.0.0.1:7000".parse().unwrap()),
            Some("postgres://localhost/other".to_string()),
            false,
        )
        .unwrap();
        assert_eq!(config.bind.port(), 7000);
        assert_eq!(
            config.database.map(|db| db.database_url),
            Some("postgres://localhost/other".to_string())
        );

        unsafe {
            std::env::remove_var("JWT_SECRET");
            std::env::remove_var("SERVER_BIND");
        }
    }

    #[test]
    #[serial]
    fn test_from_env_bad_bind() {
        unsafe {
            std::env::set_var("JWT_SECRET", SECRET);
            std::env::set_var("SERVER_BIND", "not-an-address");
        }

        let err = ServerConfig::from_env(None, None, true).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { ref var, .. } if var == "SERVER_BIND"));

        unsafe {
            std::env::remove_var("JWT_SECRET");
            std::env::remove_var("SERVER_BIND");
        }
    }
}
