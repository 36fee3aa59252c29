//! Database module providing PostgreSQL connection pooling and the user store.
//!
//! The auth layer only sees [`UserRepository`]; [`PgUserRepository`] backs it
//! with the pool managed here, and [`InMemoryUserRepository`] stands in when
//! no database is available.

use sqlx::postgres::{PgPool, PgPoolOptions};
use std::time::Duration;

pub mod config;
pub mod memory;
pub mod repository;

pub use config::DatabaseConfig;
pub use memory::InMemoryUserRepository;
pub use repository::{PgUserRepository, UserRepository};

/// Postgres pool shared by the user store and the health endpoint.
#[derive(Clone)]
pub struct Database {
    pool: PgPool,
}

impl Database {
    /// Open the pool described by `config`.
    ///
    /// ```no_run
    /// use booking_auth::db::{Database, DatabaseConfig, PgUserRepository};
    ///
    /// #[tokio::main]
    /// async fn main() -> Result<(), Box<dyn std::error::Error>> {
    ///     let db = Database::new(&DatabaseConfig::from_env()?).await?;
    ///     db.run_migrations().await?;
    ///     let users = PgUserRepository::new(db.pool().clone());
    ///     # let _ = users;
    ///     Ok(())
    /// }
    /// ```
    pub async fn new(config: &DatabaseConfig) -> Result<Self, sqlx::Error> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(Duration::from_secs(config.connection_timeout_secs))
            .idle_timeout(Duration::from_secs(config.idle_timeout_secs))
            .max_lifetime(Duration::from_secs(config.max_lifetime_secs))
            .connect(&config.database_url)
            .await?;

        log::info!(
            "Opened user store pool ({}-{} connections)",
            config.min_connections,
            config.max_connections
        );
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Create or upgrade the `users` table.
    pub async fn run_migrations(&self) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("./migrations").run(&self.pool).await
    }

    /// Round-trip a trivial query.
    pub async fn health_check(&self) -> Result<(), sqlx::Error> {
        sqlx::query_scalar::<_, i32>("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .map(|_| ())
    }

    pub async fn close(self) {
        self.pool.close().await;
    }
}
