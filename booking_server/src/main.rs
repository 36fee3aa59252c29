//! Booking platform authentication server.
//!
//! Serves the account entrance API over HTTP, backed by PostgreSQL when a
//! database URL is configured and by an in-process store otherwise.

use std::{net::SocketAddr, sync::Arc};

use anyhow::{Context, Error};
use booking_auth::{
    AuthManager, Database,
    auth::LogNotifier,
    db::{InMemoryUserRepository, PgUserRepository, UserRepository},
};
use booking_server::{api, config::ServerConfig, logging, metrics};
use ctrlc::set_handler;
use log::{info, warn};
use pico_args::Arguments;
use tokio::sync::watch;

const HELP: &str = "\
Run the booking platform authentication server

USAGE:
  booking_server [OPTIONS]

OPTIONS:
  --bind       IP:PORT     Server socket bind address  [default: env SERVER_BIND or 127.0.0.1:8080]
  --db-url     URL         Database connection string  [default: env DATABASE_URL]

FLAGS:
  --in-memory              Keep users in process memory, ignoring DATABASE_URL
  -h, --help               Print help information

ENVIRONMENT:
  SERVER_BIND              Server bind address (e.g., 0.0.0.0:8080)
  METRICS_BIND             Prometheus exporter address (metrics off when unset)
  DATABASE_URL             PostgreSQL connection string
  JWT_SECRET               Token signing secret, at least 32 bytes
  LOCKOUT_THRESHOLD        Failed logins before the account locks [default: 5]
  LOCKOUT_UNLOCK_SECS      Seconds until a lock lifts, 0 for never [default: 900]
  (See .env.example for all configuration options)
";

struct Args {
    bind: Option<SocketAddr>,
    database_url: Option<String>,
    in_memory: bool,
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    let _ = dotenvy::dotenv();

    let mut pargs = Arguments::from_env();

    if pargs.contains(["-h", "--help"]) {
        print!("{HELP}");
        std::process::exit(0);
    }

    let args = Args {
        bind: pargs.opt_value_from_str("--bind")?,
        database_url: pargs.opt_value_from_str("--db-url")?,
        in_memory: pargs.contains("--in-memory"),
    };

    logging::init();

    let remaining = pargs.finish();
    if !remaining.is_empty() {
        warn!("Ignoring unknown arguments: {remaining:?}");
    }

    let config = ServerConfig::from_env(args.bind, args.database_url, args.in_memory)
        .context("Invalid configuration")?;

    if let Some(metrics_bind) = config.metrics_bind {
        metrics::init_metrics(metrics_bind).map_err(anyhow::Error::msg)?;
        info!("Prometheus metrics listening on {metrics_bind}");
    }

    let (users, database): (Arc<dyn UserRepository>, Option<Database>) = match &config.database
    {
        Some(db_config) => {
            let db = Database::new(db_config)
                .await
                .context("Failed to connect to database")?;
            db.run_migrations()
                .await
                .context("Failed to run migrations")?;
            info!("Database connected and migrated");

            (Arc::new(PgUserRepository::new(db.pool().clone())), Some(db))
        }
        None => {
            warn!("No DATABASE_URL configured; users are kept in memory and lost on exit");
            (Arc::new(InMemoryUserRepository::new()), None)
        }
    };

    let auth_manager = AuthManager::new(users, Arc::new(LogNotifier), &config.auth)?;
    info!("Auth configured: {:?}", config.auth);

    let app = api::create_router(api::AppState {
        auth_manager: Arc::new(auth_manager),
        database: database.clone(),
    });

    let (shutdown_tx, mut shutdown_rx) = watch::channel(false);
    set_handler(move || {
        let _ = shutdown_tx.send(true);
    })?;

    let listener = tokio::net::TcpListener::bind(config.bind)
        .await
        .with_context(|| format!("Failed to bind to {}", config.bind))?;

    info!(
        "Server is running at http://{}. Press Ctrl+C to stop.",
        config.bind
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            let _ = shutdown_rx.changed().await;
        })
        .await
        .context("Server error")?;

    info!("Shutting down server...");
    if let Some(db) = database {
        db.close().await;
    }

    Ok(())
}
