//! HTTP API for account entrance.
//!
//! # Modules
//!
//! - [`auth`]: Registration, login, refresh, password change and recovery
//! - [`extract`]: JSON body extraction with the error envelope
//! - [`middleware`]: Bearer-token authentication for protected endpoints
//! - [`request_id`]: Request correlation and HTTP metrics
//!
//! # Endpoints
//!
//! ```text
//! GET  /health                            - Health check
//! POST /api/v1/entrance/create            - Register and log in
//! POST /api/v1/entrance/login             - Login with username or email
//! POST /api/v1/entrance/refreshToken      - Refresh a token (Bearer)
//! PUT  /api/v1/entrance/changePassword    - Change password
//! POST /api/v1/entrance/forgot            - Request a reset token
//! POST /api/v1/entrance/resetPassword     - Reset password with a token
//! GET  /api/v1/user                       - Current user (Bearer)
//! ```
//!
//! Errors are returned as `{"err_msg": "<CODE>"}`, including malformed
//! request bodies (`400 EMPTY_BODY` / `400 INVALID_BODY`).
//!
//! # Example Usage
//!
//! ```rust,no_run
//! use booking_auth::{
//!     AuthConfig, AuthManager,
//!     auth::LogNotifier,
//!     db::InMemoryUserRepository,
//! };
//! use booking_server::api::{AppState, create_router};
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = AuthConfig::from_env()?;
//! let auth_manager = AuthManager::new(
//!     Arc::new(InMemoryUserRepository::new()),
//!     Arc::new(LogNotifier),
//!     &config,
//! )?;
//!
//! let app = create_router(AppState {
//!     auth_manager: Arc::new(auth_manager),
//!     database: None,
//! });
//!
//! let listener = tokio::net::TcpListener::bind("127.0.0.1:8080").await?;
//! axum::serve(listener, app).await?;
//! # Ok(())
//! # }
//! ```

pub mod auth;
pub mod extract;
pub mod middleware;
pub mod request_id;

use axum::{
    Router,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json},
    routing::{get, post, put},
};
use booking_auth::{AuthManager, Database};
use serde_json::json;
use std::sync::Arc;
use tower_http::cors::CorsLayer;

/// Application state shared across all HTTP handlers.
#[derive(Clone)]
pub struct AppState {
    pub auth_manager: Arc<AuthManager>,
    /// Pool for health checks; `None` when running on the in-memory store
    pub database: Option<Database>,
}

/// Create the complete API router with all endpoints and middleware.
pub fn create_router(state: AppState) -> Router {
    let entrance = Router::new()
        .route("/create", post(auth::create_user))
        .route("/login", post(auth::login))
        .route("/refreshToken", post(auth::refresh_token))
        .route("/changePassword", put(auth::change_password))
        .route("/forgot", post(auth::forgot_password))
        .route("/resetPassword", post(auth::reset_password));

    let protected = Router::new()
        .route("/user", get(auth::current_user))
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::auth_middleware,
        ));

    let v1 = Router::new().nest("/entrance", entrance).merge(protected);

    Router::new()
        .route("/health", get(health_check))
        .nest("/api/v1", v1)
        .layer(axum::middleware::from_fn(request_id::request_id_middleware))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Health check endpoint for monitoring and load balancers.
///
/// Returns `200 OK` when the store is reachable, `503 Service Unavailable`
/// otherwise.
///
/// ```bash
/// curl http://localhost:8080/health
/// # {"status":"healthy","store":"postgres","database":true,"timestamp":"..."}
/// ```
async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let (store, db_healthy) = match &state.database {
        Some(database) => ("postgres", database.health_check().await.is_ok()),
        None => ("in_memory", true),
    };

    let status_code = if db_healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let response = json!({
        "status": if db_healthy { "healthy" } else { "unhealthy" },
        "version": env!("CARGO_PKG_VERSION"),
        "store": store,
        "database": db_healthy,
        "timestamp": chrono::Utc::now().to_rfc3339(),
    });

    (status_code, Json(response))
}
