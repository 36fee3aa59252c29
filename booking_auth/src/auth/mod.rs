//! Authentication module providing registration, login, session tokens and
//! password recovery.
//!
//! This module implements:
//! - Argon2id password hashing off the async runtime
//! - Failed-login lockout with a sliding window
//! - HS256 session tokens with refresh and per-user revocation
//! - Single-use, expiring password reset tokens
//!
//! ## Example
//!
//! ```no_run
//! use booking_auth::auth::{AuthConfig, AuthManager, CreateUserRequest, LogNotifier};
//! use booking_auth::db::InMemoryUserRepository;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = AuthConfig::from_env()?;
//!     let auth = AuthManager::new(
//!         Arc::new(InMemoryUserRepository::new()),
//!         Arc::new(LogNotifier),
//!         &config,
//!     )?;
//!
//!     let request = CreateUserRequest {
//!         email: "alice@x.com".to_string(),
//!         username: "alice".to_string(),
//!         password: "Passw0rd".to_string(),
//!         password_confirm: "Passw0rd".to_string(),
//!     };
//!
//!     let (user, token) = auth.create_user(request).await?;
//!     println!("Registered user {} (token expires {})", user.username, token.expires_at);
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod errors;
pub mod lockout;
pub mod manager;
pub mod models;
pub mod notifier;
pub mod password;
pub mod reset;
pub mod tokens;
pub mod validation;

pub use config::{AuthConfig, ConfigError};
pub use errors::{AuthError, AuthResult, ErrorKind, ValidationError};
pub use lockout::{FailureOutcome, LockoutPolicy, LockoutTracker};
pub use manager::AuthManager;
pub use models::{
    ChangePasswordRequest, CreateUserRequest, LockoutState, LoginRequest, NewUser,
    ResetPasswordRequest, SessionToken, TokenClaims, User, UserId, UserLookup, UserProfile,
    UserUpdate,
};
pub use notifier::{LogNotifier, Notifier, NotifyError};
pub use password::PasswordHasher;
pub use reset::ResetTokenService;
pub use tokens::TokenService;
