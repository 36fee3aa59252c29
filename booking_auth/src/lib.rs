//! # Booking Auth
//!
//! Account authentication for the booking platform: registration, password
//! login with failed-attempt lockout, signed session tokens, and password
//! recovery through single-use reset tokens.
//!
//! ## Core Modules
//!
//! - [`auth`]: Hashing, lockout, tokens, reset tokens and the [`AuthManager`]
//!   that orchestrates them
//! - [`db`]: Connection pool, the [`db::UserRepository`] credential store trait
//!   and its PostgreSQL and in-memory implementations
//!
//! Every operation is a sequence of awaited steps against the store; the only
//! shared mutable state is the user record itself.

/// Authentication components and the manager that ties them together.
pub mod auth;
pub use auth::{AuthConfig, AuthError, AuthManager, AuthResult};

/// Persistence layer.
pub mod db;
pub use db::{Database, DatabaseConfig};
