//! Authentication error types.

use thiserror::Error;

/// Input validation failures, raised before any store access.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// Email does not match the address grammar
    #[error("Invalid email address")]
    InvalidEmail,

    /// Password and its confirmation differ
    #[error("Password does not match confirmation")]
    PasswordMismatch,

    /// Password violates the length/character policy
    #[error("Password must be {min}-{max} characters including letters and digits")]
    WeakPassword { min: usize, max: usize },

    /// A required field was empty
    #[error("Missing required field: {0}")]
    MissingField(&'static str),
}

/// Authentication errors
#[derive(Debug, Error)]
pub enum AuthError {
    /// Malformed input
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Username already exists
    #[error("Username already in use")]
    UsernameInUse,

    /// Email already exists
    #[error("Email already in use")]
    EmailInUse,

    /// User not found
    #[error("User not found")]
    UserNotFound,

    /// Account is locked after repeated failures
    #[error("Account locked")]
    UserLocked,

    /// Wrong password on login
    #[error("Invalid username/email or password")]
    InvalidCredentials,

    /// Wrong current password on change-password
    #[error("Invalid password")]
    InvalidPassword,

    /// Reset token does not match the email, was consumed, or has expired
    #[error("Invalid email or reset token")]
    InvalidEmailOrToken,

    /// Signed token is past its expiry
    #[error("Token expired")]
    TokenExpired,

    /// Signed token is malformed, tampered, revoked, or names a stale subject
    #[error("Invalid token")]
    InvalidToken,

    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Password hashing or verification failed (including malformed stored hashes)
    #[error("Password hashing failed: {0}")]
    Hashing(String),

    /// Any other internal fault
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Coarse error taxonomy used by callers to pick a response status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    Conflict,
    NotFound,
    Locked,
    InvalidCredentials,
    InvalidToken,
    Internal,
}

impl AuthError {
    /// Classify this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            AuthError::Validation(_) => ErrorKind::Validation,
            AuthError::UsernameInUse | AuthError::EmailInUse => ErrorKind::Conflict,
            AuthError::UserNotFound => ErrorKind::NotFound,
            AuthError::UserLocked => ErrorKind::Locked,
            AuthError::InvalidCredentials
            | AuthError::InvalidPassword
            | AuthError::InvalidEmailOrToken => ErrorKind::InvalidCredentials,
            AuthError::TokenExpired | AuthError::InvalidToken => ErrorKind::InvalidToken,
            AuthError::Database(_) | AuthError::Hashing(_) | AuthError::Internal(_) => {
                ErrorKind::Internal
            }
        }
    }

    /// Whether this error hides an internal fault.
    pub fn is_internal(&self) -> bool {
        self.kind() == ErrorKind::Internal
    }

    /// Get a client-safe error code that doesn't leak sensitive information
    ///
    /// Database, hashing and other internal faults all collapse to `EXCEPTION`.
    pub fn client_message(&self) -> &'static str {
        match self {
            AuthError::Validation(ValidationError::InvalidEmail) => "INVALID_EMAIL",
            AuthError::Validation(ValidationError::PasswordMismatch) => "PASSWORD_DOES_NOT_MATCH",
            AuthError::Validation(ValidationError::WeakPassword { .. }) => {
                "PASSWORD_MUST_BE_6-24_CHARACTERS_INCLUDING_LETTERS_AND_DIGITS"
            }
            AuthError::Validation(ValidationError::MissingField("password")) => {
                "PASSWORD_IS_REQUIRED"
            }
            AuthError::Validation(ValidationError::MissingField("current_password")) => {
                "CURRENT_PASSWORD_IS_REQUIRED"
            }
            AuthError::Validation(ValidationError::MissingField(_)) => "MISSING_REQUIRED_FIELD",
            AuthError::UsernameInUse => "THIS_USERNAME_IS_ALREADY_IN_USE",
            AuthError::EmailInUse => "THIS_EMAIL_IS_ALREADY_IN_USE",
            AuthError::UserNotFound => "USER_NOT_FOUND",
            AuthError::UserLocked => "ACCOUNT_LOCKED",
            AuthError::InvalidCredentials => "INVALID_EMAIL_OR_PASSWORD",
            AuthError::InvalidPassword => "INVALID_USERNAME/EMAIL_OR_PASSWORD",
            AuthError::InvalidEmailOrToken => "INVALID_EMAIL_OR_TOKEN",
            AuthError::TokenExpired => "TOKEN_EXPIRED",
            AuthError::InvalidToken => "INVALID_TOKEN",
            AuthError::Database(_) | AuthError::Hashing(_) | AuthError::Internal(_) => "EXCEPTION",
        }
    }
}

/// Result type for authentication operations
pub type AuthResult<T> = Result<T, AuthError>;
