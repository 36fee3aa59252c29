//! Authentication data models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// User ID type
pub type UserId = i64;

/// Failed-attempt bookkeeping persisted on each user record.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockoutState {
    pub failed_attempt_count: u32,
    pub last_failure_at: Option<DateTime<Utc>>,
    pub locked: bool,
}

impl LockoutState {
    /// Fresh, unlocked state with no failure history.
    pub fn cleared() -> Self {
        Self::default()
    }
}

/// User model
///
/// The stored credential and reset token never leave the crate through
/// serialization; use [`UserProfile`] for anything handed to clients.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub username: String,
    pub email: String,
    #[serde(skip_serializing, default)]
    pub password_hash: String,
    pub display_name: Option<String>,
    pub address: Option<String>,
    pub contact_number: Option<String>,
    pub gender_code: Option<i16>,
    pub avatar_ref: Option<String>,
    pub is_admin: bool,
    pub lockout: LockoutState,
    #[serde(skip_serializing, default)]
    pub reset_token: Option<String>,
    #[serde(skip_serializing, default)]
    pub reset_token_expires_at: Option<DateTime<Utc>>,
    pub token_version: i32,
    pub created_at: DateTime<Utc>,
    pub modified_at: DateTime<Utc>,
    pub last_login_at: Option<DateTime<Utc>>,
}

/// Public view of a user, safe to return from the HTTP layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: UserId,
    pub username: String,
    pub email: String,
    pub display_name: Option<String>,
    pub is_admin: bool,
    pub created_at: DateTime<Utc>,
    pub last_login_at: Option<DateTime<Utc>>,
}

impl From<&User> for UserProfile {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            username: user.username.clone(),
            email: user.email.clone(),
            display_name: user.display_name.clone(),
            is_admin: user.is_admin,
            created_at: user.created_at,
            last_login_at: user.last_login_at,
        }
    }
}

/// Fields required to insert a user. The hash is computed before the store
/// ever sees the record.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub display_name: Option<String>,
}

/// Partial update applied to a single user row. `None` leaves a column as is.
#[derive(Debug, Clone, Default)]
pub struct UserUpdate {
    pub password_hash: Option<String>,
    pub reset_token: Option<Option<String>>,
    pub reset_token_expires_at: Option<Option<DateTime<Utc>>>,
    pub lockout: Option<LockoutState>,
    pub last_login_at: Option<DateTime<Utc>>,
    pub bump_token_version: bool,
}

impl UserUpdate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn password_hash(mut self, hash: String) -> Self {
        self.password_hash = Some(hash);
        self
    }

    pub fn reset_token(mut self, token: String, expires_at: DateTime<Utc>) -> Self {
        self.reset_token = Some(Some(token));
        self.reset_token_expires_at = Some(Some(expires_at));
        self
    }

    pub fn clear_reset_token(mut self) -> Self {
        self.reset_token = Some(None);
        self.reset_token_expires_at = Some(None);
        self
    }

    pub fn lockout(mut self, state: LockoutState) -> Self {
        self.lockout = Some(state);
        self
    }

    pub fn last_login_at(mut self, at: DateTime<Utc>) -> Self {
        self.last_login_at = Some(at);
        self
    }

    /// Invalidate every token issued so far for this user.
    pub fn bump_token_version(mut self) -> Self {
        self.bump_token_version = true;
        self
    }

    /// Apply this changeset to an in-memory record.
    pub fn apply_to(&self, user: &mut User, now: DateTime<Utc>) {
        if let Some(hash) = &self.password_hash {
            user.password_hash = hash.clone();
        }
        if let Some(token) = &self.reset_token {
            user.reset_token = token.clone();
        }
        if let Some(expires_at) = self.reset_token_expires_at {
            user.reset_token_expires_at = expires_at;
        }
        if let Some(lockout) = self.lockout {
            user.lockout = lockout;
        }
        if let Some(at) = self.last_login_at {
            user.last_login_at = Some(at);
        }
        if self.bump_token_version {
            user.token_version += 1;
        }
        user.modified_at = now;
    }
}

/// Single-row lookup key. Username and email are each unique.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserLookup<'a> {
    Id(UserId),
    Username(&'a str),
    Email(&'a str),
}

/// JWT claims for a session token
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenClaims {
    pub sub: String, // Username
    pub uid: UserId,
    pub ver: i32,       // Token version at issuance
    pub auth_time: i64, // Original password login, carried across refreshes
    pub iat: i64,
    pub exp: i64,
}

/// Signed session token handed back to the caller.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionToken {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

/// User registration request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateUserRequest {
    pub email: String,
    pub username: String,
    pub password: String,
    pub password_confirm: String,
}

/// User login request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginRequest {
    pub identifier: String,
    pub password: String,
    pub identifier_is_email: bool,
}

impl LoginRequest {
    pub fn lookup(&self) -> UserLookup<'_> {
        lookup_for(&self.identifier, self.identifier_is_email)
    }
}

/// Change password request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChangePasswordRequest {
    pub identifier: String,
    pub current_password: String,
    pub new_password: String,
    pub new_password_confirm: String,
    pub identifier_is_email: bool,
}

impl ChangePasswordRequest {
    pub fn lookup(&self) -> UserLookup<'_> {
        lookup_for(&self.identifier, self.identifier_is_email)
    }
}

/// Password reset confirmation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResetPasswordRequest {
    pub email: String,
    pub reset_token: String,
    pub new_password: String,
    pub new_password_confirm: String,
}

fn lookup_for(identifier: &str, is_email: bool) -> UserLookup<'_> {
    if is_email {
        UserLookup::Email(identifier)
    } else {
        UserLookup::Username(identifier)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_user() -> User {
        let now = Utc::now();
        User {
            id: 7,
            username: "alice".to_string(),
            email: "alice@x.com".to_string(),
            password_hash: "$argon2id$secret".to_string(),
            display_name: Some("Alice".to_string()),
            address: None,
            contact_number: None,
            gender_code: None,
            avatar_ref: None,
            is_admin: false,
            lockout: LockoutState::cleared(),
            reset_token: Some("abc".to_string()),
            reset_token_expires_at: None,
            token_version: 0,
            created_at: now,
            modified_at: now,
            last_login_at: None,
        }
    }

    #[test]
    fn test_user_serialization_hides_secrets() {
        let json = serde_json::to_string(&sample_user()).unwrap();
        assert!(!json.contains("password_hash"));
        assert!(!json.contains("argon2"));
        assert!(!json.contains("reset_token"));
    }

    #[test]
    fn test_update_apply() {
        let mut user = sample_user();
        let now = Utc::now();

        UserUpdate::new()
            .password_hash("new".to_string())
            .clear_reset_token()
            .bump_token_version()
            .apply_to(&mut user, now);

        assert_eq!(user.password_hash, "new");
        assert!(user.reset_token.is_none());
        assert_eq!(user.token_version, 1);
        assert_eq!(user.modified_at, now);
    }

    #[test]
    fn test_login_lookup() {
        let by_email = LoginRequest {
            identifier: "a@x.com".to_string(),
            password: "p".to_string(),
            identifier_is_email: true,
        };
        assert_eq!(by_email.lookup(), UserLookup::Email("a@x.com"));

        let by_name = LoginRequest {
            identifier_is_email: false,
            ..by_email
        };
        assert_eq!(by_name.lookup(), UserLookup::Username("a@x.com"));
    }
}
