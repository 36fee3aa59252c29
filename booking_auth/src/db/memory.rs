//! In-process user store.
//!
//! Same contract as [`PgUserRepository`](super::PgUserRepository), backed by a
//! mutex-guarded map. Used by the test suites and for running the server
//! without a database.

use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use super::repository::UserRepository;
use crate::auth::{
    AuthError, AuthResult, LockoutState, NewUser, User, UserId, UserLookup, UserUpdate,
};

#[derive(Default)]
struct Users {
    by_id: HashMap<UserId, User>,
    next_id: UserId,
}

/// In-memory implementation of `UserRepository`
#[derive(Clone, Default)]
pub struct InMemoryUserRepository {
    users: Arc<Mutex<Users>>,
}

impl InMemoryUserRepository {
    pub fn new() -> Self {
        Self::default()
    }

    fn users(&self) -> AuthResult<MutexGuard<'_, Users>> {
        self.users
            .lock()
            .map_err(|_| AuthError::Internal("user store lock poisoned".to_string()))
    }

    /// Number of stored users
    pub fn len(&self) -> usize {
        self.users.lock().map(|u| u.by_id.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn matches_lookup(user: &User, lookup: &UserLookup<'_>) -> bool {
    match lookup {
        UserLookup::Id(id) => user.id == *id,
        UserLookup::Username(username) => user.username == *username,
        UserLookup::Email(email) => user.email == *email,
    }
}

#[async_trait]
impl UserRepository for InMemoryUserRepository {
    async fn find_one(&self, lookup: UserLookup<'_>) -> AuthResult<Option<User>> {
        let users = self.users()?;
        if let UserLookup::Id(id) = lookup {
            return Ok(users.by_id.get(&id).cloned());
        }
        Ok(users.by_id.values().find(|u| matches_lookup(u, &lookup)).cloned())
    }

    async fn create(&self, new_user: NewUser) -> AuthResult<User> {
        let mut users = self.users()?;

        if users.by_id.values().any(|u| u.username == new_user.username) {
            return Err(AuthError::UsernameInUse);
        }
        if users.by_id.values().any(|u| u.email == new_user.email) {
            return Err(AuthError::EmailInUse);
        }

        users.next_id += 1;
        let now = Utc::now();
        let user = User {
            id: users.next_id,
            username: new_user.username,
            email: new_user.email,
            password_hash: new_user.password_hash,
            display_name: new_user.display_name,
            address: None,
            contact_number: None,
            gender_code: None,
            avatar_ref: None,
            is_admin: false,
            lockout: LockoutState::cleared(),
            reset_token: None,
            reset_token_expires_at: None,
            token_version: 0,
            created_at: now,
            modified_at: now,
            last_login_at: None,
        };

        users.by_id.insert(user.id, user.clone());
        Ok(user)
    }

    async fn update(&self, id: UserId, update: UserUpdate) -> AuthResult<()> {
        let mut users = self.users()?;
        let user = users.by_id.get_mut(&id).ok_or(AuthError::UserNotFound)?;
        update.apply_to(user, Utc::now());
        Ok(())
    }

    async fn update_lockout_if(
        &self,
        id: UserId,
        expected: &LockoutState,
        update: UserUpdate,
    ) -> AuthResult<bool> {
        let mut users = self.users()?;
        match users.by_id.get_mut(&id) {
            Some(user) if user.lockout == *expected => {
                update.apply_to(user, Utc::now());
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn consume_reset_token(
        &self,
        id: UserId,
        token: &str,
        update: UserUpdate,
    ) -> AuthResult<bool> {
        let mut users = self.users()?;
        match users.by_id.get_mut(&id) {
            Some(user) if user.reset_token.as_deref() == Some(token) => {
                update.apply_to(user, Utc::now());
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}
