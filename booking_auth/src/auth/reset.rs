//! Single-use password reset tokens.
//!
//! A reset token is a short random string stored on the user record together
//! with an expiry. It is delivered through the [`Notifier`] and never returned
//! to the caller. Redeeming it replaces the password, clears the token and the
//! lockout state, and revokes every session token issued before the reset.

use super::{
    errors::{AuthError, AuthResult},
    models::{LockoutState, UserLookup, UserUpdate},
    notifier::Notifier,
    password::PasswordHasher,
};
use crate::db::UserRepository;
use chrono::{Duration, Utc};
use rand::{Rng, distr::Alphanumeric};
use std::sync::Arc;
use subtle::ConstantTimeEq;

/// Default reset token lifetime (1 hour)
pub const DEFAULT_RESET_TOKEN_TTL_SECS: i64 = 60 * 60;

/// Default reset token length
pub const DEFAULT_RESET_TOKEN_LEN: usize = 12;

/// Reset token issuance and redemption
#[derive(Clone)]
pub struct ResetTokenService {
    users: Arc<dyn UserRepository>,
    notifier: Arc<dyn Notifier>,
    hasher: PasswordHasher,
    ttl: Duration,
    token_len: usize,
}

impl ResetTokenService {
    pub fn new(
        users: Arc<dyn UserRepository>,
        notifier: Arc<dyn Notifier>,
        hasher: PasswordHasher,
        ttl: Duration,
        token_len: usize,
    ) -> Self {
        Self {
            users,
            notifier,
            hasher,
            ttl,
            token_len,
        }
    }

    fn new_token(&self) -> String {
        rand::rng()
            .sample_iter(&Alphanumeric)
            .take(self.token_len)
            .map(char::from)
            .collect()
    }

    /// Issue a reset token for the account registered under `email` and hand
    /// it to the notifier. Any earlier token for the account is replaced.
    ///
    /// # Errors
    ///
    /// * `AuthError::UserNotFound` - No account uses this email
    pub async fn generate_reset_token(&self, email: &str) -> AuthResult<()> {
        let user = self
            .users
            .find_one(UserLookup::Email(email))
            .await?
            .ok_or(AuthError::UserNotFound)?;

        let token = self.new_token();
        let expires_at = Utc::now() + self.ttl;

        self.users
            .update(user.id, UserUpdate::new().reset_token(token.clone(), expires_at))
            .await?;

        log::info!("Reset token generated for user {}", user.id);

        if let Err(e) = self.notifier.send_reset_token(&user.email, &token).await {
            log::warn!("Failed to deliver reset token for user {}: {}", user.id, e);
        }

        Ok(())
    }

    /// Redeem a reset token and set a new password.
    ///
    /// The password is expected to have passed policy checks already.
    ///
    /// # Errors
    ///
    /// * `AuthError::InvalidEmailOrToken` - Unknown email, wrong token, expired
    ///   token, or a token that was already used
    pub async fn reset_password_by_reset_token(
        &self,
        email: &str,
        token: &str,
        new_password: &str,
    ) -> AuthResult<()> {
        let user = self
            .users
            .find_one(UserLookup::Email(email))
            .await?
            .ok_or(AuthError::InvalidEmailOrToken)?;

        let Some(stored) = user.reset_token.as_deref() else {
            return Err(AuthError::InvalidEmailOrToken);
        };

        if !bool::from(stored.as_bytes().ct_eq(token.as_bytes())) {
            log::warn!("Reset token mismatch for user {}", user.id);
            return Err(AuthError::InvalidEmailOrToken);
        }

        // A token without an expiry is treated as expired
        let expired = user
            .reset_token_expires_at
            .is_none_or(|expires_at| expires_at <= Utc::now());
        if expired {
            self.users
                .consume_reset_token(user.id, stored, UserUpdate::new().clear_reset_token())
                .await?;
            log::info!("Expired reset token discarded for user {}", user.id);
            return Err(AuthError::InvalidEmailOrToken);
        }

        let password_hash = self.hasher.hash(new_password).await?;

        let update = UserUpdate::new()
            .password_hash(password_hash)
            .clear_reset_token()
            .lockout(LockoutState::cleared())
            .bump_token_version();

        if !self.users.consume_reset_token(user.id, stored, update).await? {
            // Redeemed or replaced concurrently
            return Err(AuthError::InvalidEmailOrToken);
        }

        log::info!("Password reset completed for user {}", user.id);
        Ok(())
    }
}

impl std::fmt::Debug for ResetTokenService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResetTokenService")
            .field("ttl", &self.ttl)
            .field("token_len", &self.token_len)
            .finish_non_exhaustive()
    }
}
