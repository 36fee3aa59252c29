//! Authentication manager implementation.

use super::{
    config::AuthConfig,
    errors::{AuthError, AuthResult},
    lockout::{FailureOutcome, LockoutTracker},
    models::{
        ChangePasswordRequest, CreateUserRequest, LoginRequest, NewUser, ResetPasswordRequest,
        SessionToken, User, UserId, UserLookup, UserProfile, UserUpdate,
    },
    notifier::Notifier,
    password::PasswordHasher,
    reset::ResetTokenService,
    tokens::TokenService,
    validation::{require, validate_email, validate_new_password},
};
use crate::db::UserRepository;
use chrono::{DateTime, Utc};
use std::sync::Arc;

/// Attempts at a conditional lockout write before giving up on a contended row.
/// A lost race means another writer's update landed, so this only runs out
/// with more concurrent failures on one account than attempts.
const MAX_LOCKOUT_RETRIES: usize = 16;

/// Authentication manager
///
/// Owns the credential store handle and every auth component. Cheap to clone.
#[derive(Clone)]
pub struct AuthManager {
    users: Arc<dyn UserRepository>,
    hasher: PasswordHasher,
    lockout: LockoutTracker,
    tokens: TokenService,
    resets: ResetTokenService,
}

impl AuthManager {
    /// Create a new authentication manager
    ///
    /// # Arguments
    ///
    /// * `users` - Credential store
    /// * `notifier` - Reset token delivery
    /// * `config` - Secrets, cost factor and lockout/token policy
    ///
    /// # Errors
    ///
    /// * `AuthError::Hashing` - Hash parameters rejected by Argon2
    pub fn new(
        users: Arc<dyn UserRepository>,
        notifier: Arc<dyn Notifier>,
        config: &AuthConfig,
    ) -> AuthResult<Self> {
        let hasher = PasswordHasher::new(config.hash_cost, config.hash_memory_kib)?;
        let lockout = LockoutTracker::new(config.lockout);
        let tokens = TokenService::new(&config.jwt_secret, config.token_ttl, config.max_refresh_age);
        let resets = ResetTokenService::new(
            users.clone(),
            notifier,
            hasher.clone(),
            config.reset_token_ttl,
            config.reset_token_len,
        );

        Ok(Self {
            users,
            hasher,
            lockout,
            tokens,
            resets,
        })
    }

    pub fn tokens(&self) -> &TokenService {
        &self.tokens
    }

    /// Register a new user and log them in
    ///
    /// # Errors
    ///
    /// * `AuthError::Validation` - Bad email, mismatched confirmation, or weak password
    /// * `AuthError::UsernameInUse` - Username already exists
    /// * `AuthError::EmailInUse` - Email already exists
    pub async fn create_user(&self, request: CreateUserRequest) -> AuthResult<(User, SessionToken)> {
        require(&request.username, "username")?;
        validate_email(&request.email)?;
        validate_new_password(&request.password, &request.password_confirm)?;

        if self
            .users
            .find_one(UserLookup::Username(&request.username))
            .await?
            .is_some()
        {
            return Err(AuthError::UsernameInUse);
        }

        if self
            .users
            .find_one(UserLookup::Email(&request.email))
            .await?
            .is_some()
        {
            return Err(AuthError::EmailInUse);
        }

        let password_hash = self.hasher.hash(&request.password).await?;

        // The store enforces uniqueness again for concurrent registrations
        let user = self
            .users
            .create(NewUser {
                username: request.username,
                email: request.email,
                password_hash,
                display_name: None,
            })
            .await?;

        log::info!("Created user {} ({})", user.id, user.username);

        let token = self.tokens.issue(&user)?;
        Ok((user, token))
    }

    /// Login with username or email and password
    ///
    /// # Errors
    ///
    /// * `AuthError::UserNotFound` - No such user
    /// * `AuthError::UserLocked` - Account is locked, or this failure locked it
    /// * `AuthError::InvalidCredentials` - Wrong password
    pub async fn authenticate_by_password(
        &self,
        request: LoginRequest,
    ) -> AuthResult<(User, SessionToken)> {
        require(&request.identifier, "identifier")?;
        require(&request.password, "password")?;

        let user = self
            .verify_credentials(request.lookup(), &request.password, true)
            .await?;

        log::info!("User {} logged in", user.id);

        let token = self.tokens.issue(&user)?;
        Ok((user, token))
    }

    /// Re-issue a token from a correctly signed one, expired or not.
    ///
    /// # Errors
    ///
    /// * `AuthError::InvalidToken` - Bad signature, or tokens revoked since issue
    /// * `AuthError::TokenExpired` - Login is older than the refresh limit
    /// * `AuthError::UserNotFound` - Subject no longer exists
    /// * `AuthError::UserLocked` - Account is locked
    pub async fn refresh_token(&self, token: &str) -> AuthResult<(User, SessionToken)> {
        let (user, token) = self
            .tokens
            .refresh(token, self.users.as_ref(), &self.lockout)
            .await?;

        log::debug!("Refreshed token for user {}", user.id);
        Ok((user, token))
    }

    /// Resolve a bearer token to its user.
    pub async fn authenticate_by_token(&self, token: &str) -> AuthResult<User> {
        let claims = self.tokens.verify(token)?;
        self.tokens
            .resolve(&claims, self.users.as_ref(), &self.lockout)
            .await
    }

    /// Public profile of the bearer.
    pub async fn current_user(&self, token: &str) -> AuthResult<UserProfile> {
        let user = self.authenticate_by_token(token).await?;
        Ok(UserProfile::from(&user))
    }

    /// Change password after re-checking the current one
    ///
    /// Every token issued before the change stops working.
    ///
    /// # Errors
    ///
    /// * `AuthError::Validation` - Mismatched confirmation or weak new password
    /// * `AuthError::UserNotFound` - No such user
    /// * `AuthError::UserLocked` - Account is locked
    /// * `AuthError::InvalidPassword` - Current password is wrong
    pub async fn change_password(&self, request: ChangePasswordRequest) -> AuthResult<()> {
        require(&request.identifier, "identifier")?;
        require(&request.current_password, "current_password")?;
        validate_new_password(&request.new_password, &request.new_password_confirm)?;

        let user = self
            .verify_credentials(request.lookup(), &request.current_password, false)
            .await
            .map_err(|e| match e {
                AuthError::InvalidCredentials => AuthError::InvalidPassword,
                other => other,
            })?;

        let password_hash = self.hasher.hash(&request.new_password).await?;
        self.users
            .update(
                user.id,
                UserUpdate::new()
                    .password_hash(password_hash)
                    .bump_token_version(),
            )
            .await?;

        log::info!("Password changed for user {}", user.id);
        Ok(())
    }

    /// Send a reset token to the owner of `email`
    ///
    /// # Errors
    ///
    /// * `AuthError::Validation` - Malformed email
    /// * `AuthError::UserNotFound` - No account uses this email
    pub async fn generate_reset_token(&self, email: &str) -> AuthResult<()> {
        validate_email(email)?;
        self.resets.generate_reset_token(email).await
    }

    /// Set a new password using a reset token
    ///
    /// # Errors
    ///
    /// * `AuthError::Validation` - Bad email, empty token, mismatched confirmation, or weak password
    /// * `AuthError::InvalidEmailOrToken` - Token does not match, was used, or expired
    pub async fn reset_password(&self, request: ResetPasswordRequest) -> AuthResult<()> {
        validate_email(&request.email)?;
        require(&request.reset_token, "reset_token")?;
        validate_new_password(&request.new_password, &request.new_password_confirm)?;

        self.resets
            .reset_password_by_reset_token(&request.email, &request.reset_token, &request.new_password)
            .await
    }

    /// Clear a lock and its failure history.
    pub async fn unlock_user(&self, user_id: UserId) -> AuthResult<()> {
        self.users
            .update(user_id, UserUpdate::new().lockout(Default::default()))
            .await?;
        log::info!("User {} unlocked", user_id);
        Ok(())
    }

    /// Invalidate every token issued so far for a user.
    pub async fn revoke_tokens(&self, user_id: UserId) -> AuthResult<()> {
        self.users
            .update(user_id, UserUpdate::new().bump_token_version())
            .await?;
        log::info!("Revoked all tokens for user {}", user_id);
        Ok(())
    }

    /// Shared lookup/verify path for login and change-password.
    ///
    /// Drives the lockout state machine both ways. With `record_login` set,
    /// a success also stamps `last_login_at`.
    async fn verify_credentials(
        &self,
        lookup: UserLookup<'_>,
        password: &str,
        record_login: bool,
    ) -> AuthResult<User> {
        let Some(mut user) = self.users.find_one(lookup).await? else {
            self.hasher.verify_dummy(password).await;
            log::info!("Login attempt for unknown user");
            return Err(AuthError::UserNotFound);
        };

        let now = Utc::now();
        self.release_expired_lock(&mut user, now).await?;

        if self.lockout.is_locked(&user.lockout, now) {
            log::warn!("Login attempt on locked account {}", user.id);
            return Err(AuthError::UserLocked);
        }

        if !self.hasher.verify(password, &user.password_hash).await? {
            return match self.record_failed_attempt(&user, now).await? {
                FailureOutcome::Locked => Err(AuthError::UserLocked),
                FailureOutcome::Active { .. } => Err(AuthError::InvalidCredentials),
            };
        }

        let mut update = UserUpdate::new();
        if record_login {
            update = update.last_login_at(now);
            user.last_login_at = Some(now);
        }

        match self.lockout.record_success(&user.lockout) {
            Some(cleared) => {
                let applied = self
                    .users
                    .update_lockout_if(user.id, &user.lockout, update.clone().lockout(cleared))
                    .await?;
                if applied {
                    user.lockout = cleared;
                } else if record_login {
                    self.users.update(user.id, update).await?;
                }
            }
            None if record_login => self.users.update(user.id, update).await?,
            None => {}
        }

        Ok(user)
    }

    /// Persist the release of a lock whose `unlock_after` has passed.
    async fn release_expired_lock(&self, user: &mut User, now: DateTime<Utc>) -> AuthResult<()> {
        let Some(released) = self.lockout.release_expired(&user.lockout, now) else {
            return Ok(());
        };

        let applied = self
            .users
            .update_lockout_if(user.id, &user.lockout, UserUpdate::new().lockout(released))
            .await?;

        if applied {
            log::info!("Lock expired for user {}", user.id);
            user.lockout = released;
        } else if let Some(current) = self.users.find_one(UserLookup::Id(user.id)).await? {
            user.lockout = current.lockout;
        }

        Ok(())
    }

    /// Record a wrong password with a conditional write, re-reading on conflict
    /// so concurrent failures cannot drop a transition into Locked.
    async fn record_failed_attempt(&self, user: &User, now: DateTime<Utc>) -> AuthResult<FailureOutcome> {
        let mut current = user.lockout;

        for _ in 0..MAX_LOCKOUT_RETRIES {
            let (next, outcome) = self.lockout.record_failure(&current, now);

            let applied = self
                .users
                .update_lockout_if(user.id, &current, UserUpdate::new().lockout(next))
                .await?;

            if applied {
                match outcome {
                    FailureOutcome::Locked => log::warn!(
                        "Account {} locked after {} failed attempts",
                        user.id,
                        next.failed_attempt_count
                    ),
                    FailureOutcome::Active { remaining } => log::info!(
                        "Failed login for user {} ({} attempts, {} remaining)",
                        user.id,
                        next.failed_attempt_count,
                        remaining
                    ),
                }
                return Ok(outcome);
            }

            current = self
                .users
                .find_one(UserLookup::Id(user.id))
                .await?
                .ok_or(AuthError::UserNotFound)?
                .lockout;

            if self.lockout.is_locked(&current, now) {
                return Ok(FailureOutcome::Locked);
            }
        }

        log::warn!("Gave up recording failed login for user {} under contention", user.id);
        Err(AuthError::InvalidCredentials)
    }
}

impl std::fmt::Debug for AuthManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthManager")
            .field("hasher", &self.hasher)
            .field("lockout", &self.lockout)
            .field("tokens", &self.tokens)
            .finish_non_exhaustive()
    }
}
