//! Signed session tokens (HS256 JWT).
//!
//! Tokens name the user by `sub` (username) and carry the numeric id, the
//! user's token version, and the time of the original password login. Issuing
//! and verifying are pure; only [`TokenService::resolve`] and
//! [`TokenService::refresh`] consult the store, and neither writes to it.

use super::{
    errors::{AuthError, AuthResult},
    lockout::LockoutTracker,
    models::{SessionToken, TokenClaims, User, UserLookup},
};
use crate::db::UserRepository;
use chrono::{DateTime, Duration, TimeZone, Utc};
use jsonwebtoken::{
    Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode,
    errors::ErrorKind as JwtErrorKind,
};

/// Default token lifetime (24 hours)
pub const DEFAULT_TOKEN_TTL_SECS: i64 = 24 * 60 * 60;

/// Default cap on how long a login can be stretched by refreshing (7 days)
pub const DEFAULT_MAX_REFRESH_AGE_SECS: i64 = 7 * 24 * 60 * 60;

/// Token issuance and verification
#[derive(Clone)]
pub struct TokenService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    ttl: Duration,
    max_refresh_age: Option<Duration>,
}

impl TokenService {
    /// Create a token service
    ///
    /// # Arguments
    ///
    /// * `secret` - HMAC signing secret
    /// * `ttl` - Lifetime of each issued token
    /// * `max_refresh_age` - How long after the password login a token may
    ///   still be refreshed; `None` for no limit
    pub fn new(secret: &str, ttl: Duration, max_refresh_age: Option<Duration>) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            ttl,
            max_refresh_age,
        }
    }

    /// Issue a token for a fresh password login.
    pub fn issue(&self, user: &User) -> AuthResult<SessionToken> {
        let now = Utc::now();
        self.issue_at(user, now, now)
    }

    /// Issue a token with an explicit issue time and original login time.
    pub fn issue_at(
        &self,
        user: &User,
        issued_at: DateTime<Utc>,
        auth_time: DateTime<Utc>,
    ) -> AuthResult<SessionToken> {
        let expires_at = issued_at + self.ttl;
        let claims = TokenClaims {
            sub: user.username.clone(),
            uid: user.id,
            ver: user.token_version,
            auth_time: auth_time.timestamp(),
            iat: issued_at.timestamp(),
            exp: expires_at.timestamp(),
        };

        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| AuthError::Internal(format!("Token signing failed: {e}")))?;

        Ok(SessionToken { token, expires_at })
    }

    fn decode_claims(&self, token: &str, check_expiry: bool) -> AuthResult<TokenClaims> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.validate_exp = check_expiry;

        decode::<TokenClaims>(token, &self.decoding_key, &validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                JwtErrorKind::ExpiredSignature => AuthError::TokenExpired,
                _ => AuthError::InvalidToken,
            })
    }

    /// Verify signature and expiry.
    ///
    /// # Errors
    ///
    /// * `AuthError::TokenExpired` - Signature is valid but the token has expired
    /// * `AuthError::InvalidToken` - Malformed or wrongly signed token
    pub fn verify(&self, token: &str) -> AuthResult<TokenClaims> {
        self.decode_claims(token, true)
    }

    /// Verify the signature only. Used by refresh.
    pub fn verify_ignoring_expiry(&self, token: &str) -> AuthResult<TokenClaims> {
        self.decode_claims(token, false)
    }

    /// Load the user named by verified claims and check the claims still
    /// describe that user.
    ///
    /// # Errors
    ///
    /// * `AuthError::UserNotFound` - Subject no longer exists
    /// * `AuthError::InvalidToken` - Subject was recreated or tokens were revoked
    /// * `AuthError::UserLocked` - Account is currently locked
    pub async fn resolve(
        &self,
        claims: &TokenClaims,
        users: &dyn UserRepository,
        lockout: &LockoutTracker,
    ) -> AuthResult<User> {
        let user = users
            .find_one(UserLookup::Username(&claims.sub))
            .await?
            .ok_or(AuthError::UserNotFound)?;

        if user.id != claims.uid || user.token_version != claims.ver {
            return Err(AuthError::InvalidToken);
        }

        if lockout.is_locked(&user.lockout, Utc::now()) {
            return Err(AuthError::UserLocked);
        }

        Ok(user)
    }

    /// Re-issue a token from a correctly signed one, expired or not.
    ///
    /// The new token keeps the original login time, so a chain of refreshes
    /// ends once `max_refresh_age` has passed since the password login.
    pub async fn refresh(
        &self,
        token: &str,
        users: &dyn UserRepository,
        lockout: &LockoutTracker,
    ) -> AuthResult<(User, SessionToken)> {
        let claims = self.verify_ignoring_expiry(token)?;
        let now = Utc::now();

        let auth_time = Utc
            .timestamp_opt(claims.auth_time, 0)
            .single()
            .ok_or(AuthError::InvalidToken)?;

        if let Some(max_age) = self.max_refresh_age
            && now - auth_time > max_age
        {
            return Err(AuthError::TokenExpired);
        }

        let user = self.resolve(&claims, users, lockout).await?;
        let token = self.issue_at(&user, now, auth_time)?;

        Ok((user, token))
    }
}

impl std::fmt::Debug for TokenService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenService")
            .field("ttl", &self.ttl)
            .field("max_refresh_age", &self.max_refresh_age)
            .finish_non_exhaustive()
    }
}
