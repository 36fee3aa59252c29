//! User store abstraction and its PostgreSQL implementation.
//!
//! [`UserRepository`] is the only way the auth layer touches durable state.
//! Username and email are each unique; `create` reports which one collided.

use async_trait::async_trait;
use sqlx::{PgPool, Postgres, QueryBuilder, Row, postgres::PgRow};

use crate::auth::{
    AuthError, AuthResult, LockoutState, NewUser, User, UserId, UserLookup, UserUpdate,
};

/// Trait for user/credential repository operations
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Find a single user by id, username, or email
    async fn find_one(&self, lookup: UserLookup<'_>) -> AuthResult<Option<User>>;

    /// Insert a user
    ///
    /// # Errors
    ///
    /// * `AuthError::UsernameInUse` / `AuthError::EmailInUse` - Uniqueness violated
    async fn create(&self, user: NewUser) -> AuthResult<User>;

    /// Apply a partial update
    ///
    /// # Errors
    ///
    /// * `AuthError::UserNotFound` - No row with this id
    async fn update(&self, id: UserId, update: UserUpdate) -> AuthResult<()>;

    /// Apply `update` only if the stored lockout fields still equal `expected`.
    ///
    /// Returns `false` when another writer got there first.
    async fn update_lockout_if(
        &self,
        id: UserId,
        expected: &LockoutState,
        update: UserUpdate,
    ) -> AuthResult<bool>;

    /// Apply `update` only if the stored reset token still equals `token`.
    ///
    /// Returns `false` when the token was already consumed or replaced.
    async fn consume_reset_token(
        &self,
        id: UserId,
        token: &str,
        update: UserUpdate,
    ) -> AuthResult<bool>;
}

const USER_COLUMNS: &str = "id, username, email, password_hash, display_name, address, \
     contact_number, gender_code, avatar_ref, is_admin, failed_attempt_count, last_failure_at, \
     locked, reset_token, reset_token_expires_at, token_version, created_at, modified_at, \
     last_login_at";

fn user_from_row(row: &PgRow) -> AuthResult<User> {
    let failed_attempt_count: i32 = row.try_get("failed_attempt_count")?;
    let failed_attempt_count = u32::try_from(failed_attempt_count).map_err(|_| {
        AuthError::Internal(format!(
            "Negative failed attempt count in database: {failed_attempt_count}"
        ))
    })?;

    Ok(User {
        id: row.try_get("id")?,
        username: row.try_get("username")?,
        email: row.try_get("email")?,
        password_hash: row.try_get("password_hash")?,
        display_name: row.try_get("display_name")?,
        address: row.try_get("address")?,
        contact_number: row.try_get("contact_number")?,
        gender_code: row.try_get("gender_code")?,
        avatar_ref: row.try_get("avatar_ref")?,
        is_admin: row.try_get("is_admin")?,
        lockout: LockoutState {
            failed_attempt_count,
            last_failure_at: row.try_get("last_failure_at")?,
            locked: row.try_get("locked")?,
        },
        reset_token: row.try_get("reset_token")?,
        reset_token_expires_at: row.try_get("reset_token_expires_at")?,
        token_version: row.try_get("token_version")?,
        created_at: row.try_get("created_at")?,
        modified_at: row.try_get("modified_at")?,
        last_login_at: row.try_get("last_login_at")?,
    })
}

/// Append `SET` assignments for every field present in `update`.
fn push_assignments(builder: &mut QueryBuilder<'_, Postgres>, update: UserUpdate) {
    builder.push("UPDATE users SET modified_at = NOW()");

    if let Some(hash) = update.password_hash {
        builder.push(", password_hash = ").push_bind(hash);
    }
    if let Some(token) = update.reset_token {
        builder.push(", reset_token = ").push_bind(token);
    }
    if let Some(expires_at) = update.reset_token_expires_at {
        builder.push(", reset_token_expires_at = ").push_bind(expires_at);
    }
    if let Some(lockout) = update.lockout {
        builder
            .push(", failed_attempt_count = ")
            .push_bind(lockout.failed_attempt_count as i32)
            .push(", last_failure_at = ")
            .push_bind(lockout.last_failure_at)
            .push(", locked = ")
            .push_bind(lockout.locked);
    }
    if let Some(at) = update.last_login_at {
        builder.push(", last_login_at = ").push_bind(at);
    }
    if update.bump_token_version {
        builder.push(", token_version = token_version + 1");
    }
}

fn map_unique_violation(err: sqlx::Error) -> AuthError {
    if let sqlx::Error::Database(db_err) = &err
        && db_err.is_unique_violation()
    {
        return match db_err.constraint() {
            Some("users_email_key") => AuthError::EmailInUse,
            _ => AuthError::UsernameInUse,
        };
    }
    AuthError::Database(err)
}

/// Default PostgreSQL implementation of `UserRepository`
pub struct PgUserRepository {
    pool: PgPool,
}

impl PgUserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserRepository for PgUserRepository {
    async fn find_one(&self, lookup: UserLookup<'_>) -> AuthResult<Option<User>> {
        let mut builder = QueryBuilder::<Postgres>::new(format!("SELECT {USER_COLUMNS} FROM users WHERE "));
        match lookup {
            UserLookup::Id(id) => builder.push("id = ").push_bind(id),
            UserLookup::Username(username) => builder.push("username = ").push_bind(username),
            UserLookup::Email(email) => builder.push("email = ").push_bind(email),
        };

        let row = builder.build().fetch_optional(&self.pool).await?;
        row.as_ref().map(user_from_row).transpose()
    }

    async fn create(&self, user: NewUser) -> AuthResult<User> {
        let row = sqlx::query(&format!(
            "INSERT INTO users (username, email, password_hash, display_name) \
             VALUES ($1, $2, $3, $4) RETURNING {USER_COLUMNS}"
        ))
        .bind(&user.username)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(&user.display_name)
        .fetch_one(&self.pool)
        .await
        .map_err(map_unique_violation)?;

        user_from_row(&row)
    }

    async fn update(&self, id: UserId, update: UserUpdate) -> AuthResult<()> {
        let mut builder = QueryBuilder::<Postgres>::new("");
        push_assignments(&mut builder, update);
        builder.push(" WHERE id = ").push_bind(id);

        let result = builder.build().execute(&self.pool).await?;
        if result.rows_affected() == 0 {
            return Err(AuthError::UserNotFound);
        }
        Ok(())
    }

    async fn update_lockout_if(
        &self,
        id: UserId,
        expected: &LockoutState,
        update: UserUpdate,
    ) -> AuthResult<bool> {
        let mut builder = QueryBuilder::<Postgres>::new("");
        push_assignments(&mut builder, update);
        builder
            .push(" WHERE id = ")
            .push_bind(id)
            .push(" AND failed_attempt_count = ")
            .push_bind(expected.failed_attempt_count as i32)
            .push(" AND locked = ")
            .push_bind(expected.locked)
            .push(" AND last_failure_at IS NOT DISTINCT FROM ")
            .push_bind(expected.last_failure_at);

        let result = builder.build().execute(&self.pool).await?;
        Ok(result.rows_affected() == 1)
    }

    async fn consume_reset_token(
        &self,
        id: UserId,
        token: &str,
        update: UserUpdate,
    ) -> AuthResult<bool> {
        let mut builder = QueryBuilder::<Postgres>::new("");
        push_assignments(&mut builder, update);
        builder
            .push(" WHERE id = ")
            .push_bind(id)
            .push(" AND reset_token = ")
            .push_bind(token.to_string());

        let result = builder.build().execute(&self.pool).await?;
        Ok(result.rows_affected() == 1)
    }
}
