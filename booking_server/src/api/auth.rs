//! Account entrance handlers.
//!
//! JSON endpoints for registration, login, token refresh, password change and
//! password recovery. Failures render as `{"err_msg": "<CODE>"}` with a
//! status chosen per operation.
//!
//! # Examples
//!
//! Register a new user:
//! ```bash
//! curl -X POST http://localhost:8080/api/v1/entrance/create \
//!   -H "Content-Type: application/json" \
//!   -d '{"email": "alice@x.com", "username": "alice", "password": "Passw0rd", "password_confirm": "Passw0rd"}'
//! ```
//!
//! Login with username or email:
//! ```bash
//! curl -X POST http://localhost:8080/api/v1/entrance/login \
//!   -H "Content-Type: application/json" \
//!   -d '{"username": "alice@x.com", "password": "Passw0rd"}'
//! ```

use axum::{
    Json,
    extract::{Extension, State, rejection::JsonRejection},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use booking_auth::auth::{
    AuthError, AuthResult, ChangePasswordRequest, CreateUserRequest, ErrorKind, LoginRequest,
    ResetPasswordRequest, SessionToken, User, UserProfile, validation::is_valid_email,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;

use super::{
    AppState,
    extract::{ApiJson, rejection_code},
    middleware::bearer_token,
    request_id::RequestId,
};
use crate::{logging::log_security_event, metrics};

/// Endpoint identity, used to pick the status for an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    CreateUser,
    Login,
    RefreshToken,
    ChangePassword,
    ForgotPassword,
    ResetPassword,
    CurrentUser,
}

impl Operation {
    pub fn name(self) -> &'static str {
        match self {
            Operation::CreateUser => "create_user",
            Operation::Login => "login",
            Operation::RefreshToken => "refresh_token",
            Operation::ChangePassword => "change_password",
            Operation::ForgotPassword => "forgot_password",
            Operation::ResetPassword => "reset_password",
            Operation::CurrentUser => "current_user",
        }
    }
}

/// Response status for `error` raised by `operation`.
pub fn status_for(operation: Operation, error: &AuthError) -> StatusCode {
    match (error.kind(), operation) {
        (ErrorKind::Internal, _) => StatusCode::INTERNAL_SERVER_ERROR,
        (ErrorKind::Locked, _) => StatusCode::FORBIDDEN,
        (ErrorKind::NotFound, Operation::ForgotPassword) => StatusCode::NOT_FOUND,
        (ErrorKind::InvalidToken | ErrorKind::NotFound, Operation::CurrentUser) => {
            StatusCode::UNAUTHORIZED
        }
        _ => StatusCode::BAD_REQUEST,
    }
}

/// Client-facing code for `error` raised by `operation`.
///
/// Login and refresh do not reveal whether the account exists.
pub fn error_code(operation: Operation, error: &AuthError) -> &'static str {
    match (error, operation) {
        (AuthError::UserNotFound, Operation::Login | Operation::RefreshToken) => {
            "INVALID_EMAIL_OR_PASSWORD"
        }
        _ => error.client_message(),
    }
}

/// Handler error
#[derive(Debug)]
pub enum ApiError {
    Auth {
        operation: Operation,
        error: AuthError,
    },
    MissingBearer(Operation),
    InvalidBody(JsonRejection),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code) = match &self {
            ApiError::Auth { operation, error } => {
                (status_for(*operation, error), error_code(*operation, error))
            }
            ApiError::MissingBearer(Operation::CurrentUser) => {
                (StatusCode::UNAUTHORIZED, "NO_AUTHORIZATION_HEADER_FOUND")
            }
            ApiError::MissingBearer(_) => (
                StatusCode::BAD_REQUEST,
                "FORMAT_IS_AUTHORIZATION:BEARER_[TOKEN]",
            ),
            ApiError::InvalidBody(rejection) => (StatusCode::BAD_REQUEST, rejection_code(rejection)),
        };

        (status, Json(json!({ "err_msg": code }))).into_response()
    }
}

/// Success envelope
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub message: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T> ApiResponse<T> {
    fn with_data(message: &'static str, data: T) -> Json<Self> {
        Json(Self {
            message,
            data: Some(data),
        })
    }
}

impl ApiResponse<()> {
    fn message(message: &'static str) -> Json<Self> {
        Json(Self {
            message,
            data: None,
        })
    }
}

#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

impl From<SessionToken> for TokenResponse {
    fn from(token: SessionToken) -> Self {
        Self {
            token: token.token,
            expires_at: token.expires_at,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateUserPayload {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub password_confirm: String,
}

/// `username` may hold either the username or the email address.
#[derive(Debug, Deserialize)]
pub struct LoginPayload {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct ChangePasswordPayload {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub new_password: String,
    #[serde(default)]
    pub new_password_confirm: String,
}

#[derive(Debug, Deserialize)]
pub struct ForgotPasswordPayload {
    #[serde(default)]
    pub email: String,
}

#[derive(Debug, Deserialize)]
pub struct ResetPasswordPayload {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub reset_token: String,
    #[serde(default)]
    pub new_password: String,
    #[serde(default)]
    pub new_password_confirm: String,
}

/// Record metrics and security events for an outcome, then lift the error.
fn observe<T>(
    operation: Operation,
    request_id: &RequestId,
    result: AuthResult<T>,
) -> Result<T, ApiError> {
    match &result {
        Ok(_) => metrics::auth_operations_total(operation.name(), "ok"),
        Err(error) => {
            metrics::auth_operations_total(operation.name(), error_code(operation, error));

            match error {
                AuthError::UserLocked => {
                    metrics::accounts_locked_total();
                    log_security_event(
                        "account_locked",
                        None,
                        Some(request_id.as_str()),
                        &format!("{} rejected for locked account", operation.name()),
                    );
                }
                AuthError::InvalidCredentials | AuthError::InvalidPassword => log_security_event(
                    "failed_login",
                    None,
                    Some(request_id.as_str()),
                    "Wrong password",
                ),
                AuthError::InvalidEmailOrToken => log_security_event(
                    "invalid_reset_token",
                    None,
                    Some(request_id.as_str()),
                    "Reset token rejected",
                ),
                error if error.is_internal() => tracing::error!(
                    request_id = %request_id.as_str(),
                    operation = operation.name(),
                    error = %error,
                    "Internal error"
                ),
                _ => {}
            }
        }
    }

    result.map_err(|error| ApiError::Auth { operation, error })
}

/// Register a new account and log it in.
///
/// # Response
///
/// `201 Created`:
/// ```json
/// {"message": "USER_CREATED_SUCCESSFULLY", "data": {"token": "eyJ...", "expires_at": "..."}}
/// ```
///
/// # Errors
///
/// - `400 Bad Request`: Invalid email, mismatched or weak password, username or email in use
pub async fn create_user(
    State(state): State<AppState>,
    request_id: RequestId,
    ApiJson(payload): ApiJson<CreateUserPayload>,
) -> Result<impl IntoResponse, ApiError> {
    let request = CreateUserRequest {
        email: payload.email,
        username: payload.username,
        password: payload.password,
        password_confirm: payload.password_confirm,
    };

    let result = state.auth_manager.create_user(request).await;
    let (_, token) = observe(Operation::CreateUser, &request_id, result)?;

    Ok((
        StatusCode::CREATED,
        ApiResponse::with_data("USER_CREATED_SUCCESSFULLY", TokenResponse::from(token)),
    ))
}

/// Authenticate with username or email and password.
///
/// # Errors
///
/// - `400 Bad Request`: Unknown account or wrong password
/// - `403 Forbidden`: Account locked
pub async fn login(
    State(state): State<AppState>,
    request_id: RequestId,
    ApiJson(payload): ApiJson<LoginPayload>,
) -> Result<Json<ApiResponse<TokenResponse>>, ApiError> {
    let identifier_is_email = is_valid_email(&payload.username);
    let request = LoginRequest {
        identifier: payload.username,
        password: payload.password,
        identifier_is_email,
    };

    let result = state.auth_manager.authenticate_by_password(request).await;
    let (_, token) = observe(Operation::Login, &request_id, result)?;

    Ok(ApiResponse::with_data("USER_TOKEN", token.into()))
}

/// Exchange a signed token, expired or not, for a fresh one.
///
/// The token is read from `Authorization: Bearer <token>`.
///
/// # Errors
///
/// - `400 Bad Request`: Missing header, bad signature, revoked token, or unknown subject
/// - `403 Forbidden`: Account locked
pub async fn refresh_token(
    State(state): State<AppState>,
    request_id: RequestId,
    headers: HeaderMap,
) -> Result<Json<ApiResponse<TokenResponse>>, ApiError> {
    let token =
        bearer_token(&headers).ok_or(ApiError::MissingBearer(Operation::RefreshToken))?;

    let result = state.auth_manager.refresh_token(token).await;
    let (_, token) = observe(Operation::RefreshToken, &request_id, result)?;

    Ok(ApiResponse::with_data("USER_TOKEN", token.into()))
}

/// Change the password, given the current one.
///
/// # Errors
///
/// - `400 Bad Request`: Validation failure, unknown account, or wrong current password
/// - `403 Forbidden`: Account locked
pub async fn change_password(
    State(state): State<AppState>,
    request_id: RequestId,
    ApiJson(payload): ApiJson<ChangePasswordPayload>,
) -> Result<Json<ApiResponse<()>>, ApiError> {
    let identifier_is_email = is_valid_email(&payload.username);
    let request = ChangePasswordRequest {
        identifier: payload.username,
        current_password: payload.password,
        new_password: payload.new_password,
        new_password_confirm: payload.new_password_confirm,
        identifier_is_email,
    };

    let result = state.auth_manager.change_password(request).await;
    observe(Operation::ChangePassword, &request_id, result)?;

    Ok(ApiResponse::message("PASSWORD_UPDATED_SUCCESSFULLY"))
}

/// Send a reset token to the account's email.
///
/// # Errors
///
/// - `400 Bad Request`: Malformed email
/// - `404 Not Found`: No account with this email
pub async fn forgot_password(
    State(state): State<AppState>,
    request_id: RequestId,
    ApiJson(payload): ApiJson<ForgotPasswordPayload>,
) -> Result<Json<ApiResponse<()>>, ApiError> {
    let result = state.auth_manager.generate_reset_token(&payload.email).await;
    observe(Operation::ForgotPassword, &request_id, result)?;

    metrics::reset_tokens_issued_total();
    Ok(ApiResponse::message("CHECK_YOUR_MAIL"))
}

/// Set a new password with a reset token.
///
/// # Errors
///
/// - `400 Bad Request`: Validation failure, or email and token do not match
pub async fn reset_password(
    State(state): State<AppState>,
    request_id: RequestId,
    ApiJson(payload): ApiJson<ResetPasswordPayload>,
) -> Result<Json<ApiResponse<()>>, ApiError> {
    let request = ResetPasswordRequest {
        email: payload.email,
        reset_token: payload.reset_token,
        new_password: payload.new_password,
        new_password_confirm: payload.new_password_confirm,
    };

    let result = state.auth_manager.reset_password(request).await;
    observe(Operation::ResetPassword, &request_id, result)?;

    Ok(ApiResponse::message("DONE"))
}

/// Profile of the authenticated user.
pub async fn current_user(Extension(user): Extension<User>) -> Json<ApiResponse<UserProfile>> {
    ApiResponse::with_data("USER", UserProfile::from(&user))
}
