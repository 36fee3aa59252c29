//! Bearer-token authentication for protected endpoints.
//!
//! The middleware resolves `Authorization: Bearer <token>` to the current
//! [`User`] and stores it in request extensions:
//!
//! ```rust,no_run
//! use axum::extract::Extension;
//! use booking_auth::auth::User;
//!
//! async fn protected_handler(Extension(user): Extension<User>) -> String {
//!     format!("Authenticated as {}", user.username)
//! }
//! # let _ = protected_handler;
//! ```

use axum::{
    extract::{Request, State},
    http::{HeaderMap, header::AUTHORIZATION},
    middleware::Next,
    response::Response,
};

use super::{
    AppState,
    auth::{ApiError, Operation},
};

/// Extract the token from an `Authorization: Bearer <token>` header.
///
/// The scheme is matched case-insensitively.
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    let token = token.trim();

    (scheme.eq_ignore_ascii_case("Bearer") && !token.is_empty()).then_some(token)
}

/// Authentication middleware that validates the bearer token and injects the user.
///
/// - **Success**: Token valid, user exists and is not locked → `User` in extensions
/// - **Missing or malformed header**: `401 Unauthorized`
/// - **Expired, revoked or unknown-subject token**: `401 Unauthorized`
/// - **Locked account**: `403 Forbidden`
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = bearer_token(request.headers())
        .ok_or(ApiError::MissingBearer(Operation::CurrentUser))?
        .to_string();

    let user = state
        .auth_manager
        .authenticate_by_token(&token)
        .await
        .map_err(|error| ApiError::Auth {
            operation: Operation::CurrentUser,
            error,
        })?;

    request.extensions_mut().insert(user);
    Ok(next.run(request).await)
}
