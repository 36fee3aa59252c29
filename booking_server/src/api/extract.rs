//! Request body extraction with the API's error envelope.

use axum::{
    Json,
    extract::{FromRequest, Request, rejection::JsonRejection},
};
use serde::de::DeserializeOwned;

use super::auth::ApiError;

/// `Json<T>` whose rejections render as `{"err_msg": ...}` with `400`.
///
/// A request without a JSON content type is `EMPTY_BODY`; unparseable or
/// mistyped JSON is `INVALID_BODY`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ApiJson<T>(pub T);

impl<S, T> FromRequest<S> for ApiJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(Self(value)),
            Err(rejection) => {
                tracing::debug!(reason = %rejection.body_text(), "Rejected request body");
                Err(ApiError::InvalidBody(rejection))
            }
        }
    }
}

/// Client code for a body rejection.
pub fn rejection_code(rejection: &JsonRejection) -> &'static str {
    match rejection {
        JsonRejection::MissingJsonContentType(_) => "EMPTY_BODY",
        _ => "INVALID_BODY",
    }
}
