//! Request identity.
//!
//! The real identity middleware (token verification and user resolution)
//! sits in front of this service; by the time a request lands here it
//! carries the resolved user id in the `X-User-Id` header. This extractor
//! is the whole interface to it.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;

use crate::error::HttpAppError;
use encore_core::AppError;

const USER_ID_HEADER: &str = "x-user-id";

/// The authenticated user for the current request.
#[derive(Debug, Clone, Copy)]
pub struct CurrentUser {
    pub user_id: i64,
}

impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = HttpAppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let user_id = parts
            .headers
            .get(USER_ID_HEADER)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.parse::<i64>().ok())
            .ok_or_else(|| {
                HttpAppError(AppError::Unauthorized("missing user identity".to_string()))
            })?;

        Ok(CurrentUser { user_id })
    }
}
