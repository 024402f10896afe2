//! Request identity.

use std::convert::Infallible;

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use common::UserId;

/// Header carrying the authenticated user's ID.
pub const USER_HEADER: &str = "x-user-id";

/// The user making the request. Empty when the header is absent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CurrentUser(pub UserId);

impl<S: Send + Sync> FromRequestParts<S> for CurrentUser {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let user = parts
            .headers
            .get(USER_HEADER)
            .and_then(|value| value.to_str().ok())
            .map(str::trim)
            .unwrap_or_default();
        Ok(CurrentUser(UserId::from(user)))
    }
}
