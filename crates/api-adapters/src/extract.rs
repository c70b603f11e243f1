//! Bearer-token authentication extractor. Handlers that take a
//! `CurrentUser` argument only run for authenticated requests; everything
//! else gets a uniform 401.

use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;

use domains::User;

use crate::error::ApiError;
use crate::AppState;

pub struct CurrentUser(pub User);

impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, ApiError> {
        let token = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "))
            .ok_or_else(|| ApiError::unauthenticated("missing bearer token"))?;

        let user = state.auth.authenticate(token).await?;
        Ok(CurrentUser(user))
    }
}
