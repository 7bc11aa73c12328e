pub mod jwt;
pub mod password;

use axum::{async_trait, extract::FromRequestParts, http::request::Parts};
use axum_extra::headers::{authorization::Bearer, Authorization};
use axum_extra::TypedHeader;

use crate::{error::AppError, identity::Actor, state::AppState};

/// Resolves the bearer token into the acting user. A missing token is a 401,
/// a present but unusable one is a 403.
#[async_trait]
impl FromRequestParts<AppState> for Actor {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let TypedHeader(Authorization(bearer)) =
            TypedHeader::<Authorization<Bearer>>::from_request_parts(parts, state)
                .await
                .map_err(|rejection| {
                    if rejection.is_missing() {
                        AppError::unauthorized()
                    } else {
                        AppError::invalid_token()
                    }
                })?;

        let claims = state
            .jwt
            .verify_token(bearer.token())
            .map_err(|_| AppError::invalid_token())?;

        let role = claims.role.parse().map_err(|_| AppError::invalid_token())?;

        Ok(Actor::new(claims.sub, role))
    }
}
