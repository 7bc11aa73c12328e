use axum::{extract::State, http::StatusCode, Json};
use serde::{Deserialize, Serialize};

use super::extract::ApiJson;
use crate::{
    accounts::{self, Profile, Registration},
    error::{AppError, AppResult},
    identity::{Actor, Role},
    models::User,
    state::AppState,
};

#[derive(Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Serialize)]
pub struct SessionResponse {
    pub token: String,
    pub token_type: &'static str,
    pub expires_in: i64,
    pub user: Profile,
}

fn session_for(state: &AppState, user: User) -> AppResult<SessionResponse> {
    let role: Role = user.role.parse().map_err(AppError::internal)?;
    let token = state.jwt.generate_token(user.id, role)?;
    Ok(SessionResponse {
        token,
        token_type: "Bearer",
        expires_in: state.jwt.expires_in_seconds(),
        user: user.into(),
    })
}

pub async fn register(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<Registration>,
) -> AppResult<(StatusCode, Json<SessionResponse>)> {
    let mut conn = state.db()?;
    let user = accounts::register(&mut conn, payload)?;
    Ok((StatusCode::CREATED, Json(session_for(&state, user)?)))
}

pub async fn login(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<LoginRequest>,
) -> AppResult<Json<SessionResponse>> {
    let mut conn = state.db()?;
    let user = accounts::authenticate(&mut conn, &payload.email, &payload.password)?;
    tracing::info!(user_id = %user.id, "user logged in");
    Ok(Json(session_for(&state, user)?))
}

pub async fn me(actor: Actor) -> Json<Actor> {
    Json(actor)
}
