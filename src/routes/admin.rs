use axum::{
    extract::State,
    Json,
};
use uuid::Uuid;

use super::extract::{ApiJson, ApiPath};
use crate::{
    accounts::Profile,
    error::AppResult,
    identity::Actor,
    profiles::{self, AccountFlags},
    state::AppState,
};

pub async fn update_user(
    State(state): State<AppState>,
    actor: Actor,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(payload): ApiJson<AccountFlags>,
) -> AppResult<Json<Profile>> {
    let mut conn = state.db()?;
    Ok(Json(profiles::update_account(&mut conn, &actor, id, payload)?))
}
