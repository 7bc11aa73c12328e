use axum::{
    extract::{Multipart, State},
    Json,
};
use serde_json::Value;
use tracing::error;

use super::extract::ApiJson;
use crate::{
    accounts::Profile,
    error::{AppError, AppResult},
    identity::Actor,
    profiles,
    state::AppState,
};

pub async fn get_me(State(state): State<AppState>, actor: Actor) -> AppResult<Json<Profile>> {
    let mut conn = state.db()?;
    Ok(Json(profiles::get_profile(&mut conn, &actor)?))
}

pub async fn update_me(
    State(state): State<AppState>,
    actor: Actor,
    ApiJson(payload): ApiJson<Value>,
) -> AppResult<Json<Profile>> {
    let mut conn = state.db()?;
    Ok(Json(profiles::update_profile(&mut conn, &actor, &payload)?))
}

pub async fn upload_avatar(
    State(state): State<AppState>,
    actor: Actor,
    mut multipart: Multipart,
) -> AppResult<Json<Profile>> {
    while let Some(field) = multipart.next_field().await.map_err(|err| {
        error!(error = %err, "invalid multipart data");
        AppError::bad_request(format!("invalid multipart data: {err}"))
    })? {
        if field.name() != Some("avatar") {
            continue;
        }
        let original_name = field.file_name().unwrap_or_default().to_string();
        let content_type = field.content_type().map(|mime| mime.to_string());
        let data = field.bytes().await.map_err(|err| {
            error!(error = %err, "failed to read avatar bytes");
            AppError::bad_request(format!("failed to read file bytes: {err}"))
        })?;

        let profile = profiles::upload_avatar(
            &state.pool,
            state.storage.as_ref(),
            &actor,
            &original_name,
            content_type,
            data.to_vec(),
        )
        .await?;
        return Ok(Json(profile));
    }

    Err(AppError::bad_request("avatar field is required"))
}
