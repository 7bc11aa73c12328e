use axum::{
    extract::State,
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::extract::{ApiJson, ApiPath};
use crate::{
    contacts::Contact,
    error::{AppResult, ServiceError},
    identity::Actor,
    messages,
    models::Message,
    state::AppState,
};

#[derive(Deserialize)]
pub struct SendMessageRequest {
    #[serde(default)]
    pub receiver_id: Option<Uuid>,
    #[serde(default)]
    pub content: String,
}

#[derive(Serialize)]
pub struct MarkReadResponse {
    pub updated: usize,
}

pub async fn list_contacts(
    State(state): State<AppState>,
    actor: Actor,
) -> AppResult<Json<Vec<Contact>>> {
    let mut conn = state.db()?;
    Ok(Json(messages::contacts(&mut conn, &actor)?))
}

pub async fn history(
    State(state): State<AppState>,
    actor: Actor,
    ApiPath(other_user_id): ApiPath<Uuid>,
) -> AppResult<Json<Vec<Message>>> {
    let mut conn = state.db()?;
    Ok(Json(messages::history(&mut conn, &actor, other_user_id)?))
}

pub async fn mark_read(
    State(state): State<AppState>,
    actor: Actor,
    ApiPath(other_user_id): ApiPath<Uuid>,
) -> AppResult<Json<MarkReadResponse>> {
    let mut conn = state.db()?;
    let updated = messages::mark_read(&mut conn, &actor, other_user_id)?;
    Ok(Json(MarkReadResponse { updated }))
}

pub async fn send_message(
    State(state): State<AppState>,
    actor: Actor,
    ApiJson(payload): ApiJson<SendMessageRequest>,
) -> AppResult<(StatusCode, Json<Message>)> {
    let receiver_id = payload
        .receiver_id
        .ok_or_else(|| ServiceError::validation("receiver_id is required"))?;
    let mut conn = state.db()?;
    let message = messages::send(&mut conn, &actor, receiver_id, &payload.content)?;
    Ok((StatusCode::CREATED, Json(message)))
}
