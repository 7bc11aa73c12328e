use axum::{
    extract::State,
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use uuid::Uuid;

use super::extract::{ApiJson, ApiPath};
use crate::{
    applications::{self, JobApplicant, MyApplication},
    error::{AppResult, ServiceError},
    identity::Actor,
    models::Application,
    state::AppState,
};

#[derive(Deserialize)]
pub struct ApplyRequest {
    #[serde(default)]
    pub job_id: Option<Uuid>,
}

#[derive(Deserialize)]
pub struct StatusRequest {
    #[serde(default)]
    pub status: String,
}

pub async fn apply(
    State(state): State<AppState>,
    actor: Actor,
    ApiJson(payload): ApiJson<ApplyRequest>,
) -> AppResult<(StatusCode, Json<Application>)> {
    let job_id = payload
        .job_id
        .ok_or_else(|| ServiceError::validation("job_id is required"))?;
    let mut conn = state.db()?;
    let application = applications::apply(&mut conn, &actor, job_id)?;
    Ok((StatusCode::CREATED, Json(application)))
}

pub async fn list_my_applications(
    State(state): State<AppState>,
    actor: Actor,
) -> AppResult<Json<Vec<MyApplication>>> {
    let mut conn = state.db()?;
    Ok(Json(applications::list_my_applications(&mut conn, &actor)?))
}

pub async fn list_job_applications(
    State(state): State<AppState>,
    actor: Actor,
    ApiPath(job_id): ApiPath<Uuid>,
) -> AppResult<Json<Vec<JobApplicant>>> {
    let mut conn = state.db()?;
    Ok(Json(applications::list_job_applications(
        &mut conn, &actor, job_id,
    )?))
}

pub async fn update_status(
    State(state): State<AppState>,
    actor: Actor,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(payload): ApiJson<StatusRequest>,
) -> AppResult<Json<Application>> {
    let mut conn = state.db()?;
    Ok(Json(applications::update_status(
        &mut conn,
        &actor,
        id,
        &payload.status,
    )?))
}
