use axum::{
    extract::State,
    http::StatusCode,
    Json,
};
use uuid::Uuid;

use super::extract::{ApiJson, ApiPath};
use crate::{
    error::AppResult,
    identity::Actor,
    jobs::{self, JobDraft, OpenJob},
    models::Job,
    state::AppState,
};

pub async fn list_jobs(State(state): State<AppState>, actor: Actor) -> AppResult<Json<Vec<OpenJob>>> {
    let mut conn = state.db()?;
    Ok(Json(jobs::list_open_jobs(&mut conn, &actor)?))
}

pub async fn create_job(
    State(state): State<AppState>,
    actor: Actor,
    ApiJson(payload): ApiJson<JobDraft>,
) -> AppResult<(StatusCode, Json<Job>)> {
    let mut conn = state.db()?;
    let job = jobs::create_job(&mut conn, &actor, payload)?;
    Ok((StatusCode::CREATED, Json(job)))
}

pub async fn list_my_jobs(State(state): State<AppState>, actor: Actor) -> AppResult<Json<Vec<Job>>> {
    let mut conn = state.db()?;
    Ok(Json(jobs::list_my_jobs(&mut conn, &actor)?))
}

pub async fn close_job(
    State(state): State<AppState>,
    actor: Actor,
    ApiPath(id): ApiPath<Uuid>,
) -> AppResult<Json<Job>> {
    let mut conn = state.db()?;
    Ok(Json(jobs::close_job(&mut conn, &actor, id)?))
}
