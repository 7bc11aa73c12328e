use axum::{
    extract::{Multipart, State},
    http::StatusCode,
    Json,
};
use tracing::error;
use uuid::Uuid;

use crate::{
    contacts::{self, Employee},
    documents::{self, DocumentUpload, ReceivedDocument, SentDocument},
    error::{AppError, AppResult},
    identity::Actor,
    models::Document,
    state::AppState,
};

async fn text_field(field: axum::extract::multipart::Field<'_>, label: &str) -> AppResult<String> {
    field.text().await.map_err(|err| {
        error!(error = %err, field = label, "invalid multipart text field");
        AppError::bad_request(format!("invalid {label}: {err}"))
    })
}

pub async fn upload_document(
    State(state): State<AppState>,
    actor: Actor,
    mut multipart: Multipart,
) -> AppResult<(StatusCode, Json<Document>)> {
    let mut file_bytes: Option<Vec<u8>> = None;
    let mut original_name: Option<String> = None;
    let mut content_type: Option<String> = None;
    let mut recipient_id: Option<Uuid> = None;
    let mut month: Option<String> = None;
    let mut file_name: Option<String> = None;

    while let Some(field) = multipart.next_field().await.map_err(|err| {
        error!(error = %err, "invalid multipart data");
        AppError::bad_request(format!("invalid multipart data: {err}"))
    })? {
        let name = field.name().map(|n| n.to_string());
        match name.as_deref() {
            Some("document") => {
                original_name = field.file_name().map(|n| n.to_string());
                content_type = field.content_type().map(|mime| mime.to_string());
                let data = field.bytes().await.map_err(|err| {
                    error!(error = %err, "failed to read document bytes");
                    AppError::bad_request(format!("failed to read file bytes: {err}"))
                })?;
                file_bytes = Some(data.to_vec());
            }
            Some("user_id") => {
                let value = text_field(field, "user_id").await?;
                let parsed = Uuid::parse_str(value.trim())
                    .map_err(|_| AppError::bad_request("user_id must be a valid UUID"))?;
                recipient_id = Some(parsed);
            }
            Some("month") => month = Some(text_field(field, "month").await?),
            Some("file_name") => file_name = Some(text_field(field, "file_name").await?),
            _ => {}
        }
    }

    let bytes = file_bytes.ok_or_else(|| {
        error!("upload rejected: missing document field");
        AppError::bad_request("document field is required")
    })?;
    let recipient_id =
        recipient_id.ok_or_else(|| AppError::bad_request("user_id field is required"))?;
    let month = month.ok_or_else(|| AppError::bad_request("month field is required"))?;

    let request = DocumentUpload {
        recipient_id,
        month,
        file_name,
        original_name: original_name.unwrap_or_default(),
        content_type,
        bytes,
    };
    let document = documents::upload(&state.pool, state.storage.as_ref(), &actor, request).await?;
    Ok((StatusCode::CREATED, Json(document)))
}

pub async fn list_mine(
    State(state): State<AppState>,
    actor: Actor,
) -> AppResult<Json<Vec<ReceivedDocument>>> {
    let mut conn = state.db()?;
    Ok(Json(documents::list_mine(&mut conn, &actor)?))
}

pub async fn list_sent(
    State(state): State<AppState>,
    actor: Actor,
) -> AppResult<Json<Vec<SentDocument>>> {
    let mut conn = state.db()?;
    Ok(Json(documents::list_sent(&mut conn, &actor)?))
}

pub async fn list_my_employees(
    State(state): State<AppState>,
    actor: Actor,
) -> AppResult<Json<Vec<Employee>>> {
    let mut conn = state.db()?;
    Ok(Json(contacts::list_employees_of(&mut conn, &actor)?))
}
