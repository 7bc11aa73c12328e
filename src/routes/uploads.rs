use axum::{
    extract::{Path, State},
    http::{header, HeaderValue},
    response::{IntoResponse, Response},
};
use tracing::error;

use crate::{
    error::{AppError, AppResult},
    state::AppState,
};

/// Serves a stored blob back under the public `/uploads/<key>` URL.
pub async fn serve_upload(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> AppResult<Response> {
    if key.split('/').any(|segment| segment.is_empty() || segment == "..") {
        return Err(AppError::not_found());
    }

    let object = state.storage.get_object(&key).await.map_err(|err| {
        error!(error = %err, %key, "failed to fetch stored object");
        AppError::internal(err)
    })?;
    let object = object.ok_or_else(AppError::not_found)?;

    let content_type = object
        .content_type
        .or_else(|| {
            mime_guess::from_path(&key)
                .first()
                .map(|mime| mime.essence_str().to_string())
        })
        .unwrap_or_else(|| "application/octet-stream".to_string());
    let content_type = HeaderValue::from_str(&content_type)
        .unwrap_or_else(|_| HeaderValue::from_static("application/octet-stream"));

    Ok(([(header::CONTENT_TYPE, content_type)], object.bytes).into_response())
}
