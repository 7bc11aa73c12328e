use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use std::fmt::Display;
use thiserror::Error;

pub const LIMIT_REACHED: &str = "LIMIT_REACHED";

/// Failures of the core operations, independent of HTTP.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("{0}")]
    Authentication(String),
    #[error("{0}")]
    Authorization(String),
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    Conflict(String),
    #[error("{message}")]
    QuotaExceeded { message: String, code: &'static str },
    #[error("{0}")]
    NotFound(String),
    #[error("database error: {0}")]
    Database(#[from] diesel::result::Error),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

pub type ServiceResult<T> = Result<T, ServiceError>;

impl ServiceError {
    pub fn forbidden() -> Self {
        Self::Authorization("insufficient permissions".to_string())
    }

    /// Deliberately the same for "exists but not yours" and "does not exist".
    pub fn not_owned() -> Self {
        Self::Authorization("not authorized or resource not found".to_string())
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }
}

pub type AppResult<T> = Result<T, AppError>;

#[derive(Debug)]
pub struct AppError {
    status: StatusCode,
    message: String,
    code: Option<&'static str>,
}

impl AppError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
            code: None,
        }
    }

    pub fn with_code(mut self, code: &'static str) -> Self {
        self.code = Some(code);
        self
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn unauthorized() -> Self {
        Self::new(StatusCode::UNAUTHORIZED, "access denied")
    }

    pub fn invalid_token() -> Self {
        Self::new(StatusCode::FORBIDDEN, "invalid token")
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(StatusCode::FORBIDDEN, message)
    }

    pub fn not_found() -> Self {
        Self::new(StatusCode::NOT_FOUND, "resource not found")
    }

    pub fn internal<E: Display>(error: E) -> Self {
        tracing::error!(error = %error, "internal server error");
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, "internal server error")
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status;
        let body = Json(ErrorResponse {
            error: self.message,
            code: self.code,
        });
        (status, body).into_response()
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    code: Option<&'static str>,
}

impl From<ServiceError> for AppError {
    fn from(value: ServiceError) -> Self {
        match value {
            ServiceError::Authentication(message) => {
                AppError::new(StatusCode::UNAUTHORIZED, message)
            }
            ServiceError::Authorization(message) => AppError::forbidden(message),
            ServiceError::Validation(message) | ServiceError::Conflict(message) => {
                AppError::bad_request(message)
            }
            ServiceError::QuotaExceeded { message, code } => {
                AppError::forbidden(message).with_code(code)
            }
            ServiceError::NotFound(message) => AppError::new(StatusCode::NOT_FOUND, message),
            ServiceError::Database(diesel::result::Error::NotFound) => AppError::not_found(),
            ServiceError::Database(err) => AppError::internal(err),
            ServiceError::Internal(err) => AppError::internal(format!("{err:#}")),
        }
    }
}

impl From<diesel::result::Error> for AppError {
    fn from(value: diesel::result::Error) -> Self {
        ServiceError::from(value).into()
    }
}

impl From<anyhow::Error> for AppError {
    fn from(value: anyhow::Error) -> Self {
        AppError::internal(format!("{value:#}"))
    }
}
