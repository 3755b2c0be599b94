use crate::{
    models::ValidationError,
    services::{catalog_service::CatalogError, upload_service::UploadError},
};
use axum::{
    Json,
    extract::{
        multipart::{MultipartError, MultipartRejection},
        rejection::JsonRejection,
    },
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use std::fmt;

const INTERNAL_MESSAGE: &str = "Internal server error";

/// A lightweight wrapper for general errors that keeps the message local.
///
/// Internal failures are logged where they are converted and reach the
/// client only as a generic message.
#[derive(Debug)]
pub struct AppError {
    pub status: StatusCode,
    pub message: String,
}

impl AppError {
    /// Create a new AppError with a specific status and message.
    pub fn new(status: StatusCode, msg: impl Into<String>) -> Self {
        Self {
            status,
            message: msg.into(),
        }
    }

    /// Shortcut for a 500 Internal Server Error. The detail is logged, not returned.
    pub fn internal(detail: impl fmt::Display) -> Self {
        tracing::error!("internal error: {}", detail);
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, INTERNAL_MESSAGE)
    }

    /// Shortcut for 404 Not Found
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, msg)
    }

    /// Shortcut for 400 Bad Request
    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, msg)
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for AppError {}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = Json(json!({
            "error": self.message,
            "status": self.status.as_u16()
        }));

        (self.status, body).into_response()
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::internal(err)
    }
}

impl From<ValidationError> for AppError {
    fn from(err: ValidationError) -> Self {
        AppError::bad_request(err.to_string())
    }
}

impl From<CatalogError> for AppError {
    fn from(err: CatalogError) -> Self {
        match err {
            CatalogError::UnknownCollection(_) => AppError::bad_request(err.to_string()),
            CatalogError::Sqlx(inner) => AppError::internal(inner),
        }
    }
}

impl From<UploadError> for AppError {
    fn from(err: UploadError) -> Self {
        if err.is_client_error() {
            AppError::bad_request(err.to_string())
        } else {
            AppError::internal(err)
        }
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::bad_request(rejection.body_text())
    }
}

impl From<MultipartRejection> for AppError {
    fn from(rejection: MultipartRejection) -> Self {
        AppError::bad_request(rejection.body_text())
    }
}

impl From<MultipartError> for AppError {
    fn from(err: MultipartError) -> Self {
        AppError::bad_request(err.body_text())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn internal_errors_do_not_leak_detail() {
        let err = AppError::from(CatalogError::Sqlx(sqlx::Error::PoolTimedOut));
        assert_eq!(err.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.message, INTERNAL_MESSAGE);

        let err = AppError::from(UploadError::Io(std::io::Error::other("disk full")));
        assert_eq!(err.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(!err.message.contains("disk full"));
    }

    #[test]
    fn client_errors_map_to_400() {
        let err = AppError::from(CatalogError::UnknownCollection(Uuid::nil()));
        assert_eq!(err.status, StatusCode::BAD_REQUEST);

        let err = AppError::from(UploadError::UnsupportedExtension);
        assert_eq!(err.status, StatusCode::BAD_REQUEST);

        let err = AppError::from(ValidationError::Empty("title"));
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
        assert!(err.message.contains("title"));
    }
}
