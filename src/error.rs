use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

/// Unified request-level error. Every variant maps to one HTTP status and
/// the `{status: "error", message}` envelope; messages are diagnostic only.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    PermissionDenied(String),
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error("Version not found or invalid")]
    VersionNotFound,
    #[error("Share link has expired")]
    Expired,
    #[error("{0}")]
    GenerationFailed(String),
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("An unexpected error occurred")]
    Unexpected,
}

impl ApiError {
    pub fn validation(msg: impl Into<String>) -> Self {
        ApiError::Validation(msg.into())
    }

    pub fn permission_denied() -> Self {
        ApiError::PermissionDenied("Permission denied".into())
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::PermissionDenied(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) | ApiError::VersionNotFound => StatusCode::NOT_FOUND,
            ApiError::Expired => StatusCode::GONE,
            ApiError::GenerationFailed(_)
            | ApiError::Database(_)
            | ApiError::Serialization(_)
            | ApiError::Unexpected => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!(error = %self, "request failed");
        }
        let body = Json(json!({
            "status": "error",
            "message": self.to_string(),
        }));
        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn taxonomy_maps_to_http_statuses() {
        assert_eq!(
            ApiError::validation("UID is required").status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::permission_denied().status_code(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            ApiError::NotFound("Profile").status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(ApiError::Expired.status_code(), StatusCode::GONE);
        assert_eq!(
            ApiError::GenerationFailed("upstream".into()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn not_found_message_names_the_resource() {
        assert_eq!(ApiError::NotFound("File").to_string(), "File not found");
        assert_eq!(
            ApiError::NotFound("Share link").to_string(),
            "Share link not found"
        );
    }
}
