/// Error types for the tree analysis service.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// Malformed base64 or undecodable image bytes.
    #[error("Image decode error: {0}")]
    ImageDecode(String),
    /// Detector, classifier or health estimator failed or timed out.
    #[error("Collaborator unavailable: {0}")]
    CollaboratorUnavailable(String),
    #[error("Bad request: {0}")]
    BadRequest(String),
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::Internal(format!("IO error: {err}"))
    }
}

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        AppError::CollaboratorUnavailable(format!("Detector request failed: {err}"))
    }
}

impl From<tokio::task::JoinError> for AppError {
    fn from(err: tokio::task::JoinError) -> Self {
        AppError::Internal(format!("Join error: {err}"))
    }
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::ImageDecode(_)
            | AppError::CollaboratorUnavailable(_)
            | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match &self {
            AppError::BadRequest(msg) => msg.clone(),
            other => format!("Error processing image: {other}"),
        };

        tracing::error!(status = status.as_u16(), "{message}");

        let body = json!({
            "error": message,
            "status": status.as_u16(),
        });

        (status, axum::Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_and_collaborator_errors_are_server_errors() {
        assert_eq!(
            AppError::ImageDecode("bad".into()).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            AppError::CollaboratorUnavailable("timeout".into()).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            AppError::BadRequest("empty".into()).status(),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn test_display_names_the_failure() {
        let err = AppError::CollaboratorUnavailable("detector timed out after 5s".into());
        assert_eq!(
            err.to_string(),
            "Collaborator unavailable: detector timed out after 5s"
        );
    }
}
