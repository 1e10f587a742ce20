use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use axum_login::tower_sessions::session;
use sea_orm::DbErr;

use crate::media::MediaError;

/// Everything a handler can fail with. Renders as `{"error": message}`.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("{0}")]
    Validation(String),

    #[error("Not signed in")]
    Unauthorized,

    #[error("{0}")]
    Forbidden(String),

    #[error("Not found")]
    NotFound,

    #[error("{0}")]
    Conflict(String),

    #[error("Upload exceeds the size limit")]
    TooLarge,

    #[error(transparent)]
    Media(#[from] MediaError),

    #[error(transparent)]
    Database(#[from] DbErr),

    #[error(transparent)]
    Template(#[from] minijinja::Error),

    #[error(transparent)]
    Session(#[from] session::Error),
}

impl AppError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthorized => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::NotFound => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::TooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            AppError::Media(err) => match err {
                MediaError::Empty
                | MediaError::UnknownFolder(_)
                | MediaError::InvalidOptions(_)
                | MediaError::ForeignUrl(_) => StatusCode::BAD_REQUEST,
                MediaError::Decode(_) => StatusCode::UNPROCESSABLE_ENTITY,
                MediaError::Storage(_) => StatusCode::BAD_GATEWAY,
                MediaError::Encode(_) | MediaError::Task(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            AppError::Database(_) | AppError::Template(_) | AppError::Session(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// The text shown to the caller. Internal failures are logged in full and
    /// summarized here.
    pub fn public_message(&self) -> String {
        match self {
            AppError::Database(_) => "Database failure".to_string(),
            AppError::Template(_) | AppError::Session(_) => "Internal error".to_string(),
            other => other.to_string(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = ?self, "request failed");
        } else {
            tracing::debug!(error = %self, %status, "request rejected");
        }
        (status, Json(serde_json::json!({ "error": self.public_message() }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;

    #[tokio::test]
    async fn renders_error_body_with_status() {
        let response = AppError::validation("Title is required").into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let body = response.into_body().collect().await.unwrap().to_bytes();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["error"], "Title is required");
    }

    #[tokio::test]
    async fn hides_database_details() {
        let response = AppError::Database(DbErr::Custom("relation missing".into())).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let body = response.into_body().collect().await.unwrap().to_bytes();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["error"], "Database failure");
    }

    #[test]
    fn storage_failures_are_bad_gateway() {
        let err = AppError::from(MediaError::Storage("connection reset".into()));
        assert_eq!(err.status(), StatusCode::BAD_GATEWAY);
        assert_eq!(
            AppError::from(MediaError::Empty).status(),
            StatusCode::BAD_REQUEST
        );
    }
}
