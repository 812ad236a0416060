use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::ats::scoring::ScoringError;

/// Application-level error type.
/// Implements `IntoResponse` so Axum handlers can return `Result<T, AppError>`.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    /// The skill universe could not be loaded; retrying after the store
    /// recovers yields a correct result.
    #[error("Taxonomy unavailable: {0}")]
    TaxonomyUnavailable(String),

    #[error("Scoring error: {0}")]
    Scoring(#[from] ScoringError),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    /// Whether the dashboard should offer a retry for this failure.
    pub fn is_retryable(&self) -> bool {
        matches!(self, AppError::TaxonomyUnavailable(_) | AppError::Database(_))
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg.clone()),
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone()),
            AppError::TaxonomyUnavailable(msg) => {
                tracing::warn!("Taxonomy unavailable: {msg}");
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    "TAXONOMY_UNAVAILABLE",
                    "The skill taxonomy is temporarily unavailable".to_string(),
                )
            }
            AppError::Scoring(e) => {
                tracing::error!("Scoring contract violation: {e}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "SCORING_ERROR",
                    "Candidate scoring failed".to_string(),
                )
            }
            AppError::Database(e) => {
                tracing::error!("Database error: {e}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "DATABASE_ERROR",
                    "A database error occurred".to_string(),
                )
            }
            AppError::Internal(e) => {
                tracing::error!("Internal error: {e:?}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "An internal server error occurred".to_string(),
                )
            }
        };

        let body = Json(json!({
            "ok": false,
            "error": {
                "code": code,
                "message": message,
                "retryable": self.is_retryable()
            }
        }));

        (status, body).into_response()
    }
}
