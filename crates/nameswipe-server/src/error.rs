//! Server-specific error types

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use nameswipe_ingest::IngestError;
use serde_json::json;
use thiserror::Error;

/// Application error types
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Ingestion error: {0}")]
    Ingest(#[from] IngestError),
}

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Ingest(e) if e.is_client_error() => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let error_message = match self {
            AppError::Database(ref e) => {
                tracing::error!("Database error: {:?}", e);
                "A database error occurred".to_string()
            },
            AppError::Ingest(ref e) if e.is_client_error() => e.to_string(),
            AppError::Ingest(ref e) => {
                tracing::error!("Ingestion error: {:?}", e);
                e.to_string()
            },
        };

        let body = Json(json!({
            "error": {
                "message": error_message,
                "status": status.as_u16(),
            }
        }));

        (status, body).into_response()
    }
}
