//! Error types for name ingestion

use std::time::Duration;

use thiserror::Error;

/// Result type alias for ingestion operations
pub type Result<T> = std::result::Result<T, IngestError>;

/// Errors raised by the ingestion core.
///
/// `UnknownSource` is the only variant a caller of
/// [`IngestionOrchestrator::start_ingestion`](crate::IngestionOrchestrator::start_ingestion)
/// ever sees. Everything else aborts a run in the background and surfaces
/// through the run's status and progress events.
#[derive(Error, Debug)]
pub enum IngestError {
    #[error("Unknown source: {0}")]
    UnknownSource(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("HTTP {status} fetching {url}")]
    HttpStatus {
        status: reqwest::StatusCode,
        url: String,
    },

    #[error("Stream error: {0}")]
    Stream(#[from] std::io::Error),

    #[error("No data received for {0:?}")]
    IdleTimeout(Duration),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Catalog error: {0}")]
    Catalog(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl IngestError {
    /// True for errors the caller caused, as opposed to run failures
    pub fn is_client_error(&self) -> bool {
        matches!(self, IngestError::UnknownSource(_))
    }
}
