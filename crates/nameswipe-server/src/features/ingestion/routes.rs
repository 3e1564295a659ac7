//! Ingestion routes

use std::convert::Infallible;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{
        sse::{Event, KeepAlive, Sse},
        IntoResponse, Response,
    },
    routing::{get, post},
    Json, Router,
};
use futures::{Stream, StreamExt};
use nameswipe_ingest::IngestionOrchestrator;
use serde_json::json;

use super::commands::{start, StartIngestionCommand};
use super::queries::{get_status, subscribe_events, GetIngestionStatusQuery, SubscribeEventsQuery};
use crate::error::AppError;

/// Create ingestion routes
pub fn ingestion_routes() -> Router<IngestionOrchestrator> {
    Router::new()
        .route("/status", get(get_ingestion_status))
        .route("/events", get(stream_events))
        .route("/:source", post(start_ingestion))
}

/// Start ingesting a source
///
/// POST /:source
async fn start_ingestion(
    State(orchestrator): State<IngestionOrchestrator>,
    Path(source): Path<String>,
) -> Result<Response, AppError> {
    let outcome = start::handle(&orchestrator, StartIngestionCommand { source })?;
    Ok((StatusCode::ACCEPTED, Json(json!(outcome))).into_response())
}

/// Status of every supported source
///
/// GET /status?source=FR
async fn get_ingestion_status(
    State(orchestrator): State<IngestionOrchestrator>,
    Query(query): Query<GetIngestionStatusQuery>,
) -> Result<Response, AppError> {
    let statuses = get_status::handle(&orchestrator, query).await?;
    Ok((StatusCode::OK, Json(json!(statuses))).into_response())
}

/// Live progress events as server-sent events
///
/// GET /events?source=FR
async fn stream_events(
    State(orchestrator): State<IngestionOrchestrator>,
    Query(query): Query<SubscribeEventsQuery>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, AppError> {
    let events = subscribe_events::handle(&orchestrator, query)?;

    let stream = events.filter_map(|event| async move {
        match Event::default().event(event.kind()).json_data(&event) {
            Ok(sse_event) => Some(Ok(sse_event)),
            Err(e) => {
                tracing::warn!("Failed to encode ingestion event: {}", e);
                None
            },
        }
    });

    Ok(Sse::new(stream).keep_alive(KeepAlive::default()))
}
