//! Subscribe to ingestion events query

use futures::stream::{BoxStream, StreamExt};
use mediator::Request;
use nameswipe_ingest::{find_source, IngestError, IngestionEvent, IngestionOrchestrator};
use serde::{Deserialize, Serialize};

/// Optional topic filter
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SubscribeEventsQuery {
    pub source: Option<String>,
}

impl Request<Result<BoxStream<'static, IngestionEvent>, IngestError>> for SubscribeEventsQuery {}

/// Events from now on, for one source or all of them
pub fn handle(
    orchestrator: &IngestionOrchestrator,
    query: SubscribeEventsQuery,
) -> Result<BoxStream<'static, IngestionEvent>, IngestError> {
    match query.source {
        Some(source) => {
            let supported =
                find_source(&source).ok_or_else(|| IngestError::UnknownSource(source.trim().to_string()))?;
            Ok(orchestrator.subscribe(supported.code).boxed())
        },
        None => Ok(orchestrator.subscribe_all().boxed()),
    }
}
