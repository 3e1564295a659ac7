//! Get ingestion status query
//!
//! One entry per supported source with a live catalog count and the state of
//! any run still held by the registry.

use mediator::Request;
use nameswipe_ingest::{find_source, IngestError, IngestionOrchestrator, SourceStatus};
use serde::{Deserialize, Serialize};

/// Status of every source, or of one
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GetIngestionStatusQuery {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

impl Request<Result<Vec<SourceStatus>, IngestError>> for GetIngestionStatusQuery {}

pub async fn handle(
    orchestrator: &IngestionOrchestrator,
    query: GetIngestionStatusQuery,
) -> Result<Vec<SourceStatus>, IngestError> {
    let wanted = match query.source {
        Some(source) => Some(
            find_source(&source)
                .ok_or_else(|| IngestError::UnknownSource(source.trim().to_string()))?
                .code,
        ),
        None => None,
    };

    let statuses = orchestrator.get_ingestion_status().await?;
    Ok(match wanted {
        Some(code) => statuses.into_iter().filter(|status| status.source == code).collect(),
        None => statuses,
    })
}
