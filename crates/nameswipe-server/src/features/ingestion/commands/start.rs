//! Start ingestion command
//!
//! Registers a run for one source and spawns it. Returns as soon as the run is
//! accepted or refused.

use mediator::Request;
use nameswipe_ingest::{IngestError, IngestionOrchestrator, StartOutcome};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StartIngestionCommand {
    /// Source code, any case
    pub source: String,
}

impl Request<Result<StartOutcome, IngestError>> for StartIngestionCommand {}

pub fn handle(
    orchestrator: &IngestionOrchestrator,
    command: StartIngestionCommand,
) -> Result<StartOutcome, IngestError> {
    orchestrator.start_ingestion(&command.source)
}
