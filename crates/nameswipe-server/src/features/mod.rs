//! Feature modules implementing the Nameswipe API
//!
//! Each feature is a vertical slice with its own commands, queries and routes.
//!
//! # Features
//!
//! - **ingestion**: start source ingestion runs, report their status, stream
//!   their progress
//!
//! # Architecture
//!
//! Each feature module follows the structure:
//! - `commands/` - Write operations
//! - `queries/` - Read operations
//! - `routes.rs` - HTTP route definitions
//!
//! Command and query types implement `mediator::Request` for the result their
//! `handle` function returns.

pub mod ingestion;

use axum::Router;
use nameswipe_ingest::IngestionOrchestrator;

/// Shared state for all feature routes
#[derive(Clone)]
pub struct FeatureState {
    /// Runs and tracks ingestion of supported sources
    pub orchestrator: IngestionOrchestrator,
}

/// Creates the API router with all feature routes mounted
///
/// - `/ingestion` - Ingestion runs
pub fn router(state: FeatureState) -> Router<()> {
    Router::new().nest(
        "/ingestion",
        ingestion::ingestion_routes().with_state(state.orchestrator),
    )
}
