//! Ingestion feature module
//!
//! Starts source ingestion runs and reports on them. Runs execute in the
//! background inside the shared [`IngestionOrchestrator`](nameswipe_ingest::IngestionOrchestrator);
//! these routes only submit and observe.

pub mod commands;
pub mod queries;
pub mod routes;

#[cfg(test)]
mod routes_test;

pub use routes::ingestion_routes;
