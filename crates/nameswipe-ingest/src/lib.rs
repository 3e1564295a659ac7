//! Nameswipe Ingest Library
//!
//! Bulk ingestion of external first-name datasets into the shared name
//! catalog. Each supported source (a country partition of the dataset) is
//! streamed over HTTP, split into lines, validated, and written in fixed-size
//! duplicate-tolerant batches. At most one run per source is active at a time;
//! progress is broadcast to any number of subscribers.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use futures::StreamExt;
//! use nameswipe_ingest::{IngestConfig, IngestionOrchestrator, MemoryNameCatalog};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let orchestrator =
//!         IngestionOrchestrator::new(IngestConfig::from_env()?, Arc::new(MemoryNameCatalog::new()))?;
//!
//!     let mut events = Box::pin(orchestrator.subscribe("FR"));
//!     orchestrator.start_ingestion("fr")?;
//!
//!     while let Some(event) = events.next().await {
//!         println!("{:?}", event.snapshot());
//!         if event.is_terminal() {
//!             break;
//!         }
//!     }
//!     Ok(())
//! }
//! ```

#![deny(clippy::unwrap_used, clippy::expect_used)]

pub mod batch;
pub mod catalog;
pub mod config;
pub mod error;
pub mod fetch;
pub mod orchestrator;
pub mod progress;
pub mod reassembler;
pub mod registry;
pub mod sources;
pub mod validator;

pub use catalog::{MemoryNameCatalog, NameCatalog, NewCatalogName, PgNameCatalog};
pub use config::IngestConfig;
pub use error::{IngestError, Result};
pub use orchestrator::{IngestionOrchestrator, SourceStatus, StartOutcome};
pub use progress::{IngestionEvent, ProgressChannel, ProgressSnapshot};
pub use registry::{RunStatus, SourceRunRegistry, SourceRunState};
pub use sources::{find_source, SupportedSource, SUPPORTED_SOURCES};
pub use validator::{NameValidator, RejectReason, Verdict};
