//! Ingestion commands

pub mod start;

pub use start::StartIngestionCommand;
