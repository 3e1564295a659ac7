//! Nameswipe Server Library
//!
//! HTTP surface over the name ingestion core.
//!
//! # Overview
//!
//! - **API Endpoints**: start, status and live progress of ingestion runs
//!   under `/api/v1/ingestion`, plus `/health`
//! - **Database Management**: PostgreSQL pool and migrations with SQLx
//! - **Configuration**: Environment-based configuration management
//! - **Middleware**: CORS and request logging
//!
//! # Example
//!
//! ```no_run
//! use nameswipe_server::{api, config::Config};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load()?;
//!     api::serve(config).await?;
//!     Ok(())
//! }
//! ```

#![deny(clippy::unwrap_used, clippy::expect_used)]

pub mod api;
pub mod config;
pub mod db;
pub mod error;
pub mod features;
pub mod middleware;

// Re-export commonly used types
pub use error::AppError;
