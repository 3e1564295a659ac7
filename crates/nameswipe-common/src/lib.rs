//! Nameswipe Common Library
#![deny(clippy::unwrap_used, clippy::expect_used)]
//!
//! Shared types, logging, and error handling for the Nameswipe workspace.
//!
//! # Overview
//!
//! - **Error Handling**: [`NameswipeError`] and the [`Result`] alias
//! - **Logging**: [`logging::LogConfig`] and [`logging::init_logging`]
//! - **Configuration**: [`env`] readers shared by the config loaders
//! - **Types**: catalog vocabulary shared by ingestion and the server
//!
//! # Example
//!
//! ```
//! use nameswipe_common::types::Gender;
//!
//! assert_eq!(Gender::from_code("f"), Some(Gender::Female));
//! assert_eq!(Gender::Male.as_str(), "male");
//! ```

pub mod env;
pub mod error;
pub mod logging;
pub mod types;

// Re-export commonly used types
pub use error::{NameswipeError, Result};
pub use types::{Gender, Provenance};
