//! Error types for Nameswipe

use thiserror::Error;

/// Result type alias for Nameswipe operations
pub type Result<T> = std::result::Result<T, NameswipeError>;

/// Main error type shared across crates
#[derive(Error, Debug)]
pub enum NameswipeError {
    #[error("Unknown gender: {0}")]
    InvalidGender(String),

    #[error("Unknown provenance: {0}")]
    InvalidProvenance(String),
}
