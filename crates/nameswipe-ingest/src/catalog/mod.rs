//! Name catalog store interface
//!
//! The catalog is owned outside the ingestion core. Ingestion only needs two
//! operations from it: a set-oriented insert that silently skips rows whose
//! `(name, gender)` pair already exists, and a per-country row count.
//!
//! Implementations:
//! - [`PgNameCatalog`]: PostgreSQL `names` table
//! - [`MemoryNameCatalog`]: in-process map, for tests and dry runs

use async_trait::async_trait;
use nameswipe_common::{Gender, Provenance};
use serde::{Deserialize, Serialize};

use crate::error::Result;

pub mod memory;
pub mod postgres;

pub use memory::MemoryNameCatalog;
pub use postgres::PgNameCatalog;

/// A row to be written to the catalog
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewCatalogName {
    pub name: String,
    pub gender: Gender,
    pub origin_country: String,
    pub provenance: Provenance,
}

#[async_trait]
pub trait NameCatalog: Send + Sync {
    /// Insert all rows in one operation, skipping `(name, gender)` duplicates.
    ///
    /// Returns how many rows were actually inserted. Duplicates, whether
    /// against existing rows or within `names`, are not errors.
    async fn insert_ignoring_duplicates(&self, names: &[NewCatalogName]) -> Result<u64>;

    /// Live number of catalog rows whose origin country is `code`
    async fn count_by_origin_country(&self, code: &str) -> Result<i64>;
}
