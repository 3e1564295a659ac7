//! In-memory name catalog

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use nameswipe_common::{Gender, Provenance};

use super::{NameCatalog, NewCatalogName};
use crate::error::Result;

/// A stored row, as the catalog would hand it back
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogEntry {
    pub name: String,
    pub gender: Gender,
    pub origin_country: String,
    pub provenance: Provenance,
    pub created_at: DateTime<Utc>,
}

/// Catalog held in a map keyed by `(name, gender)`.
///
/// Enforces the same uniqueness rule as the `names` table. Used by tests and
/// by the CLI's `--dry-run` mode.
#[derive(Debug, Default)]
pub struct MemoryNameCatalog {
    rows: Mutex<HashMap<(String, Gender), CatalogEntry>>,
    insert_calls: Mutex<Vec<usize>>,
}

impl MemoryNameCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    fn rows(&self) -> MutexGuard<'_, HashMap<(String, Gender), CatalogEntry>> {
        self.rows.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Total rows across all countries
    pub fn len(&self) -> usize {
        self.rows().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn get(&self, name: &str, gender: Gender) -> Option<CatalogEntry> {
        self.rows().get(&(name.to_string(), gender)).cloned()
    }

    /// Size of every batch handed to `insert_ignoring_duplicates`, in order
    pub fn insert_batch_sizes(&self) -> Vec<usize> {
        self.insert_calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[async_trait]
impl NameCatalog for MemoryNameCatalog {
    async fn insert_ignoring_duplicates(&self, names: &[NewCatalogName]) -> Result<u64> {
        self.insert_calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(names.len());

        let now = Utc::now();
        let mut rows = self.rows();
        let mut inserted = 0;

        for row in names {
            let key = (row.name.clone(), row.gender);
            if rows.contains_key(&key) {
                continue;
            }
            rows.insert(
                key,
                CatalogEntry {
                    name: row.name.clone(),
                    gender: row.gender,
                    origin_country: row.origin_country.clone(),
                    provenance: row.provenance,
                    created_at: now,
                },
            );
            inserted += 1;
        }

        Ok(inserted)
    }

    async fn count_by_origin_country(&self, code: &str) -> Result<i64> {
        let count = self
            .rows()
            .values()
            .filter(|entry| entry.origin_country == code)
            .count();
        Ok(count as i64)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn row(name: &str, gender: Gender, country: &str) -> NewCatalogName {
        NewCatalogName {
            name: name.to_string(),
            gender,
            origin_country: country.to_string(),
            provenance: Provenance::Extended,
        }
    }

    #[tokio::test]
    async fn test_duplicates_are_silently_skipped() {
        let catalog = MemoryNameCatalog::new();

        let first = catalog
            .insert_ignoring_duplicates(&[
                row("Alice", Gender::Female, "FR"),
                row("Alice", Gender::Female, "FR"),
                row("Bob", Gender::Male, "FR"),
            ])
            .await
            .unwrap();
        assert_eq!(first, 2);

        // Same pair from another country is still a duplicate
        let second = catalog
            .insert_ignoring_duplicates(&[
                row("Alice", Gender::Female, "US"),
                row("Alice", Gender::Male, "US"),
            ])
            .await
            .unwrap();
        assert_eq!(second, 1);

        assert_eq!(catalog.len(), 3);
        assert_eq!(catalog.count_by_origin_country("FR").await.unwrap(), 2);
        assert_eq!(catalog.count_by_origin_country("US").await.unwrap(), 1);
        assert_eq!(catalog.get("Alice", Gender::Female).unwrap().origin_country, "FR");
        assert_eq!(catalog.insert_batch_sizes(), vec![3, 2]);
    }
}
