//! Fixed-size batching of accepted names into the catalog

use nameswipe_common::Provenance;

use crate::catalog::{NameCatalog, NewCatalogName};
use crate::error::Result;
use crate::validator::ValidName;

/// Result of one catalog write
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlushOutcome {
    /// Rows in the batch, duplicates included
    pub attempted: usize,
    /// Rows the catalog actually inserted
    pub inserted: u64,
}

/// Accumulates accepted names for one source and writes them in batches.
///
/// A batch is flushed as soon as it reaches `batch_size`; [`finish`](Self::finish)
/// flushes whatever is left once. Flushes run inline, so batches land in the
/// catalog in the order records were offered.
pub struct BatchWriter<'a, C: NameCatalog + ?Sized> {
    catalog: &'a C,
    origin_country: String,
    provenance: Provenance,
    batch_size: usize,
    pending: Vec<NewCatalogName>,
}

impl<'a, C: NameCatalog + ?Sized> BatchWriter<'a, C> {
    pub fn new(catalog: &'a C, origin_country: impl Into<String>, batch_size: usize) -> Self {
        let batch_size = batch_size.max(1);
        Self {
            catalog,
            origin_country: origin_country.into(),
            provenance: Provenance::Extended,
            batch_size,
            pending: Vec::with_capacity(batch_size),
        }
    }

    pub fn with_provenance(mut self, provenance: Provenance) -> Self {
        self.provenance = provenance;
        self
    }

    /// Records waiting for the next flush
    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    /// Append a name, flushing if the batch is now full
    pub async fn offer(&mut self, name: ValidName) -> Result<Option<FlushOutcome>> {
        self.pending.push(NewCatalogName {
            name: name.name,
            gender: name.gender,
            origin_country: self.origin_country.clone(),
            provenance: self.provenance,
        });

        if self.pending.len() >= self.batch_size {
            self.flush().await.map(Some)
        } else {
            Ok(None)
        }
    }

    /// Flush the partial batch left at end of stream
    pub async fn finish(mut self) -> Result<Option<FlushOutcome>> {
        if self.pending.is_empty() {
            return Ok(None);
        }
        self.flush().await.map(Some)
    }

    async fn flush(&mut self) -> Result<FlushOutcome> {
        let batch = std::mem::replace(&mut self.pending, Vec::with_capacity(self.batch_size));
        let inserted = self.catalog.insert_ignoring_duplicates(&batch).await?;
        Ok(FlushOutcome {
            attempted: batch.len(),
            inserted,
        })
    }
}
