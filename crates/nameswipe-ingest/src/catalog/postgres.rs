//! PostgreSQL name catalog

use async_trait::async_trait;
use sqlx::{PgPool, Postgres, QueryBuilder};
use tracing::debug;

use super::{NameCatalog, NewCatalogName};
use crate::error::Result;

/// Bind parameters per row; Postgres caps a statement at 65535 binds
const BINDS_PER_ROW: usize = 4;
const MAX_ROWS_PER_STATEMENT: usize = u16::MAX as usize / BINDS_PER_ROW;

/// Catalog backed by the `names` table (see `migrations/`)
#[derive(Clone)]
pub struct PgNameCatalog {
    db: PgPool,
}

impl PgNameCatalog {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    pub fn pool(&self) -> &PgPool {
        &self.db
    }
}

#[async_trait]
impl NameCatalog for PgNameCatalog {
    async fn insert_ignoring_duplicates(&self, names: &[NewCatalogName]) -> Result<u64> {
        let mut inserted = 0;

        for chunk in names.chunks(MAX_ROWS_PER_STATEMENT) {
            let mut query_builder: QueryBuilder<Postgres> =
                QueryBuilder::new("INSERT INTO names (name, gender, origin_country, provenance) ");

            query_builder.push_values(chunk, |mut b, row| {
                b.push_bind(&row.name)
                    .push_bind(row.gender.as_str())
                    .push_bind(&row.origin_country)
                    .push_bind(row.provenance.as_str());
            });
            query_builder.push(" ON CONFLICT (name, gender) DO NOTHING");

            let result = query_builder.build().execute(&self.db).await?;
            inserted += result.rows_affected();
        }

        debug!(
            attempted = names.len(),
            inserted = inserted,
            "Inserted catalog batch"
        );

        Ok(inserted)
    }

    async fn count_by_origin_country(&self, code: &str) -> Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM names WHERE origin_country = $1")
            .bind(code)
            .fetch_one(&self.db)
            .await?;

        Ok(count)
    }
}
