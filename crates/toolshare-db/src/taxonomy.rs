//! External taxonomy repository implementation.
//!
//! The table is replaced wholesale on every import: one delete-all followed
//! by batched inserts. Each batch is its own transaction so a failed batch
//! leaves earlier batches committed.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{Pool, Postgres, Row};
use tracing::debug;

use toolshare_core::{Error, Result, TaxonomyRecord, TaxonomyStore};

/// PostgreSQL implementation of TaxonomyStore.
#[derive(Clone)]
pub struct PgTaxonomyRepository {
    pool: Pool<Postgres>,
}

impl PgTaxonomyRepository {
    /// Create a new PgTaxonomyRepository with the given connection pool.
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TaxonomyStore for PgTaxonomyRepository {
    async fn delete_all(&self) -> Result<u64> {
        let result = sqlx::query("DELETE FROM external_taxonomy")
            .execute(&self.pool)
            .await
            .map_err(Error::Database)?;

        debug!(
            subsystem = "database",
            component = "taxonomy",
            op = "delete_all",
            db_table = "external_taxonomy",
            rows = result.rows_affected(),
            "Cleared external taxonomy"
        );
        Ok(result.rows_affected())
    }

    async fn insert_batch(&self, records: &[TaxonomyRecord]) -> Result<u64> {
        if records.is_empty() {
            return Ok(0);
        }

        let mut ids: Vec<i64> = Vec::with_capacity(records.len());
        let mut paths: Vec<String> = Vec::with_capacity(records.len());
        let mut parents: Vec<Option<i64>> = Vec::with_capacity(records.len());
        let mut levels: Vec<i32> = Vec::with_capacity(records.len());
        let mut active: Vec<bool> = Vec::with_capacity(records.len());
        let mut updated: Vec<DateTime<Utc>> = Vec::with_capacity(records.len());
        for r in records {
            ids.push(r.external_id);
            paths.push(r.path.clone());
            parents.push(r.parent_external_id);
            levels.push(r.level);
            active.push(r.is_active);
            updated.push(r.updated_at);
        }

        let mut tx = self.pool.begin().await.map_err(Error::Database)?;
        let result = sqlx::query(
            r#"
            INSERT INTO external_taxonomy (
                external_id, path, parent_external_id, level, is_active, updated_at
            )
            SELECT * FROM UNNEST(
                $1::BIGINT[], $2::TEXT[], $3::BIGINT[], $4::INTEGER[],
                $5::BOOLEAN[], $6::TIMESTAMPTZ[]
            )
            "#,
        )
        .bind(&ids)
        .bind(&paths)
        .bind(&parents)
        .bind(&levels)
        .bind(&active)
        .bind(&updated)
        .execute(&mut *tx)
        .await
        .map_err(Error::Database)?;
        tx.commit().await.map_err(Error::Database)?;

        Ok(result.rows_affected())
    }

    async fn list_records(&self) -> Result<Vec<TaxonomyRecord>> {
        let rows = sqlx::query(
            r#"
            SELECT external_id, path, parent_external_id, level, is_active, updated_at
            FROM external_taxonomy
            ORDER BY level, path
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(rows
            .into_iter()
            .map(|r| TaxonomyRecord {
                external_id: r.get("external_id"),
                path: r.get("path"),
                parent_external_id: r.get("parent_external_id"),
                level: r.get("level"),
                is_active: r.get("is_active"),
                updated_at: r.get("updated_at"),
            })
            .collect())
    }
}
