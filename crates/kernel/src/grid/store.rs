//! Listing store abstraction.
//!
//! The grid engine only reads. Every store call takes a [`QueryDescription`]
//! so that alternative backends see exactly what the grid and export asked
//! for, not pre-rendered SQL.

use std::pin::Pin;

use anyhow::{Context, Result};
use async_trait::async_trait;
use futures_core::Stream;
use sqlx::PgPool;
use tokio_stream::StreamExt;

use super::query_builder::GridQueryBuilder;
use super::types::{QueryDescription, Row};
use crate::db;

/// A store-side cursor over result rows. Dropping it releases the cursor.
pub type RowStream = Pin<Box<dyn Stream<Item = Result<Row>> + Send>>;

/// Read access to property listings.
#[async_trait]
pub trait ListingStore: Send + Sync {
    /// Fetch the rows selected by `query`, honouring its page window.
    async fn fetch_page(&self, query: &QueryDescription) -> Result<Vec<Row>>;

    /// Count all rows matching `query`'s scope, search, and filters.
    async fn count(&self, query: &QueryDescription) -> Result<u64>;

    /// Stream the rows selected by `query` without materializing them.
    fn stream(&self, query: QueryDescription) -> RowStream;

    /// Whether the backing store is reachable.
    async fn ping(&self) -> bool {
        true
    }
}

/// PostgreSQL-backed listing store.
#[derive(Clone)]
pub struct PgListingStore {
    pool: PgPool,
}

impl PgListingStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Wrap a row query so each row comes back as one JSON object.
fn json_rows_sql(sql: &str) -> String {
    format!("SELECT row_to_json(t) FROM ({sql}) t")
}

fn into_row(value: serde_json::Value) -> Result<Row> {
    match value {
        serde_json::Value::Object(row) => Ok(row),
        other => anyhow::bail!("expected a JSON object row, got {other}"),
    }
}

#[async_trait]
impl ListingStore for PgListingStore {
    async fn fetch_page(&self, query: &QueryDescription) -> Result<Vec<Row>> {
        let sql = json_rows_sql(&GridQueryBuilder::new(query).build());

        let values: Vec<serde_json::Value> = sqlx::query_scalar(&sql)
            .fetch_all(&self.pool)
            .await
            .context("failed to execute grid row query")?;

        values.into_iter().map(into_row).collect()
    }

    async fn count(&self, query: &QueryDescription) -> Result<u64> {
        let sql = GridQueryBuilder::new(query).build_count();

        let total: i64 = sqlx::query_scalar(&sql)
            .fetch_one(&self.pool)
            .await
            .context("failed to execute grid count query")?;

        Ok(u64::try_from(total).unwrap_or_default())
    }

    fn stream(&self, query: QueryDescription) -> RowStream {
        let pool = self.pool.clone();
        let sql = json_rows_sql(&GridQueryBuilder::new(&query).build());

        Box::pin(async_stream::stream! {
            let mut rows = sqlx::query_scalar::<_, serde_json::Value>(&sql).fetch(&pool);
            while let Some(next) = rows.next().await {
                match next {
                    Ok(value) => yield into_row(value),
                    Err(e) => {
                        yield Err(anyhow::Error::new(e).context("failed to stream export rows"));
                        break;
                    }
                }
            }
        })
    }

    async fn ping(&self) -> bool {
        db::check_health(&self.pool).await
    }
}
