//! Grid service for executing property grid queries.
//!
//! Both entry points compose the request through the same [`QueryComposer`]:
//! - `grid`: page query, then count when paginated
//! - `export`: streamed CSV over the same description

use std::sync::Arc;
use std::time::Instant;

use chrono::{FixedOffset, Utc};
use thiserror::Error;
use tracing::{debug, error};

use super::assembler::shape_rows;
use super::composer::QueryComposer;
use super::export::{CsvEncoder, ExportStream, csv_stream, export_filename};
use super::format::{Currency, Presenter};
use super::query_builder::GridQueryBuilder;
use super::store::ListingStore;
use super::types::{GridRequest, GridResponse, PageResult};
use crate::metrics::Metrics;

/// Grid engine errors.
///
/// Invalid caller input never produces an error; only the store and the
/// export encoder can fail.
#[derive(Debug, Error)]
pub enum GridError {
    #[error("query failed")]
    QueryFailed(#[source] anyhow::Error),

    #[error("failed to encode export")]
    Encode(#[source] std::io::Error),
}

/// Export settings, fixed at startup.
#[derive(Debug, Clone, Copy)]
pub struct ExportSettings {
    /// Rows per flushed chunk.
    pub batch_size: usize,
    pub default_currency: Currency,
    /// Offset used for date cells and the attachment date.
    pub utc_offset: FixedOffset,
}

impl ExportSettings {
    fn presenter(&self) -> Presenter {
        Presenter::new(self.default_currency, self.utc_offset)
    }
}

/// Service for executing grid and export requests.
pub struct GridService {
    store: Arc<dyn ListingStore>,
    composer: QueryComposer,
    export: ExportSettings,
    metrics: Arc<Metrics>,
}

impl GridService {
    /// Create a new GridService.
    pub fn new(
        store: Arc<dyn ListingStore>,
        composer: QueryComposer,
        export: ExportSettings,
        metrics: Arc<Metrics>,
    ) -> Arc<Self> {
        Arc::new(Self {
            store,
            composer,
            export,
            metrics,
        })
    }

    pub fn store(&self) -> &Arc<dyn ListingStore> {
        &self.store
    }

    /// Execute an interactive grid request.
    ///
    /// Returns a page envelope when the request is paginated and a bare row
    /// array otherwise. The count runs after the page query.
    pub async fn grid(&self, request: &GridRequest) -> Result<GridResponse, GridError> {
        let description = self.composer.compose(request);
        debug!(
            sql = %GridQueryBuilder::new(&description).describe(),
            "executing grid query"
        );

        let started = Instant::now();
        let rows = self
            .store
            .fetch_page(&description)
            .await
            .map_err(query_failed)?;
        self.metrics
            .record_store_query("page", started.elapsed().as_secs_f64());

        let data = shape_rows(rows, &description.projection.fields);

        let Some(window) = description.page else {
            return Ok(GridResponse::Rows(data));
        };

        let started = Instant::now();
        let total = self
            .store
            .count(&description)
            .await
            .map_err(query_failed)?;
        self.metrics
            .record_store_query("count", started.elapsed().as_secs_f64());

        Ok(GridResponse::Paged(PageResult::new(
            data,
            total,
            window.page,
            window.limit,
        )))
    }

    /// Stream an export of the same rows the grid would select.
    ///
    /// Unbounded unless the request explicitly asks for pagination.
    pub fn export(&self, request: &GridRequest) -> ExportStream {
        let description = self.composer.compose(request);
        debug!(
            sql = %GridQueryBuilder::new(&description).build(),
            "executing export query"
        );

        let encoder = CsvEncoder::new(
            description.projection.fields.clone(),
            self.export.presenter(),
        );
        let rows = self.store.stream(description);

        csv_stream(rows, encoder, self.export.batch_size, self.metrics.clone())
    }

    /// Attachment name for an export started now.
    pub fn export_filename(&self) -> String {
        let today = Utc::now().with_timezone(&self.export.utc_offset).date_naive();
        export_filename(today)
    }
}

fn query_failed(e: anyhow::Error) -> GridError {
    error!(error = %e, "grid store query failed");
    GridError::QueryFailed(e)
}
