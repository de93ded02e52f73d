//! Application state shared across all handlers.

use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::info;

use crate::config::Config;
use crate::db;
use crate::grid::{BaseScope, GridService, ListingStore, PgListingStore, QueryComposer};
use crate::metrics::Metrics;

/// Shared application state.
///
/// Wrapped in Arc internally so Clone is cheap.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    /// Grid and export engine.
    grid: Arc<GridService>,

    /// SHA-256 hex digests of accepted API tokens.
    api_token_hashes: Vec<String>,

    /// Prometheus metrics.
    metrics: Arc<Metrics>,
}

impl AppState {
    /// Create new application state backed by PostgreSQL.
    pub async fn new(config: &Config) -> Result<Self> {
        let pool = db::create_pool(config)
            .await
            .context("failed to create database pool")?;
        info!(
            max_connections = config.database_max_connections,
            "database pool created"
        );

        Ok(Self::with_store(Arc::new(PgListingStore::new(pool)), config))
    }

    /// Create application state over an arbitrary listing store.
    pub fn with_store(store: Arc<dyn ListingStore>, config: &Config) -> Self {
        let metrics = Arc::new(Metrics::new());
        let composer = QueryComposer::new(BaseScope::for_sale(), config.page_limits());
        let grid = GridService::new(
            store,
            composer,
            config.export_settings(),
            metrics.clone(),
        );

        if config.api_token_hashes.is_empty() {
            info!("API_TOKEN_HASHES is empty; grid routes are open");
        }

        Self {
            inner: Arc::new(AppStateInner {
                grid,
                api_token_hashes: config.api_token_hashes.clone(),
                metrics,
            }),
        }
    }

    /// Get the grid service.
    pub fn grid(&self) -> &Arc<GridService> {
        &self.inner.grid
    }

    /// Get the accepted API token digests.
    pub fn api_token_hashes(&self) -> &[String] {
        &self.inner.api_token_hashes
    }

    /// Get the metrics registry.
    pub fn metrics(&self) -> &Arc<Metrics> {
        &self.inner.metrics
    }

    /// Check if the listing store is reachable.
    pub async fn store_healthy(&self) -> bool {
        self.inner.grid.store().ping().await
    }
}
