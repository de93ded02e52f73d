//! Prometheus metrics collection.
//!
//! Provides application metrics in Prometheus format.

use prometheus_client::encoding::{EncodeLabelSet, text::encode};
use prometheus_client::metrics::counter::Counter;
use prometheus_client::metrics::family::Family;
use prometheus_client::metrics::histogram::{Histogram, exponential_buckets};
use prometheus_client::registry::Registry;

/// Grid endpoint labels.
#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
pub struct EndpointLabels {
    pub endpoint: String,
}

/// Store query labels.
#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
pub struct QueryLabels {
    pub kind: String,
}

/// Application metrics.
pub struct Metrics {
    registry: Registry,

    /// Grid requests by endpoint.
    pub grid_requests: Family<EndpointLabels, Counter>,

    /// Store query duration by query kind (page, count).
    pub store_query_duration_seconds: Family<QueryLabels, Histogram>,

    /// Rows written to exports.
    pub export_rows: Counter,

    /// Exports aborted mid-stream.
    pub export_failures: Counter,
}

impl Metrics {
    /// Create a new metrics registry.
    pub fn new() -> Self {
        let mut registry = Registry::default();

        let grid_requests = Family::<EndpointLabels, Counter>::default();
        registry.register(
            "grid_requests",
            "Grid requests by endpoint",
            grid_requests.clone(),
        );

        let store_query_duration_seconds =
            Family::<QueryLabels, Histogram>::new_with_constructor(|| {
                Histogram::new(exponential_buckets(0.0001, 2.0, 14))
            });
        registry.register(
            "store_query_duration_seconds",
            "Listing store query duration in seconds",
            store_query_duration_seconds.clone(),
        );

        let export_rows = Counter::default();
        registry.register("export_rows", "Rows written to exports", export_rows.clone());

        let export_failures = Counter::default();
        registry.register(
            "export_failures",
            "Exports aborted before completion",
            export_failures.clone(),
        );

        Self {
            registry,
            grid_requests,
            store_query_duration_seconds,
            export_rows,
            export_failures,
        }
    }

    /// Record a grid or export request.
    pub fn record_grid_request(&self, endpoint: &str) {
        self.grid_requests
            .get_or_create(&EndpointLabels {
                endpoint: endpoint.to_string(),
            })
            .inc();
    }

    /// Record a store query.
    pub fn record_store_query(&self, kind: &str, duration_secs: f64) {
        self.store_query_duration_seconds
            .get_or_create(&QueryLabels {
                kind: kind.to_string(),
            })
            .observe(duration_secs);
    }

    /// Record rows written to an export.
    pub fn record_export_rows(&self, rows: u64) {
        self.export_rows.inc_by(rows);
    }

    /// Record an export that ended in an error.
    pub fn record_export_failure(&self) {
        self.export_failures.inc();
    }

    /// Encode metrics in Prometheus text format.
    ///
    /// # Panics
    ///
    /// Panics if Prometheus metric encoding to a `String` buffer fails.
    /// The `fmt::Write` impl for `String` is infallible, and all metric
    /// labels use derived `EncodeLabelSet` impls that do not produce
    /// `fmt::Error`.
    pub fn encode(&self) -> String {
        let mut buffer = String::new();
        // Prometheus encoding to String buffer is infallible
        #[allow(clippy::expect_used)]
        encode(&mut buffer, &self.registry).expect("encoding metrics");
        buffer
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Metrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Metrics").finish()
    }
}
