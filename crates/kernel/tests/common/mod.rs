#![allow(clippy::unwrap_used, clippy::expect_used)]
//! Common test utilities for integration tests.
//!
//! Tests drive the REAL kernel router and grid service. Only the listing
//! store is replaced: [`MemoryListingStore`] evaluates each
//! `QueryDescription` over fixture rows, so every request still goes through
//! the real parser, resolvers, composer, pager, and assemblers.

#![allow(dead_code)]

use std::cmp::Ordering;
use std::collections::HashMap;
use std::str::FromStr;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering as AtomicOrdering};

use anyhow::{Result, anyhow};
use async_trait::async_trait;
use axum::Router;
use axum::body::Body;
use axum::http::{Request, header};
use axum::response::Response;
use chrono::{DateTime, NaiveDate, Utc};
use http_body_util::BodyExt;
use rust_decimal::Decimal;
use serde_json::Value;
use tower::ServiceExt;

use estate_kernel::config::Config;
use estate_kernel::grid::registry::{Comparison, searchable_fields};
use estate_kernel::grid::{
    Field, FilterClause, FilterValue, ListingStore, QueryDescription, Row, RowStream,
    SortDirection,
};
use estate_kernel::state::AppState;
use estate_test_utils::{TestProperty, sample_catalogue};

/// How the in-memory store misbehaves, if at all.
#[derive(Debug, Clone, Copy, Default)]
pub enum Failure {
    #[default]
    None,
    /// Every query fails.
    Always,
    /// Streams fail after yielding this many rows.
    StreamAfter(usize),
}

/// Listing store over fixture rows.
pub struct MemoryListingStore {
    rows: Vec<Row>,
    failure: Failure,
    /// Number of store calls made, for asserting call patterns.
    pub calls: AtomicUsize,
    /// Set when an export cursor is dropped.
    pub cursor_released: Arc<AtomicBool>,
    /// Set when an export cursor yields its last row.
    pub cursor_exhausted: Arc<AtomicBool>,
}

/// Flags its cursor as released when dropped.
struct CursorGuard(Arc<AtomicBool>);

impl Drop for CursorGuard {
    fn drop(&mut self) {
        self.0.store(true, AtomicOrdering::SeqCst);
    }
}

impl MemoryListingStore {
    pub fn new(properties: &[TestProperty]) -> Self {
        Self {
            rows: properties.iter().map(TestProperty::to_row).collect(),
            failure: Failure::None,
            calls: AtomicUsize::new(0),
            cursor_released: Arc::new(AtomicBool::new(false)),
            cursor_exhausted: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn failing(mut self, failure: Failure) -> Self {
        self.failure = failure;
        self
    }

    /// Rows selected by `query`, ordered, before the page window.
    fn select(&self, query: &QueryDescription) -> Vec<Row> {
        let mut selected: Vec<Row> = self
            .rows
            .iter()
            .filter(|row| in_scope(row, query))
            .filter(|row| matches_search(row, query.search_term.as_deref()))
            .filter(|row| query.filters.iter().all(|c| matches_filter(row, c)))
            .cloned()
            .collect();

        let keys = query.sort.keys();
        selected.sort_by(|a, b| {
            keys.iter()
                .map(|(field, direction)| compare(a, b, *field, *direction))
                .find(|o| o.is_ne())
                .unwrap_or(Ordering::Equal)
        });
        selected
    }

    fn project(row: &Row, fields: impl Iterator<Item = Field>) -> Row {
        fields
            .map(|f| {
                let value = row.get(f.name()).cloned().unwrap_or(Value::Null);
                (f.name().to_string(), value)
            })
            .collect()
    }

    fn rows_for(&self, query: &QueryDescription) -> Vec<Row> {
        let selected = self.select(query);
        let (offset, limit) = match query.page {
            Some(window) => (window.offset as usize, window.limit as usize),
            None => (0, usize::MAX),
        };
        selected
            .iter()
            .skip(offset)
            .take(limit)
            .map(|row| Self::project(row, query.projection.selected()))
            .collect()
    }
}

#[async_trait]
impl ListingStore for MemoryListingStore {
    async fn fetch_page(&self, query: &QueryDescription) -> Result<Vec<Row>> {
        self.calls.fetch_add(1, AtomicOrdering::SeqCst);
        if matches!(self.failure, Failure::Always) {
            return Err(anyhow!("connection refused"));
        }
        Ok(self.rows_for(query))
    }

    async fn count(&self, query: &QueryDescription) -> Result<u64> {
        self.calls.fetch_add(1, AtomicOrdering::SeqCst);
        if matches!(self.failure, Failure::Always) {
            return Err(anyhow!("connection refused"));
        }
        Ok(self.select(query).len() as u64)
    }

    fn stream(&self, query: QueryDescription) -> RowStream {
        self.calls.fetch_add(1, AtomicOrdering::SeqCst);
        let rows = self.rows_for(&query);
        let items: Vec<Result<Row>> = match self.failure {
            Failure::None => rows.into_iter().map(Ok).collect(),
            Failure::Always => vec![Err(anyhow!("connection refused"))],
            Failure::StreamAfter(n) => rows
                .into_iter()
                .take(n)
                .map(Ok)
                .chain(std::iter::once(Err(anyhow!("connection reset"))))
                .collect(),
        };
        let guard = CursorGuard(self.cursor_released.clone());
        let exhausted = self.cursor_exhausted.clone();
        Box::pin(async_stream::stream! {
            let _guard = guard;
            for item in items {
                yield item;
            }
            exhausted.store(true, AtomicOrdering::SeqCst);
        })
    }

    async fn ping(&self) -> bool {
        !matches!(self.failure, Failure::Always)
    }
}

fn text(row: &Row, field: Field) -> Option<&str> {
    row.get(field.name()).and_then(Value::as_str)
}

fn decimal(value: &Value) -> Option<Decimal> {
    match value {
        Value::Number(n) => Decimal::from_str(&n.to_string()).ok(),
        Value::String(s) => Decimal::from_str(s).ok(),
        _ => None,
    }
}

fn day(row: &Row, field: Field) -> Option<NaiveDate> {
    text(row, field)
        .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
        .map(|ts| ts.with_timezone(&Utc).date_naive())
}

fn in_scope(row: &Row, query: &QueryDescription) -> bool {
    let scope = &query.base_scope;
    let deleted = row.get("deleted").and_then(Value::as_bool).unwrap_or(false);
    text(row, Field::OperationType) == Some(scope.operation_type.as_str())
        && !(scope.exclude_deleted && deleted)
}

fn matches_search(row: &Row, term: Option<&str>) -> bool {
    let Some(term) = term else {
        return true;
    };
    let term = term.to_lowercase();
    searchable_fields().any(|field| {
        row.get(field.name())
            .and_then(Value::as_str)
            .is_some_and(|v| v.to_lowercase().contains(&term))
    })
}

fn matches_filter(row: &Row, clause: &FilterClause) -> bool {
    let field = clause.field;
    let value = row.get(field.name()).unwrap_or(&Value::Null);

    match &clause.value {
        FilterValue::Text(wanted) => {
            let Some(actual) = value.as_str() else {
                return false;
            };
            let (actual, wanted) = (actual.to_lowercase(), wanted.to_lowercase());
            match field.descriptor().comparison {
                Comparison::Equals => actual == wanted,
                Comparison::Contains => actual.contains(&wanted),
            }
        }
        FilterValue::Enum(wanted) => value.as_str() == Some(wanted.as_str()),
        FilterValue::Number(wanted) => decimal(value) == Some(*wanted),
        FilterValue::NumberRange(from, to) => {
            decimal(value).is_some_and(|v| *from <= v && v <= *to)
        }
        FilterValue::Date(wanted) => day(row, field) == Some(*wanted),
        FilterValue::DateRange(from, to) => {
            day(row, field).is_some_and(|d| *from <= d && d <= *to)
        }
    }
}

/// PostgreSQL ordering: NULLs sort as larger than any value.
fn compare(a: &Row, b: &Row, field: Field, direction: SortDirection) -> Ordering {
    let (left, right) = (
        a.get(field.name()).unwrap_or(&Value::Null),
        b.get(field.name()).unwrap_or(&Value::Null),
    );
    let ordering = match (left, right) {
        (Value::Null, Value::Null) => Ordering::Equal,
        (Value::Null, _) => Ordering::Greater,
        (_, Value::Null) => Ordering::Less,
        (Value::Number(_), Value::Number(_)) => decimal(left).cmp(&decimal(right)),
        (Value::String(l), Value::String(r)) => l.cmp(r),
        _ => left.to_string().cmp(&right.to_string()),
    };
    match direction {
        SortDirection::Asc => ordering,
        SortDirection::Desc => ordering.reverse(),
    }
}

/// Test application wrapper using the REAL kernel routes and state.
pub struct TestApp {
    router: Router,
    pub state: AppState,
    pub store: Arc<MemoryListingStore>,
}

impl TestApp {
    /// App over the sample catalogue with default configuration.
    pub fn new() -> Self {
        Self::build(MemoryListingStore::new(&sample_catalogue()), &[])
    }

    /// App over `store` with extra configuration variables.
    pub fn build(store: MemoryListingStore, vars: &[(&str, &str)]) -> Self {
        let mut env: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        env.entry("DATABASE_URL".into())
            .or_insert_with(|| "postgres://unused/estate_test".into());

        let config = Config::from_lookup(|key| env.get(key).cloned()).unwrap();
        let store = Arc::new(store);
        let state = AppState::with_store(store.clone(), &config);
        let router = estate_kernel::routes::app(state.clone());

        Self {
            router,
            state,
            store,
        }
    }

    /// Make a request to the app.
    pub async fn request(&self, request: Request<Body>) -> Response {
        self.router.clone().oneshot(request).await.unwrap()
    }

    pub async fn get(&self, uri: &str) -> Response {
        self.request(Request::get(uri).body(Body::empty()).unwrap())
            .await
    }

    pub async fn post_json(&self, uri: &str, body: &Value) -> Response {
        self.request(
            Request::post(uri)
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
    }
}

/// Read a response body as JSON.
pub async fn body_json(response: Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

/// Read a response body as UTF-8 text.
pub async fn body_text(response: Response) -> String {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    String::from_utf8(bytes.to_vec()).unwrap()
}

/// Parse an export body into records, header first, BOM stripped.
pub fn csv_records(body: &str) -> Vec<Vec<String>> {
    let body = body.strip_prefix('\u{feff}').expect("export starts with a BOM");
    csv::ReaderBuilder::new()
        .has_headers(false)
        .from_reader(body.as_bytes())
        .records()
        .map(|r| r.unwrap().iter().map(str::to_string).collect())
        .collect()
}

/// Values of `key` across an array of rows.
pub fn column<'a>(rows: &'a Value, key: &str) -> Vec<&'a Value> {
    rows.as_array()
        .expect("rows array")
        .iter()
        .map(|row| &row[key])
        .collect()
}
