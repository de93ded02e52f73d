//! Query composition.
//!
//! Turns a [`GridRequest`] into the one [`QueryDescription`] that both the
//! interactive grid and the export execute. Composition is pure: identical
//! requests always produce identical descriptions.

use serde::Deserialize;

use super::filter::{resolve_inputs, split_filters};
use super::pager::PageLimits;
use super::projection::{resolve_projection, split_field_list};
use super::sort::resolve_sort;
use super::types::{BaseScope, GridRequest, QueryDescription, SortDirection};

/// Raw query-string parameters accepted by the grid and export endpoints.
///
/// Every field is kept as text so that malformed values degrade to defaults
/// instead of failing extraction.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GridParams {
    pub fields: Option<String>,
    pub sort: Option<String>,
    pub sort_field: Option<String>,
    pub search: Option<String>,
    pub filtration: Option<String>,
    pub filters: Option<String>,
    pub pagination: Option<String>,
    pub page: Option<String>,
    pub limit: Option<String>,
}

impl GridParams {
    /// Decode into a typed request.
    ///
    /// `filters` is only honoured when `filtration=true`.
    pub fn into_request(self) -> GridRequest {
        let filters = if is_true(self.filtration.as_deref()) {
            self.filters
                .as_deref()
                .map(split_filters)
                .unwrap_or_default()
        } else {
            Vec::new()
        };

        GridRequest {
            fields: self
                .fields
                .as_deref()
                .map(split_field_list)
                .unwrap_or_default(),
            sort_field: self.sort_field,
            sort: self.sort,
            search: self.search,
            filters,
            pagination: is_true(self.pagination.as_deref()),
            page: parse_int(self.page.as_deref()),
            limit: parse_int(self.limit.as_deref()),
        }
    }
}

fn is_true(value: Option<&str>) -> bool {
    value.is_some_and(|v| v.trim().eq_ignore_ascii_case("true"))
}

fn parse_int(value: Option<&str>) -> Option<i64> {
    value.and_then(|v| v.trim().parse().ok())
}

/// Builds query descriptions for one base scope.
#[derive(Debug, Clone)]
pub struct QueryComposer {
    base_scope: BaseScope,
    limits: PageLimits,
}

impl QueryComposer {
    pub fn new(base_scope: BaseScope, limits: PageLimits) -> Self {
        Self { base_scope, limits }
    }

    pub fn limits(&self) -> PageLimits {
        self.limits
    }

    /// Compose a request into a query description.
    ///
    /// The page window is present only when the request asks for pagination.
    pub fn compose(&self, request: &GridRequest) -> QueryDescription {
        let search_term = request
            .search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string);

        QueryDescription {
            base_scope: self.base_scope.clone(),
            search_term,
            filters: resolve_inputs(&request.filters),
            sort: resolve_sort(
                request.sort_field.as_deref(),
                SortDirection::parse(request.sort.as_deref()),
            ),
            projection: resolve_projection(&request.fields),
            page: request
                .pagination
                .then(|| self.limits.window(request.page, request.limit)),
        }
    }
}
