//! Property grid types.
//!
//! Provides type definitions for the grid query engine:
//! - GridRequest: normalized caller input (typed transport)
//! - QueryDescription: the canonical "what to fetch" shared by grid and export
//! - PageResult / GridResponse: interactive grid response shapes

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use super::registry::{Field, Join};

/// A result row keyed by wire field name.
pub type Row = serde_json::Map<String, serde_json::Value>;

/// Typed filter value after coercion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum FilterValue {
    /// Free text, compared per the field's comparison.
    Text(String),
    /// Upper-cased member of the field's enum set.
    Enum(String),
    Number(Decimal),
    NumberRange(Decimal, Decimal),
    /// Whole calendar day.
    Date(NaiveDate),
    /// Inclusive day range.
    DateRange(NaiveDate, NaiveDate),
}

impl FilterValue {
    /// Render the value in filter wire syntax.
    pub fn to_wire(&self) -> String {
        match self {
            FilterValue::Text(s) | FilterValue::Enum(s) => s.clone(),
            FilterValue::Number(n) => n.to_string(),
            FilterValue::NumberRange(from, to) => format!("{from}..{to}"),
            FilterValue::Date(d) => d.format("%Y-%m-%d").to_string(),
            FilterValue::DateRange(from, to) => {
                format!("{}..{}", from.format("%Y-%m-%d"), to.format("%Y-%m-%d"))
            }
        }
    }
}

/// A validated filter clause.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterClause {
    pub field: Field,
    /// Trimmed value as supplied by the caller.
    pub raw_value: String,
    pub value: FilterValue,
}

/// Sort direction.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

impl SortDirection {
    /// Lenient parse: anything other than `desc` (case-insensitive) is `asc`.
    pub fn parse(value: Option<&str>) -> Self {
        match value.map(str::trim) {
            Some(v) if v.eq_ignore_ascii_case("desc") => SortDirection::Desc,
            _ => SortDirection::Asc,
        }
    }
}

/// Resolved sort order, primary key first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortSpec {
    pub field: Field,
    pub direction: SortDirection,
    /// Always-ascending tie-break key; `None` when `field` is already the key.
    pub tie_break: Option<Field>,
}

impl SortSpec {
    /// Ordering keys in application order.
    pub fn keys(&self) -> Vec<(Field, SortDirection)> {
        let mut keys = vec![(self.field, self.direction)];
        if let Some(tie) = self.tie_break {
            keys.push((tie, SortDirection::Asc));
        }
        keys
    }
}

/// Resolved output fields plus the joins needed to produce them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Projection {
    pub fields: Vec<Field>,
    /// Selected alongside `fields` only to present them; never output.
    pub companions: Vec<Field>,
    pub joins: Vec<Join>,
}

impl Projection {
    /// Every column the store must select: output fields, then companions.
    pub fn selected(&self) -> impl Iterator<Item = Field> + '_ {
        self.fields.iter().chain(&self.companions).copied()
    }
}

/// Implicit predicate applied before any caller filter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BaseScope {
    pub operation_type: String,
    pub exclude_deleted: bool,
}

impl BaseScope {
    /// Non-deleted listings offered for sale.
    pub fn for_sale() -> Self {
        Self {
            operation_type: "SALE".to_string(),
            exclude_deleted: true,
        }
    }
}

/// Page bound applied to a query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageWindow {
    /// 1-indexed page number.
    pub page: u32,
    pub limit: u32,
    pub offset: u64,
}

/// Canonical description of a grid query.
///
/// Produced only by the composer; the grid and export paths both execute it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryDescription {
    pub base_scope: BaseScope,
    pub search_term: Option<String>,
    pub filters: Vec<FilterClause>,
    pub sort: SortSpec,
    pub projection: Projection,
    pub page: Option<PageWindow>,
}

impl QueryDescription {
    /// Same query without its page bound.
    pub fn unpaged(&self) -> Self {
        Self {
            page: None,
            ..self.clone()
        }
    }
}

/// A filter supplied through the typed transport.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterInput {
    pub field: String,
    pub value: String,
}

/// Normalized grid request, decoded from either transport.
///
/// Scalar members decode leniently: a value of the wrong type or shape is
/// treated as absent rather than rejecting the whole body.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GridRequest {
    /// Requested output fields; empty selects the default set.
    pub fields: Vec<String>,
    #[serde(deserialize_with = "lenient_text")]
    pub sort_field: Option<String>,
    /// Raw direction, resolved with [`SortDirection::parse`].
    #[serde(deserialize_with = "lenient_text")]
    pub sort: Option<String>,
    #[serde(deserialize_with = "lenient_text")]
    pub search: Option<String>,
    pub filters: Vec<FilterInput>,
    #[serde(deserialize_with = "lenient_flag")]
    pub pagination: bool,
    #[serde(deserialize_with = "lenient_int")]
    pub page: Option<i64>,
    #[serde(deserialize_with = "lenient_int")]
    pub limit: Option<i64>,
}

fn lenient_text<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::String(s)) => Some(s),
        _ => None,
    })
}

fn lenient_flag<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::Bool(b)) => b,
        Some(Value::String(s)) => s.trim().eq_ignore_ascii_case("true"),
        _ => false,
    })
}

fn lenient_int<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<i64>, D::Error> {
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::Number(n)) => n.as_i64(),
        Some(Value::String(s)) => s.trim().parse().ok(),
        _ => None,
    })
}

/// One page of grid rows with pager metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageResult {
    pub data: Vec<Row>,
    pub total: u64,
    pub page: u32,
    pub limit: u32,
    pub total_pages: u32,
    pub has_next_page: bool,
    pub has_prev_page: bool,
}

impl PageResult {
    /// Create a new result with paging calculations.
    pub fn new(data: Vec<Row>, total: u64, page: u32, limit: u32) -> Self {
        let total_pages = if limit > 0 {
            u32::try_from(total.div_ceil(u64::from(limit))).unwrap_or(u32::MAX)
        } else {
            1
        };

        Self {
            data,
            total,
            page,
            limit,
            total_pages,
            has_next_page: page < total_pages,
            has_prev_page: page > 1,
        }
    }
}

/// Grid response: a page envelope when paginated, a bare array otherwise.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum GridResponse {
    Paged(PageResult),
    Rows(Vec<Row>),
}
