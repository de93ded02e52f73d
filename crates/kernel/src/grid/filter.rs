//! Filter expression parsing.
//!
//! Decodes the compact `field-value,field2-value2` wire format into validated
//! [`FilterClause`]s. Malformed clauses, unknown fields, and values that fail
//! to coerce are dropped rather than rejected so that a stale client filter
//! list never breaks the grid.

use std::str::FromStr;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use tracing::debug;

use super::registry::{Field, ValueType};
use super::types::{FilterClause, FilterInput, FilterValue};

/// Separator between the bounds of a numeric or date range.
const RANGE_SEPARATOR: &str = "..";

/// Parse a filter string into clauses, preserving order.
pub fn parse_filters(input: &str) -> Vec<FilterClause> {
    resolve_inputs(&split_filters(input))
}

/// Split a filter string into unvalidated `(field, value)` pairs.
///
/// Each segment splits on its first `-` only, so values may contain dashes.
pub fn split_filters(input: &str) -> Vec<FilterInput> {
    input
        .split(',')
        .filter_map(|segment| {
            let Some((field, value)) = segment.split_once('-') else {
                if !segment.trim().is_empty() {
                    debug!(segment, "dropping filter clause without separator");
                }
                return None;
            };
            Some(FilterInput {
                field: field.to_string(),
                value: value.to_string(),
            })
        })
        .collect()
}

/// Validate typed-transport filters with the same rules as wire clauses.
pub fn resolve_inputs(inputs: &[FilterInput]) -> Vec<FilterClause> {
    inputs
        .iter()
        .filter_map(|input| resolve_clause(&input.field, &input.value))
        .collect()
}

/// Validate a single `(field, value)` pair against the filter whitelist.
pub fn resolve_clause(field: &str, value: &str) -> Option<FilterClause> {
    let field_name = field.trim();
    let raw_value = value.trim();

    if field_name.is_empty() || raw_value.is_empty() {
        return None;
    }

    let Some(field) = Field::filterable(field_name) else {
        debug!(field = field_name, "dropping filter on unknown field");
        return None;
    };

    let Some(value) = coerce(field.descriptor().value_type, raw_value) else {
        debug!(
            field = field_name,
            value = raw_value,
            "dropping filter with unparseable value"
        );
        return None;
    };

    Some(FilterClause {
        field,
        raw_value: raw_value.to_string(),
        value,
    })
}

/// Render clauses back into wire syntax.
pub fn to_wire(clauses: &[FilterClause]) -> String {
    clauses
        .iter()
        .map(|c| format!("{}-{}", c.field.name(), c.value.to_wire()))
        .collect::<Vec<_>>()
        .join(",")
}

fn coerce(value_type: ValueType, raw: &str) -> Option<FilterValue> {
    match value_type {
        ValueType::Text => Some(FilterValue::Text(raw.to_string())),
        ValueType::Enum(allowed) => {
            let upper = raw.to_uppercase();
            allowed
                .contains(&upper.as_str())
                .then_some(FilterValue::Enum(upper))
        }
        ValueType::Numeric => match split_range(raw) {
            Some((from, to)) => {
                let (from, to) = (parse_decimal(from)?, parse_decimal(to)?);
                (from <= to).then_some(FilterValue::NumberRange(from, to))
            }
            None => parse_decimal(raw).map(FilterValue::Number),
        },
        ValueType::Date => match split_range(raw) {
            Some((from, to)) => {
                let (from, to) = (parse_date(from)?, parse_date(to)?);
                (from <= to).then_some(FilterValue::DateRange(from, to))
            }
            None => parse_date(raw).map(FilterValue::Date),
        },
    }
}

fn split_range(raw: &str) -> Option<(&str, &str)> {
    raw.split_once(RANGE_SEPARATOR)
}

fn parse_decimal(raw: &str) -> Option<Decimal> {
    Decimal::from_str(raw.trim()).ok()
}

fn parse_date(raw: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d").ok()
}
