//! Grid row shaping.

use serde_json::Value;

use super::registry::Field;
use super::types::Row;

/// Shape raw store rows for the interactive grid.
///
/// Only projected fields appear, keyed by name; key order is not
/// significant. Each field is emitted under its wire name and, when the
/// registry defines one, under its conventional fallback key as well. Fields
/// the store did not return come back as `null`.
pub fn shape_rows(rows: Vec<Row>, fields: &[Field]) -> Vec<Row> {
    rows.into_iter().map(|row| shape_row(&row, fields)).collect()
}

fn shape_row(raw: &Row, fields: &[Field]) -> Row {
    let mut shaped = Row::new();
    for field in fields {
        let descriptor = field.descriptor();
        let value = raw.get(descriptor.name).cloned().unwrap_or(Value::Null);

        if let Some(fallback) = descriptor.fallback_key {
            shaped.insert(fallback.to_string(), value.clone());
        }
        shaped.insert(descriptor.name.to_string(), value);
    }
    shaped
}
