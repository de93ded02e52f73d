//! Field projection resolution.

use tracing::debug;

use super::registry::{Field, push_joins};
use super::types::Projection;

/// Fields returned when the request names none that are projectable.
pub const DEFAULT_FIELDS: &[Field] = &[
    Field::Id,
    Field::Title,
    Field::Status,
    Field::OperationType,
    Field::City,
    Field::Price,
    Field::CreatedAt,
];

/// Split a comma-separated `fields` parameter into names.
pub fn split_field_list(input: &str) -> Vec<String> {
    input
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Resolve requested names against the projection whitelist.
///
/// Unknown names are dropped, duplicates collapse to their first occurrence,
/// and the primary key is always present (first unless requested elsewhere).
pub fn resolve_projection(requested: &[String]) -> Projection {
    let mut fields: Vec<Field> = Vec::new();
    for name in requested {
        match Field::projectable(name) {
            Some(field) if !fields.contains(&field) => fields.push(field),
            Some(_) => {}
            None => debug!(field = %name, "dropping unknown projection field"),
        }
    }

    if fields.is_empty() {
        fields = DEFAULT_FIELDS.to_vec();
    } else if !fields.contains(&Field::Id) {
        fields.insert(0, Field::Id);
    }

    let mut companions = Vec::new();
    for field in &fields {
        for companion in companions_of(*field) {
            if !fields.contains(companion) && !companions.contains(companion) {
                companions.push(*companion);
            }
        }
    }

    let mut joins = Vec::new();
    for field in fields.iter().chain(&companions) {
        push_joins(&mut joins, field.descriptor().joins);
    }

    Projection {
        fields,
        companions,
        joins,
    }
}

/// Columns a field cannot be presented without.
///
/// A price is meaningless without its currency, so exports always see it.
fn companions_of(field: Field) -> &'static [Field] {
    match field {
        Field::Price => &[Field::CurrencyPrice],
        _ => &[],
    }
}
