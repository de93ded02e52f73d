//! Sort resolution.

use tracing::debug;

use super::registry::Field;
use super::types::{SortDirection, SortSpec};

/// Primary key used to break ties between equal sort values.
pub const TIE_BREAK: Field = Field::Id;

/// Resolve a requested sort against the sort whitelist.
///
/// A missing or unknown field yields `createdAt desc` regardless of the
/// requested direction. The primary key is appended as an ascending tie-break
/// so that paged results form a total order.
pub fn resolve_sort(sort_field: Option<&str>, direction: SortDirection) -> SortSpec {
    let requested = sort_field.map(str::trim).filter(|s| !s.is_empty());

    let (field, direction) = match requested.map(|name| (name, Field::sortable(name))) {
        Some((_, Some(field))) => (field, direction),
        Some((name, None)) => {
            debug!(sort_field = name, "unknown sort field, using default order");
            (Field::CreatedAt, SortDirection::Desc)
        }
        None => (Field::CreatedAt, SortDirection::Desc),
    };

    SortSpec {
        field,
        direction,
        tie_break: (field != TIE_BREAK).then_some(TIE_BREAK),
    }
}
