//! Field registry for the property grid.
//!
//! Every caller-supplied field name (filter, sort, projection) is resolved
//! through this registry. The filter, sort, and projection whitelists are all
//! derived from the flags on a single [`FieldDescriptor`] per [`Field`], so
//! adding a grid column means adding exactly one entry here.
//!
//! Storage layout assumed by the registry:
//!
//! ```text
//! properties     AS property       (id, title, status, operation_type, address, city,
//!                                   state, price, currency_price, property_type_id,
//!                                   assigned_agent_id, created_at, updated_at, deleted_at)
//! property_types AS property_type  (id, name)
//! users          AS agent          (id, person_id)
//! persons        AS agent_person   (id, first_name, last_name)
//! ```

use serde::{Deserialize, Serialize};

/// Base table of the grid.
pub const BASE_TABLE: &str = "properties";

/// Alias of the base table in generated SQL.
pub const BASE_ALIAS: &str = "property";

/// Every field the grid knows about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Field {
    Id,
    Title,
    Status,
    OperationType,
    TypeName,
    AssignedAgentName,
    Address,
    City,
    State,
    Price,
    CurrencyPrice,
    CreatedAt,
    UpdatedAt,
}

/// Joins a field may depend on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Join {
    PropertyType,
    Agent,
    AgentPerson,
}

/// Static description of a join.
#[derive(Debug, Clone, Copy)]
pub struct JoinSpec {
    pub table: &'static str,
    pub alias: &'static str,
    /// `(table alias, column)` on the already-joined side.
    pub local: (&'static str, &'static str),
    /// Column on the joined table matched against `local`.
    pub foreign_column: &'static str,
    /// Join that must precede this one.
    pub requires: Option<Join>,
}

impl Join {
    pub fn spec(self) -> JoinSpec {
        match self {
            Join::PropertyType => JoinSpec {
                table: "property_types",
                alias: "property_type",
                local: (BASE_ALIAS, "property_type_id"),
                foreign_column: "id",
                requires: None,
            },
            Join::Agent => JoinSpec {
                table: "users",
                alias: "agent",
                local: (BASE_ALIAS, "assigned_agent_id"),
                foreign_column: "id",
                requires: None,
            },
            Join::AgentPerson => JoinSpec {
                table: "persons",
                alias: "agent_person",
                local: ("agent", "person_id"),
                foreign_column: "id",
                requires: Some(Join::Agent),
            },
        }
    }
}

/// Where a field's value comes from.
#[derive(Debug, Clone, Copy)]
pub enum FieldSource {
    /// A plain column on the base table or a joined alias.
    Column {
        table: &'static str,
        column: &'static str,
    },
    /// A fixed SQL expression over joined aliases.
    Computed { sql: &'static str },
}

/// Type used to coerce filter values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueType {
    Text,
    /// Closed set of upper-case values.
    Enum(&'static [&'static str]),
    Numeric,
    Date,
}

/// How a filter clause on the field compares.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Comparison {
    Equals,
    Contains,
}

/// How the export renders the field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Presentation {
    Plain,
    Currency,
    Date,
}

/// Registry entry for one field.
#[derive(Debug, Clone, Copy)]
pub struct FieldDescriptor {
    pub field: Field,
    pub name: &'static str,
    pub label: &'static str,
    pub source: FieldSource,
    pub joins: &'static [Join],
    pub value_type: ValueType,
    pub comparison: Comparison,
    pub sortable: bool,
    pub filterable: bool,
    pub projectable: bool,
    pub searchable: bool,
    /// Secondary row key emitted next to `name` by the grid assembler.
    pub fallback_key: Option<&'static str>,
    pub presentation: Presentation,
}

pub const STATUS_VALUES: &[&str] = &["AVAILABLE", "RESERVED", "SOLD", "INACTIVE"];
pub const OPERATION_VALUES: &[&str] = &["SALE", "RENT"];
pub const CURRENCY_VALUES: &[&str] = &["CLP", "UF", "USD"];

const fn base(column: &'static str) -> FieldSource {
    FieldSource::Column {
        table: BASE_ALIAS,
        column,
    }
}

static REGISTRY: [FieldDescriptor; 13] = [
    FieldDescriptor {
        field: Field::Id,
        name: "id",
        label: "ID",
        source: base("id"),
        joins: &[],
        value_type: ValueType::Text,
        comparison: Comparison::Equals,
        sortable: true,
        filterable: false,
        projectable: true,
        searchable: false,
        fallback_key: Some("property_id"),
        presentation: Presentation::Plain,
    },
    FieldDescriptor {
        field: Field::Title,
        name: "title",
        label: "Título",
        source: base("title"),
        joins: &[],
        value_type: ValueType::Text,
        comparison: Comparison::Contains,
        sortable: true,
        filterable: true,
        projectable: true,
        searchable: true,
        fallback_key: Some("property_title"),
        presentation: Presentation::Plain,
    },
    FieldDescriptor {
        field: Field::Status,
        name: "status",
        label: "Estado",
        source: base("status"),
        joins: &[],
        value_type: ValueType::Enum(STATUS_VALUES),
        comparison: Comparison::Equals,
        sortable: true,
        filterable: true,
        projectable: true,
        searchable: false,
        fallback_key: Some("property_status"),
        presentation: Presentation::Plain,
    },
    FieldDescriptor {
        field: Field::OperationType,
        name: "operationType",
        label: "Operación",
        source: base("operation_type"),
        joins: &[],
        value_type: ValueType::Enum(OPERATION_VALUES),
        comparison: Comparison::Equals,
        sortable: true,
        filterable: true,
        projectable: true,
        searchable: false,
        fallback_key: Some("property_operationType"),
        presentation: Presentation::Plain,
    },
    FieldDescriptor {
        field: Field::TypeName,
        name: "typeName",
        label: "Tipo",
        source: FieldSource::Column {
            table: "property_type",
            column: "name",
        },
        joins: &[Join::PropertyType],
        value_type: ValueType::Text,
        comparison: Comparison::Equals,
        sortable: true,
        filterable: true,
        projectable: true,
        searchable: false,
        fallback_key: None,
        presentation: Presentation::Plain,
    },
    FieldDescriptor {
        field: Field::AssignedAgentName,
        name: "assignedAgentName",
        label: "Agente asignado",
        source: FieldSource::Computed {
            sql: "NULLIF(CONCAT_WS(' ', \"agent_person\".\"first_name\", \"agent_person\".\"last_name\"), '')",
        },
        joins: &[Join::AgentPerson],
        value_type: ValueType::Text,
        comparison: Comparison::Contains,
        sortable: true,
        filterable: true,
        projectable: true,
        searchable: false,
        fallback_key: None,
        presentation: Presentation::Plain,
    },
    FieldDescriptor {
        field: Field::Address,
        name: "address",
        label: "Dirección",
        source: base("address"),
        joins: &[],
        value_type: ValueType::Text,
        comparison: Comparison::Contains,
        sortable: false,
        filterable: true,
        projectable: false,
        searchable: true,
        fallback_key: None,
        presentation: Presentation::Plain,
    },
    FieldDescriptor {
        field: Field::City,
        name: "city",
        label: "Comuna",
        source: base("city"),
        joins: &[],
        value_type: ValueType::Text,
        comparison: Comparison::Equals,
        sortable: true,
        filterable: true,
        projectable: true,
        searchable: true,
        fallback_key: Some("property_city"),
        presentation: Presentation::Plain,
    },
    FieldDescriptor {
        field: Field::State,
        name: "state",
        label: "Región",
        source: base("state"),
        joins: &[],
        value_type: ValueType::Text,
        comparison: Comparison::Equals,
        sortable: true,
        filterable: true,
        projectable: true,
        searchable: false,
        fallback_key: Some("property_state"),
        presentation: Presentation::Plain,
    },
    FieldDescriptor {
        field: Field::Price,
        name: "price",
        label: "Precio",
        source: base("price"),
        joins: &[],
        value_type: ValueType::Numeric,
        comparison: Comparison::Equals,
        sortable: true,
        filterable: true,
        projectable: true,
        searchable: false,
        fallback_key: Some("property_price"),
        presentation: Presentation::Currency,
    },
    FieldDescriptor {
        field: Field::CurrencyPrice,
        name: "currencyPrice",
        label: "Moneda",
        source: base("currency_price"),
        joins: &[],
        value_type: ValueType::Enum(CURRENCY_VALUES),
        comparison: Comparison::Equals,
        sortable: true,
        filterable: true,
        projectable: true,
        searchable: false,
        fallback_key: Some("property_currencyPrice"),
        presentation: Presentation::Plain,
    },
    FieldDescriptor {
        field: Field::CreatedAt,
        name: "createdAt",
        label: "Creado",
        source: base("created_at"),
        joins: &[],
        value_type: ValueType::Date,
        comparison: Comparison::Equals,
        sortable: true,
        filterable: true,
        projectable: true,
        searchable: false,
        fallback_key: Some("property_createdAt"),
        presentation: Presentation::Date,
    },
    FieldDescriptor {
        field: Field::UpdatedAt,
        name: "updatedAt",
        label: "Actualizado",
        source: base("updated_at"),
        joins: &[],
        value_type: ValueType::Date,
        comparison: Comparison::Equals,
        sortable: true,
        filterable: true,
        projectable: true,
        searchable: false,
        fallback_key: Some("property_updatedAt"),
        presentation: Presentation::Date,
    },
];

impl Field {
    /// Registry entry for this field.
    pub fn descriptor(self) -> &'static FieldDescriptor {
        // Registry order matches enum declaration order.
        &REGISTRY[self as usize]
    }

    /// Wire name.
    pub fn name(self) -> &'static str {
        self.descriptor().name
    }

    /// Look up a field by its wire name (exact, case-sensitive).
    pub fn from_name(name: &str) -> Option<Field> {
        REGISTRY.iter().find(|d| d.name == name).map(|d| d.field)
    }

    /// Filter whitelist lookup.
    pub fn filterable(name: &str) -> Option<Field> {
        Self::from_name(name).filter(|f| f.descriptor().filterable)
    }

    /// Sort whitelist lookup.
    pub fn sortable(name: &str) -> Option<Field> {
        Self::from_name(name).filter(|f| f.descriptor().sortable)
    }

    /// Projection whitelist lookup.
    pub fn projectable(name: &str) -> Option<Field> {
        Self::from_name(name).filter(|f| f.descriptor().projectable)
    }
}

/// All registry entries in declaration order.
pub fn descriptors() -> &'static [FieldDescriptor] {
    &REGISTRY
}

/// Fields matched by the free-text search, in registry order.
pub fn searchable_fields() -> impl Iterator<Item = Field> {
    REGISTRY.iter().filter(|d| d.searchable).map(|d| d.field)
}

/// Append `joins` (and their prerequisites) to `out`, skipping duplicates.
pub fn push_joins(out: &mut Vec<Join>, joins: &[Join]) {
    for &join in joins {
        if let Some(required) = join.spec().requires {
            push_joins(out, &[required]);
        }
        if !out.contains(&join) {
            out.push(join);
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn registry_order_matches_enum() {
        for (i, d) in REGISTRY.iter().enumerate() {
            assert_eq!(d.field as usize, i, "registry entry {} out of order", d.name);
        }
    }

    #[test]
    fn names_are_unique_and_round_trip() {
        for d in descriptors() {
            assert_eq!(Field::from_name(d.name), Some(d.field));
            let json = serde_json::to_string(&d.field).unwrap();
            assert_eq!(json, format!("\"{}\"", d.name));
        }
    }

    #[test]
    fn whitelists_derive_from_flags() {
        assert_eq!(Field::filterable("city"), Some(Field::City));
        assert_eq!(Field::filterable("id"), None);
        assert_eq!(Field::sortable("address"), None);
        assert_eq!(Field::projectable("address"), None);
        assert_eq!(Field::projectable("typeName"), Some(Field::TypeName));
        assert_eq!(Field::from_name("deleted_at"), None);
        assert_eq!(Field::from_name("City"), None);
    }

    #[test]
    fn searchable_fields_are_text_columns() {
        let fields: Vec<Field> = searchable_fields().collect();
        assert_eq!(fields, vec![Field::Title, Field::Address, Field::City]);
    }

    #[test]
    fn join_prerequisites_come_first_and_dedupe() {
        let mut joins = Vec::new();
        push_joins(&mut joins, Field::AssignedAgentName.descriptor().joins);
        push_joins(&mut joins, Field::TypeName.descriptor().joins);
        push_joins(&mut joins, Field::AssignedAgentName.descriptor().joins);

        assert_eq!(
            joins,
            vec![Join::Agent, Join::AgentPerson, Join::PropertyType]
        );
    }
}
