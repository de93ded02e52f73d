//! Estate test utilities.
//!
//! Helpers for integration testing: property fixtures shaped like the rows the
//! listing store returns, plus assertion utilities for grid responses.

use chrono::{DateTime, TimeZone, Utc};
use rust_decimal::Decimal;
use serde_json::{Map, Value as JsonValue};
use uuid::Uuid;

/// Create a test property with default values (a CLP sale listing in Santiago).
pub fn test_property(title: &str) -> TestProperty {
    let created = Utc.with_ymd_and_hms(2024, 1, 15, 12, 0, 0).single().unwrap_or_default();
    TestProperty {
        id: Uuid::now_v7(),
        title: title.to_string(),
        status: "AVAILABLE".to_string(),
        operation_type: "SALE".to_string(),
        type_name: Some("Departamento".to_string()),
        agent_name: None,
        address: format!("{title} 123"),
        city: "Santiago".to_string(),
        state: "Metropolitana".to_string(),
        price: Some(Decimal::new(100_000_000, 0)),
        currency: Some("CLP".to_string()),
        created_at: created,
        updated_at: created,
        deleted: false,
    }
}

/// A property builder for creating store fixtures.
#[derive(Debug, Clone)]
pub struct TestProperty {
    pub id: Uuid,
    pub title: String,
    pub status: String,
    pub operation_type: String,
    pub type_name: Option<String>,
    pub agent_name: Option<String>,
    pub address: String,
    pub city: String,
    pub state: String,
    pub price: Option<Decimal>,
    pub currency: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted: bool,
}

impl TestProperty {
    /// Set a custom ID.
    pub fn with_id(mut self, id: Uuid) -> Self {
        self.id = id;
        self
    }

    /// Set the city (comuna).
    pub fn in_city(mut self, city: &str) -> Self {
        self.city = city.to_string();
        self
    }

    /// Set the state (región).
    pub fn in_state(mut self, state: &str) -> Self {
        self.state = state.to_string();
        self
    }

    /// Set the street address.
    pub fn at_address(mut self, address: &str) -> Self {
        self.address = address.to_string();
        self
    }

    /// Set the price in whole currency units.
    pub fn priced(mut self, amount: i64) -> Self {
        self.price = Some(Decimal::new(amount, 0));
        self
    }

    /// Set an exact decimal price.
    pub fn with_price(mut self, price: Decimal) -> Self {
        self.price = Some(price);
        self
    }

    /// Set the price currency code.
    pub fn in_currency(mut self, currency: &str) -> Self {
        self.currency = Some(currency.to_string());
        self
    }

    /// Leave the price currency unset.
    pub fn without_currency(mut self) -> Self {
        self.currency = None;
        self
    }

    /// Set the listing status.
    pub fn with_status(mut self, status: &str) -> Self {
        self.status = status.to_string();
        self
    }

    /// Set the property type name.
    pub fn of_type(mut self, type_name: &str) -> Self {
        self.type_name = Some(type_name.to_string());
        self
    }

    /// Assign an agent by display name.
    pub fn with_agent(mut self, name: &str) -> Self {
        self.agent_name = Some(name.to_string());
        self
    }

    /// Mark as a rental listing.
    pub fn for_rent(mut self) -> Self {
        self.operation_type = "RENT".to_string();
        self
    }

    /// Mark as soft-deleted.
    pub fn deleted(mut self) -> Self {
        self.deleted = true;
        self
    }

    /// Set the creation timestamp (also used as the update timestamp).
    pub fn created(mut self, at: DateTime<Utc>) -> Self {
        self.created_at = at;
        self.updated_at = at;
        self
    }

    /// Render as a store row keyed by wire field name.
    ///
    /// Values follow PostgreSQL `row_to_json` conventions: numerics as JSON
    /// numbers and timestamps as RFC 3339 strings.
    pub fn to_row(&self) -> Map<String, JsonValue> {
        let mut row = Map::new();
        row.insert("id".into(), JsonValue::String(self.id.to_string()));
        row.insert("title".into(), JsonValue::String(self.title.clone()));
        row.insert("status".into(), JsonValue::String(self.status.clone()));
        row.insert(
            "operationType".into(),
            JsonValue::String(self.operation_type.clone()),
        );
        row.insert("typeName".into(), optional_string(&self.type_name));
        row.insert("assignedAgentName".into(), optional_string(&self.agent_name));
        row.insert("address".into(), JsonValue::String(self.address.clone()));
        row.insert("city".into(), JsonValue::String(self.city.clone()));
        row.insert("state".into(), JsonValue::String(self.state.clone()));
        row.insert("price".into(), decimal_to_json(self.price));
        row.insert("currencyPrice".into(), optional_string(&self.currency));
        row.insert(
            "createdAt".into(),
            JsonValue::String(self.created_at.to_rfc3339()),
        );
        row.insert(
            "updatedAt".into(),
            JsonValue::String(self.updated_at.to_rfc3339()),
        );
        row.insert("deleted".into(), JsonValue::Bool(self.deleted));
        row
    }
}

fn optional_string(value: &Option<String>) -> JsonValue {
    value
        .as_ref()
        .map(|s| JsonValue::String(s.clone()))
        .unwrap_or(JsonValue::Null)
}

fn decimal_to_json(value: Option<Decimal>) -> JsonValue {
    value
        .and_then(|d| serde_json::from_str(&d.to_string()).ok())
        .unwrap_or(JsonValue::Null)
}

/// A small fixed catalogue of sale and rent listings used across tests.
///
/// Prices repeat on purpose so sorts by price exercise the tie-break.
pub fn sample_catalogue() -> Vec<TestProperty> {
    let day = |d: u32| {
        Utc.with_ymd_and_hms(2024, 3, d, 9, 30, 0)
            .single()
            .unwrap_or_default()
    };
    vec![
        test_property("Depto Los Leones")
            .in_city("Providencia")
            .priced(150_000_000)
            .with_agent("Ana Rojas")
            .created(day(1)),
        test_property("Casa El Golf")
            .in_city("Las Condes")
            .of_type("Casa")
            .priced(420_000_000)
            .with_agent("Pedro Soto")
            .created(day(2)),
        test_property("Depto Pedro de Valdivia")
            .in_city("Providencia")
            .priced(150_000_000)
            .created(day(3)),
        test_property("Oficina Apoquindo")
            .in_city("Las Condes")
            .of_type("Oficina")
            .with_price(Decimal::new(1_250_050, 2))
            .in_currency("UF")
            .with_agent("Ana Rojas")
            .created(day(4)),
        test_property("Depto Manuel Montt")
            .in_city("Providencia")
            .priced(98_000_000)
            .with_status("RESERVED")
            .created(day(5)),
        test_property("Casa Ñuñoa")
            .in_city("Ñuñoa")
            .of_type("Casa")
            .priced(210_000_000)
            .created(day(6)),
        test_property("Depto Arriendo Providencia")
            .in_city("Providencia")
            .priced(650_000)
            .for_rent()
            .created(day(7)),
        test_property("Depto Eliminado")
            .in_city("Providencia")
            .priced(120_000_000)
            .deleted()
            .created(day(8)),
    ]
}

/// Assertion helpers for JSON grid rows.
pub mod assert {
    use serde_json::Value;

    /// Assert that a JSON value has a specific key.
    pub fn has_key(value: &Value, key: &str) {
        assert!(
            value.get(key).is_some(),
            "Expected JSON to have key '{key}', got: {value}"
        );
    }

    /// Assert that a JSON object has exactly the given keys, in any order.
    pub fn only_keys(value: &Value, keys: &[&str]) {
        let Some(obj) = value.as_object() else {
            panic!("Expected a JSON object, got: {value}");
        };
        let mut actual: Vec<&str> = obj.keys().map(String::as_str).collect();
        let mut expected = keys.to_vec();
        actual.sort_unstable();
        expected.sort_unstable();
        assert_eq!(actual, expected, "key mismatch for row: {value}");
    }

    /// Assert that a string contains a substring.
    pub fn contains(haystack: &str, needle: &str) {
        assert!(
            haystack.contains(needle),
            "Expected string to contain '{needle}'\nActual: {haystack}"
        );
    }

    /// Assert that a string does not contain a substring.
    pub fn not_contains(haystack: &str, needle: &str) {
        assert!(
            !haystack.contains(needle),
            "Expected string to NOT contain '{needle}'\nActual: {haystack}"
        );
    }
}
