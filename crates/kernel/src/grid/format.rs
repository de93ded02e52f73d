//! Export presentation rules.
//!
//! Formatting is applied to already-selected rows at serialization time and
//! never influences which rows are selected.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, Offset, Utc};
use rust_decimal::{Decimal, RoundingStrategy};
use serde_json::Value;

use super::registry::{Field, Presentation};
use super::types::Row;

/// Currencies a listing can be priced in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Currency {
    Clp,
    Uf,
    Usd,
}

impl Currency {
    fn symbol(self) -> &'static str {
        match self {
            Currency::Clp => "$",
            Currency::Uf => "UF ",
            Currency::Usd => "US$",
        }
    }

    fn decimals(self) -> u32 {
        match self {
            Currency::Clp => 0,
            Currency::Uf | Currency::Usd => 2,
        }
    }

    /// Format `amount` with es-CL separators: `.` for thousands, `,` for decimals.
    pub fn format(self, amount: Decimal) -> String {
        let decimals = self.decimals();
        let mut rounded = amount
            .abs()
            .round_dp_with_strategy(decimals, RoundingStrategy::MidpointAwayFromZero);
        rounded.rescale(decimals);

        let digits = rounded.to_string();
        let (int_part, frac_part) = match digits.split_once('.') {
            Some((int_part, frac_part)) => (int_part, Some(frac_part)),
            None => (digits.as_str(), None),
        };

        let mut out = String::new();
        if amount.is_sign_negative() && !rounded.is_zero() {
            out.push('-');
        }
        out.push_str(self.symbol());
        out.push_str(&group_thousands(int_part));
        if let Some(frac) = frac_part {
            out.push(',');
            out.push_str(frac);
        }
        out
    }
}

impl FromStr for Currency {
    type Err = UnknownCurrency;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "CLP" => Ok(Currency::Clp),
            "UF" => Ok(Currency::Uf),
            "USD" => Ok(Currency::Usd),
            _ => Err(UnknownCurrency(s.to_string())),
        }
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let code = match self {
            Currency::Clp => "CLP",
            Currency::Uf => "UF",
            Currency::Usd => "USD",
        };
        f.write_str(code)
    }
}

#[derive(Debug, thiserror::Error)]
#[error("unknown currency: {0}")]
pub struct UnknownCurrency(String);

fn group_thousands(digits: &str) -> String {
    let len = digits.len();
    let mut out = String::with_capacity(len + len / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (len - i) % 3 == 0 {
            out.push('.');
        }
        out.push(c);
    }
    out
}

/// Renders row values as spreadsheet cells.
#[derive(Debug, Clone, Copy)]
pub struct Presenter {
    /// Used when a row carries no recognizable `currencyPrice`.
    pub default_currency: Currency,
    /// Offset dates are shown in.
    pub offset: FixedOffset,
}

impl Presenter {
    pub fn new(default_currency: Currency, offset: FixedOffset) -> Self {
        Self {
            default_currency,
            offset,
        }
    }

    /// Render one cell of `row`. Nulls render as empty cells.
    pub fn cell(&self, row: &Row, field: Field) -> String {
        let descriptor = field.descriptor();
        let value = row.get(descriptor.name).unwrap_or(&Value::Null);

        match (descriptor.presentation, value) {
            (_, Value::Null) => String::new(),
            (Presentation::Currency, value) => match to_decimal(value) {
                Some(amount) => self.row_currency(row).format(amount),
                None => plain(value),
            },
            (Presentation::Date, Value::String(s)) => self
                .format_date(s)
                .unwrap_or_else(|| s.clone()),
            (_, value) => plain(value),
        }
    }

    fn row_currency(&self, row: &Row) -> Currency {
        row.get(Field::CurrencyPrice.name())
            .and_then(Value::as_str)
            .and_then(|code| code.parse().ok())
            .unwrap_or(self.default_currency)
    }

    /// Format a stored timestamp or date as `DD-MM-YYYY`.
    fn format_date(&self, raw: &str) -> Option<String> {
        let date = if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
            ts.with_timezone(&self.offset).date_naive()
        } else if let Ok(naive) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f") {
            naive
                .and_utc()
                .with_timezone(&self.offset)
                .date_naive()
        } else {
            NaiveDate::parse_from_str(raw, "%Y-%m-%d").ok()?
        };
        Some(date.format("%d-%m-%Y").to_string())
    }
}

impl Default for Presenter {
    fn default() -> Self {
        Self::new(Currency::Clp, Utc.fix())
    }
}

fn to_decimal(value: &Value) -> Option<Decimal> {
    match value {
        Value::Number(n) => {
            let text = n.to_string();
            Decimal::from_str(&text)
                .or_else(|_| Decimal::from_scientific(&text))
                .ok()
        }
        Value::String(s) => Decimal::from_str(s.trim()).ok(),
        _ => None,
    }
}

fn plain(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
