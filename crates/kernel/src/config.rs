//! Configuration loaded from environment variables.

use std::env;
use std::str::FromStr;

use anyhow::{Context, Result, bail};
use chrono::{FixedOffset, Offset};

use crate::grid::{Currency, ExportSettings, PageLimits};

/// Application configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// HTTP server port (default: 3000).
    pub port: u16,

    /// PostgreSQL connection URL.
    pub database_url: String,

    /// Maximum database connections in pool (default: 10).
    pub database_max_connections: u32,

    /// CORS allowed origins (comma-separated, default: "*").
    pub cors_allowed_origins: Vec<String>,

    /// Grid page size used when the caller sends none (default: 10).
    pub grid_default_limit: u32,

    /// Largest page size the grid will serve (default: 200).
    pub grid_max_limit: u32,

    /// Rows per export chunk (default: 500).
    pub export_batch_size: usize,

    /// Currency for prices without a currency column (default: CLP).
    pub export_default_currency: Currency,

    /// Offset, in minutes east of UTC, for export dates (default: -180).
    pub export_utc_offset_minutes: i32,

    /// SHA-256 hex digests of accepted API tokens. Empty disables the gate.
    pub api_token_hashes: Vec<String>,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let port = parse_or(&lookup, "PORT", 3000)?;

        let database_url =
            lookup("DATABASE_URL").context("DATABASE_URL environment variable is required")?;

        let database_max_connections = parse_or(&lookup, "DATABASE_MAX_CONNECTIONS", 10)?;

        let cors_allowed_origins = lookup("CORS_ALLOWED_ORIGINS")
            .map(|v| v.split(',').map(|s| s.trim().to_string()).collect())
            .unwrap_or_else(|| vec!["*".to_string()]);

        let grid_default_limit = parse_or(&lookup, "GRID_DEFAULT_LIMIT", 10)?;
        let grid_max_limit = parse_or(&lookup, "GRID_MAX_LIMIT", 200)?;
        if grid_default_limit == 0 || grid_max_limit == 0 {
            bail!("GRID_DEFAULT_LIMIT and GRID_MAX_LIMIT must be positive");
        }

        let export_batch_size = parse_or(&lookup, "EXPORT_BATCH_SIZE", 500)?;
        if export_batch_size == 0 {
            bail!("EXPORT_BATCH_SIZE must be positive");
        }

        let export_default_currency = parse_or(&lookup, "EXPORT_DEFAULT_CURRENCY", Currency::Clp)?;

        let export_utc_offset_minutes = parse_or(&lookup, "EXPORT_UTC_OFFSET_MINUTES", -180)?;
        if offset_from_minutes(export_utc_offset_minutes).is_none() {
            bail!("EXPORT_UTC_OFFSET_MINUTES is out of range");
        }

        let api_token_hashes = lookup("API_TOKEN_HASHES")
            .map(|v| {
                v.split(',')
                    .map(|s| s.trim().to_lowercase())
                    .filter(|s| !s.is_empty())
                    .collect()
            })
            .unwrap_or_default();

        Ok(Self {
            port,
            database_url,
            database_max_connections,
            cors_allowed_origins,
            grid_default_limit,
            grid_max_limit,
            export_batch_size,
            export_default_currency,
            export_utc_offset_minutes,
            api_token_hashes,
        })
    }

    /// Grid page size bounds.
    pub fn page_limits(&self) -> PageLimits {
        PageLimits {
            default_limit: self.grid_default_limit,
            max_limit: self.grid_max_limit,
        }
    }

    /// Export settings derived from this configuration.
    pub fn export_settings(&self) -> ExportSettings {
        // Range checked in from_lookup.
        let utc_offset =
            offset_from_minutes(self.export_utc_offset_minutes).unwrap_or_else(|| chrono::Utc.fix());

        ExportSettings {
            batch_size: self.export_batch_size,
            default_currency: self.export_default_currency,
            utc_offset,
        }
    }
}

fn offset_from_minutes(minutes: i32) -> Option<FixedOffset> {
    minutes.checked_mul(60).and_then(FixedOffset::east_opt)
}

fn parse_or<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("{key} must be a valid {}", std::any::type_name::<T>())),
        None => Ok(default),
    }
}
