//! Property grid query engine.
//!
//! Turns loosely-typed list parameters (field selection, sort, free-text
//! search, filters, paging) into one validated [`QueryDescription`], then
//! executes it either as an interactive page or as a streamed spreadsheet
//! export. Every caller-supplied name is resolved through the field
//! [`registry`]; nothing from the request reaches SQL unvalidated.

pub mod assembler;
pub mod composer;
pub mod export;
pub mod filter;
pub mod format;
pub mod grid_service;
pub mod pager;
pub mod projection;
pub mod query_builder;
pub mod registry;
pub mod sort;
pub mod store;
pub mod types;

pub use composer::{GridParams, QueryComposer};
pub use export::CONTENT_TYPE as EXPORT_CONTENT_TYPE;
pub use format::Currency;
pub use grid_service::{ExportSettings, GridError, GridService};
pub use pager::PageLimits;
pub use registry::Field;
pub use store::{ListingStore, PgListingStore, RowStream};
pub use types::{
    BaseScope, FilterClause, FilterInput, FilterValue, GridRequest, GridResponse, PageResult,
    QueryDescription, Row, SortDirection,
};
